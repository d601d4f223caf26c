use std::path::PathBuf;

use model::{ScoreData, ThetaMatrix};
use serde::{Deserialize, Serialize};

use super::RegularizerSettings;

/// Where the theta rows produced by a round of batch processing end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThetaMatrixType {
    /// Theta is thrown away.
    #[default]
    None,
    /// Theta goes to the instance cache, when the instance caches theta at all.
    Cache,
    /// Theta is returned to the caller, one dense row per document.
    Dense,
    /// Theta is returned to the caller, one sparse row per document.
    Sparse,
}

/// Processes a set of batches against a model and aggregates what comes out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessBatchesArgs {
    /// The model whose probabilities the processors read.
    pub pwt_source_name: String,
    /// Where the fresh counts of this round accumulate, must differ from the source.
    pub nwt_target_name: Option<String>,
    pub batch_filenames: Vec<PathBuf>,
    pub inner_iterations_count: Option<usize>,
    pub stream_name: Option<String>,
    #[serde(default)]
    pub regularizers: Vec<RegularizerSettings>,
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub class_weights: Vec<f32>,
    pub reuse_theta: Option<bool>,
    pub use_sparse_bow: Option<bool>,
    #[serde(default)]
    pub reset_scores: bool,
    #[serde(default)]
    pub theta_matrix_type: ThetaMatrixType,
}

/// The aggregated outcome of a `ProcessBatchesArgs` round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessBatchesResult {
    pub score_data: Vec<ScoreData>,
    pub theta_matrix: Option<ThetaMatrix>,
}
