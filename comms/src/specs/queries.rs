use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Reads per document topic distributions.
///
/// Without a batch the instance cache answers, with one the batch is processed on the spot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetThetaMatrixArgs {
    pub model_name: String,
    pub batch: Option<PathBuf>,
    #[serde(default)]
    pub use_sparse_format: bool,
    #[serde(default)]
    pub eps: f32,
}

/// Reads one score of a model.
///
/// Without a batch the accumulated value answers, with one the batch is scored on the spot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetScoreValueArgs {
    pub model_name: String,
    pub score_name: String,
    pub batch: Option<PathBuf>,
}

/// Waits until all queued work is done, `-1` waits forever.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaitIdleArgs {
    pub timeout_milliseconds: i64,
}

impl Default for WaitIdleArgs {
    fn default() -> Self {
        Self {
            timeout_milliseconds: -1,
        }
    }
}
