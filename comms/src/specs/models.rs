use std::path::PathBuf;

use model::{ChunkEncoding, Token};
use serde::{Deserialize, Serialize};

/// A regularizer to invoke, by name, and the coefficient its contribution is scaled with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularizerSettings {
    pub name: String,
    pub tau: f64,
}

/// Per model configuration of the processors' inner loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub topics_count: usize,
    #[serde(default)]
    pub topic_names: Vec<String>,
    #[serde(default = "default_inner_iterations")]
    pub inner_iterations_count: usize,
    pub stream_name: Option<String>,
    #[serde(default)]
    pub regularizers: Vec<RegularizerSettings>,
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub class_weights: Vec<f32>,
    #[serde(default = "default_use_sparse_bow")]
    pub use_sparse_bow: bool,
    #[serde(default)]
    pub reuse_theta: bool,
}

fn default_inner_iterations() -> usize {
    10
}

fn default_use_sparse_bow() -> bool {
    true
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with default inner loop settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topics_count: 0,
            topic_names: Vec::new(),
            inner_iterations_count: default_inner_iterations(),
            stream_name: None,
            regularizers: Vec::new(),
            class_ids: Vec::new(),
            class_weights: Vec::new(),
            use_sparse_bow: default_use_sparse_bow(),
            reuse_theta: false,
        }
    }
}

/// Weighted sum of several count matrices into a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeModelArgs {
    pub nwt_target_name: String,
    pub nwt_source_names: Vec<String>,
    pub source_weights: Vec<f32>,
    /// Overrides the topic sequence of the target, taken from the first source otherwise.
    #[serde(default)]
    pub topic_names: Vec<String>,
}

/// Computes the regularization term of a model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegularizeModelArgs {
    pub pwt_source_name: String,
    pub nwt_source_name: String,
    pub rwt_target_name: String,
    #[serde(default)]
    pub regularizer_settings: Vec<RegularizerSettings>,
}

/// Derives probabilities out of counts and an optional regularization term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeModelArgs {
    pub pwt_target_name: String,
    pub nwt_source_name: String,
    pub rwt_source_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportModelArgs {
    pub model_name: String,
    pub file_name: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportModelArgs {
    pub model_name: String,
    pub file_name: PathBuf,
}

/// Creates a topic model over a known vocabulary with uniform probabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeModelArgs {
    pub model_name: String,
    pub tokens: Vec<Token>,
    pub topic_names: Vec<String>,
}

/// Which half of a topic model to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKind {
    #[default]
    Pwt,
    Nwt,
}

/// Reads (a slice of) a model back in its external representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetTopicModelArgs {
    pub model_name: String,
    #[serde(default)]
    pub matrix_kind: MatrixKind,
    /// Restricts the answer to these tokens, in this order.
    pub tokens: Option<Vec<Token>>,
    #[serde(default)]
    pub encoding: ChunkEncoding,
    #[serde(default)]
    pub eps: f32,
}
