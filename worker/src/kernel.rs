use std::path::Path;

use comms::specs::ModelConfig;
use model::{DenseMatrix, PhiMatrix, ScoreData, ThetaMatrix};
use parameter_server::InstanceSchema;

use crate::Result;

/// What a `BatchProcessor` is asked to compute.
pub struct BatchRequest<'a> {
    pub batch_filename: &'a Path,
    pub model_name: &'a str,
    pub pwt: &'a dyn PhiMatrix,
    pub config: &'a ModelConfig,
    /// The regularizers and score calculators of the instance.
    pub schema: &'a InstanceSchema,
    pub compute_nwt: bool,
    pub compute_theta: bool,
}

/// What a `BatchProcessor` computed for one batch.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Fresh counts, shaped like `pwt`'s topics.
    pub nwt_increment: Option<DenseMatrix>,
    /// One dense row per document of the batch.
    pub theta: Option<ThetaMatrix>,
    /// One contribution per score computed, named after the score.
    pub scores: Vec<ScoreData>,
}

/// The numeric kernel inferring topic distributions over a batch of documents.
///
/// Reading the batch itself is up to the implementation.
pub trait BatchProcessor: Send + Sync {
    fn process(&self, request: &BatchRequest<'_>) -> Result<BatchOutput>;
}
