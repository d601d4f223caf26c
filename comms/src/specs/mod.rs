//! The request and response types of every master component entry point.

mod batches;
mod models;
mod queries;

pub use batches::{ProcessBatchesArgs, ProcessBatchesResult, ThetaMatrixType};
pub use models::{
    ExportModelArgs, GetTopicModelArgs, ImportModelArgs, InitializeModelArgs, MatrixKind,
    MergeModelArgs, ModelConfig, NormalizeModelArgs, RegularizeModelArgs, RegularizerSettings,
};
pub use queries::{GetScoreValueArgs, GetThetaMatrixArgs, WaitIdleArgs};
