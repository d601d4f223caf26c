use std::{path::PathBuf, sync::Arc};

use comms::specs::ModelConfig;
use parameter_server::{
    InstanceSchema, Merger, ThetaCache,
    scores::ScoresMerger,
    storage::ModelSnapshot,
    synchronization::BatchTracker,
};
use uuid::Uuid;

/// One batch to process against one model.
///
/// The item only holds references to the shared state it publishes into, the
/// processor never hands results back through it.
pub struct ProcessorInput {
    pub task_id: Uuid,
    /// The model whose probabilities are read, also the key the task is tracked under.
    pub model_name: String,
    pub batch_filename: PathBuf,
    pub model_config: ModelConfig,
    /// The probabilities as they were at dispatch time.
    pub pwt: ModelSnapshot,
    /// Where the fresh counts accumulate, none are computed without it.
    pub nwt_target_name: Option<String>,
    pub schema: Arc<InstanceSchema>,
    pub merger: Arc<Merger>,
    pub scores: Arc<ScoresMerger>,
    /// Where the theta rows go, none are computed without it.
    pub cache: Option<Arc<ThetaCache>>,
    pub tracker: Arc<BatchTracker>,
}
