use std::sync::Arc;

use parameter_server::{
    InstanceSchema, Merger, ThetaCache, scores::ScoresMerger, synchronization::Versioned,
};
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use worker::{BatchProcessor, ProcessorPool, ProcessorQueue};

use crate::{MasterErr, Result};

/// The state of a master: its models, scores, cached theta, work queue and processors.
///
/// Fields drop in order, the processors are stopped before the runtime goes away.
pub(crate) struct Instance {
    pub pool: Mutex<ProcessorPool>,
    pub queue: Arc<ProcessorQueue>,
    pub schema: Versioned<InstanceSchema>,
    pub merger: Arc<Merger>,
    pub scores: Arc<ScoresMerger>,
    pub cache: Arc<ThetaCache>,
    pub runtime: Runtime,
}

impl Instance {
    /// Creates a new `Instance` running `processors_count` processors.
    ///
    /// # Arguments
    /// * `schema` - The plugins and model settings.
    /// * `kernel` - The numeric kernel of every processor.
    /// * `processors_count` - The amount of processors to start.
    pub fn new(schema: InstanceSchema, kernel: Arc<dyn BatchProcessor>, processors_count: usize) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| MasterErr::Internal(format!("failed to start the runtime: {e}")))?;
        let queue = Arc::new(ProcessorQueue::new());

        let mut pool = ProcessorPool::new(Arc::clone(&queue), kernel, runtime.handle().clone());
        pool.resize(processors_count);

        Ok(Self {
            pool: Mutex::new(pool),
            queue,
            schema: Versioned::new(schema),
            merger: Arc::new(Merger::new()),
            scores: Arc::new(ScoresMerger::new()),
            cache: Arc::new(ThetaCache::new()),
            runtime,
        })
    }
}
