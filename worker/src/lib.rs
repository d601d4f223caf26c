//! The processors draining the work queue of a master instance.

pub mod error;
mod input;
mod kernel;
mod pool;
mod processor;
mod queue;

pub use error::{Result, WorkerErr};
pub use input::ProcessorInput;
pub use kernel::{BatchOutput, BatchProcessor, BatchRequest};
pub use pool::ProcessorPool;
pub use queue::ProcessorQueue;
