use std::sync::Arc;

use log::info;
use tokio::{runtime::Handle, sync::oneshot, task::JoinHandle};

use crate::{BatchProcessor, ProcessorQueue, processor};

struct ProcessorHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// A resizable set of processors draining one queue with one kernel.
pub struct ProcessorPool {
    queue: Arc<ProcessorQueue>,
    kernel: Arc<dyn BatchProcessor>,
    runtime: Handle,
    processors: Vec<ProcessorHandle>,
    next_id: usize,
}

impl ProcessorPool {
    /// Creates a new `ProcessorPool` without any processor.
    ///
    /// # Arguments
    /// * `queue` - The queue to drain.
    /// * `kernel` - The numeric kernel every processor runs.
    /// * `runtime` - Where the processors are spawned, must be a multi thread runtime.
    pub fn new(queue: Arc<ProcessorQueue>, kernel: Arc<dyn BatchProcessor>, runtime: Handle) -> Self {
        Self {
            queue,
            kernel,
            runtime,
            processors: Vec::new(),
            next_id: 0,
        }
    }

    /// Grows or shrinks the pool to exactly `size` processors.
    ///
    /// Stopped processors finish the item they are working on first.
    pub fn resize(&mut self, size: usize) {
        while self.processors.len() < size {
            let (stop, stop_rx) = oneshot::channel();
            let fut = processor::run(
                self.next_id,
                Arc::clone(&self.queue),
                Arc::clone(&self.kernel),
                stop_rx,
            );

            self.next_id += 1;
            let task = self.runtime.spawn(fut);
            self.processors.push(ProcessorHandle { stop, task });
        }

        while self.processors.len() > size {
            if let Some(handle) = self.processors.pop() {
                let _ = handle.stop.send(());
            }
        }

        info!("processor pool resized: size={size}");
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// The kernel of the first processor, `None` when the pool is empty.
    pub fn first_processor(&self) -> Option<Arc<dyn BatchProcessor>> {
        self.processors.first().map(|_| Arc::clone(&self.kernel))
    }

    /// Whether every processor is still running.
    pub fn is_healthy(&self) -> bool {
        self.processors.iter().all(|p| !p.task.is_finished())
    }
}

impl Drop for ProcessorPool {
    fn drop(&mut self) {
        self.resize(0);
    }
}
