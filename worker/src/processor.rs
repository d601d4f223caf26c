use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::{debug, error, warn};
use tokio::{sync::oneshot, task};

use crate::{BatchProcessor, BatchRequest, ProcessorInput, ProcessorQueue, Result, WorkerErr};

/// Drains `queue` until `stop` fires or its sender is dropped.
///
/// Every item taken is reported to its tracker, whether processing succeeded or not.
pub(crate) async fn run(
    processor_id: usize,
    queue: Arc<ProcessorQueue>,
    kernel: Arc<dyn BatchProcessor>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(processor_id = processor_id; "processor started");

    loop {
        let input = tokio::select! {
            biased;
            _ = &mut stop => break,
            input = queue.pop() => input,
        };

        debug!(
            "processing batch: processor_id={processor_id} task={} batch={}",
            input.task_id,
            input.batch_filename.display()
        );

        let result = task::block_in_place(|| {
            panic::catch_unwind(AssertUnwindSafe(|| process(kernel.as_ref(), &input)))
                .unwrap_or_else(|payload| Err(WorkerErr::Processing(panic_message(payload))))
        });

        if let Err(e) = result {
            error!(
                "failed to process batch {}: processor_id={processor_id} task={}: {e}",
                input.batch_filename.display(),
                input.task_id
            );
        }

        input.tracker.callback(input.task_id, &input.model_name);
        queue.done();
    }

    debug!(processor_id = processor_id; "processor stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());

    format!("kernel panicked: {detail}")
}

/// Runs the kernel over one item and publishes what it computed into the
/// shared state the item points to.
pub(crate) fn process(kernel: &dyn BatchProcessor, input: &ProcessorInput) -> Result<()> {
    let request = BatchRequest {
        batch_filename: &input.batch_filename,
        model_name: &input.model_name,
        pwt: input.pwt.pwt(),
        config: &input.model_config,
        schema: &input.schema,
        compute_nwt: input.nwt_target_name.is_some(),
        compute_theta: input.cache.is_some(),
    };

    let output = kernel.process(&request)?;

    if let (Some(target), Some(increment)) = (&input.nwt_target_name, &output.nwt_increment) {
        input.merger.accumulate(target, increment)?;
    }

    if let (Some(cache), Some(mut theta)) = (&input.cache, output.theta) {
        theta.model_name = input.model_name.clone();
        cache.update(&input.batch_filename.to_string_lossy(), theta);
    }

    for score in &output.scores {
        match input.schema.score_calculator(&score.name) {
            Some(calculator) if calculator.is_cumulative() => {
                input.scores.append(&input.model_name, score, calculator.as_ref())
            }
            Some(_) => {}
            None => warn!(score = score.name.as_str(); "score is not configured, dropping it"),
        }
    }

    Ok(())
}
