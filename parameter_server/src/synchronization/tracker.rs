use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use log::debug;
use parking_lot::{Mutex, RwLock};
use tokio::{sync::Notify, time};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Round {
    pending: Mutex<HashSet<Uuid>>,
    done: Notify,
}

/// Tracks the in-flight tasks of a dispatch round, per model.
///
/// Every model has its own lock, processors of unrelated models report back
/// without contending.
#[derive(Debug, Default)]
pub struct BatchTracker {
    rounds: RwLock<HashMap<String, Arc<Round>>>,
}

impl BatchTracker {
    /// Creates a new `BatchTracker` without any pending task.
    pub fn new() -> Self {
        Self::default()
    }

    fn round(&self, model_name: &str) -> Option<Arc<Round>> {
        self.rounds.read().get(model_name).cloned()
    }

    /// Registers `task_id` as pending for `model_name`.
    ///
    /// # Returns
    /// `false` if the task was already registered, in which case nothing changes.
    pub fn add(&self, task_id: Uuid, model_name: &str) -> bool {
        let round = match self.round(model_name) {
            Some(round) => round,
            None => Arc::clone(self.rounds.write().entry(model_name.to_string()).or_default()),
        };

        round.pending.lock().insert(task_id)
    }

    /// Marks `task_id` as done, waking up the waiters once no task of `model_name` is pending.
    ///
    /// Reports for tasks that aren't pending are ignored.
    pub fn callback(&self, task_id: Uuid, model_name: &str) {
        let Some(round) = self.round(model_name) else {
            debug!("completion for unknown model ignored: model={model_name} task={task_id}");
            return;
        };

        let mut pending = round.pending.lock();
        if !pending.remove(&task_id) {
            debug!("completion for unknown task ignored: model={model_name} task={task_id}");
            return;
        }

        if pending.is_empty() {
            drop(pending);
            round.done.notify_waiters();
        }
    }

    /// Whether every task registered for `model_name` has reported back.
    pub fn is_everything_processed(&self, model_name: &str) -> bool {
        self.round(model_name)
            .is_none_or(|round| round.pending.lock().is_empty())
    }

    /// The amount of tasks still pending, across all models.
    pub fn pending(&self) -> usize {
        self.rounds
            .read()
            .values()
            .map(|round| round.pending.lock().len())
            .sum()
    }

    /// Waits until every task registered for `model_name` has reported back.
    ///
    /// # Arguments
    /// * `model_name` - The model the tasks were registered under.
    /// * `slice` - The longest single sleep between two checks of the pending set.
    pub async fn wait(&self, model_name: &str, slice: Duration) {
        let Some(round) = self.round(model_name) else {
            return;
        };

        loop {
            let notified = round.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if round.pending.lock().is_empty() {
                return;
            }

            let _ = time::timeout(slice, notified).await;
        }
    }
}
