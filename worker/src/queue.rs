use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::ProcessorInput;

#[derive(Default)]
struct State {
    items: VecDeque<ProcessorInput>,
    in_flight: usize,
}

/// The work queue shared by every processor of an instance.
///
/// Items are handed out in push order, each to exactly one processor.
#[derive(Default)]
pub struct ProcessorQueue {
    state: Mutex<State>,
    available: Notify,
    drained: Notify,
    idle: Notify,
}

impl ProcessorQueue {
    /// Creates a new empty `ProcessorQueue`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, input: ProcessorInput) {
        self.state.lock().items.push_back(input);
        self.available.notify_one();
    }

    /// Takes the oldest item, if any, counting it as in flight until `done` is called.
    pub fn try_pop(&self) -> Option<ProcessorInput> {
        let mut state = self.state.lock();
        let input = state.items.pop_front()?;
        state.in_flight += 1;

        if state.items.is_empty() {
            drop(state);
            self.drained.notify_waiters();
        }

        Some(input)
    }

    /// Waits for an item and takes it.
    ///
    /// Cancel safe, an item is never taken by a future that gets dropped.
    pub async fn pop(&self) -> ProcessorInput {
        loop {
            let available = self.available.notified();
            tokio::pin!(available);
            available.as_mut().enable();

            if let Some(input) = self.try_pop() {
                return input;
            }

            available.await;
        }
    }

    /// Marks one item previously taken as processed.
    pub fn done(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.items.is_empty() && state.in_flight == 0 {
            drop(state);
            self.idle.notify_waiters();
        }
    }

    /// The amount of items waiting for a processor.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The amount of items taken but not processed yet.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.items.is_empty() && state.in_flight == 0
    }

    /// Waits until every item has been taken by a processor.
    pub async fn wait_empty(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.is_empty() {
                return;
            }

            drained.await;
        }
    }

    /// Waits until every item taken has been processed and nothing is waiting.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.is_idle() {
                return;
            }

            idle.await;
        }
    }
}
