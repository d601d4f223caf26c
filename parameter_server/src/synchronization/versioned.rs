use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;

/// A value replaced wholesale, readers take cheap `Arc` snapshots of it.
#[derive(Debug)]
pub struct Versioned<T> {
    value: RwLock<Arc<T>>,
    version: AtomicU64,
}

impl<T> Versioned<T> {
    /// Creates a new `Versioned` holding `value` as version zero.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(Arc::new(value)),
            version: AtomicU64::new(0),
        }
    }

    /// The current value, unaffected by later updates.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.value.read())
    }

    /// Publishes `value` as the new version.
    ///
    /// # Returns
    /// The version number of `value`.
    pub fn set(&self, value: T) -> u64 {
        let mut current = self.value.write();
        *current = Arc::new(value);
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publishes a modified copy of the current value.
    ///
    /// # Arguments
    /// * `f` - Edits the copy, or refuses to with an error in which case nothing is published.
    ///
    /// # Returns
    /// The new version number, or the error returned by `f`.
    pub fn update<E, F>(&self, f: F) -> Result<u64, E>
    where
        T: Clone,
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut current = self.value.write();
        let mut next = T::clone(&current);
        f(&mut next)?;

        *current = Arc::new(next);
        Ok(self.version.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}
