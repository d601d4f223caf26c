use std::{collections::HashMap, sync::Arc};

use log::debug;
use model::DenseMatrix;
use parking_lot::{Mutex, RwLock};

use super::ModelSnapshot;
use crate::{MergeErr, Result};

type Slot = Arc<Mutex<ModelSnapshot>>;

/// The named model table.
///
/// Every name has its own lock so writers of unrelated models never wait on
/// each other. Writers keep the table read locked while they write into a
/// slot, so a slot is never removed under a pending write.
#[derive(Debug, Default)]
pub struct ModelStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl ModelStore {
    /// Creates a new empty `ModelStore`.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.read().get(name).cloned()
    }

    /// Takes a snapshot of the model registered under `name`.
    pub fn get(&self, name: &str) -> Option<ModelSnapshot> {
        self.slot(name).map(|slot| slot.lock().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Publishes `snapshot` under `name`, replacing the previous one.
    pub fn set(&self, name: &str, snapshot: ModelSnapshot) {
        {
            let slots = self.slots.read();
            if let Some(slot) = slots.get(name) {
                *slot.lock() = snapshot;
                return;
            }
        }

        let mut slots = self.slots.write();
        match slots.get(name) {
            Some(slot) => *slot.lock() = snapshot,
            None => {
                slots.insert(name.to_string(), Arc::new(Mutex::new(snapshot)));
            }
        }
    }

    /// Adds `increment` cell by cell into the matrix registered under `name`.
    ///
    /// Readers holding a snapshot of the matrix keep their copy untouched, the
    /// sum is published as a new version.
    ///
    /// # Arguments
    /// * `name` - The name of a standalone matrix.
    /// * `increment` - The values to add, must share the matrix topic sequence.
    ///
    /// # Returns
    /// A `ModelNotFound` error if nothing is registered under `name`, or an
    /// `InvalidOperation` error if `name` holds a topic model.
    pub fn accumulate(&self, name: &str, increment: &DenseMatrix) -> Result<()> {
        let slots = self.slots.read();
        let slot = slots
            .get(name)
            .ok_or_else(|| MergeErr::ModelNotFound(name.to_string()))?;

        let mut snapshot = slot.lock();
        let ModelSnapshot::Matrix(matrix) = &mut *snapshot else {
            return Err(MergeErr::InvalidOperation(format!(
                "{name} is a topic model, increments only go into plain matrices"
            )));
        };

        Arc::make_mut(matrix).add_scaled(increment, 1.)?;
        Ok(())
    }

    /// Removes `name` from the table.
    ///
    /// # Returns
    /// Whether something was registered under `name`.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.slots.write().remove(name).is_some();
        if removed {
            debug!(model = name; "model disposed");
        }

        removed
    }
}
