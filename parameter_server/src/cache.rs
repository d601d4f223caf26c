use std::collections::BTreeMap;

use model::ThetaMatrix;
use parking_lot::Mutex;

/// Theta rows kept around for later retrieval, keyed by (model, batch).
///
/// Processing the same batch again for the same model replaces its rows.
#[derive(Debug, Default)]
pub struct ThetaCache {
    entries: Mutex<BTreeMap<(String, String), ThetaMatrix>>,
}

impl ThetaCache {
    /// Creates a new empty `ThetaCache`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the rows `theta` produced for `batch`.
    ///
    /// # Arguments
    /// * `batch` - The identity of the processed batch.
    /// * `theta` - Its dense rows, keyed by the model they were computed with.
    pub fn update(&self, batch: &str, theta: ThetaMatrix) {
        let key = (theta.model_name.clone(), batch.to_string());
        self.entries.lock().insert(key, theta);
    }

    /// Concatenates every cached row of `model_name`, in batch order.
    ///
    /// # Arguments
    /// * `model_name` - The model to read the rows of.
    /// * `use_sparse_format` - Whether to convert the rows to their sparse form.
    /// * `eps` - Sparse rows only keep weights above it.
    ///
    /// # Returns
    /// `None` if nothing is cached for `model_name`.
    pub fn request(&self, model_name: &str, use_sparse_format: bool, eps: f32) -> Option<ThetaMatrix> {
        let entries = self.entries.lock();
        let mut rows = entries
            .iter()
            .filter(|((model, _), _)| model == model_name)
            .map(|(_, theta)| theta);

        let first = rows.next()?;
        let mut theta = ThetaMatrix::new(model_name, first.topic_names.clone());
        theta.extend(first);
        rows.for_each(|other| theta.extend(other));
        drop(entries);

        Some(match use_sparse_format {
            true => theta.into_sparse(eps),
            false => theta,
        })
    }

    /// Drops every row of `model_name`.
    pub fn dispose(&self, model_name: &str) {
        self.entries.lock().retain(|(model, _), _| model != model_name);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// The amount of cached batches.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
