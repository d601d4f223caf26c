use serde::{Deserialize, Serialize};

/// Per document topic distributions, one row per document (item).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThetaMatrix {
    pub model_name: String,
    pub topic_names: Vec<String>,
    pub item_ids: Vec<i32>,
    pub item_titles: Vec<String>,
    pub item_weights: Vec<Vec<f32>>,
    /// Per row topic indices, empty unless the matrix is sparse.
    #[serde(default)]
    pub topic_indices: Vec<Vec<u32>>,
}

impl ThetaMatrix {
    /// Creates a new dense `ThetaMatrix` without rows.
    ///
    /// # Arguments
    /// * `model_name` - The model that produced the distributions.
    /// * `topic_names` - The topic sequence of that model.
    pub fn new(model_name: impl Into<String>, topic_names: Vec<String>) -> Self {
        Self {
            model_name: model_name.into(),
            topic_names,
            ..Default::default()
        }
    }

    /// Appends a dense row.
    pub fn push_item(&mut self, item_id: i32, title: impl Into<String>, weights: Vec<f32>) {
        self.item_ids.push(item_id);
        self.item_titles.push(title.into());
        self.item_weights.push(weights);
    }

    /// The amount of documents.
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    pub fn is_sparse(&self) -> bool {
        !self.topic_indices.is_empty()
    }

    /// Appends every row of the dense matrix `other` to this one.
    pub fn extend(&mut self, other: &ThetaMatrix) {
        self.item_ids.extend_from_slice(&other.item_ids);
        self.item_titles.extend_from_slice(&other.item_titles);
        self.item_weights.extend_from_slice(&other.item_weights);
    }

    /// Converts this dense matrix into its sparse form, dropping weights not above `eps`.
    pub fn into_sparse(self, eps: f32) -> ThetaMatrix {
        let mut topic_indices = Vec::with_capacity(self.item_weights.len());
        let mut item_weights = Vec::with_capacity(self.item_weights.len());

        for row in self.item_weights {
            let (indices, weights): (Vec<u32>, Vec<f32>) = row
                .into_iter()
                .enumerate()
                .filter(|(_, w)| *w > eps)
                .map(|(i, w)| (i as u32, w))
                .unzip();

            topic_indices.push(indices);
            item_weights.push(weights);
        }

        Self {
            item_weights,
            topic_indices,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_sparse_drops_small_weights() {
        let mut theta = ThetaMatrix::new("m", vec!["a".into(), "b".into(), "c".into()]);
        theta.push_item(1, "doc1", vec![0.5, 0., 0.5]);
        theta.push_item(2, "doc2", vec![0., 1., 0.]);

        let sparse = theta.into_sparse(1e-6);

        assert!(sparse.is_sparse());
        assert_eq!(sparse.topic_indices, vec![vec![0, 2], vec![1]]);
        assert_eq!(sparse.item_weights, vec![vec![0.5, 0.5], vec![1.]]);
        assert_eq!(sparse.item_titles, vec!["doc1", "doc2"]);
    }
}
