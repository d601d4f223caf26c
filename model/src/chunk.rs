use serde::{Deserialize, Serialize};

use crate::{DenseMatrix, PhiErr, Result, Token, operations};

/// How the weights of a `TopicModelChunk` row are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkEncoding {
    /// One weight per topic, in topic order.
    #[default]
    Dense,
    /// Only the listed topics carry a weight, every other cell is zero.
    Sparse,
}

/// The external representation of (a slice of) a token-by-topic matrix.
///
/// This is what gets exported, imported and handed out to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModelChunk {
    pub name: String,
    pub topic_names: Vec<String>,
    pub tokens: Vec<Token>,
    pub encoding: ChunkEncoding,
    /// Per row topic indices, only populated for the sparse encoding.
    #[serde(default)]
    pub topic_indices: Vec<Vec<u32>>,
    pub token_weights: Vec<Vec<f32>>,
}

impl TopicModelChunk {
    /// Creates a new `TopicModelChunk` without rows.
    ///
    /// # Arguments
    /// * `name` - The name of the matrix this chunk belongs to.
    /// * `topic_names` - The topic sequence of the matrix.
    /// * `encoding` - The row layout.
    pub fn new(name: impl Into<String>, topic_names: Vec<String>, encoding: ChunkEncoding) -> Self {
        Self {
            name: name.into(),
            topic_names,
            tokens: Vec::new(),
            encoding,
            topic_indices: Vec::new(),
            token_weights: Vec::new(),
        }
    }

    /// Appends a dense row, one weight per topic.
    pub fn push_dense(&mut self, token: Token, weights: Vec<f32>) {
        self.tokens.push(token);
        self.token_weights.push(weights);
    }

    /// Appends a sparse row.
    pub fn push_sparse(&mut self, token: Token, topic_indices: Vec<u32>, weights: Vec<f32>) {
        self.tokens.push(token);
        self.topic_indices.push(topic_indices);
        self.token_weights.push(weights);
    }

    /// The amount of rows.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Checks the chunk describes a consistent matrix.
    ///
    /// # Returns
    /// A `MalformedChunk` error naming the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let topics = self.topic_names.len();
        let malformed = |msg: String| Err(PhiErr::MalformedChunk(msg));

        if topics == 0 {
            return malformed("no topic names".into());
        }

        if self.token_weights.len() != self.tokens.len() {
            return malformed(format!(
                "{} weight rows for {} tokens",
                self.token_weights.len(),
                self.tokens.len()
            ));
        }

        match self.encoding {
            ChunkEncoding::Dense => {
                if let Some(row) = self.token_weights.iter().position(|w| w.len() != topics) {
                    return malformed(format!("row {row} doesn't have {topics} weights"));
                }
            }
            ChunkEncoding::Sparse => {
                if self.topic_indices.len() != self.tokens.len() {
                    return malformed(format!(
                        "{} index rows for {} tokens",
                        self.topic_indices.len(),
                        self.tokens.len()
                    ));
                }

                let rows = self.topic_indices.iter().zip(&self.token_weights);
                for (row, (indices, weights)) in rows.enumerate() {
                    if indices.len() != weights.len() {
                        return malformed(format!("row {row} has mismatched indices and weights"));
                    }

                    if indices.iter().any(|&i| i as usize >= topics) {
                        return malformed(format!("row {row} references an unknown topic"));
                    }
                }
            }
        }

        Ok(())
    }

    /// Materializes this chunk into a new `DenseMatrix`.
    ///
    /// # Arguments
    /// * `name` - The name of the resulting matrix, regardless of the chunk's own name.
    pub fn to_matrix(&self, name: impl Into<String>) -> Result<DenseMatrix> {
        let mut matrix = DenseMatrix::new(name, self.topic_names.clone())?;
        operations::apply(self, 1., &mut matrix)?;
        Ok(matrix)
    }
}
