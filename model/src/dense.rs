use std::collections::{HashMap, HashSet};

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2, Axis};

use crate::{PhiErr, PhiMatrix, Result, Token};

/// A dense token-by-topic matrix.
///
/// Rows keep their insertion order, new rows are always zero-initialized.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    name: String,
    topic_names: Vec<String>,
    tokens: Vec<Token>,
    index: HashMap<Token, usize>,
    values: Array2<f32>,
}

impl DenseMatrix {
    /// Creates a new empty `DenseMatrix`.
    ///
    /// # Arguments
    /// * `name` - The name of the matrix.
    /// * `topic_names` - The ordered, unique names of the columns.
    ///
    /// # Returns
    /// The new matrix, or an error if `topic_names` is empty or has duplicates.
    pub fn new(name: impl Into<String>, topic_names: Vec<String>) -> Result<Self> {
        if topic_names.is_empty() {
            return Err(PhiErr::EmptyTopics);
        }

        let mut seen = HashSet::with_capacity(topic_names.len());
        if let Some(dup) = topic_names.iter().find(|topic| !seen.insert(*topic)) {
            return Err(PhiErr::DuplicateTopic(dup.clone()));
        }

        let topics = topic_names.len();
        Ok(Self {
            name: name.into(),
            topic_names,
            tokens: Vec::new(),
            index: HashMap::new(),
            values: Array2::zeros((0, topics)),
        })
    }

    /// Creates a zero matrix with the same tokens and topics as `other`.
    ///
    /// # Arguments
    /// * `name` - The name of the new matrix.
    /// * `other` - The matrix to take the shape from.
    pub fn zeros_like(name: impl Into<String>, other: &dyn PhiMatrix) -> Result<Self> {
        let mut matrix = Self::new(name, other.topic_names().to_vec())?;
        matrix.reshape(other)?;
        Ok(matrix)
    }

    /// Renames this matrix.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Adds `token` as a new zero row, or finds the row it already occupies.
    ///
    /// # Returns
    /// The row index of `token`.
    pub fn add_token(&mut self, token: Token) -> Result<usize> {
        if let Some(&token_id) = self.index.get(&token) {
            return Ok(token_id);
        }

        let zeros = Array1::<f32>::zeros(self.topic_names.len());
        self.values.push_row(zeros.view())?;

        let token_id = self.tokens.len();
        self.index.insert(token.clone(), token_id);
        self.tokens.push(token);
        Ok(token_id)
    }

    /// Grows this matrix so that it holds every token of `other`, new cells are zero.
    ///
    /// Existing rows keep their position.
    pub fn reshape(&mut self, other: &dyn PhiMatrix) -> Result<()> {
        for token_id in 0..other.token_size() {
            self.add_token(other.token(token_id).clone())?;
        }

        Ok(())
    }

    /// Overwrites the weight at (`token_id`, `topic_id`).
    pub fn set(&mut self, token_id: usize, topic_id: usize, value: f32) {
        self.values[[token_id, topic_id]] = value;
    }

    /// Adds `delta` to the weight at (`token_id`, `topic_id`).
    pub fn increase(&mut self, token_id: usize, topic_id: usize, delta: f32) {
        self.values[[token_id, topic_id]] += delta;
    }

    /// The weights of a single row.
    pub fn row(&self, token_id: usize) -> ArrayView1<'_, f32> {
        self.values.row(token_id)
    }

    /// The mutable weights of a single row.
    pub fn row_mut(&mut self, token_id: usize) -> ArrayViewMut1<'_, f32> {
        self.values.row_mut(token_id)
    }

    /// The whole weight table, rows are tokens and columns are topics.
    pub fn values_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.values.view_mut()
    }

    /// The tokens, in row order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Accumulates `weight * source` into this matrix, a running weighted sum.
    ///
    /// Tokens of `source` unknown to this matrix are appended first.
    ///
    /// # Arguments
    /// * `source` - The matrix to add, must have this matrix topic sequence.
    /// * `weight` - The scale applied to every cell of `source`.
    ///
    /// # Returns
    /// A `TopicMismatch` error if the topic sequences differ, in which case
    /// this matrix is left untouched.
    pub fn add_scaled(&mut self, source: &dyn PhiMatrix, weight: f32) -> Result<()> {
        self.check_topics(source.topic_names())?;

        for token_id in 0..source.token_size() {
            let target_id = self.add_token(source.token(token_id).clone())?;
            let mut row = self.values.row_mut(target_id);

            for (topic_id, cell) in row.iter_mut().enumerate() {
                *cell += weight * source.get(token_id, topic_id);
            }
        }

        Ok(())
    }

    /// Sums every column of the matrix.
    pub fn topic_sums(&self) -> Vec<f32> {
        self.values.sum_axis(Axis(0)).to_vec()
    }
}

impl PhiMatrix for DenseMatrix {
    fn name(&self) -> &str {
        &self.name
    }

    fn topic_names(&self) -> &[String] {
        &self.topic_names
    }

    fn token_size(&self) -> usize {
        self.tokens.len()
    }

    fn token(&self, token_id: usize) -> &Token {
        &self.tokens[token_id]
    }

    fn token_index(&self, token: &Token) -> Option<usize> {
        self.index.get(token).copied()
    }

    fn get(&self, token_id: usize, topic_id: usize) -> f32 {
        self.values[[token_id, topic_id]]
    }
}
