use crate::{PhiErr, Result, Token};

/// Read access to a token-by-topic matrix.
///
/// Regularizers and score calculators only ever see matrices through this view.
pub trait PhiMatrix: Send + Sync {
    /// The name the matrix is registered under.
    fn name(&self) -> &str;

    /// The ordered topic names, one per column.
    fn topic_names(&self) -> &[String];

    /// The amount of rows.
    fn token_size(&self) -> usize;

    /// The token stored at row `token_id`.
    fn token(&self, token_id: usize) -> &Token;

    /// Looks up the row of `token`, if the matrix holds it.
    fn token_index(&self, token: &Token) -> Option<usize>;

    /// The weight stored at (`token_id`, `topic_id`).
    fn get(&self, token_id: usize, topic_id: usize) -> f32;

    /// The amount of columns.
    fn topic_size(&self) -> usize {
        self.topic_names().len()
    }

    /// Checks that `other` has exactly this matrix topic sequence, same count and same order.
    ///
    /// # Returns
    /// A `TopicMismatch` error otherwise.
    fn check_topics(&self, other: &[String]) -> Result<()> {
        if self.topic_names() != other {
            return Err(PhiErr::TopicMismatch {
                expected: self.topic_names().to_vec(),
                got: other.to_vec(),
            });
        }

        Ok(())
    }
}
