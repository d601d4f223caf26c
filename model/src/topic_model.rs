use crate::{DenseMatrix, PhiMatrix, Result, TopicModelChunk, operations};

/// A named model pairing its accumulated counts (`nwt`) with the probabilities
/// derived from them (`pwt`).
///
/// `pwt` is never edited directly, it's always the normalization of `nwt`.
#[derive(Debug, Clone)]
pub struct TopicModel {
    name: String,
    nwt: DenseMatrix,
    pwt: DenseMatrix,
}

impl TopicModel {
    /// Creates a new `TopicModel` out of its counts, deriving the probabilities.
    ///
    /// # Arguments
    /// * `name` - The name of the model.
    /// * `nwt` - The accumulated counts.
    pub fn new(name: impl Into<String>, mut nwt: DenseMatrix) -> Result<Self> {
        let name = name.into();
        nwt.set_name(name.clone());
        let pwt = operations::normalize(&name, &nwt, None)?;
        Ok(Self { name, nwt, pwt })
    }

    /// Creates a new `TopicModel` out of an external chunk holding its counts.
    ///
    /// # Arguments
    /// * `chunk` - The counts, the model is named after the chunk.
    pub fn from_chunk(chunk: &TopicModelChunk) -> Result<Self> {
        let nwt = chunk.to_matrix(chunk.name.clone())?;
        Self::new(chunk.name.clone(), nwt)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accumulated counts.
    pub fn nwt(&self) -> &DenseMatrix {
        &self.nwt
    }

    /// The normalized probabilities.
    pub fn pwt(&self) -> &DenseMatrix {
        &self.pwt
    }

    pub fn topic_names(&self) -> &[String] {
        self.nwt.topic_names()
    }

    pub fn token_size(&self) -> usize {
        self.nwt.token_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkEncoding, Token};

    #[test]
    fn test_from_chunk_derives_normalized_pwt() {
        let mut chunk = TopicModelChunk::new("m1", vec!["t0".into(), "t1".into()], ChunkEncoding::Dense);
        chunk.push_dense(Token::keyword("a"), vec![1., 0.]);
        chunk.push_dense(Token::keyword("b"), vec![3., 0.]);

        let model = TopicModel::from_chunk(&chunk).unwrap();

        assert_eq!(model.name(), "m1");
        assert_eq!(model.nwt().get(1, 0), 3.);
        assert_eq!(model.pwt().get(0, 0), 0.25);
        assert_eq!(model.pwt().get(1, 0), 0.75);
        // An all zero column falls back to the uniform distribution.
        assert_eq!(model.pwt().get(0, 1), 0.5);
    }
}
