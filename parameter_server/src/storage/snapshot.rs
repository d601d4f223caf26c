use std::sync::Arc;

use model::{DenseMatrix, PhiMatrix, TopicModel};

/// An immutable view of whatever is registered under a name.
///
/// Cloning a snapshot only clones the `Arc`, holders keep seeing the same
/// values even after a newer version gets published under the same name.
#[derive(Debug, Clone)]
pub enum ModelSnapshot {
    /// A standalone matrix, e.g. an nwt increment or a regularization term.
    Matrix(Arc<DenseMatrix>),
    /// A counts and probabilities pair.
    Topic(Arc<TopicModel>),
}

impl ModelSnapshot {
    /// The probabilities of a topic model, or the matrix itself.
    pub fn pwt(&self) -> &DenseMatrix {
        match self {
            Self::Matrix(matrix) => matrix,
            Self::Topic(model) => model.pwt(),
        }
    }

    /// The counts of a topic model, or the matrix itself.
    pub fn nwt(&self) -> &DenseMatrix {
        match self {
            Self::Matrix(matrix) => matrix,
            Self::Topic(model) => model.nwt(),
        }
    }

    pub fn topic_names(&self) -> &[String] {
        self.nwt().topic_names()
    }

    pub fn token_size(&self) -> usize {
        self.nwt().token_size()
    }

    pub fn is_topic_model(&self) -> bool {
        matches!(self, Self::Topic(_))
    }
}
