use std::{error::Error, fmt};

use ndarray::ShapeError;

/// The specific result type for matrix operations.
pub type Result<T> = std::result::Result<T, PhiErr>;

/// Errors raised by matrix construction and arithmetic.
#[derive(Debug)]
pub enum PhiErr {
    /// Two matrices taking part in one operation don't share the same topic sequence.
    TopicMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },
    /// A topic name appears more than once.
    DuplicateTopic(String),
    /// A matrix was created without any topic.
    EmptyTopics,
    /// An external chunk doesn't describe a consistent matrix.
    MalformedChunk(String),
    /// The underlying storage refused to grow.
    Shape(ShapeError),
}

impl fmt::Display for PhiErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopicMismatch { expected, got } => write!(
                f,
                "topic mismatch: expected {} topics {expected:?}, got {} topics {got:?}",
                expected.len(),
                got.len()
            ),
            Self::DuplicateTopic(name) => write!(f, "duplicate topic name: {name}"),
            Self::EmptyTopics => f.write_str("a matrix must have at least one topic"),
            Self::MalformedChunk(msg) => write!(f, "malformed topic model chunk: {msg}"),
            Self::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for PhiErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for PhiErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
