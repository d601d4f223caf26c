use std::{error::Error, fmt};

use model::PhiErr;

/// The specific result type for the model merger.
pub type Result<T> = std::result::Result<T, MergeErr>;

/// Errors raised by the operations of the `Merger`.
#[derive(Debug)]
pub enum MergeErr {
    /// The request is malformed or contradicts itself.
    InvalidOperation(String),
    /// A referenced model is not registered.
    ModelNotFound(String),
    /// The matrices taking part in the operation are incompatible.
    Phi(PhiErr),
}

impl fmt::Display for MergeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Self::ModelNotFound(name) => write!(f, "model {name} does not exist"),
            Self::Phi(e) => write!(f, "phi matrix error: {e}"),
        }
    }
}

impl Error for MergeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Phi(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PhiErr> for MergeErr {
    fn from(value: PhiErr) -> Self {
        Self::Phi(value)
    }
}
