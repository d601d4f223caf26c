use std::{error::Error, fmt, io};

use model::PhiErr;
use parameter_server::MergeErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Failures while processing a batch.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    /// The kernel refused or failed to process the batch.
    Processing(String),
    Phi(PhiErr),
    /// Publishing the results into the shared state failed.
    Merge(MergeErr),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Processing(detail) => write!(f, "batch processing failed: {detail}"),
            WorkerErr::Phi(e) => write!(f, "phi matrix error: {e}"),
            WorkerErr::Merge(e) => write!(f, "failed to publish results: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Phi(e) => Some(e),
            WorkerErr::Merge(e) => Some(e),
            WorkerErr::Processing(_) => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PhiErr> for WorkerErr {
    fn from(value: PhiErr) -> Self {
        Self::Phi(value)
    }
}

impl From<MergeErr> for WorkerErr {
    fn from(value: MergeErr) -> Self {
        Self::Merge(value)
    }
}
