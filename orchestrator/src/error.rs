use std::{error::Error, fmt, io};

use comms::CodecErr;
use model::PhiErr;
use parameter_server::MergeErr;
use worker::WorkerErr;

/// The master module's result type.
pub type Result<T> = std::result::Result<T, MasterErr>;

/// All errors that can occur in the master component.
#[derive(Debug)]
pub enum MasterErr {
    /// A malformed or contradictory request, caught before any side effect.
    InvalidOperation(String),
    /// A referenced model is not registered.
    ModelNotFound(String),
    /// A file couldn't be opened or read.
    DiskRead(String),
    /// A file couldn't be created or written, or already exists.
    DiskWrite(String),
    /// A persisted stream is malformed.
    CorruptedMessage(String),
    /// An invariant of the instance doesn't hold.
    Internal(String),
}

impl fmt::Display for MasterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Self::ModelNotFound(name) => write!(f, "model {name} does not exist"),
            Self::DiskRead(msg) => write!(f, "disk read error: {msg}"),
            Self::DiskWrite(msg) => write!(f, "disk write error: {msg}"),
            Self::CorruptedMessage(msg) => write!(f, "corrupted message: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl Error for MasterErr {}

impl From<MergeErr> for MasterErr {
    fn from(value: MergeErr) -> Self {
        match value {
            MergeErr::InvalidOperation(msg) => Self::InvalidOperation(msg),
            MergeErr::ModelNotFound(name) => Self::ModelNotFound(name),
            MergeErr::Phi(e) => e.into(),
        }
    }
}

impl From<PhiErr> for MasterErr {
    fn from(value: PhiErr) -> Self {
        Self::InvalidOperation(value.to_string())
    }
}

impl From<CodecErr> for MasterErr {
    fn from(value: CodecErr) -> Self {
        match value {
            CodecErr::Io(e) => Self::DiskRead(e.to_string()),
            CodecErr::UnsupportedVersion(_) => Self::DiskRead(value.to_string()),
            CodecErr::Truncated { .. } | CodecErr::Corrupted(_) => {
                Self::CorruptedMessage(value.to_string())
            }
        }
    }
}

impl From<WorkerErr> for MasterErr {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e.into(),
            WorkerErr::Processing(msg) => Self::Internal(msg),
            WorkerErr::Phi(e) => e.into(),
            WorkerErr::Merge(e) => e.into(),
        }
    }
}

impl From<io::Error> for MasterErr {
    fn from(value: io::Error) -> Self {
        Self::DiskRead(value.to_string())
    }
}
