use std::{error::Error, fmt, io};

use model::PhiErr;

/// The codec module's result type.
pub type Result<T> = std::result::Result<T, CodecErr>;

/// Failures while writing or reading a chunk stream.
#[derive(Debug)]
pub enum CodecErr {
    Io(io::Error),
    /// The stream starts with a version byte this codec doesn't understand.
    UnsupportedVersion(u8),
    /// The stream ended in the middle of a length field or a payload.
    Truncated { expected: usize, got: usize },
    /// A payload was read in full but doesn't parse.
    Corrupted(String),
}

impl fmt::Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::UnsupportedVersion(version) => write!(f, "unsupported format version: {version}"),
            Self::Truncated { expected, got } => {
                write!(f, "truncated stream: expected {expected} bytes, got {got}")
            }
            Self::Corrupted(msg) => write!(f, "corrupted chunk: {msg}"),
        }
    }
}

impl Error for CodecErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CodecErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupted(value.to_string())
    }
}

impl From<PhiErr> for CodecErr {
    fn from(value: PhiErr) -> Self {
        Self::Corrupted(value.to_string())
    }
}
