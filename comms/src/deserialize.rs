use crate::Result;

/// Something that can be read back from the payload of a single chunk.
pub trait Deserialize: Sized {
    /// Parses a whole chunk payload.
    fn deserialize(buf: &[u8]) -> Result<Self>;
}
