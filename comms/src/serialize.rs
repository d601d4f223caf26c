use crate::Result;

/// Something that can be written as the payload of a single chunk.
pub trait Serialize {
    /// Appends the payload bytes of `self` to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>) -> Result<()>;
}
