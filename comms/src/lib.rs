mod chunk;
mod deserialize;
mod error;
mod reader;
mod serialize;
pub mod specs;
mod writer;

pub use deserialize::Deserialize;
pub use error::{CodecErr, Result};
pub use reader::ChunkReader;
pub use serialize::Serialize;
pub use writer::ChunkWriter;

/// The only persisted stream layout understood so far.
pub const FORMAT_VERSION: u8 = 0;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();
