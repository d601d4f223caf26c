//! The reading end of a persisted chunk stream.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{CodecErr, Deserialize, FORMAT_VERSION, LEN_TYPE_SIZE, LenType, Result};

/// Reads back a stream written by a `ChunkWriter`.
pub struct ChunkReader<R: AsyncRead + Unpin> {
    rx: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Creates a new `ChunkReader`, consuming and checking the format version.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    ///
    /// # Returns
    /// An `UnsupportedVersion` error for any version other than the current one,
    /// or `Truncated` if the stream is empty.
    pub async fn start(mut rx: R) -> Result<Self> {
        let mut version = [0; 1];
        if read_full(&mut rx, &mut version).await? == 0 {
            return Err(CodecErr::Truncated {
                expected: 1,
                got: 0,
            });
        }

        if version[0] != FORMAT_VERSION {
            return Err(CodecErr::UnsupportedVersion(version[0]));
        }

        Ok(Self {
            rx,
            buf: Vec::new(),
        })
    }

    /// Waits to read the next chunk.
    ///
    /// # Returns
    /// `None` once the stream ends cleanly between two chunks. A stream ending inside a
    /// length field or a payload yields `Truncated`, a zero length or an unparseable
    /// payload yields `Corrupted`.
    pub async fn recv<T: Deserialize>(&mut self) -> Result<Option<T>> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        let got = read_full(&mut self.rx, &mut size_buf).await?;

        if got == 0 {
            return Ok(None);
        }

        if got < LEN_TYPE_SIZE {
            return Err(CodecErr::Truncated {
                expected: LEN_TYPE_SIZE,
                got,
            });
        }

        let len = LenType::from_be_bytes(size_buf);
        if len == 0 {
            return Err(CodecErr::Corrupted("zero length chunk".into()));
        }

        // Grows with the data actually present, a bogus length can't force a huge allocation.
        self.buf.clear();
        let got = (&mut self.rx).take(len).read_to_end(&mut self.buf).await?;

        if (got as LenType) < len {
            return Err(CodecErr::Truncated {
                expected: len as usize,
                got,
            });
        }

        T::deserialize(&self.buf).map(Some)
    }
}

/// Reads until `buf` is full or the stream ends.
///
/// # Returns
/// The amount of bytes read.
async fn read_full<R: AsyncRead + Unpin>(rx: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match rx.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }

    Ok(filled)
}
