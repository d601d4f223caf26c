//! The writing end of a persisted chunk stream.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{FORMAT_VERSION, LEN_TYPE_SIZE, LenType, Result, Serialize};

/// Writes a version byte followed by length prefixed chunks.
pub struct ChunkWriter<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
    chunks: usize,
}

impl<W: AsyncWrite + Unpin> ChunkWriter<W> {
    /// Creates a new `ChunkWriter`, writing the format version right away.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub async fn start(mut tx: W) -> Result<Self> {
        tx.write_all(&[FORMAT_VERSION]).await?;

        Ok(Self {
            tx,
            buf: Vec::new(),
            chunks: 0,
        })
    }

    /// Writes `msg` as the next chunk.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// The size in bytes of the written payload.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<usize> {
        let Self { buf, tx, chunks } = self;

        buf.clear();
        buf.resize(LEN_TYPE_SIZE, 0);
        msg.serialize(buf)?;

        let len = buf.len() - LEN_TYPE_SIZE;
        let header = (len as LenType).to_be_bytes();
        buf[..header.len()].copy_from_slice(&header);

        tx.write_all(buf).await?;
        *chunks += 1;
        Ok(len)
    }

    /// The amount of chunks written so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Flushes the stream and hands back the underlying writer.
    pub async fn finish(mut self) -> Result<W> {
        self.tx.flush().await?;
        Ok(self.tx)
    }
}
