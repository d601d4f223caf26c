//! Payload layout of a `TopicModelChunk`:
//!
//! `[u32 BE header length][JSON header][f32 weights, row after row]`
//!
//! The header carries everything but the weights, so the bulk of the chunk is
//! copied as raw floats.

use model::{ChunkEncoding, Token, TopicModelChunk};

use crate::{CodecErr, Deserialize, Result, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

#[derive(serde::Serialize)]
struct ChunkHeaderRef<'a> {
    name: &'a str,
    topic_names: &'a [String],
    tokens: &'a [Token],
    encoding: ChunkEncoding,
    topic_indices: &'a [Vec<u32>],
}

#[derive(serde::Deserialize)]
struct ChunkHeader {
    name: String,
    topic_names: Vec<String>,
    tokens: Vec<Token>,
    encoding: ChunkEncoding,
    #[serde(default)]
    topic_indices: Vec<Vec<u32>>,
}

impl ChunkHeader {
    /// The amount of weights each row carries.
    fn row_lens(&self) -> Vec<usize> {
        match self.encoding {
            ChunkEncoding::Dense => vec![self.topic_names.len(); self.tokens.len()],
            ChunkEncoding::Sparse => self.topic_indices.iter().map(Vec::len).collect(),
        }
    }
}

impl Serialize for TopicModelChunk {
    fn serialize(&self, buf: &mut Vec<u8>) -> Result<()> {
        let header = ChunkHeaderRef {
            name: &self.name,
            topic_names: &self.topic_names,
            tokens: &self.tokens,
            encoding: self.encoding,
            topic_indices: &self.topic_indices,
        };

        let start = buf.len();
        buf.extend_from_slice(&[0; HEADER_SIZE]);
        serde_json::to_writer(&mut *buf, &header)?;

        let header_len = (buf.len() - start - HEADER_SIZE) as Header;
        buf[start..start + HEADER_SIZE].copy_from_slice(&header_len.to_be_bytes());

        for weights in &self.token_weights {
            buf.extend_from_slice(bytemuck::cast_slice(weights.as_slice()));
        }

        Ok(())
    }
}

impl Deserialize for TopicModelChunk {
    fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(CodecErr::Corrupted(format!(
                "payload of {} bytes can't hold a header",
                buf.len()
            )));
        }

        let (len_buf, rest) = buf.split_at(HEADER_SIZE);
        let mut len_bytes = [0; HEADER_SIZE];
        len_bytes.copy_from_slice(len_buf);
        let header_len = Header::from_be_bytes(len_bytes) as usize;

        if rest.len() < header_len {
            return Err(CodecErr::Corrupted(format!(
                "header of {header_len} bytes doesn't fit in {} bytes",
                rest.len()
            )));
        }

        let (header_buf, payload) = rest.split_at(header_len);
        let header: ChunkHeader = serde_json::from_slice(header_buf)?;

        let row_lens = header.row_lens();
        let weights_count: usize = row_lens.iter().sum();
        let weight_size = size_of::<f32>();

        if payload.len() != weights_count * weight_size {
            return Err(CodecErr::Corrupted(format!(
                "expected {weights_count} weights, payload holds {} bytes",
                payload.len()
            )));
        }

        // The payload sits at an arbitrary offset, so floats are read unaligned.
        let weights: Vec<f32> = payload
            .chunks_exact(weight_size)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let mut offset = 0;
        let token_weights = row_lens
            .into_iter()
            .map(|len| {
                let row = weights[offset..offset + len].to_vec();
                offset += len;
                row
            })
            .collect();

        let chunk = TopicModelChunk {
            name: header.name,
            topic_names: header.topic_names,
            tokens: header.tokens,
            encoding: header.encoding,
            topic_indices: header.topic_indices,
            token_weights,
        };

        chunk.validate()?;
        Ok(chunk)
    }
}
