use std::path::Path;

use comms::{ChunkReader, ChunkWriter};
use log::debug;
use model::{ChunkEncoding, DenseMatrix, PhiErr, PhiMatrix, TopicModelChunk, operations};
use tokio::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter},
};

use crate::{MasterErr, Result};

/// The upper bound of the amount of weights held by one exported chunk.
const CHUNK_BUDGET: usize = 100 * 1024 * 1024;

/// How many tokens of a matrix with `topic_size` topics fit into one chunk.
pub(crate) fn tokens_per_chunk(token_size: usize, topic_size: usize) -> usize {
    let budget = (CHUNK_BUDGET / topic_size.max(1)).max(1);
    token_size.min(budget)
}

fn disk_write(path: &Path, e: impl std::fmt::Display) -> MasterErr {
    MasterErr::DiskWrite(format!("{}: {e}", path.display()))
}

/// Streams `matrix` into a new file, `tokens_per_chunk` tokens per chunk.
///
/// # Returns
/// The amount of chunks written, or a `DiskWrite` error if the file exists
/// already or writing fails.
pub(crate) async fn export(path: &Path, matrix: &dyn PhiMatrix, tokens_per_chunk: usize) -> Result<usize> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| disk_write(path, e))?;

    let mut writer = ChunkWriter::start(BufWriter::new(file))
        .await
        .map_err(|e| disk_write(path, e))?;

    let token_size = matrix.token_size();
    let step = tokens_per_chunk.max(1);

    for start in (0..token_size).step_by(step) {
        let end = token_size.min(start + step);
        let tokens: Vec<_> = (start..end).map(|id| matrix.token(id).clone()).collect();
        let chunk = operations::retrieve(matrix, Some(tokens.as_slice()), ChunkEncoding::Sparse, 0.);

        writer.send(&chunk).await.map_err(|e| disk_write(path, e))?;
    }

    let chunks = writer.chunks();
    writer.finish().await.map_err(|e| disk_write(path, e))?;

    debug!("exported {} tokens into {chunks} chunks: path={}", token_size, path.display());
    Ok(chunks)
}

/// Reads every chunk of a file into one matrix named `name`.
///
/// Chunks are added up with weight one, a token repeated across chunks accumulates.
///
/// # Returns
/// The matrix, a `DiskRead` error if the file can't be opened or has an unknown
/// version, or a `CorruptedMessage` error if a chunk is truncated or malformed.
pub(crate) async fn import(path: &Path, name: &str) -> Result<DenseMatrix> {
    let file = File::open(path)
        .await
        .map_err(|e| MasterErr::DiskRead(format!("{}: {e}", path.display())))?;

    let corrupted = |e: PhiErr| MasterErr::CorruptedMessage(format!("{}: {e}", path.display()));
    let mut reader = ChunkReader::start(BufReader::new(file)).await?;
    let mut target: Option<DenseMatrix> = None;

    while let Some(chunk) = reader.recv::<TopicModelChunk>().await? {
        let mut matrix = match target.take() {
            Some(matrix) => matrix,
            None => DenseMatrix::new(name, chunk.topic_names.clone()).map_err(corrupted)?,
        };

        operations::apply(&chunk, 1., &mut matrix).map_err(corrupted)?;
        target = Some(matrix);
    }

    target.ok_or_else(|| MasterErr::CorruptedMessage(format!("{} holds no chunk", path.display())))
}

#[cfg(test)]
mod tests {
    use model::Token;

    use super::*;

    fn matrix(tokens: usize) -> DenseMatrix {
        let mut matrix = DenseMatrix::new("m", vec!["t0".into(), "t1".into(), "t2".into()]).unwrap();
        for i in 0..tokens {
            let id = matrix.add_token(Token::new(format!("w{i}"), "@c")).unwrap();
            matrix.set(id, i % 3, i as f32 + 0.5);
            matrix.set(id, (i + 1) % 3, -0.25);
        }
        matrix
    }

    #[test]
    fn test_tokens_per_chunk() {
        assert_eq!(tokens_per_chunk(10, 3), 10);
        assert_eq!(tokens_per_chunk(usize::MAX, 1024), CHUNK_BUDGET / 1024);
        assert_eq!(tokens_per_chunk(5, 0), 5);
    }

    #[tokio::test]
    async fn test_round_trip_regardless_of_chunk_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let source = matrix(7);

        for (i, per_chunk) in [1, 2, 3, 7, 100].into_iter().enumerate() {
            let path = dir.path().join(format!("model_{i}"));
            let chunks = export(&path, &source, per_chunk).await.unwrap();
            assert_eq!(chunks, 7usize.div_ceil(per_chunk.min(7)));

            let imported = import(&path, "imported").await.unwrap();
            assert_eq!(imported.name(), "imported");
            assert_eq!(imported.tokens(), source.tokens());
            assert_eq!(imported.topic_names(), source.topic_names());
            for token_id in 0..7 {
                assert_eq!(imported.row(token_id), source.row(token_id));
            }
        }
    }

    #[tokio::test]
    async fn test_export_refuses_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let res = export(file.path(), &matrix(1), 10).await;
        assert!(matches!(res, Err(MasterErr::DiskWrite(_))));
    }

    #[tokio::test]
    async fn test_import_truncated_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        export(&path, &matrix(4), 2).await.unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 5);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(import(&path, "m").await, Err(MasterErr::CorruptedMessage(_))));

        std::fs::write(&path, [7u8]).unwrap();
        assert!(matches!(import(&path, "m").await, Err(MasterErr::DiskRead(_))));

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(import(&path, "m").await, Err(MasterErr::CorruptedMessage(_))));

        let missing = dir.path().join("missing");
        assert!(matches!(import(&missing, "m").await, Err(MasterErr::DiskRead(_))));
    }
}
