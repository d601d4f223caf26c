//! The arithmetic shared by every model update: applying external chunks,
//! retrieving them back, and deriving probabilities from counts.

use ndarray::{Axis, parallel::prelude::*};

use crate::{ChunkEncoding, DenseMatrix, PhiMatrix, Result, Token, TopicModelChunk};

/// Derives a probability matrix out of `nwt`, optionally shifted by the regularization term `rwt`.
///
/// For every topic column `raw = max(0, nwt + rwt)`, each cell is then divided by the
/// column sum. A column whose sum is zero becomes the uniform distribution `1 / tokens`.
///
/// # Arguments
/// * `name` - The name of the resulting matrix.
/// * `nwt` - The counts.
/// * `rwt` - The regularization term, tokens it lacks contribute nothing.
///
/// # Returns
/// A matrix with `nwt`'s tokens and topics, or a `TopicMismatch` error if `rwt`
/// has another topic sequence.
pub fn normalize(name: &str, nwt: &dyn PhiMatrix, rwt: Option<&dyn PhiMatrix>) -> Result<DenseMatrix> {
    if let Some(rwt) = rwt {
        nwt.check_topics(rwt.topic_names())?;
    }

    let mut pwt = DenseMatrix::zeros_like(name, nwt)?;
    let tokens = nwt.token_size();
    if tokens == 0 {
        return Ok(pwt);
    }

    let rwt_rows: Vec<Option<usize>> = match rwt {
        Some(rwt) => (0..tokens).map(|i| rwt.token_index(nwt.token(i))).collect(),
        None => Vec::new(),
    };

    let uniform = 1. / tokens as f32;

    pwt.values_mut()
        .axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(topic_id, mut column)| {
            let mut sum = 0.;

            for (token_id, cell) in column.iter_mut().enumerate() {
                let delta = match rwt {
                    Some(rwt) => rwt_rows[token_id].map_or(0., |row| rwt.get(row, topic_id)),
                    None => 0.,
                };

                let raw = (nwt.get(token_id, topic_id) + delta).max(0.);
                *cell = raw;
                sum += raw;
            }

            if sum > 0. {
                column.mapv_inplace(|raw| raw / sum);
            } else {
                column.fill(uniform);
            }
        });

    Ok(pwt)
}

/// Copies (a slice of) `matrix` into its external representation.
///
/// # Arguments
/// * `matrix` - The matrix to read.
/// * `tokens` - The tokens to retrieve, all of them when `None`. Tokens the matrix
///              doesn't hold come back as zero rows.
/// * `encoding` - The row layout of the chunk.
/// * `eps` - Sparse rows only keep weights whose magnitude is above it.
pub fn retrieve(
    matrix: &dyn PhiMatrix,
    tokens: Option<&[Token]>,
    encoding: ChunkEncoding,
    eps: f32,
) -> TopicModelChunk {
    let topics = matrix.topic_size();
    let mut chunk = TopicModelChunk::new(matrix.name(), matrix.topic_names().to_vec(), encoding);

    let mut push_row = |token: &Token, token_id: Option<usize>| {
        let weights: Vec<f32> = match token_id {
            Some(token_id) => (0..topics).map(|t| matrix.get(token_id, t)).collect(),
            None => vec![0.; topics],
        };

        match encoding {
            ChunkEncoding::Dense => chunk.push_dense(token.clone(), weights),
            ChunkEncoding::Sparse => {
                let (indices, values) = weights
                    .into_iter()
                    .enumerate()
                    .filter(|(_, w)| w.abs() > eps)
                    .map(|(t, w)| (t as u32, w))
                    .unzip();

                chunk.push_sparse(token.clone(), indices, values);
            }
        }
    };

    match tokens {
        Some(tokens) => tokens
            .iter()
            .for_each(|token| push_row(token, matrix.token_index(token))),
        None => (0..matrix.token_size()).for_each(|id| push_row(matrix.token(id), Some(id))),
    }

    chunk
}

/// Accumulates `weight * chunk` into `target`, appending tokens `target` doesn't hold yet.
///
/// Repeated tokens add up, they never overwrite.
///
/// # Returns
/// A `MalformedChunk` error if the chunk is inconsistent, or a `TopicMismatch`
/// error if its topic sequence differs from `target`'s.
pub fn apply(chunk: &TopicModelChunk, weight: f32, target: &mut DenseMatrix) -> Result<()> {
    chunk.validate()?;
    target.check_topics(&chunk.topic_names)?;

    for (row, token) in chunk.tokens.iter().enumerate() {
        let token_id = target.add_token(token.clone())?;
        let weights = &chunk.token_weights[row];

        match chunk.encoding {
            ChunkEncoding::Dense => {
                for (topic_id, w) in weights.iter().enumerate() {
                    target.increase(token_id, topic_id, weight * w);
                }
            }
            ChunkEncoding::Sparse => {
                for (&topic_id, w) in chunk.topic_indices[row].iter().zip(weights) {
                    target.increase(token_id, topic_id as usize, weight * w);
                }
            }
        }
    }

    Ok(())
}
