//! Token-by-topic matrices and the arithmetic applied to them.

mod chunk;
mod dense;
mod error;
pub mod operations;
mod phi_matrix;
mod score;
mod theta;
mod token;
mod topic_model;

pub use chunk::{ChunkEncoding, TopicModelChunk};
pub use dense::DenseMatrix;
pub use error::{PhiErr, Result};
pub use phi_matrix::PhiMatrix;
pub use score::ScoreData;
pub use theta::ThetaMatrix;
pub use token::{DEFAULT_CLASS, Token};
pub use topic_model::TopicModel;
