//! The authoritative state of a master instance: named models, accumulated scores,
//! cached theta rows and the bookkeeping of in-flight batches.

mod cache;
mod error;
mod merger;
pub mod regularization;
mod schema;
pub mod scores;
pub mod storage;
pub mod synchronization;

pub use cache::ThetaCache;
pub use error::{MergeErr, Result};
pub use merger::Merger;
pub use schema::InstanceSchema;
