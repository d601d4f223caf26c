mod regularizer;

pub use regularizer::{Regularizer, RegularizerMap, invoke_regularizers};
