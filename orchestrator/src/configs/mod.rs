mod master;
mod validator;

pub use master::{MasterConfig, RegularizerConfig, ScoreConfig};
pub(crate) use validator::{resolve_model_config, validate_model_config};
