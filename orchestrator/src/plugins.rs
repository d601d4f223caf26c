use std::sync::Arc;

use parameter_server::{InstanceSchema, regularization::Regularizer, scores::ScoreCalculator};

use crate::{
    Result,
    configs::{MasterConfig, RegularizerConfig, ScoreConfig},
};

/// Creates the regularizers and score calculators named in a configuration.
///
/// Implementations should reject kinds they don't know with `InvalidOperation`.
pub trait PluginFactory: Send + Sync {
    fn create_regularizer(&self, config: &RegularizerConfig) -> Result<Arc<dyn Regularizer>>;

    fn create_score_calculator(&self, config: &ScoreConfig) -> Result<Arc<dyn ScoreCalculator>>;
}

/// Builds the schema of `config`, keeping the model settings of `previous`.
///
/// # Arguments
/// * `config` - The configuration to create the plugins of.
/// * `factory` - Creates each plugin.
/// * `previous` - The schema being replaced, if any.
///
/// # Returns
/// The new schema, or the first error returned by `factory`.
pub(crate) fn build_schema(
    config: &MasterConfig,
    factory: &dyn PluginFactory,
    previous: Option<&InstanceSchema>,
) -> Result<InstanceSchema> {
    let mut schema = InstanceSchema::new();

    for regularizer in &config.regularizer_config {
        schema.set_regularizer(&regularizer.name, factory.create_regularizer(regularizer)?);
    }

    for score in &config.score_config {
        schema.set_score_calculator(&score.name, factory.create_score_calculator(score)?);
    }

    if let Some(previous) = previous {
        previous
            .model_configs()
            .for_each(|model_config| schema.set_model_config(model_config.clone()));
    }

    Ok(schema)
}
