use std::collections::HashSet;

use comms::specs::{ModelConfig, ProcessBatchesArgs};

use crate::{MasterErr, Result};

fn invalid(msg: impl Into<String>) -> MasterErr {
    MasterErr::InvalidOperation(msg.into())
}

fn validate_class_weights(class_ids: &[String], class_weights: &[f32], use_sparse_bow: bool) -> Result<()> {
    if !use_sparse_bow && (!class_ids.is_empty() || !class_weights.is_empty()) {
        return Err(invalid(
            "class_id and class_weight are only supported together with use_sparse_bow",
        ));
    }

    if class_ids.len() != class_weights.len() {
        return Err(invalid(format!(
            "{} class ids but {} class weights",
            class_ids.len(),
            class_weights.len()
        )));
    }

    Ok(())
}

/// Checks a model configuration and fills in the topic names it implies.
///
/// A configuration with `topics_count` but no `topic_names` gets `@topic_0`,
/// `@topic_1`, ... as names.
///
/// # Returns
/// The completed configuration, or an `InvalidOperation` error describing
/// the first inconsistency found.
pub(crate) fn validate_model_config(mut config: ModelConfig) -> Result<ModelConfig> {
    if config.name.is_empty() {
        return Err(invalid("ModelConfig.name is missing"));
    }

    validate_class_weights(&config.class_ids, &config.class_weights, config.use_sparse_bow)?;

    if config.topic_names.is_empty() {
        config.topic_names = (0..config.topics_count).map(|i| format!("@topic_{i}")).collect();
    } else if config.topics_count != 0 && config.topics_count != config.topic_names.len() {
        return Err(invalid(format!(
            "ModelConfig.topics_count is {} but {} topic names were given",
            config.topics_count,
            config.topic_names.len()
        )));
    }

    let mut seen = HashSet::with_capacity(config.topic_names.len());
    if let Some(dup) = config.topic_names.iter().find(|t| !seen.insert(*t)) {
        return Err(invalid(format!("duplicate topic name: {dup}")));
    }

    config.topics_count = config.topic_names.len();
    Ok(config)
}

/// Builds the inner loop settings of one processing round: the registered
/// settings of the model, overridden by whatever the request sets.
///
/// The topic sequence always comes from the model being processed.
///
/// # Arguments
/// * `registered` - The settings registered for the model, if any.
/// * `args` - The processing request.
/// * `topic_names` - The topics of the Pwt the round reads.
pub(crate) fn resolve_model_config(
    registered: Option<&ModelConfig>,
    args: &ProcessBatchesArgs,
    topic_names: &[String],
) -> Result<ModelConfig> {
    let mut config = registered
        .cloned()
        .unwrap_or_else(|| ModelConfig::new(&args.pwt_source_name));

    config.topic_names = topic_names.to_vec();
    config.topics_count = topic_names.len();

    if let Some(iterations) = args.inner_iterations_count {
        config.inner_iterations_count = iterations;
    }

    if args.stream_name.is_some() {
        config.stream_name = args.stream_name.clone();
    }

    if !args.regularizers.is_empty() {
        config.regularizers = args.regularizers.clone();
    }

    if !args.class_ids.is_empty() || !args.class_weights.is_empty() {
        config.class_ids = args.class_ids.clone();
        config.class_weights = args.class_weights.clone();
    }

    if let Some(reuse_theta) = args.reuse_theta {
        config.reuse_theta = reuse_theta;
    }

    if let Some(use_sparse_bow) = args.use_sparse_bow {
        config.use_sparse_bow = use_sparse_bow;
    }

    validate_class_weights(&config.class_ids, &config.class_weights, config.use_sparse_bow)?;
    Ok(config)
}
