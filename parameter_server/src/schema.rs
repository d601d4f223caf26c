use std::{collections::HashMap, sync::Arc};

use comms::specs::ModelConfig;

use crate::{
    regularization::{Regularizer, RegularizerMap},
    scores::{ScoreCalculator, ScoreCalculatorMap},
};

/// The plugins and per model settings shared by every component of an instance.
///
/// It is replaced wholesale on reconfiguration, components read it through a
/// `Versioned` snapshot.
#[derive(Clone, Default)]
pub struct InstanceSchema {
    regularizers: RegularizerMap,
    score_calculators: ScoreCalculatorMap,
    score_names: Vec<String>,
    model_configs: HashMap<String, ModelConfig>,
}

impl InstanceSchema {
    /// Creates a new empty `InstanceSchema`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regularizers(&self) -> &RegularizerMap {
        &self.regularizers
    }

    /// Adds or replaces the regularizer registered under `name`.
    pub fn set_regularizer(&mut self, name: impl Into<String>, regularizer: Arc<dyn Regularizer>) {
        self.regularizers.insert(name.into(), regularizer);
    }

    /// # Returns
    /// Whether a regularizer was registered under `name`.
    pub fn remove_regularizer(&mut self, name: &str) -> bool {
        self.regularizers.remove(name).is_some()
    }

    pub fn score_calculator(&self, name: &str) -> Option<Arc<dyn ScoreCalculator>> {
        self.score_calculators.get(name).cloned()
    }

    /// Adds or replaces the calculator of the score `name`.
    ///
    /// New scores are appended to the end of `score_names`.
    pub fn set_score_calculator(&mut self, name: impl Into<String>, calculator: Arc<dyn ScoreCalculator>) {
        let name = name.into();
        if !self.score_names.contains(&name) {
            self.score_names.push(name.clone());
        }

        self.score_calculators.insert(name, calculator);
    }

    /// The configured score names, in configuration order.
    pub fn score_names(&self) -> &[String] {
        &self.score_names
    }

    pub fn model_configs(&self) -> impl Iterator<Item = &ModelConfig> {
        self.model_configs.values()
    }

    pub fn model_config(&self, name: &str) -> Option<&ModelConfig> {
        self.model_configs.get(name)
    }

    /// Adds or replaces the settings of the model named after `config`.
    pub fn set_model_config(&mut self, config: ModelConfig) {
        self.model_configs.insert(config.name.clone(), config);
    }

    /// # Returns
    /// Whether settings were registered for `name`.
    pub fn remove_model_config(&mut self, name: &str) -> bool {
        self.model_configs.remove(name).is_some()
    }
}
