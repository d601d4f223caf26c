use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MasterErr, Result};

/// A score to compute, `config` is handed as is to the calculator of `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub config: Value,
}

/// A regularizer to register, `config` is handed as is to the regularizer of `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularizerConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub config: Value,
}

/// The configuration of a master instance.
///
/// Everything but `disk_path` can be changed on a live instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Where relative batch file names are resolved.
    #[serde(default)]
    pub disk_path: Option<PathBuf>,
    #[serde(default = "default_processors_count")]
    pub processors_count: usize,
    /// Whether theta rows requested with the cache mode are kept in the instance.
    #[serde(default)]
    pub cache_theta: bool,
    /// The longest single sleep while waiting on batches.
    #[serde(default = "default_idle_loop_interval_ms")]
    pub idle_loop_interval_ms: u64,
    #[serde(default)]
    pub score_config: Vec<ScoreConfig>,
    #[serde(default)]
    pub regularizer_config: Vec<RegularizerConfig>,
}

fn default_processors_count() -> usize {
    1
}

fn default_idle_loop_interval_ms() -> u64 {
    10
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            disk_path: None,
            processors_count: default_processors_count(),
            cache_theta: false,
            idle_loop_interval_ms: default_idle_loop_interval_ms(),
            score_config: Vec::new(),
            regularizer_config: Vec::new(),
        }
    }
}

impl MasterConfig {
    /// Loads and validates a `MasterConfig` from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The JSON file, missing fields take their default value.
    ///
    /// # Returns
    /// The configuration, a `DiskRead` error if the file can't be read, or an
    /// `InvalidOperation` error if it isn't a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| MasterErr::DiskRead(format!("{}: {e}", path.display())))?;

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| MasterErr::InvalidOperation(format!("{}: {e}", path.display())))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration is consistent.
    ///
    /// # Returns
    /// An `InvalidOperation` error if the idle interval is zero, or two scores
    /// or two regularizers share a name.
    pub fn validate(&self) -> Result<()> {
        if self.idle_loop_interval_ms == 0 {
            return Err(MasterErr::InvalidOperation(
                "MasterConfig.idle_loop_interval_ms must be positive".into(),
            ));
        }

        check_names("score", self.score_config.iter().map(|c| c.name.as_str()))?;
        check_names("regularizer", self.regularizer_config.iter().map(|c| c.name.as_str()))
    }

    /// Adds `config`, or replaces the regularizer sharing its name.
    pub fn set_regularizer(&mut self, config: RegularizerConfig) {
        match self.regularizer_config.iter_mut().find(|c| c.name == config.name) {
            Some(current) => *current = config,
            None => self.regularizer_config.push(config),
        }
    }

    /// # Returns
    /// Whether a regularizer named `name` was configured.
    pub fn remove_regularizer(&mut self, name: &str) -> bool {
        let before = self.regularizer_config.len();
        self.regularizer_config.retain(|c| c.name != name);
        before != self.regularizer_config.len()
    }
}

fn check_names<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();

    for name in names {
        if name.is_empty() {
            return Err(MasterErr::InvalidOperation(format!("a {what} has an empty name")));
        }

        if !seen.insert(name) {
            return Err(MasterErr::InvalidOperation(format!("duplicate {what} name: {name}")));
        }
    }

    Ok(())
}
