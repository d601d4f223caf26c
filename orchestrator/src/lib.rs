//! The master of a topic model training instance.
//!
//! A `MasterComponent` dispatches batches to its processors, aggregates what
//! they produce, and applies the model updates (merge, regularize, normalize,
//! overwrite, import and export) to the named models it owns.

pub mod configs;
pub mod error;
mod instance;
mod master;
mod persistence;
mod plugins;

pub use configs::{MasterConfig, RegularizerConfig, ScoreConfig};
pub use error::{MasterErr, Result};
pub use master::MasterComponent;
pub use plugins::PluginFactory;
