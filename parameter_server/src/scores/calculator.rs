use std::{collections::HashMap, sync::Arc};

use model::{PhiMatrix, ScoreData};

/// The score calculators of an instance, by score name.
pub type ScoreCalculatorMap = HashMap<String, Arc<dyn ScoreCalculator>>;

/// A pluggable metric over a model.
///
/// Cumulative scores are computed per batch by the processors and folded
/// together with `append_score`, the others are computed on request out of
/// the model probabilities.
pub trait ScoreCalculator: Send + Sync {
    /// The kind of score this calculator produces.
    fn kind(&self) -> &str;

    fn is_cumulative(&self) -> bool {
        true
    }

    /// Folds the per batch `contribution` into `accumulated`.
    fn append_score(&self, accumulated: &mut ScoreData, contribution: &ScoreData);

    /// Computes a non cumulative score out of `pwt`.
    fn calculate_score(&self, pwt: &dyn PhiMatrix) -> Option<ScoreData> {
        let _ = pwt;
        None
    }
}
