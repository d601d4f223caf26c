use std::{collections::HashMap, sync::Arc};

use log::debug;
use model::ScoreData;
use parking_lot::{Mutex, RwLock};

use super::ScoreCalculator;

type ScoreKey = (String, String);
type Accumulator = Arc<Mutex<Option<ScoreData>>>;

/// Accumulates score contributions per (model, score) pair.
///
/// Every pair has its own lock, processors reporting for unrelated models or
/// scores never contend.
#[derive(Debug, Default)]
pub struct ScoresMerger {
    scores: RwLock<HashMap<ScoreKey, Accumulator>>,
}

impl ScoresMerger {
    /// Creates a new empty `ScoresMerger`.
    pub fn new() -> Self {
        Self::default()
    }

    fn accumulator(&self, model_name: &str, score_name: &str) -> Accumulator {
        let key = (model_name.to_string(), score_name.to_string());
        if let Some(acc) = self.scores.read().get(&key) {
            return Arc::clone(acc);
        }

        Arc::clone(self.scores.write().entry(key).or_default())
    }

    /// Folds `contribution` into the accumulated value of its score.
    ///
    /// # Arguments
    /// * `model_name` - The model the contribution was computed for.
    /// * `contribution` - A per batch score, named after its score.
    /// * `calculator` - The calculator owning the merge semantics of the score.
    pub fn append(&self, model_name: &str, contribution: &ScoreData, calculator: &dyn ScoreCalculator) {
        let acc = self.accumulator(model_name, &contribution.name);
        let mut acc = acc.lock();

        match acc.as_mut() {
            Some(accumulated) => calculator.append_score(accumulated, contribution),
            None => *acc = Some(contribution.clone()),
        }
    }

    /// Clears the accumulated scores of `model_name`, or of every model when `None`.
    pub fn reset(&self, model_name: Option<&str>) {
        let mut scores = self.scores.write();
        match model_name {
            Some(name) => scores.retain(|(model, _), _| model != name),
            None => scores.clear(),
        }

        debug!("scores reset: model={model_name:?}");
    }

    /// A snapshot of the accumulated value, `None` if nothing was appended yet.
    pub fn request(&self, model_name: &str, score_name: &str) -> Option<ScoreData> {
        let key = (model_name.to_string(), score_name.to_string());
        let acc = self.scores.read().get(&key).cloned()?;
        acc.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    struct Sum;

    impl ScoreCalculator for Sum {
        fn kind(&self) -> &str {
            "sum"
        }

        fn append_score(&self, accumulated: &mut ScoreData, contribution: &ScoreData) {
            accumulated
                .values
                .iter_mut()
                .zip(&contribution.values)
                .for_each(|(acc, v)| *acc += v);
        }
    }

    fn score(value: f64) -> ScoreData {
        ScoreData::new("perplexity", "sum", vec![value])
    }

    #[test]
    fn test_absent_score_yields_nothing() {
        let scores = ScoresMerger::new();
        assert_eq!(scores.request("m", "perplexity"), None);
    }

    #[test]
    fn test_append_accumulates_per_model() {
        let scores = ScoresMerger::new();
        scores.append("m1", &score(1.), &Sum);
        scores.append("m1", &score(2.), &Sum);
        scores.append("m2", &score(10.), &Sum);

        assert_eq!(scores.request("m1", "perplexity").unwrap().values, vec![3.]);
        assert_eq!(scores.request("m2", "perplexity").unwrap().values, vec![10.]);
    }

    #[test]
    fn test_reset_only_touches_one_model() {
        let scores = ScoresMerger::new();
        scores.append("m1", &score(1.), &Sum);
        scores.append("m2", &score(1.), &Sum);

        scores.reset(Some("m1"));
        assert_eq!(scores.request("m1", "perplexity"), None);
        assert!(scores.request("m2", "perplexity").is_some());

        scores.reset(None);
        assert_eq!(scores.request("m2", "perplexity"), None);
    }

    #[test]
    fn test_concurrent_appends_are_never_lost() {
        let scores = Arc::new(ScoresMerger::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scores = Arc::clone(&scores);
                thread::spawn(move || {
                    for _ in 0..100 {
                        scores.append("m", &score(1.), &Sum);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(scores.request("m", "perplexity").unwrap().values, vec![800.]);
    }
}
