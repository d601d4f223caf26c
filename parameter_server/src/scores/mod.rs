mod calculator;
mod scores_merger;

pub use calculator::{ScoreCalculator, ScoreCalculatorMap};
pub use scores_merger::ScoresMerger;
