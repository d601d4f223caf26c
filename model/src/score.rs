use serde::{Deserialize, Serialize};

/// The accumulated value of one score for one model.
///
/// The meaning of `values` is owned by the calculator of the score kind, this crate
/// only moves them around.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreData {
    pub name: String,
    pub kind: String,
    pub values: Vec<f64>,
}

impl ScoreData {
    /// Creates a new `ScoreData`.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            values,
        }
    }
}
