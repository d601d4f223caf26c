use std::fmt;

use serde::{Deserialize, Serialize};

/// The class every token belongs to unless told otherwise.
pub const DEFAULT_CLASS: &str = "@default_class";

/// A vocabulary entry, identified by its keyword and the modality it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token {
    pub keyword: String,
    pub class_id: String,
}

impl Token {
    /// Creates a new `Token`.
    ///
    /// # Arguments
    /// * `keyword` - The textual form of the token.
    /// * `class_id` - The class (modality) of the token.
    pub fn new(keyword: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            class_id: class_id.into(),
        }
    }

    /// Creates a new `Token` inside the default class.
    ///
    /// # Arguments
    /// * `keyword` - The textual form of the token.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::new(keyword, DEFAULT_CLASS)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_id, self.keyword)
    }
}
