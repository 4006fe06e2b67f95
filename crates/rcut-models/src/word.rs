//! Transcript word models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single transcribed word with its timing in the source recording.
///
/// Words arrive already time-ordered from the transcription service and are
/// never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    /// The token text as produced by the transcriber (may carry punctuation)
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Duration of this word in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Midpoint of the word in seconds.
    ///
    /// Used to attribute a word to exactly one keep interval even when its
    /// span straddles a padded edge.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Whether the word ends with sentence-ending punctuation.
    pub fn ends_sentence(&self) -> bool {
        self.text
            .trim_end()
            .ends_with(|c: char| c == '.' || c == '!' || c == '?')
    }
}
