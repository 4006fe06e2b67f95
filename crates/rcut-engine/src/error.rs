//! Error types for the cut-decision engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while planning cuts.
///
/// Input validation failures are rejected before any computation; the engine
/// never returns a partially-applied plan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transcript contains no words")]
    EmptyTranscript,

    #[error("total duration must be positive, got {0:.3}s")]
    InvalidDuration(f64),

    #[error("word {index} (\"{text}\") ends at {end:.3}s before it starts at {start:.3}s")]
    InvalidWordSpan {
        index: usize,
        text: String,
        start: f64,
        end: f64,
    },

    #[error("word {index} (\"{text}\") starts at {start:.3}s, before the previous word ends at {previous_end:.3}s")]
    NonMonotonicTimestamps {
        index: usize,
        text: String,
        start: f64,
        previous_end: f64,
    },

    #[error("{what} interval {start:.3}s - {end:.3}s falls outside [0, {total:.3}s]")]
    IntervalOutOfBounds {
        what: &'static str,
        start: f64,
        end: f64,
        total: f64,
    },

    #[error("nothing survived trimming; the caller should fall back to the original recording")]
    NothingSurvived,

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create an out-of-bounds error for a named interval kind.
    pub fn out_of_bounds(what: &'static str, start: f64, end: f64, total: f64) -> Self {
        Self::IntervalOutOfBounds {
            what,
            start,
            end,
            total,
        }
    }
}
