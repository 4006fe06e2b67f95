//! Deterministic cut-decision engine for spoken-word recordings.
//!
//! The engine turns a word-level transcript and a list of detected silence
//! intervals into a final, disjoint list of time ranges to keep, removing
//! silence and superseded takes while keeping the speaker's last delivery of
//! each idea.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Words        │───►│ Segmenter    │───►│ Similarity + │
//! │ (timed)      │    │ (phrases)    │    │ Grouper      │
//! └──────────────┘    └──────────────┘    └──────┬───────┘
//!                                                │ retake removals
//! ┌──────────────┐                               ▼
//! │ Silence      │────────────────────►┌──────────────┐    ┌──────────────┐
//! │ intervals    │                     │ Interval     │───►│ KeepPlan +   │
//! └──────────────┘    overrides ──────►│ Merger       │    │ TrimReport   │
//!                                      └──────────────┘    └──────────────┘
//! ```
//!
//! Each invocation is a pure function of its inputs: no I/O, no global state,
//! and a complete, invariant-satisfying plan or an explicit error — never a
//! partially-applied one. The separate [`align`] module scores a produced
//! transcript against a reference and is the regression gate for threshold
//! tuning.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rcut_engine::{plan_cuts, EngineConfig, TrimRequest};
//!
//! let request = TrimRequest {
//!     words: &words,
//!     silences: &silences,
//!     overrides: &[],
//!     total_duration,
//! };
//! let trim = plan_cuts(&request, &EngineConfig::moderate())?;
//! render(&trim.plan); // external
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use rcut_models::{
    KeepPlan, OverrideInterval, RemovalInterval, RemovalSource, TimeRange, TrimReport, Word,
};

pub mod align;
pub mod config;
pub mod error;
pub mod grouper;
pub mod merger;
pub mod segmenter;
pub mod similarity;

pub use align::{compare_token_sequences, compare_transcripts, AlignmentBlock, AlignmentReport};
pub use config::{EngineConfig, ThresholdBand};
pub use error::{EngineError, EngineResult};
pub use grouper::{group_retakes, removal_intervals};
pub use merger::{build_keep_plan, MergeOutcome};
pub use segmenter::{segment_words, Segment};
pub use similarity::{SimilarityMethod, SimilarityScore};

/// Shared cancellation flag checked between comparison batches.
///
/// Cancelling yields [`EngineError::Cancelled`]; a partially-applied plan is
/// never returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Inputs for one engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct TrimRequest<'a> {
    /// Time-ordered transcript words
    pub words: &'a [Word],
    /// Silence ranges from the external media tool
    pub silences: &'a [TimeRange],
    /// Arbitration overrides, applied in order (later wins)
    pub overrides: &'a [OverrideInterval],
    /// Duration of the source recording in seconds
    pub total_duration: f64,
}

/// The engine's output: the keep plan for the renderer plus diagnostics.
#[derive(Debug, Clone)]
pub struct TrimPlan {
    /// Ordered disjoint ranges to keep
    pub plan: KeepPlan,
    /// Diagnostics for UI display, audit, or arbitration
    pub report: TrimReport,
}

/// Plan the cuts for one recording.
///
/// See [`plan_cuts_cancellable`] for the cancellable variant.
pub fn plan_cuts(request: &TrimRequest<'_>, config: &EngineConfig) -> EngineResult<TrimPlan> {
    plan_cuts_cancellable(request, config, &CancelToken::new())
}

/// Plan the cuts for one recording, aborting early if `cancel` fires.
pub fn plan_cuts_cancellable(
    request: &TrimRequest<'_>,
    config: &EngineConfig,
    cancel: &CancelToken,
) -> EngineResult<TrimPlan> {
    validate_request(request)?;

    let segments = segmenter::segment_words(request.words, config);
    let groups = grouper::group_retakes(&segments, config, cancel)?;
    let retake_removals = grouper::removal_intervals(&groups, &segments);

    let mut removals: Vec<RemovalInterval> = request
        .silences
        .iter()
        .map(|range| RemovalInterval {
            range: *range,
            source: RemovalSource::Silence,
        })
        .collect();
    let retake_count = retake_removals.len();
    removals.extend(retake_removals);

    let outcome = merger::build_keep_plan(
        &removals,
        request.overrides,
        request.words,
        request.total_duration,
        config,
    )?;

    let kept_duration = outcome.plan.kept_duration();
    let report = TrimReport {
        total_duration: request.total_duration,
        kept_duration,
        removed_duration: request.total_duration - kept_duration,
        segment_count: segments.len(),
        silence_interval_count: request.silences.len(),
        retake_interval_count: retake_count,
        retake_groups: groups,
        override_conflicts: outcome.conflicts,
    };

    info!(
        segments = report.segment_count,
        retake_groups = report.retake_groups.len(),
        keep_intervals = outcome.plan.len(),
        keep_ratio = format!("{:.1}%", 100.0 * report.keep_ratio()),
        "Cut planning complete"
    );

    Ok(TrimPlan {
        plan: outcome.plan,
        report,
    })
}

/// Reject invalid inputs before any computation.
fn validate_request(request: &TrimRequest<'_>) -> EngineResult<()> {
    let total = request.total_duration;
    if !(total.is_finite() && total > 0.0) {
        return Err(EngineError::InvalidDuration(total));
    }
    if request.words.is_empty() {
        return Err(EngineError::EmptyTranscript);
    }

    let mut previous_end = 0.0f64;
    for (index, word) in request.words.iter().enumerate() {
        if word.end < word.start {
            return Err(EngineError::InvalidWordSpan {
                index,
                text: word.text.clone(),
                start: word.start,
                end: word.end,
            });
        }
        if word.start < 0.0 || word.end > total {
            return Err(EngineError::out_of_bounds("word", word.start, word.end, total));
        }
        if index > 0 && word.start < previous_end {
            return Err(EngineError::NonMonotonicTimestamps {
                index,
                text: word.text.clone(),
                start: word.start,
                previous_end,
            });
        }
        previous_end = word.end;
    }

    for silence in request.silences {
        if silence.start < 0.0 || silence.end > total {
            return Err(EngineError::out_of_bounds(
                "silence",
                silence.start,
                silence.end,
                total,
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Vec<Word> {
        vec![
            Word::new("hello", 0.5, 0.9),
            Word::new("there.", 1.0, 1.4),
            Word::new("general", 5.0, 5.4),
            Word::new("remarks.", 5.5, 6.0),
        ]
    }

    #[test]
    fn test_empty_transcript_rejected() {
        let request = TrimRequest {
            words: &[],
            silences: &[],
            overrides: &[],
            total_duration: 10.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::EmptyTranscript)
        ));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let words = words();
        let request = TrimRequest {
            words: &words,
            silences: &[],
            overrides: &[],
            total_duration: 0.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_non_monotonic_words_rejected() {
        let words = vec![Word::new("b", 2.0, 2.5), Word::new("a", 1.0, 1.5)];
        let request = TrimRequest {
            words: &words,
            silences: &[],
            overrides: &[],
            total_duration: 10.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::NonMonotonicTimestamps { index: 1, .. })
        ));
    }

    #[test]
    fn test_inverted_word_span_rejected() {
        let words = vec![Word::new("a", 2.0, 1.5)];
        let request = TrimRequest {
            words: &words,
            silences: &[],
            overrides: &[],
            total_duration: 10.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::InvalidWordSpan { index: 0, .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_silence_rejected() {
        let words = words();
        let silences = [TimeRange::new(5.0, 12.0)];
        let request = TrimRequest {
            words: &words,
            silences: &silences,
            overrides: &[],
            total_duration: 10.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::IntervalOutOfBounds { what: "silence", .. })
        ));
    }

    #[test]
    fn test_word_beyond_duration_rejected() {
        let words = vec![Word::new("late", 9.5, 10.5)];
        let request = TrimRequest {
            words: &words,
            silences: &[],
            overrides: &[],
            total_duration: 10.0,
        };
        assert!(matches!(
            plan_cuts(&request, &EngineConfig::moderate()),
            Err(EngineError::IntervalOutOfBounds { what: "word", .. })
        ));
    }

    #[test]
    fn test_minimal_valid_request_produces_plan() {
        let words = words();
        let request = TrimRequest {
            words: &words,
            silences: &[],
            overrides: &[],
            total_duration: 10.0,
        };
        let trim = plan_cuts(&request, &EngineConfig::moderate()).unwrap();
        trim.plan.validate().unwrap();
        assert_eq!(trim.report.segment_count, 2);
        assert!(trim.report.retake_groups.is_empty());
        assert!((trim.report.kept_duration - 10.0).abs() < 1e-9);
    }
}
