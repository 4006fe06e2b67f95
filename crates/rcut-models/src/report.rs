//! Diagnostic report models.
//!
//! The engine returns a [`TrimReport`] next to the keep plan so a UI can show
//! what was cut and why, and so arbitration callers can inspect the detected
//! retake groups before deciding on overrides.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interval::{OverrideAction, TimeRange};

/// Summary of one detected retake group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetakeGroupSummary {
    /// Group index, in order of the earliest member
    pub group_id: usize,

    /// Segment ids of all members, in chronological order
    pub member_ids: Vec<usize>,

    /// The member kept (latest start time wins)
    pub keep_id: usize,

    /// Members scheduled for removal
    pub remove_ids: Vec<usize>,

    /// Short text preview of the kept take, for arbitration hints
    pub preview: String,
}

/// A pair of overlapping overrides that asked for different actions.
///
/// The later override wins on the overlap; the conflict is reported rather
/// than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverrideConflict {
    /// The overlapping portion of the two overrides
    pub range: TimeRange,

    /// Action that won (from the later override)
    pub applied: OverrideAction,

    /// Action that was overridden (from the earlier override)
    pub discarded: OverrideAction,
}

/// Diagnostics for one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimReport {
    /// Duration of the source recording in seconds
    pub total_duration: f64,

    /// Total duration kept by the plan
    pub kept_duration: f64,

    /// Total duration removed (total minus kept)
    pub removed_duration: f64,

    /// Number of phrase segments derived from the transcript
    pub segment_count: usize,

    /// Number of silence intervals supplied by the caller
    pub silence_interval_count: usize,

    /// Number of removal intervals contributed by retake grouping
    pub retake_interval_count: usize,

    /// Detected retake groups, also exposed as hints for arbitration
    pub retake_groups: Vec<RetakeGroupSummary>,

    /// Conflicting override pairs, resolved last-applied-wins
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub override_conflicts: Vec<OverrideConflict>,
}

impl TrimReport {
    /// Fraction of the source kept by the plan (0.0 to 1.0).
    pub fn keep_ratio(&self) -> f64 {
        if self.total_duration > 0.0 {
            self.kept_duration / self.total_duration
        } else {
            1.0
        }
    }
}
