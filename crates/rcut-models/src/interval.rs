//! Time intervals, removal sources, overrides, and the keep plan.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A half-open time range `[start, end)` in seconds, in the source time base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl TimeRange {
    /// Create a new time range.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Duration in seconds (zero for inverted ranges).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether the range has positive length.
    pub fn is_positive(&self) -> bool {
        self.end > self.start
    }

    /// Whether two ranges overlap (sharing only an endpoint does not count).
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Gap between this range and a later one (negative when they overlap).
    pub fn gap_to(&self, later: &TimeRange) -> f64 {
        later.start - self.end
    }

    /// The overlapping portion of two ranges, if any.
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end > start).then_some(TimeRange { start, end })
    }

    /// Clip the range to `[0, total]`, returning `None` if nothing remains.
    pub fn clipped(&self, total: f64) -> Option<TimeRange> {
        let start = self.start.max(0.0);
        let end = self.end.min(total);
        (end > start).then_some(TimeRange { start, end })
    }

    /// Remove `other` from this range, yielding the surviving pieces in order.
    pub fn subtract(&self, other: &TimeRange) -> Vec<TimeRange> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::new();
        if other.start > self.start {
            pieces.push(TimeRange::new(self.start, other.start));
        }
        if other.end < self.end {
            pieces.push(TimeRange::new(other.end, self.end));
        }
        pieces
    }
}

/// Which decision source produced a removal interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalSource {
    /// Detected silence from the external media tool
    Silence,
    /// A superseded take found by the retake grouper
    Retake,
    /// An externally supplied arbitration decision
    Override,
}

impl RemovalSource {
    /// Returns the source as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silence => "silence",
            Self::Retake => "retake",
            Self::Override => "override",
        }
    }
}

/// A time range scheduled for removal, tagged with its decision source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemovalInterval {
    /// The range to remove
    pub range: TimeRange,
    /// The decision source that produced it
    pub source: RemovalSource,
}

impl RemovalInterval {
    /// Create a new removal interval.
    pub fn new(start: f64, end: f64, source: RemovalSource) -> Self {
        Self {
            range: TimeRange::new(start, end),
            source,
        }
    }
}

/// What an arbitration override asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// The range must survive trimming regardless of algorithmic decisions
    ForceKeep,
    /// The range must be removed regardless of algorithmic decisions
    ForceRemove,
}

/// An externally supplied decision that takes precedence over the algorithm.
///
/// Overrides are applied in list order; a later override wins over an earlier
/// one where their ranges overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverrideInterval {
    /// The range the override applies to
    pub range: TimeRange,
    /// Whether to force-keep or force-remove the range
    pub action: OverrideAction,
}

impl OverrideInterval {
    /// Create a force-keep override.
    pub fn force_keep(start: f64, end: f64) -> Self {
        Self {
            range: TimeRange::new(start, end),
            action: OverrideAction::ForceKeep,
        }
    }

    /// Create a force-remove override.
    pub fn force_remove(start: f64, end: f64) -> Self {
        Self {
            range: TimeRange::new(start, end),
            action: OverrideAction::ForceRemove,
        }
    }
}

/// Violation of the keep-plan invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeepPlanError {
    #[error("interval {index} has non-positive length ({start:.3}s - {end:.3}s)")]
    EmptyInterval { index: usize, start: f64, end: f64 },

    #[error("interval {index} starts at {start:.3}s, before the previous interval ends at {previous_end:.3}s")]
    OutOfOrder {
        index: usize,
        start: f64,
        previous_end: f64,
    },
}

/// The final, ordered, disjoint list of time ranges to keep for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct KeepPlan {
    /// Intervals to keep, strictly increasing and non-overlapping
    pub intervals: Vec<TimeRange>,
}

impl KeepPlan {
    /// Create a keep plan from already-ordered intervals.
    pub fn new(intervals: Vec<TimeRange>) -> Self {
        Self { intervals }
    }

    /// Number of keep intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the plan keeps nothing.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total kept duration in seconds.
    pub fn kept_duration(&self) -> f64 {
        self.intervals.iter().map(TimeRange::duration).sum()
    }

    /// Check the plan invariants: positive lengths, strictly increasing,
    /// non-overlapping.
    pub fn validate(&self) -> Result<(), KeepPlanError> {
        let mut previous_end = f64::NEG_INFINITY;
        for (index, interval) in self.intervals.iter().enumerate() {
            if !interval.is_positive() {
                return Err(KeepPlanError::EmptyInterval {
                    index,
                    start: interval.start,
                    end: interval.end,
                });
            }
            if interval.start < previous_end {
                return Err(KeepPlanError::OutOfOrder {
                    index,
                    start: interval.start,
                    previous_end,
                });
            }
            previous_end = interval.end;
        }
        Ok(())
    }

    /// The removed complement of this plan within `[0, total_duration]`.
    pub fn complement(&self, total_duration: f64) -> Vec<TimeRange> {
        let mut removed = Vec::new();
        let mut cursor = 0.0;
        for interval in &self.intervals {
            if interval.start > cursor {
                removed.push(TimeRange::new(cursor, interval.start));
            }
            cursor = cursor.max(interval.end);
        }
        if cursor < total_duration {
            removed.push(TimeRange::new(cursor, total_duration));
        }
        removed
    }
}
