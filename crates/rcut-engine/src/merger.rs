//! Multi-source interval fusion.
//!
//! Removal intervals from silence detection, retake grouping, and arbitration
//! overrides meet here and come out as one padded, fragment-cleaned keep plan.
//!
//! ```text
//! silence ──┐
//! retake  ──┼─► overrides ─► normalize ─► merge ─► invert ─► pad ─► de-fragment ─► re-merge
//! override ─┘
//! ```
//!
//! Overrides always dominate: a force-keep range is carved out of the removal
//! set before merging, a force-remove range joins it before normalization.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use rcut_models::{
    KeepPlan, OverrideAction, OverrideConflict, OverrideInterval, RemovalInterval, TimeRange, Word,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Result of interval fusion: the plan plus any override conflicts that were
/// resolved along the way.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The final keep plan
    pub plan: KeepPlan,
    /// Overlapping overrides with differing actions, resolved
    /// last-applied-wins
    pub conflicts: Vec<OverrideConflict>,
}

/// A keep candidate between removed runs, tracking which of its edges were
/// produced by a cut (as opposed to the absolute 0/total boundaries).
#[derive(Debug, Clone, Copy)]
struct KeepCandidate {
    range: TimeRange,
    cut_before: bool,
    cut_after: bool,
}

/// Fuse all removal intervals into the final keep plan.
///
/// `words` is only consulted for the word counts used by micro-fragment
/// elimination. An empty outcome is an explicit error so callers can fall
/// back to the untrimmed recording instead of rendering a zero-length file.
pub fn build_keep_plan(
    removals: &[RemovalInterval],
    overrides: &[OverrideInterval],
    words: &[Word],
    total_duration: f64,
    config: &EngineConfig,
) -> EngineResult<MergeOutcome> {
    let (force_keep, force_remove, conflicts) = resolve_overrides(overrides);

    // Step 1: collect and normalize the removal set
    let mut remove_ranges: Vec<TimeRange> = Vec::new();
    for removal in removals {
        if let Some(clipped) = removal.range.clipped(total_duration) {
            remove_ranges.push(clipped);
        }
    }
    for range in &force_remove {
        if let Some(clipped) = range.clipped(total_duration) {
            remove_ranges.push(clipped);
        }
    }

    // Force-keep ranges are carved out before merging so they can never be
    // swallowed by an adjacent removed run
    for keep_range in &force_keep {
        remove_ranges = remove_ranges
            .iter()
            .flat_map(|r| r.subtract(keep_range))
            .collect();
    }

    // Step 2: merge overlapping runs, fusing across sub-tolerance gaps
    let merged = merge_ranges(remove_ranges, config.padding_secs);

    // Step 3: invert into keep candidates
    let candidates = invert(&merged, total_duration);

    // Step 4: shrink candidates inward at cut edges
    let padded = apply_padding(&candidates, config.padding_secs);

    // Step 5: drop isolated micro-fragments
    let survivors = drop_micro_fragments(&padded, words, config);

    // Step 6: fuse keeps separated by imperceptible gaps
    let intervals = remerge(&survivors, config.merge_gap_secs);

    let plan = KeepPlan::new(intervals);
    if plan.is_empty() {
        warn!(
            removals = removals.len(),
            total_duration, "Nothing survived trimming"
        );
        return Err(EngineError::NothingSurvived);
    }

    let kept = plan.kept_duration();
    info!(
        keep_intervals = plan.len(),
        kept_secs = format!("{:.1}", kept),
        removed_secs = format!("{:.1}", total_duration - kept),
        keep_ratio = format!("{:.1}%", 100.0 * kept / total_duration),
        "Keep plan assembled"
    );

    Ok(MergeOutcome { plan, conflicts })
}

/// Apply overrides in list order, later ones winning on overlap.
///
/// Returns the effective force-keep ranges, force-remove ranges, and the
/// conflicts that were resolved. Conflicts are reported, never silently
/// dropped.
fn resolve_overrides(
    overrides: &[OverrideInterval],
) -> (Vec<TimeRange>, Vec<TimeRange>, Vec<OverrideConflict>) {
    let mut applied: Vec<OverrideInterval> = Vec::new();
    let mut conflicts = Vec::new();

    for incoming in overrides {
        if !incoming.range.is_positive() {
            continue;
        }
        let mut surviving = Vec::with_capacity(applied.len() + 1);
        for earlier in &applied {
            if let Some(overlap) = earlier.range.intersection(&incoming.range) {
                if earlier.action != incoming.action {
                    conflicts.push(OverrideConflict {
                        range: overlap,
                        applied: incoming.action,
                        discarded: earlier.action,
                    });
                }
            }
            for piece in earlier.range.subtract(&incoming.range) {
                surviving.push(OverrideInterval {
                    range: piece,
                    action: earlier.action,
                });
            }
        }
        surviving.push(*incoming);
        applied = surviving;
    }

    let force_keep = applied
        .iter()
        .filter(|o| o.action == OverrideAction::ForceKeep)
        .map(|o| o.range)
        .collect();
    let force_remove = applied
        .iter()
        .filter(|o| o.action == OverrideAction::ForceRemove)
        .map(|o| o.range)
        .collect();
    (force_keep, force_remove, conflicts)
}

/// Sort ranges and fuse overlapping runs, also fusing across gaps at or
/// below the tolerance so timestamp jitter cannot leave zero-length slivers
/// between two cuts.
fn merge_ranges(mut ranges: Vec<TimeRange>, tolerance: f64) -> Vec<TimeRange> {
    ranges.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(current) if range.start - current.end <= tolerance => {
                current.end = current.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Complement of the removed runs within `[0, total_duration]`.
fn invert(removed: &[TimeRange], total_duration: f64) -> Vec<KeepCandidate> {
    let mut candidates = Vec::new();
    let mut cursor = 0.0;
    let mut cut_before = false;

    for run in removed {
        if run.start > cursor {
            candidates.push(KeepCandidate {
                range: TimeRange::new(cursor, run.start),
                cut_before,
                cut_after: true,
            });
        }
        cursor = cursor.max(run.end);
        cut_before = true;
    }
    if cursor < total_duration {
        candidates.push(KeepCandidate {
            range: TimeRange::new(cursor, total_duration),
            cut_before,
            cut_after: false,
        });
    }
    candidates
}

/// Shrink each candidate inward by the padding at every edge bordering a
/// removed run. The absolute recording boundaries are left alone, so an
/// untouched recording stays untouched. Candidates inverted to non-positive
/// length are dropped.
fn apply_padding(candidates: &[KeepCandidate], padding: f64) -> Vec<KeepCandidate> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let mut range = candidate.range;
            if candidate.cut_before {
                range.start += padding;
            }
            if candidate.cut_after {
                range.end -= padding;
            }
            range.is_positive().then_some(KeepCandidate {
                range,
                ..*candidate
            })
        })
        .collect()
}

/// Drop keep candidates that are short, word-poor, and isolated.
///
/// All three conditions must hold: such an interval is far more likely to be
/// transcription noise than meaningful content. Neighbor distances are taken
/// from the pre-elimination list so the pass stays order-independent.
fn drop_micro_fragments(
    candidates: &[KeepCandidate],
    words: &[Word],
    config: &EngineConfig,
) -> Vec<TimeRange> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, candidate)| {
            let range = candidate.range;
            if range.duration() >= config.min_fragment_secs {
                return Some(range);
            }
            if words_within(words, &range) >= config.min_fragment_words {
                return Some(range);
            }

            let before = idx
                .checked_sub(1)
                .map(|p| range.start - candidates[p].range.end);
            let after = candidates
                .get(idx + 1)
                .map(|n| n.range.start - range.end);
            let nearest = match (before, after) {
                (Some(b), Some(a)) => b.min(a),
                (Some(b), None) => b,
                (None, Some(a)) => a,
                (None, None) => f64::INFINITY,
            };

            if nearest > config.isolation_secs {
                debug!(
                    start = format!("{:.2}", range.start),
                    end = format!("{:.2}", range.end),
                    nearest = format!("{:.2}", nearest),
                    "Dropping isolated micro-fragment"
                );
                None
            } else {
                Some(range)
            }
        })
        .collect()
}

/// Number of words whose midpoint falls inside the range.
fn words_within(words: &[Word], range: &TimeRange) -> usize {
    words
        .iter()
        .filter(|w| {
            let mid = w.midpoint();
            mid >= range.start && mid < range.end
        })
        .count()
}

/// Fuse keep intervals separated by a gap below the merge gap, re-including
/// the gap content rather than producing an imperceptible extra cut.
fn remerge(intervals: &[TimeRange], merge_gap: f64) -> Vec<TimeRange> {
    let mut merged: Vec<TimeRange> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if interval.start - current.end < merge_gap => {
                current.end = current.end.max(interval.end);
            }
            _ => merged.push(*interval),
        }
    }
    merged
}
