//! Retake grouping.
//!
//! Segments within a time window whose similarity clears an adaptive
//! threshold are linked into groups; within each group only the latest take
//! survives. Links are merged through a parent-pointer union-find indexed by
//! segment position, so "kept" and "removed" are derived labels over group
//! membership rather than a separate object graph, and the merge result does
//! not depend on traversal order.

use rayon::prelude::*;
use tracing::{debug, info};

use rcut_models::{RemovalInterval, RemovalSource, RetakeGroupSummary};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::segmenter::Segment;
use crate::similarity::{combined_score, SimilarityScore};
use crate::CancelToken;

/// Characters of kept-take text exposed in group previews.
const PREVIEW_CHARS: usize = 60;

/// Segments scanned per cancellation check.
const SCAN_BATCH: usize = 64;

/// Parent-pointer union-find over segment positions.
///
/// Roots are always the smallest member index, which keeps the merge
/// symmetric and independent of link order.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving keeps the trees flat without recursion
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let (low, high) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[high] = low;
    }
}

/// Detect retake groups among chronologically ordered segments.
///
/// For each segment, up to `lookahead` following segments are examined, or
/// fewer when the time window runs out. The pairwise scoring is pure and runs
/// on rayon workers; links are then merged serially in segment order so the
/// outcome is reproducible regardless of scheduling. The cancel token is
/// checked between comparison batches.
pub fn group_retakes(
    segments: &[Segment],
    config: &EngineConfig,
    cancel: &CancelToken,
) -> EngineResult<Vec<RetakeGroupSummary>> {
    if segments.len() < 2 {
        return Ok(Vec::new());
    }

    let mut links: Vec<SimilarityScore> = Vec::new();
    for batch_start in (0..segments.len()).step_by(SCAN_BATCH) {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let batch_end = (batch_start + SCAN_BATCH).min(segments.len());
        let batch_links: Vec<Vec<SimilarityScore>> = (batch_start..batch_end)
            .into_par_iter()
            .map(|i| links_for_segment(segments, i, config))
            .collect();
        links.extend(batch_links.into_iter().flatten());
    }

    for link in &links {
        debug!(
            a = link.a,
            b = link.b,
            score = format!("{:.3}", link.value),
            method = ?link.method,
            "Linked retake candidates"
        );
    }

    let mut set = DisjointSet::new(segments.len());
    for link in &links {
        set.union(link.a, link.b);
    }

    let groups = collect_groups(segments, &mut set);
    info!(
        segments = segments.len(),
        links = links.len(),
        groups = groups.len(),
        "Retake grouping complete"
    );

    Ok(groups)
}

/// Score segment `i` against its lookahead window and return the links found.
fn links_for_segment(
    segments: &[Segment],
    i: usize,
    config: &EngineConfig,
) -> Vec<SimilarityScore> {
    let a = &segments[i];
    let mut links = Vec::new();
    let mut examined = 0usize;

    for (offset, b) in segments[i + 1..].iter().enumerate() {
        if b.start - a.end > config.time_window_secs {
            break;
        }
        if examined >= config.lookahead {
            break;
        }
        examined += 1;
        let j = i + 1 + offset;

        let (value, method) = combined_score(&a.tokens, &b.tokens, config.ngram_size);
        let threshold = config.similarity_threshold(a.word_count.min(b.word_count));

        let generic = value >= threshold;
        let opening = shares_opening(a, b, config) && value >= config.opening_min_similarity;
        let adjacency = b.start - a.end <= config.adjacency_gap_secs
            && value >= config.adjacency_threshold_factor * threshold;

        if generic || opening || adjacency {
            links.push(SimilarityScore {
                a: i,
                b: j,
                value,
                method,
            });
        }
    }

    links
}

/// Same-opening rule: the first few normalized words match at a high ratio.
///
/// Catches a false start that the speaker immediately completed differently,
/// where overall similarity alone would stay below the generic threshold.
fn shares_opening(a: &Segment, b: &Segment, config: &EngineConfig) -> bool {
    let k = config
        .opening_words
        .min(a.tokens.len())
        .min(b.tokens.len());
    if k < 3 {
        return false;
    }

    let matched = a.tokens[..k]
        .iter()
        .zip(&b.tokens[..k])
        .filter(|(x, y)| x == y)
        .count();

    matched as f64 / k as f64 >= config.opening_match_ratio
}

/// Derive groups and keep/remove labels from union-find membership.
fn collect_groups(segments: &[Segment], set: &mut DisjointSet) -> Vec<RetakeGroupSummary> {
    let mut members_by_root: Vec<Vec<usize>> = vec![Vec::new(); segments.len()];
    for idx in 0..segments.len() {
        let root = set.find(idx);
        members_by_root[root].push(idx);
    }

    let mut groups = Vec::new();
    for members in members_by_root {
        if members.len() < 2 {
            continue;
        }

        let keep_id = select_keep(segments, &members);
        let remove_ids: Vec<usize> = members.iter().copied().filter(|&m| m != keep_id).collect();
        groups.push(RetakeGroupSummary {
            group_id: groups.len(),
            preview: segments[keep_id].preview(PREVIEW_CHARS),
            member_ids: members,
            keep_id,
            remove_ids,
        });
    }

    groups
}

/// Keep-last policy: latest start wins; ties go to the longer normalized
/// text, then to the later original position.
fn select_keep(segments: &[Segment], members: &[usize]) -> usize {
    let mut best = members[0];
    for &candidate in &members[1..] {
        let cand = &segments[candidate];
        let cur = &segments[best];
        let later = cand.start > cur.start;
        let tied = cand.start == cur.start;
        let longer = cand.normalized_text().len() > cur.normalized_text().len();
        let same_length = cand.normalized_text().len() == cur.normalized_text().len();
        if later || (tied && longer) || (tied && same_length && candidate > best) {
            best = candidate;
        }
    }
    best
}

/// Turn the remove members of each group into retake removal intervals.
pub fn removal_intervals(
    groups: &[RetakeGroupSummary],
    segments: &[Segment],
) -> Vec<RemovalInterval> {
    let mut removals: Vec<RemovalInterval> = groups
        .iter()
        .flat_map(|group| group.remove_ids.iter())
        .filter_map(|&id| segments.get(id))
        .map(|segment| RemovalInterval::new(segment.start, segment.end, RemovalSource::Retake))
        .collect();
    removals.sort_by(|a, b| {
        a.range
            .start
            .partial_cmp(&b.range.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    removals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::segment_words;
    use rcut_models::Word;

    fn seg(id: usize, text: &str, start: f64, end: f64) -> Segment {
        Segment {
            id,
            start,
            end,
            text: text.to_string(),
            tokens: crate::similarity::normalize_tokens(text),
            word_count: text.split_whitespace().count(),
        }
    }

    fn run(segments: &[Segment]) -> Vec<RetakeGroupSummary> {
        group_retakes(segments, &EngineConfig::moderate(), &CancelToken::new()).unwrap()
    }

    #[test]
    fn test_near_duplicate_within_window_groups_and_keeps_last() {
        let segments = vec![
            seg(0, "we should deploy the service now", 10.0, 13.0),
            seg(1, "we should deploy the service now immediately", 100.0, 103.5),
        ];
        let groups = run(&segments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec![0, 1]);
        assert_eq!(groups[0].keep_id, 1);
        assert_eq!(groups[0].remove_ids, vec![0]);
        assert!(groups[0].preview.starts_with("we should deploy"));
    }

    #[test]
    fn test_generic_phrasing_below_threshold_not_grouped() {
        // Shared filler only; both measures stay well below threshold(>10)
        let segments = vec![
            seg(
                0,
                "so basically what I want to talk about today is the budget",
                0.0,
                4.0,
            ),
            seg(
                1,
                "so basically here is an unrelated story about my vacation plans",
                6.0,
                10.0,
            ),
        ];
        let groups = run(&segments);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_outside_time_window_not_grouped() {
        let config = EngineConfig::moderate().with_time_window_secs(30.0);
        let segments = vec![
            seg(0, "we should deploy the service now", 0.0, 3.0),
            seg(1, "we should deploy the service now", 100.0, 103.0),
        ];
        let groups = group_retakes(&segments, &config, &CancelToken::new()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_lookahead_limits_candidates() {
        let config = EngineConfig::moderate().with_lookahead(1);
        let segments = vec![
            seg(0, "we should deploy the service now", 0.0, 3.0),
            seg(1, "completely different filler content here", 4.0, 6.0),
            seg(2, "we should deploy the service now", 8.0, 11.0),
        ];
        let groups = group_retakes(&segments, &config, &CancelToken::new()).unwrap();
        assert!(groups.is_empty());

        // With the default lookahead of 3 the duplicate is reachable
        let groups = run(&segments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec![0, 2]);
    }

    #[test]
    fn test_same_opening_rule_links_false_start() {
        // Opening matches 4/4 but the endings diverge enough that the
        // generic threshold alone does not link them; the gap is too wide
        // for the adjacency rule
        let segments = vec![
            seg(0, "and then we move on to the part", 0.0, 2.0),
            seg(
                1,
                "and then we move over to the completely different configuration screen with all options visible",
                5.0,
                9.0,
            ),
        ];
        let a = &segments[0].tokens;
        let b = &segments[1].tokens;
        let config = EngineConfig::moderate();
        let (value, _) = combined_score(a, b, config.ngram_size);
        let threshold =
            config.similarity_threshold(segments[0].word_count.min(segments[1].word_count));
        assert!(value < threshold, "precondition: generic rule must not fire");
        assert!(value >= config.opening_min_similarity);

        let groups = run(&segments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep_id, 1);
    }

    #[test]
    fn test_adjacency_rule_links_self_interruption() {
        // Similarity lands between 0.85x and 1x of the generic bar, and the
        // openings differ, so only the near-zero gap links the pair
        let segments = vec![
            seg(0, "the quick brown fox jumps high", 0.0, 2.0),
            seg(1, "well a quick brown fox runs today", 2.2, 4.5),
        ];
        let a = &segments[0].tokens;
        let b = &segments[1].tokens;
        let config = EngineConfig::moderate();
        let (value, _) = combined_score(a, b, config.ngram_size);
        let threshold = config.similarity_threshold(6);
        assert!(value < threshold, "precondition: below the generic bar");
        assert!(
            value >= config.adjacency_threshold_factor * threshold,
            "precondition: inside the adjacency margin"
        );

        let groups = run(&segments);
        assert_eq!(groups.len(), 1, "near-zero gap should link the pair");

        // The same pair further apart stays unlinked
        let apart = vec![
            seg(0, "the quick brown fox jumps high", 0.0, 2.0),
            seg(1, "well a quick brown fox runs today", 6.0, 8.3),
        ];
        assert!(run(&apart).is_empty());
    }

    #[test]
    fn test_union_is_order_independent() {
        let mut forward = DisjointSet::new(4);
        forward.union(0, 1);
        forward.union(2, 3);
        forward.union(1, 3);

        let mut backward = DisjointSet::new(4);
        backward.union(1, 3);
        backward.union(2, 3);
        backward.union(0, 1);

        for i in 0..4 {
            assert_eq!(forward.find(i), backward.find(i));
            assert_eq!(forward.find(i), 0);
        }
    }

    #[test]
    fn test_keep_tie_breaks_on_longer_text_then_position() {
        let segments = vec![
            seg(0, "we ship the build today", 5.0, 7.0),
            seg(1, "we ship the build today definitely", 5.0, 8.0),
        ];
        assert_eq!(select_keep(&segments, &[0, 1]), 1);

        let twins = vec![
            seg(0, "we ship the build today", 5.0, 7.0),
            seg(1, "we ship the build today", 5.0, 7.0),
        ];
        assert_eq!(select_keep(&twins, &[0, 1]), 1);
    }

    #[test]
    fn test_removal_intervals_cover_removed_members_only() {
        let segments = vec![
            seg(0, "we should deploy the service now", 10.0, 13.0),
            seg(1, "we should deploy the service now immediately", 100.0, 103.5),
        ];
        let groups = run(&segments);
        let removals = removal_intervals(&groups, &segments);
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].source, RemovalSource::Retake);
        assert!((removals[0].range.start - 10.0).abs() < 1e-9);
        assert!((removals[0].range.end - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment_scores_zero_instead_of_aborting() {
        // Punctuation-only text normalizes to no tokens; the pass continues
        // and simply never links it
        let segments = vec![
            seg(0, "...", 0.0, 1.0),
            seg(1, "we should deploy the service now", 2.0, 5.0),
            seg(2, "we should deploy the service now", 8.0, 11.0),
        ];
        let groups = run(&segments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec![1, 2]);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let segments = vec![
            seg(0, "one two three four", 0.0, 1.0),
            seg(1, "one two three four", 2.0, 3.0),
        ];
        let result = group_retakes(&segments, &EngineConfig::moderate(), &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn test_grouping_is_deterministic_across_runs() {
        let words: Vec<Word> = (0..40)
            .flat_map(|i| {
                let base = i as f64 * 5.0;
                vec![
                    Word::new("let", base, base + 0.2),
                    Word::new("us", base + 0.3, base + 0.5),
                    Word::new("try", base + 0.6, base + 0.8),
                    Word::new(format!("take{}.", i % 7), base + 0.9, base + 1.2),
                ]
            })
            .collect();
        let segments = segment_words(&words, &EngineConfig::moderate());
        let first = run(&segments);
        for _ in 0..5 {
            assert_eq!(run(&segments), first);
        }
    }
}
