//! Alignment validation between a reference and a produced transcript.
//!
//! This is the regression gate used to tune the grouping thresholds: render a
//! recording, transcribe the result, and diff it against the transcript of a
//! hand-edited reference cut. It is deliberately independent of the main
//! engine and never fails on mismatch; a total mismatch simply scores low
//! with maximal gap and insertion lists.

use serde::{Deserialize, Serialize};

use rcut_models::Word;

use crate::config::EngineConfig;
use crate::similarity::normalize_tokens;

/// Kind of an alignment block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Both sides agree on this run of tokens
    Match,
    /// Tokens present only in the produced transcript
    Insert,
    /// Tokens present only in the reference transcript
    Delete,
    /// Both sides have tokens, but they differ
    Replace,
}

/// Classification of a non-match block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchClass {
    /// Homophone or spelling variance from the transcription service
    TranscriptionNoise,
    /// Materially different or wholly missing words
    ContentDifference,
}

/// One aligned region between the two token sequences.
///
/// Ranges are half-open token index ranges into the normalized sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentBlock {
    /// Block kind
    pub kind: BlockKind,
    /// Range in the reference sequence
    pub expected: (usize, usize),
    /// Range in the produced sequence
    pub produced: (usize, usize),
    /// Noise-vs-content classification for non-match blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<MismatchClass>,
}

impl AlignmentBlock {
    /// Number of tokens covered on the larger side.
    pub fn word_count(&self) -> usize {
        (self.expected.1 - self.expected.0).max(self.produced.1 - self.produced.0)
    }
}

/// A materially-sized non-match block with its text, for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Range in the reference sequence
    pub expected: (usize, usize),
    /// Range in the produced sequence
    pub produced: (usize, usize),
    /// Reference-side text (empty for insertions)
    pub expected_text: String,
    /// Produced-side text (empty for gaps)
    pub produced_text: String,
    /// Noise-vs-content classification
    pub classification: MismatchClass,
}

/// Result of comparing two transcripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Aggregate similarity: `2 * matched / (reference + produced)`
    pub similarity: f64,
    /// Matched token count
    pub matched_words: usize,
    /// Reference token count
    pub reference_words: usize,
    /// Produced token count
    pub produced_words: usize,
    /// Every aligned region in order
    pub blocks: Vec<AlignmentBlock>,
    /// Materially-sized deletions (reference content missing from produced)
    pub gaps: Vec<DiffEntry>,
    /// Materially-sized insertions (produced content absent in reference)
    pub insertions: Vec<DiffEntry>,
    /// Materially-sized replacements
    pub replacements: Vec<DiffEntry>,
}

impl AlignmentReport {
    /// Similarity as a percentage.
    pub fn similarity_percent(&self) -> f64 {
        self.similarity * 100.0
    }
}

/// Compare two word-level transcripts.
pub fn compare_transcripts(
    reference: &[Word],
    produced: &[Word],
    config: &EngineConfig,
) -> AlignmentReport {
    let reference_tokens: Vec<String> = reference
        .iter()
        .flat_map(|w| normalize_tokens(&w.text))
        .collect();
    let produced_tokens: Vec<String> = produced
        .iter()
        .flat_map(|w| normalize_tokens(&w.text))
        .collect();
    compare_token_sequences(&reference_tokens, &produced_tokens, config)
}

/// Compare two normalized token sequences.
pub fn compare_token_sequences(
    reference: &[String],
    produced: &[String],
    config: &EngineConfig,
) -> AlignmentReport {
    let min_block = config.align_min_block_words.max(1);
    let mut anchors = Vec::new();
    collect_anchors(
        reference,
        produced,
        0,
        reference.len(),
        0,
        produced.len(),
        min_block,
        &mut anchors,
    );

    let blocks = build_blocks(reference, produced, &anchors, config);

    let matched_words: usize = anchors.iter().map(|a| a.size).sum();
    let denominator = reference.len() + produced.len();
    let similarity = if denominator == 0 {
        1.0
    } else {
        2.0 * matched_words as f64 / denominator as f64
    };

    let mut gaps = Vec::new();
    let mut insertions = Vec::new();
    let mut replacements = Vec::new();
    for block in &blocks {
        if block.kind == BlockKind::Match || block.word_count() < config.align_material_words {
            continue;
        }
        let entry = DiffEntry {
            expected: block.expected,
            produced: block.produced,
            expected_text: reference[block.expected.0..block.expected.1].join(" "),
            produced_text: produced[block.produced.0..block.produced.1].join(" "),
            classification: block
                .classification
                .unwrap_or(MismatchClass::ContentDifference),
        };
        match block.kind {
            BlockKind::Delete => gaps.push(entry),
            BlockKind::Insert => insertions.push(entry),
            BlockKind::Replace => replacements.push(entry),
            BlockKind::Match => {}
        }
    }

    AlignmentReport {
        similarity,
        matched_words,
        reference_words: reference.len(),
        produced_words: produced.len(),
        blocks,
        gaps,
        insertions,
        replacements,
    }
}

/// A matching anchor: `size` tokens agree starting at `a` / `b`.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    a: usize,
    b: usize,
    size: usize,
}

/// Recursive longest-matching-block decomposition, difflib style, with a
/// minimum anchor size so 1-2 coincidentally shared words never split a
/// mismatch region in half.
#[allow(clippy::too_many_arguments)]
fn collect_anchors(
    a: &[String],
    b: &[String],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
    min_block: usize,
    anchors: &mut Vec<Anchor>,
) {
    let Some(best) = longest_match(a, b, a_lo, a_hi, b_lo, b_hi) else {
        return;
    };
    if best.size < min_block {
        return;
    }

    collect_anchors(a, b, a_lo, best.a, b_lo, best.b, min_block, anchors);
    anchors.push(best);
    collect_anchors(
        a,
        b,
        best.a + best.size,
        a_hi,
        best.b + best.size,
        b_hi,
        min_block,
        anchors,
    );
}

/// Longest common contiguous run inside the window, earliest-in-`a` (then
/// earliest-in-`b`) on ties so the decomposition is deterministic.
fn longest_match(
    a: &[String],
    b: &[String],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> Option<Anchor> {
    if a_lo >= a_hi || b_lo >= b_hi {
        return None;
    }

    let width = b_hi - b_lo;
    let mut best: Option<Anchor> = None;
    // lengths[j] = match run ending at (i, b_lo + j)
    let mut lengths = vec![0usize; width + 1];

    for i in a_lo..a_hi {
        let mut previous = 0usize;
        for j in 0..width {
            let current = lengths[j + 1];
            lengths[j + 1] = if a[i] == b[b_lo + j] {
                previous + 1
            } else {
                0
            };
            if lengths[j + 1] > best.map_or(0, |anchor| anchor.size) {
                best = Some(Anchor {
                    a: i + 1 - lengths[j + 1],
                    b: b_lo + j + 1 - lengths[j + 1],
                    size: lengths[j + 1],
                });
            }
            previous = current;
        }
    }

    best
}

/// Walk the anchors and fill the regions between them with classified
/// insert/delete/replace blocks.
fn build_blocks(
    reference: &[String],
    produced: &[String],
    anchors: &[Anchor],
    config: &EngineConfig,
) -> Vec<AlignmentBlock> {
    let mut blocks = Vec::new();
    let mut a_pos = 0usize;
    let mut b_pos = 0usize;

    let push_mismatch = |blocks: &mut Vec<AlignmentBlock>,
                             a_range: (usize, usize),
                             b_range: (usize, usize)| {
        let has_expected = a_range.1 > a_range.0;
        let has_produced = b_range.1 > b_range.0;
        if !has_expected && !has_produced {
            return;
        }
        let kind = match (has_expected, has_produced) {
            (true, true) => BlockKind::Replace,
            (true, false) => BlockKind::Delete,
            (false, true) => BlockKind::Insert,
            (false, false) => unreachable!(),
        };
        let classification = Some(classify(
            &reference[a_range.0..a_range.1],
            &produced[b_range.0..b_range.1],
            config.align_noise_cutoff,
        ));
        blocks.push(AlignmentBlock {
            kind,
            expected: a_range,
            produced: b_range,
            classification,
        });
    };

    for anchor in anchors {
        push_mismatch(&mut blocks, (a_pos, anchor.a), (b_pos, anchor.b));
        blocks.push(AlignmentBlock {
            kind: BlockKind::Match,
            expected: (anchor.a, anchor.a + anchor.size),
            produced: (anchor.b, anchor.b + anchor.size),
            classification: None,
        });
        a_pos = anchor.a + anchor.size;
        b_pos = anchor.b + anchor.size;
    }
    push_mismatch(
        &mut blocks,
        (a_pos, reference.len()),
        (b_pos, produced.len()),
    );

    blocks
}

/// Noise-vs-content call for one mismatch block.
///
/// Wholly missing words are always a content difference; for replacements a
/// high character-level similarity ratio indicates homophone or spelling
/// variance rather than different speech.
fn classify(expected: &[String], produced: &[String], noise_cutoff: f64) -> MismatchClass {
    if expected.is_empty() || produced.is_empty() {
        return MismatchClass::ContentDifference;
    }
    let ratio = strsim::normalized_levenshtein(&expected.join(" "), &produced.join(" "));
    if ratio >= noise_cutoff {
        MismatchClass::TranscriptionNoise
    } else {
        MismatchClass::ContentDifference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        normalize_tokens(text)
    }

    fn compare(reference: &str, produced: &str) -> AlignmentReport {
        compare_token_sequences(
            &tokens(reference),
            &tokens(produced),
            &EngineConfig::moderate(),
        )
    }

    #[test]
    fn test_identical_transcripts_score_full() {
        let report = compare(
            "we should deploy the service now and then verify it",
            "we should deploy the service now and then verify it",
        );
        assert!((report.similarity - 1.0).abs() < 1e-9);
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].kind, BlockKind::Match);
        assert!(report.gaps.is_empty());
        assert!(report.insertions.is_empty());
        assert!(report.replacements.is_empty());
    }

    #[test]
    fn test_both_empty_is_full_similarity() {
        let report = compare("", "");
        assert!((report.similarity - 1.0).abs() < 1e-9);
        assert!(report.blocks.is_empty());
    }

    #[test]
    fn test_empty_produced_degrades_to_maximal_gap() {
        let report = compare("all of this content went missing somewhere", "");
        assert!(report.similarity.abs() < 1e-9);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].expected, (0, 7));
        assert_eq!(
            report.gaps[0].classification,
            MismatchClass::ContentDifference
        );
    }

    #[test]
    fn test_total_mismatch_never_panics() {
        let report = compare(
            "completely different words on this side",
            "nothing shared here at all today",
        );
        assert!(report.similarity.abs() < 1e-9);
        assert_eq!(report.replacements.len(), 1);
    }

    #[test]
    fn test_deleted_middle_run_is_a_gap() {
        let report = compare(
            "the first part stays here this middle passage disappears entirely and the final part stays too",
            "the first part stays here and the final part stays too",
        );
        assert!(report.similarity > 0.5);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].expected_text, "this middle passage disappears entirely");
        assert!(report.insertions.is_empty());
    }

    #[test]
    fn test_spelling_variant_classified_as_noise() {
        let expected = tokens("colour");
        let produced = tokens("color");
        assert_eq!(
            classify(&expected, &produced, 0.7),
            MismatchClass::TranscriptionNoise
        );

        let expected = tokens("budget meeting");
        let produced = tokens("vacation plans");
        assert_eq!(
            classify(&expected, &produced, 0.7),
            MismatchClass::ContentDifference
        );
    }

    #[test]
    fn test_replace_block_carries_classification() {
        let report = compare(
            "we paint the whole colour palette on the big wall",
            "we paint the whole color palette on the big wall",
        );
        let replace: Vec<_> = report
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Replace)
            .collect();
        assert_eq!(replace.len(), 1);
        assert_eq!(
            replace[0].classification,
            Some(MismatchClass::TranscriptionNoise)
        );
        // A one-word swap is not materially sized
        assert!(report.replacements.is_empty());
    }

    #[test]
    fn test_small_shared_runs_are_not_anchors() {
        // "of the" appears on both sides but is below the 3-word minimum
        // block size, so the region stays one replacement
        let report = compare(
            "speaking of the deployment pipeline",
            "thinking of the weather forecast",
        );
        assert_eq!(report.matched_words, 0);
        assert!(report.similarity.abs() < 1e-9);
    }

    #[test]
    fn test_similarity_ratio_arithmetic() {
        // 7 shared tokens of 7 vs 9: 2*7/16
        let report = compare(
            "one two three four five six seven",
            "one two three four five six seven extra words",
        );
        assert!((report.similarity - 14.0 / 16.0).abs() < 1e-9);
        assert_eq!(report.matched_words, 7);
        assert_eq!(report.reference_words, 7);
        assert_eq!(report.produced_words, 9);
    }
}
