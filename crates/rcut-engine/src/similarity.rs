//! Textual similarity between spoken segments.
//!
//! Two measures are computed on normalized word tokens and combined by max:
//! n-gram Jaccard catches verbatim phrase overlap, the LCS sequence ratio
//! catches restatements with insertions or light reordering. Either structural
//! or lexical overlap is sufficient to flag a retake candidate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Which measure produced the winning score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// Overlap ratio of contiguous n-token windows
    NgramJaccard,
    /// 2 * LCS / (lenA + lenB) over tokens
    SequenceRatio,
}

/// A symmetric similarity score between two segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Id of the earlier segment
    pub a: usize,
    /// Id of the later segment
    pub b: usize,
    /// Combined score in [0, 1]
    pub value: f64,
    /// The measure that won the max
    pub method: SimilarityMethod,
}

/// Normalize text into comparison tokens: lowercase, strip punctuation,
/// collapse whitespace.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// N-gram Jaccard similarity over token windows.
///
/// Returns 0 when either side has fewer than `n` tokens, so degenerate
/// segments never abort a grouping pass.
pub fn ngram_jaccard(a: &[String], b: &[String], n: usize) -> f64 {
    if n == 0 || a.len() < n || b.len() < n {
        return 0.0;
    }

    let ngrams_a: HashSet<&[String]> = a.windows(n).collect();
    let ngrams_b: HashSet<&[String]> = b.windows(n).collect();

    let intersection = ngrams_a.intersection(&ngrams_b).count();
    let union = ngrams_a.union(&ngrams_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Sequence ratio: `2 * LCS(a, b) / (|a| + |b|)` over tokens.
///
/// Tolerant of reordering and insertions, matching the behavior of a
/// difflib-style matcher on word sequences.
pub fn sequence_ratio(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(a, b);
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Length of the longest common subsequence of two token slices.
///
/// Rolling single-row DP; segment token counts are small enough that the
/// quadratic table is never a concern inside the grouper's window.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut row = vec![0usize; b.len() + 1];
    for token_a in a {
        let mut diagonal = 0;
        for (j, token_b) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if token_a == token_b {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Combined similarity: max of the two measures, with the winner tagged.
pub fn combined_score(a: &[String], b: &[String], ngram_size: usize) -> (f64, SimilarityMethod) {
    let ngram = ngram_jaccard(a, b, ngram_size);
    let sequence = sequence_ratio(a, b);
    if ngram >= sequence {
        (ngram, SimilarityMethod::NgramJaccard)
    } else {
        (sequence, SimilarityMethod::SequenceRatio)
    }
}
