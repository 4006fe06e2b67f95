//! Transcript segmentation into phrase-level units.
//!
//! The word stream is split at sentence-ending punctuation and at pause gaps.
//! A tighter internal-gap limit additionally forces a split inside what would
//! otherwise be one block, so two distinct takes fused by the transcription
//! service never end up in a single segment.

use tracing::debug;

use rcut_models::Word;

use crate::config::EngineConfig;
use crate::similarity::normalize_tokens;

/// A contiguous run of transcript words treated as one spoken unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Stable id, equal to the segment's position in the output
    pub id: usize,
    /// Start of the first word (seconds)
    pub start: f64,
    /// End of the last word (seconds)
    pub end: f64,
    /// Raw text, words joined by single spaces
    pub text: String,
    /// Normalized word tokens (lowercased, punctuation stripped)
    pub tokens: Vec<String>,
    /// Number of raw words in the segment
    pub word_count: usize,
}

impl Segment {
    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Joined normalized text, used for tie-breaking and previews.
    pub fn normalized_text(&self) -> String {
        self.tokens.join(" ")
    }

    /// Short preview of the raw text for reports and arbitration hints.
    pub fn preview(&self, max_chars: usize) -> String {
        let preview: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().count() > max_chars {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}

/// Split an ordered word stream into segments.
///
/// Splits occur after a word that ends a sentence, and between words whose gap
/// exceeds either the pause-split limit or the tighter internal-gap limit.
/// Zero-word results are invalid and never produced; words with no usable
/// tokens after normalization still form segments (they score 0 similarity
/// later instead of aborting the pass).
pub fn segment_words(words: &[Word], config: &EngineConfig) -> Vec<Segment> {
    fn flush(run: &mut Vec<&Word>, segments: &mut Vec<Segment>) {
        if run.is_empty() {
            return;
        }
        let text = run
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let tokens = normalize_tokens(&text);
        segments.push(Segment {
            id: segments.len(),
            start: run.first().map(|w| w.start).unwrap_or(0.0),
            end: run.last().map(|w| w.end).unwrap_or(0.0),
            word_count: run.len(),
            text,
            tokens,
        });
        run.clear();
    }

    let split_gap = config.pause_split_secs.min(config.internal_gap_secs);

    let mut segments: Vec<Segment> = Vec::new();
    let mut current: Vec<&Word> = Vec::new();

    for (idx, word) in words.iter().enumerate() {
        current.push(word);

        let gap_after = words
            .get(idx + 1)
            .map(|next| next.start - word.end)
            .unwrap_or(f64::INFINITY);

        if word.ends_sentence() || gap_after > split_gap {
            flush(&mut current, &mut segments);
        }
    }
    flush(&mut current, &mut segments);

    debug!(
        words = words.len(),
        segments = segments.len(),
        "Segmented transcript"
    );

    segments
}
