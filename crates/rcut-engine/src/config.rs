//! Configuration for the cut-decision engine.
//!
//! Every tuning knob lives here so thresholds can be recalibrated per corpus
//! without code changes. The presets supply consistent bundles; each field is
//! individually overridable through the builder-style setters.

use serde::{Deserialize, Serialize};

/// One band of the adaptive similarity threshold table.
///
/// Shorter segments carry less lexical redundancy for the same semantic
/// overlap, so they need a lower bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    /// Band applies to segments with at most this many words
    pub max_words: usize,
    /// Minimum combined similarity to link two segments
    pub threshold: f64,
}

/// Configuration for the cut-decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // === Segmentation ===
    /// Gap between consecutive words that always splits a segment (seconds).
    ///
    /// - Lower values (1.0s): choppier segments, more retake candidates
    /// - Default (1.5s): natural phrase boundaries
    pub pause_split_secs: f64,

    /// Tighter gap limit enforced inside a block (seconds).
    ///
    /// Guards against two distinct takes fused by the transcription service
    /// into a single run. Must not exceed `pause_split_secs` to be effective.
    pub internal_gap_secs: f64,

    // === Similarity ===
    /// N-gram size for the Jaccard measure (default: 3)
    pub ngram_size: usize,

    // === Retake grouping ===
    /// Maximum seconds between the first and last member of a group
    pub time_window_secs: f64,

    /// How many following segments to examine per segment (default: 3)
    pub lookahead: usize,

    /// Adaptive threshold bands, ordered by ascending `max_words`.
    ///
    /// Segments longer than every band use `base_threshold`.
    pub threshold_bands: Vec<ThresholdBand>,

    /// Threshold for segments longer than every band (default: 0.65)
    pub base_threshold: f64,

    /// Words compared by the same-opening rule (default: 4)
    pub opening_words: usize,

    /// Minimum ratio of matching opening words (default: 0.75)
    pub opening_match_ratio: f64,

    /// Minimum overall similarity required alongside a matching opening
    /// (default: 0.40)
    pub opening_min_similarity: f64,

    /// Maximum gap for the adjacency rule to apply (seconds, default: 0.5)
    pub adjacency_gap_secs: f64,

    /// Fraction of the generic threshold required by the adjacency rule
    /// (default: 0.85)
    pub adjacency_threshold_factor: f64,

    // === Interval merging ===
    /// Padding shrunk off keep candidates at cut edges (seconds, default: 0.1).
    ///
    /// Also the tolerance below which two removal intervals fuse into one run.
    pub padding_secs: f64,

    /// Keep intervals separated by less than this re-merge (seconds,
    /// default: 0.5)
    pub merge_gap_secs: f64,

    /// Keep candidates shorter than this are micro-fragment suspects
    /// (seconds, default: 2.0)
    pub min_fragment_secs: f64,

    /// Keep candidates with fewer words than this are micro-fragment suspects
    /// (default: 8)
    pub min_fragment_words: usize,

    /// A suspect is dropped only when both neighbors are further away than
    /// this (seconds, default: 2.0)
    pub isolation_secs: f64,

    // === Alignment validation ===
    /// Minimum matching-block size treated as an anchor (words, default: 3)
    pub align_min_block_words: usize,

    /// Per-block similarity at or above which a mismatch counts as
    /// transcription noise rather than a content difference (default: 0.7)
    pub align_noise_cutoff: f64,

    /// Non-match blocks below this word count are not listed as material
    /// (default: 3)
    pub align_material_words: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::moderate()
    }
}

impl EngineConfig {
    /// Balanced preset: clear and probable retakes are removed.
    pub fn moderate() -> Self {
        Self {
            pause_split_secs: 1.5,
            internal_gap_secs: 1.2,
            ngram_size: 3,
            time_window_secs: 180.0,
            lookahead: 3,
            threshold_bands: vec![
                ThresholdBand {
                    max_words: 6,
                    threshold: 0.50,
                },
                ThresholdBand {
                    max_words: 10,
                    threshold: 0.55,
                },
            ],
            base_threshold: 0.65,
            opening_words: 4,
            opening_match_ratio: 0.75,
            opening_min_similarity: 0.40,
            adjacency_gap_secs: 0.5,
            adjacency_threshold_factor: 0.85,
            padding_secs: 0.1,
            merge_gap_secs: 0.5,
            min_fragment_secs: 2.0,
            min_fragment_words: 8,
            isolation_secs: 2.0,
            align_min_block_words: 3,
            align_noise_cutoff: 0.7,
            align_material_words: 3,
        }
    }

    /// Aggressive preset for fast-paced output: lower similarity bars, wider
    /// window, harsher fragment elimination.
    pub fn aggressive() -> Self {
        Self {
            pause_split_secs: 1.0,
            internal_gap_secs: 0.9,
            threshold_bands: vec![
                ThresholdBand {
                    max_words: 6,
                    threshold: 0.40,
                },
                ThresholdBand {
                    max_words: 10,
                    threshold: 0.45,
                },
            ],
            base_threshold: 0.55,
            adjacency_gap_secs: 1.0,
            min_fragment_secs: 3.0,
            min_fragment_words: 10,
            ..Self::moderate()
        }
    }

    /// Conservative preset: only obvious retakes are removed and short
    /// fragments survive more easily.
    pub fn conservative() -> Self {
        Self {
            threshold_bands: vec![
                ThresholdBand {
                    max_words: 6,
                    threshold: 0.60,
                },
                ThresholdBand {
                    max_words: 10,
                    threshold: 0.65,
                },
            ],
            base_threshold: 0.75,
            opening_min_similarity: 0.50,
            adjacency_gap_secs: 0.3,
            min_fragment_secs: 1.0,
            min_fragment_words: 4,
            isolation_secs: 3.0,
            ..Self::moderate()
        }
    }

    /// Look up a preset by name, as supplied in caller configuration.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "aggressive" => Some(Self::aggressive()),
            "moderate" => Some(Self::moderate()),
            "conservative" => Some(Self::conservative()),
            _ => None,
        }
    }

    /// Similarity threshold for a pair of segments, keyed by the shorter
    /// member's word count.
    ///
    /// This is the single most sensitive tuning knob, so it is one explicit
    /// lookup rather than inline literals.
    pub fn similarity_threshold(&self, word_count: usize) -> f64 {
        for band in &self.threshold_bands {
            if word_count <= band.max_words {
                return band.threshold;
            }
        }
        self.base_threshold
    }

    /// Builder-style setter for the retake time window.
    pub fn with_time_window_secs(mut self, secs: f64) -> Self {
        self.time_window_secs = secs.max(0.0);
        self
    }

    /// Builder-style setter for the lookahead width.
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead.max(1);
        self
    }

    /// Builder-style setter for keep-candidate padding.
    pub fn with_padding_secs(mut self, secs: f64) -> Self {
        self.padding_secs = secs.max(0.0);
        self
    }

    /// Builder-style setter for the keep re-merge gap.
    pub fn with_merge_gap_secs(mut self, secs: f64) -> Self {
        self.merge_gap_secs = secs.max(0.0);
        self
    }

    /// Builder-style setter for the base similarity threshold.
    pub fn with_base_threshold(mut self, threshold: f64) -> Self {
        self.base_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}
