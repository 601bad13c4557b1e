//! Context trimming
//!
//! When the last request's input tokens exceed the budget, the oldest
//! non-system turns are dropped until `floor(len * keep_ratio)` turns remain
//! (never fewer than two).

use skiff_core::{ContextSettings, Transcript};
use tracing::info;

/// Decides when and how far to trim the transcript
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextManager {
    token_budget: u64,
    keep_ratio: f64,
}

impl ContextManager {
    /// `keep_ratio` is clamped into (0, 1]
    pub fn new(token_budget: u64, keep_ratio: f64) -> Self {
        let keep_ratio = if keep_ratio.is_finite() && keep_ratio > 0.0 {
            keep_ratio.min(1.0)
        } else {
            1.0
        };
        Self {
            token_budget,
            keep_ratio,
        }
    }

    pub fn from_settings(settings: &ContextSettings) -> Self {
        Self::new(settings.token_budget, settings.keep_ratio)
    }

    pub fn token_budget(&self) -> u64 {
        self.token_budget
    }

    pub fn keep_ratio(&self) -> f64 {
        self.keep_ratio
    }

    /// Over budget, and there is more than one turn besides the system turn
    pub fn should_trim(&self, last_input_tokens: u64, transcript_len: usize) -> bool {
        last_input_tokens > self.token_budget && transcript_len > 2
    }

    /// Length a transcript of `current_len` turns is trimmed to
    pub fn target_len(&self, current_len: usize) -> usize {
        let target = (current_len as f64 * self.keep_ratio).floor() as usize;
        target.max(2)
    }

    /// Trim `transcript` if warranted; returns how many turns were removed
    pub fn trim(&self, transcript: &mut Transcript, last_input_tokens: u64) -> usize {
        if !self.should_trim(last_input_tokens, transcript.len()) {
            return 0;
        }

        let before = transcript.len();
        let removed = transcript.compact_to(self.target_len(before));
        if removed > 0 {
            info!(
                "Trimmed {} turns ({} -> {}) after {} input tokens exceeded budget {}",
                removed,
                before,
                transcript.len(),
                last_input_tokens,
                self.token_budget
            );
        }
        removed
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::from_settings(&ContextSettings::default())
    }
}
