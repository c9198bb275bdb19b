//! Incremental reveal of an already-known reply.
//!
//! The reply is split at whitespace-delimited token boundaries and exposed a
//! few tokens at a time. Pacing is purely cosmetic; what holds regardless is
//! that every step is a longer prefix ending on a token boundary and that the
//! last step is the whole text.

use std::time::Duration;

/// Byte offsets at which each token of `text` ends.
///
/// A token is a run of non-whitespace plus the whitespace that follows it.
/// Leading whitespace belongs to the first token. The final offset is always
/// `text.len()`; empty text has no tokens.
pub fn token_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut in_word = false;
    let mut seen_word = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else {
            if !in_word && seen_word {
                boundaries.push(i);
            }
            in_word = true;
            seen_word = true;
        }
    }

    if !text.is_empty() {
        boundaries.push(text.len());
    }
    boundaries
}

/// Step-by-step reveal over one text.
#[derive(Debug, Clone)]
pub struct Reveal {
    boundaries: Vec<usize>,
    next: usize,
    batch: usize,
}

impl Reveal {
    /// `batch` is the number of tokens per step; zero is treated as one.
    pub fn new(text: &str, batch: usize) -> Self {
        Self {
            boundaries: token_boundaries(text),
            next: 0,
            batch: batch.max(1),
        }
    }

    /// Length of the next displayed prefix, or `None` once fully revealed.
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_complete() {
            return None;
        }
        let idx = (self.next + self.batch).min(self.boundaries.len()) - 1;
        self.next = idx + 1;
        Some(self.boundaries[idx])
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.boundaries.len()
    }

    /// Steps left before completion.
    pub fn remaining_steps(&self) -> usize {
        (self.boundaries.len() - self.next).div_ceil(self.batch)
    }
}

/// Cosmetic pacing of a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPacing {
    pub batch_tokens: usize,
    pub delay: Duration,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            batch_tokens: 2,
            delay: Duration::from_millis(30),
        }
    }
}
