//! Word shingling and Jaccard similarity.
//!
//! Shingles are contiguous windows of `k` whitespace-delimited tokens taken
//! from normalized text. They are collected into a set, so repeated windows
//! count once; frequency information is deliberately discarded.

use std::collections::HashSet;

/// Set of distinct shingles for one document.
pub type ShingleSet = HashSet<String>;

/// Produces k-token shingles from normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShingleGenerator {
    k: usize,
}

impl ShingleGenerator {
    /// Create a generator for `k`-token windows. `k` is clamped to at least 1.
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    /// Shingle size in tokens.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Split `text` on whitespace and collect every `k`-token window.
    ///
    /// - no tokens: empty set
    /// - at most `k` tokens: a single shingle holding the whole text
    /// - otherwise: every contiguous `k`-window, tokens joined by one space
    pub fn shingles(&self, text: &str) -> ShingleSet {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut out = ShingleSet::new();
        if tokens.is_empty() {
            return out;
        }
        if tokens.len() <= self.k {
            out.insert(tokens.join(" "));
            return out;
        }

        out.reserve(tokens.len() - self.k + 1);
        for window in tokens.windows(self.k) {
            out.insert(window.join(" "));
        }
        out
    }
}

/// Jaccard coefficient `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets are considered identical and score `1.0`.
pub fn jaccard(a: &ShingleSet, b: &ShingleSet) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    // Iterate the smaller set when counting the intersection.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|s| large.contains(*s)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
