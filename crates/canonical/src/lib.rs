//! simscan canonical text layer.
//!
//! Turns arbitrary document text into the normalized form every downstream
//! stage (shingling, MinHash, LSH) operates on.
//!
//! ## What we do
//!
//! - Locale-free Unicode lowercasing
//! - NFD decomposition followed by removal of combining diacritical marks,
//!   so `café` and `cafe\u{0301}` both become `cafe`
//! - Every character outside `[a-z0-9]` becomes a separator
//! - Whitespace collapses to single ASCII spaces, edges are trimmed
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no OS/locale dependence. The same input yields the
//! same output on any machine, which is what keeps corpus signatures and
//! query signatures comparable.

mod normalize;

pub use crate::normalize::{normalize, normalize_text};
