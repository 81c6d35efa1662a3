//! # simscan perceptual layer
//!
//! Turns normalized text into the similarity-preserving artifacts the LSH
//! index works with.
//!
//! ## Contract
//!
//! - Input is text already produced by the `canonical` normalizer; nothing
//!   here lowercases, strips or re-tokenizes beyond a whitespace split.
//! - The API is a pure function of `(normalized_text, config)` with no I/O
//!   and no reliance on clocks or process state.
//!
//! Invariant: for the same normalized text and the same
//! [`PerceptualConfig`], signatures are bit-identical across runs.
//!
//! ## Pipeline
//!
//! 1.  **Shingling**: the text is split into overlapping `k`-token windows,
//!     collected as a set of strings ([`ShingleGenerator`]).
//! 2.  **MinHashing**: each shingle gets a stable 32-bit base hash, and each
//!     of `n` seeded affine hash functions keeps its minimum over the set
//!     ([`MinHasher`]). Agreement between two signatures estimates the
//!     Jaccard similarity of the shingle sets ([`jaccard`] computes it
//!     exactly).
//!
//! ## Example Usage
//!
//! ```
//! use perceptual::{jaccard, MinHasher, PerceptualConfig, ShingleGenerator};
//!
//! let cfg = PerceptualConfig::default();
//! let shingler = ShingleGenerator::new(cfg.k);
//! let hasher = MinHasher::from_config(&cfg).unwrap();
//!
//! let a = shingler.shingles("the quick brown fox jumps over the lazy dog");
//! let b = shingler.shingles("the quick brown fox jumps over the lazy cat");
//!
//! let approx = hasher.similarity(&hasher.signature(&a), &hasher.signature(&b)).unwrap();
//! assert_eq!(hasher.signature(&a).len(), 300);
//! assert!(approx > 0.5);
//! assert!((jaccard(&a, &b) - 6.0 / 8.0).abs() < 1e-12);
//! ```

pub mod config;
mod minhash;
mod shingles;
mod signature;

pub use crate::config::{PerceptualConfig, PerceptualError};
pub use crate::minhash::{signature_similarity, MinHasher, MERSENNE_PRIME};
pub use crate::shingles::{jaccard, ShingleGenerator, ShingleSet};
pub use crate::signature::Signature;
