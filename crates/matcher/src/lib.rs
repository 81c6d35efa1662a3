//! # simscan Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` ties the text pipeline together: it normalizes text with
//! `canonical`, shingles and sketches it with `perceptual`, and looks it up in
//! the `index` LSH index built from a directory of plain-text files.
//!
//! Candidates returned by the index are re-scored with the exact Jaccard
//! coefficient of their shingle sets, so the approximate MinHash score is only
//! ever used as a filter.
//!
//! ## Core Types
//!
//! - [`Request`] / [`Response`]: the wire-level request and reply, serialized
//!   as camelCase JSON.
//! - [`MatchResult`]: one similar corpus document.
//! - [`DetectorConfig`]: perceptual parameters plus the similarity floor and
//!   corpus file extension.
//! - [`PlagiarismDetector`]: the frozen corpus index and the `handle` entry
//!   point.
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{DetectorConfig, PlagiarismDetector, Request, Status};
//!
//! let detector = PlagiarismDetector::from_documents(
//!     DetectorConfig::default(),
//!     [("doc1.txt", "The quick brown fox jumps over the lazy dog")],
//! )
//! .unwrap();
//!
//! let response = detector.handle(&Request::new("the quick brown fox jumps over the lazy dog"));
//! assert_eq!(response.status, Status::Success);
//! let matches = response.matches.unwrap();
//! assert_eq!(matches[0].file_name, "doc1.txt");
//! assert_eq!(matches[0].description, "Similarity: 100.00%");
//! ```

mod corpus;
pub mod engine;
pub mod types;

pub use crate::corpus::CorpusReport;
pub use crate::engine::PlagiarismDetector;
pub use crate::types::{DetectorConfig, MatchError, MatchResult, Request, Response, Status};
