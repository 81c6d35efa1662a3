//! Workspace umbrella crate for simscan.
//!
//! simscan finds near-duplicate documents in a fixed text corpus. The
//! pipeline is split into one crate per stage, re-exported here so callers
//! can depend on a single crate:
//!
//! - `canonical`: text normalization.
//! - `perceptual`: k-word shingles, Jaccard similarity, MinHash signatures.
//! - `index`: in-memory LSH index over signatures.
//! - `matcher`: corpus loading and request handling.
//! - `server`: line-delimited JSON TCP server with a worker pool.
//!
//! The helpers in this crate run the first stages end to end for callers
//! that only want to compare texts.

pub use canonical::{normalize, normalize_text};
pub use index::{Candidate, IndexError, IndexStats, LshIndex, LshIndexBuilder};
pub use matcher::{
    CorpusReport, DetectorConfig, MatchError, MatchResult, PlagiarismDetector, Request, Response,
    Status,
};
pub use perceptual::{
    MinHasher, PerceptualConfig, PerceptualError, ShingleGenerator, ShingleSet, Signature, jaccard,
    signature_similarity,
};
pub use server::{
    ProtocolError, Server, ServerConfig, ServerError, decode_request, encode_response,
    init_tracing, start_server,
};

/// Normalize `text` and split it into `k`-word shingles.
pub fn shingle_text(text: &str, k: usize) -> ShingleSet {
    ShingleGenerator::new(k).shingles(&normalize_text(text))
}

/// Exact Jaccard similarity of two texts' shingle sets after normalization.
///
/// ```
/// let same = simscan::text_similarity("Hello, World!", "hello world", 3);
/// assert_eq!(same, 1.0);
/// ```
pub fn text_similarity(a: &str, b: &str, k: usize) -> f64 {
    jaccard(&shingle_text(a, k), &shingle_text(b, k))
}

/// MinHash signature of `text` under `cfg`.
pub fn sketch_text(text: &str, cfg: &PerceptualConfig) -> Result<Signature, PerceptualError> {
    let hasher = MinHasher::from_config(cfg)?;
    Ok(hasher.signature(&shingle_text(text, cfg.k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shingle_text_normalizes_first() {
        let set = shingle_text("The QUICK, brown fox!", 2);
        let mut shingles: Vec<_> = set.into_iter().collect();
        shingles.sort();
        assert_eq!(shingles, vec!["brown fox", "quick brown", "the quick"]);
    }

    #[test]
    fn text_similarity_partial_overlap() {
        let sim = text_similarity(
            "the quick brown fox jumps over the lazy dog",
            "the quick brown fox jumps over the lazy cat",
            3,
        );
        assert_eq!(sim, 0.75);
    }

    #[test]
    fn sketch_text_is_deterministic() {
        let cfg = PerceptualConfig::default();
        let a = sketch_text("some text to sketch here", &cfg).unwrap();
        let b = sketch_text("Some TEXT to sketch, here.", &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), cfg.num_hashes);
    }

    #[test]
    fn sketch_text_rejects_invalid_config() {
        let cfg = PerceptualConfig::default().with_k(0);
        assert!(matches!(
            sketch_text("text", &cfg),
            Err(PerceptualError::InvalidConfigK { k: 0 })
        ));
    }
}
