//! MinHash computation over shingle sets.
//!
//! The hash family is `h_i(x) = (a_i * x + b_i) mod P` with `P = 2^31 - 1`.
//! Coefficients are drawn from a SplitMix64 stream seeded at construction,
//! so a fixed seed yields the same family, and the same signatures, on every
//! run.

use rayon::prelude::*;
use xxhash_rust::xxh32::xxh32;

use crate::config::{PerceptualConfig, PerceptualError};
use crate::shingles::ShingleSet;
use crate::signature::Signature;

/// Mersenne prime modulus of the affine hash family.
pub const MERSENNE_PRIME: u64 = (1 << 31) - 1;

/// One affine hash function `(a * x + b) mod P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AffineHash {
    a: u64,
    b: u64,
}

impl AffineHash {
    #[inline]
    fn apply(&self, x: u32) -> u32 {
        // a < 2^31 and x < 2^32, so a * x + b stays below 2^64.
        ((self.a * u64::from(x) + self.b) % MERSENNE_PRIME) as u32
    }
}

/// Deterministic MinHash sketcher.
#[derive(Debug, Clone)]
pub struct MinHasher {
    funcs: Vec<AffineHash>,
    seed: u64,
    use_parallel: bool,
}

impl MinHasher {
    /// Derive `num_hashes` hash functions from `seed`.
    pub fn new(num_hashes: usize, seed: u64) -> Result<Self, PerceptualError> {
        if num_hashes == 0 {
            return Err(PerceptualError::InvalidConfigHashes { num_hashes });
        }
        let mut state = seed;
        let funcs = (0..num_hashes)
            .map(|_| AffineHash {
                a: next_splitmix64(&mut state) % MERSENNE_PRIME,
                b: next_splitmix64(&mut state) % MERSENNE_PRIME,
            })
            .collect();
        Ok(Self {
            funcs,
            seed,
            use_parallel: false,
        })
    }

    /// Build a sketcher from a validated configuration.
    pub fn from_config(cfg: &PerceptualConfig) -> Result<Self, PerceptualError> {
        cfg.validate()?;
        Ok(Self::new(cfg.num_hashes, cfg.seed)?.with_parallel(cfg.use_parallel))
    }

    /// Evaluate hash functions in parallel. Output is identical either way.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Number of hash functions, i.e. the signature length.
    pub fn num_hashes(&self) -> usize {
        self.funcs.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Compute the signature of a shingle set.
    ///
    /// An empty set yields an all-`u32::MAX` signature.
    pub fn signature(&self, shingles: &ShingleSet) -> Signature {
        let base: Vec<u32> = shingles.iter().map(|s| base_hash(s)).collect();

        let values: Vec<u32> = if self.use_parallel {
            self.funcs
                .par_iter()
                .map(|f| min_over(&base, f))
                .collect()
        } else {
            self.funcs.iter().map(|f| min_over(&base, f)).collect()
        };
        Signature::from(values)
    }

    /// Fraction of positions where the two signatures agree.
    ///
    /// This is an unbiased estimate of the Jaccard similarity of the
    /// underlying shingle sets. Signatures of different lengths come from
    /// differently configured sketchers and are rejected.
    pub fn similarity(&self, a: &Signature, b: &Signature) -> Result<f64, PerceptualError> {
        signature_similarity(a, b)
    }
}

/// Component-wise agreement rate of two equal-length signatures.
pub fn signature_similarity(a: &Signature, b: &Signature) -> Result<f64, PerceptualError> {
    if a.len() != b.len() {
        return Err(PerceptualError::SignatureLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(1.0);
    }
    let matches = a
        .values()
        .iter()
        .zip(b.values())
        .filter(|(x, y)| x == y)
        .count();
    Ok(matches as f64 / a.len() as f64)
}

/// Stable 32-bit base hash of a shingle's UTF-8 bytes.
#[inline]
pub(crate) fn base_hash(shingle: &str) -> u32 {
    xxh32(shingle.as_bytes(), 0)
}

#[inline]
fn min_over(base: &[u32], f: &AffineHash) -> u32 {
    base.iter().map(|&x| f.apply(x)).min().unwrap_or(u32::MAX)
}

/// Advance a SplitMix64 state and return the next output.
#[inline]
pub(crate) fn next_splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
