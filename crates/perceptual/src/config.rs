//! Configuration and error types for shingling and MinHash.
//!
//! This module defines the public configuration surface for the perceptual
//! layer. It is free of any I/O or environment-dependent behavior so that
//! signatures are a pure function of `(normalized_text, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for shingling, MinHash signatures and LSH banding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PerceptualConfig {
    /// Configuration schema version.
    ///
    /// Any algorithmic change that can affect signatures must bump this
    /// version.
    pub version: u32,
    /// Number of tokens per shingle (k-shingling).
    ///
    /// Larger values are more sensitive to local word order, smaller values
    /// are more tolerant of light rewording.
    pub k: usize,
    /// Number of MinHash functions, which is also the signature length.
    pub num_hashes: usize,
    /// Number of LSH bands.
    pub minhash_bands: usize,
    /// Number of signature rows per LSH band.
    pub minhash_rows_per_band: usize,
    /// Seed for deriving the hash function family.
    ///
    /// When two configs share the same seed and all other parameters are
    /// equal, identical shingle sets produce bit-identical signatures across
    /// runs and machines.
    pub seed: u64,
    /// Evaluate the hash functions in parallel with rayon.
    pub use_parallel: bool,
}

impl PerceptualConfig {
    /// Create a new configuration with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shingle size (k).
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of MinHash functions.
    pub fn with_num_hashes(mut self, num_hashes: usize) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    /// Set the number of LSH bands.
    /// More bands = higher recall, more candidates to verify.
    pub fn with_minhash_bands(mut self, bands: usize) -> Self {
        self.minhash_bands = bands;
        self
    }

    /// Set the number of rows per LSH band.
    /// More rows = fewer false-positive candidates, lower recall.
    pub fn with_minhash_rows_per_band(mut self, rows: usize) -> Self {
        self.minhash_rows_per_band = rows;
        self
    }

    /// Set the seed for reproducible signatures.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel signature computation.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version < 1 {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.k < 1 {
            return Err(PerceptualError::InvalidConfigK { k: self.k });
        }
        if self.num_hashes < 1 {
            return Err(PerceptualError::InvalidConfigHashes {
                num_hashes: self.num_hashes,
            });
        }
        if self.minhash_bands < 1 {
            return Err(PerceptualError::InvalidConfigBands {
                bands: self.minhash_bands,
            });
        }
        if self.minhash_rows_per_band < 1 {
            return Err(PerceptualError::InvalidConfigRows {
                rows: self.minhash_rows_per_band,
            });
        }

        let banded = self
            .minhash_bands
            .checked_mul(self.minhash_rows_per_band)
            .filter(|&len| len <= self.num_hashes);
        if banded.is_none() {
            return Err(PerceptualError::InvalidConfigBanding {
                bands: self.minhash_bands,
                rows: self.minhash_rows_per_band,
                num_hashes: self.num_hashes,
            });
        }

        Ok(())
    }
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            version: 1,
            k: 3,
            num_hashes: 300,
            minhash_bands: 150,
            minhash_rows_per_band: 2,
            seed: 2024,
            use_parallel: false,
        }
    }
}

/// Errors returned by the perceptual layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: num_hashes must be >= 1 (got {num_hashes})")]
    InvalidConfigHashes { num_hashes: usize },

    #[error("invalid config: minhash_bands must be >= 1 (got {bands})")]
    InvalidConfigBands { bands: usize },

    #[error("invalid config: minhash_rows_per_band must be >= 1 (got {rows})")]
    InvalidConfigRows { rows: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error(
        "invalid config: {bands} bands x {rows} rows exceeds signature length {num_hashes}"
    )]
    InvalidConfigBanding {
        bands: usize,
        rows: usize,
        num_hashes: usize,
    },

    #[error("signature length mismatch: {left} vs {right}")]
    SignatureLengthMismatch { left: usize, right: usize },
}
