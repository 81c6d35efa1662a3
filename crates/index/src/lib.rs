//! # simscan Index
//!
//! In-memory Locality-Sensitive Hashing index over MinHash signatures.
//!
//! ## Key Concepts
//!
//! Each document's signature is cut into `bands` contiguous slices of `rows`
//! values. Documents whose slices are identical in the same band share a
//! bucket. A query collects every document sharing at least one bucket with
//! it (the OR-of-bands rule), then verifies each candidate by comparing full
//! signatures. Components past `bands * rows` are stored but never banded.
//!
//! The index is built once and frozen: [`LshIndexBuilder`] is the only type
//! with mutating methods, and [`LshIndexBuilder::build`] consumes it. A built
//! [`LshIndex`] can be shared across threads behind an `Arc` without any
//! locking.
//!
//! ## Example Usage
//!
//! ```
//! use index::LshIndex;
//! use perceptual::{MinHasher, ShingleGenerator};
//!
//! let shingler = ShingleGenerator::new(3);
//! let hasher = MinHasher::new(300, 2024).unwrap();
//!
//! let mut builder = LshIndex::builder(150, 2, hasher).unwrap();
//! let text = "the quick brown fox jumps over the lazy dog";
//! builder.add("doc1.txt", text, &shingler.shingles(text)).unwrap();
//! let index = builder.build();
//!
//! let hits = index.query(&shingler.shingles(text), 0.5).unwrap();
//! assert_eq!(hits[0].name, "doc1.txt");
//! assert_eq!(hits[0].similarity, 1.0);
//! ```

mod query;

pub use query::Candidate;

use hashbrown::HashMap;
use perceptual::{MinHasher, PerceptualError, ShingleSet, Signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a document in insertion order.
pub(crate) type DocId = usize;

/// Band slice -> documents whose signature carries that slice.
pub(crate) type BandBuckets = HashMap<Box<[u32]>, Vec<DocId>>;

/// Errors raised while building or querying the index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid LSH config: {0}")]
    InvalidConfig(String),

    #[error("document already indexed: {0}")]
    DuplicateDocument(String),

    #[error(transparent)]
    Perceptual(#[from] PerceptualError),
}

/// Summary of a built index, suitable for startup logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub bands: usize,
    pub rows: usize,
    pub num_hashes: usize,
    /// Distinct buckets across all bands.
    pub buckets: usize,
    /// Size of the most populated bucket.
    pub largest_bucket: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    pub(crate) name: String,
    pub(crate) content: String,
    pub(crate) signature: Signature,
}

/// Frozen LSH index. Read-only after [`LshIndexBuilder::build`].
#[derive(Debug, Clone)]
pub struct LshIndex {
    bands: usize,
    rows: usize,
    hasher: MinHasher,
    docs: Vec<StoredDocument>,
    by_name: HashMap<String, DocId>,
    buckets: Vec<BandBuckets>,
}

impl LshIndex {
    /// Start building an index with `bands` bands of `rows` rows each.
    ///
    /// `bands * rows` must not exceed the signature length of `hasher`.
    pub fn builder(
        bands: usize,
        rows: usize,
        hasher: MinHasher,
    ) -> Result<LshIndexBuilder, IndexError> {
        if bands == 0 || rows == 0 {
            return Err(IndexError::InvalidConfig(format!(
                "bands and rows must be >= 1 (got bands={bands}, rows={rows})"
            )));
        }
        let banded = bands.checked_mul(rows).ok_or_else(|| {
            IndexError::InvalidConfig(format!("bands={bands} x rows={rows} overflows"))
        })?;
        if banded > hasher.num_hashes() {
            return Err(IndexError::InvalidConfig(format!(
                "bands={bands} x rows={rows} exceeds signature length {}",
                hasher.num_hashes()
            )));
        }

        Ok(LshIndexBuilder {
            index: LshIndex {
                bands,
                rows,
                hasher,
                docs: Vec::new(),
                by_name: HashMap::new(),
                buckets: (0..bands).map(|_| BandBuckets::new()).collect(),
            },
        })
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Sketcher shared by indexing and querying.
    pub fn hasher(&self) -> &MinHasher {
        &self.hasher
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Stored signature of `name`, if indexed.
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.document(name).map(|doc| &doc.signature)
    }

    /// Stored normalized content of `name`, if indexed.
    pub fn content(&self, name: &str) -> Option<&str> {
        self.document(name).map(|doc| doc.content.as_str())
    }

    /// Document names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(|doc| doc.name.as_str())
    }

    /// Distinct buckets across all bands.
    pub fn bucket_count(&self) -> usize {
        self.buckets.iter().map(|band| band.len()).sum()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.len(),
            bands: self.bands,
            rows: self.rows,
            num_hashes: self.hasher.num_hashes(),
            buckets: self.bucket_count(),
            largest_bucket: self
                .buckets
                .iter()
                .flat_map(|band| band.values())
                .map(Vec::len)
                .max()
                .unwrap_or(0),
        }
    }

    fn document(&self, name: &str) -> Option<&StoredDocument> {
        self.by_name.get(name).and_then(|&id| self.docs.get(id))
    }
}

/// Mutable phase of an [`LshIndex`]. Append-only.
#[derive(Debug, Clone)]
pub struct LshIndexBuilder {
    index: LshIndex,
}

impl LshIndexBuilder {
    /// Sign `shingles`, store the signature and `normalized_content` under
    /// `name`, and bucket `name` in every band.
    ///
    /// Adding a name twice is rejected and leaves the index unchanged.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        normalized_content: impl Into<String>,
        shingles: &ShingleSet,
    ) -> Result<(), IndexError> {
        let name = name.into();
        if self.index.by_name.contains_key(&name) {
            return Err(IndexError::DuplicateDocument(name));
        }

        let signature = self.index.hasher.signature(shingles);
        let id = self.index.docs.len();
        let rows = self.index.rows;
        for (band, buckets) in self.index.buckets.iter_mut().enumerate() {
            // Banding was validated against the signature length up front.
            if let Some(slice) = signature.band(band, rows) {
                buckets.entry(Box::from(slice)).or_default().push(id);
            }
        }

        self.index.by_name.insert(name.clone(), id);
        self.index.docs.push(StoredDocument {
            name,
            content: normalized_content.into(),
            signature,
        });
        Ok(())
    }

    /// Documents added so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Freeze the index.
    pub fn build(self) -> LshIndex {
        self.index
    }
}
