//! MinHash signature representation.

use serde::{Deserialize, Serialize};

/// Fixed-length vector of per-hash-function minima over a shingle set.
///
/// The length equals the number of hash functions of the [`MinHasher`]
/// that produced it and never changes for the lifetime of an index.
///
/// [`MinHasher`]: crate::MinHasher
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u32>);

impl Signature {
    /// Signature values in hash-function order.
    pub fn values(&self) -> &[u32] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rows `[band * rows, band * rows + rows)` of the signature.
    ///
    /// Returns `None` when the band does not fit inside the signature.
    pub fn band(&self, band: usize, rows: usize) -> Option<&[u32]> {
        let start = band.checked_mul(rows)?;
        let end = start.checked_add(rows)?;
        self.0.get(start..end)
    }
}

impl From<Vec<u32>> for Signature {
    fn from(values: Vec<u32>) -> Self {
        Self(values)
    }
}

impl From<Signature> for Vec<u32> {
    fn from(signature: Signature) -> Self {
        signature.0
    }
}
