use crate::{DocId, IndexError, LshIndex};
use hashbrown::HashSet;
use perceptual::{signature_similarity, PerceptualError, ShingleSet, Signature};

/// A document that collided with the query in at least one band and passed
/// the similarity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub name: &'a str,
    /// Fraction of agreeing signature components, in `[0, 1]`.
    pub similarity: f64,
    /// Normalized text stored at indexing time.
    pub content: &'a str,
}

impl LshIndex {
    /// Find indexed documents similar to `shingles`.
    ///
    /// Candidates are the documents sharing at least one band bucket with the
    /// query. Those whose estimated similarity is `>= threshold` are returned
    /// sorted by descending similarity; ties keep first-collision order.
    pub fn query(
        &self,
        shingles: &ShingleSet,
        threshold: f64,
    ) -> Result<Vec<Candidate<'_>>, IndexError> {
        let signature = self.hasher().signature(shingles);
        self.query_signature(&signature, threshold)
    }

    /// Same as [`LshIndex::query`] for a precomputed signature.
    pub fn query_signature(
        &self,
        signature: &Signature,
        threshold: f64,
    ) -> Result<Vec<Candidate<'_>>, IndexError> {
        let expected = self.hasher().num_hashes();
        if signature.len() != expected {
            return Err(PerceptualError::SignatureLengthMismatch {
                left: signature.len(),
                right: expected,
            }
            .into());
        }

        let mut results = Vec::new();
        for id in self.collect_candidates(signature) {
            let Some(doc) = self.docs.get(id) else {
                continue;
            };
            let similarity = signature_similarity(signature, &doc.signature)?;
            if similarity >= threshold {
                results.push(Candidate {
                    name: &doc.name,
                    similarity,
                    content: &doc.content,
                });
            }
        }

        // `sort_by` is stable, so equal scores stay in collision order.
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(results)
    }

    /// Union of band buckets hit by `signature`, deduplicated, in order of
    /// first collision (band 0 first, insertion order within a bucket).
    fn collect_candidates(&self, signature: &Signature) -> Vec<DocId> {
        let mut seen: HashSet<DocId> = HashSet::new();
        let mut ordered = Vec::new();

        for (band, buckets) in self.buckets.iter().enumerate() {
            let Some(slice) = signature.band(band, self.rows) else {
                break;
            };
            if let Some(ids) = buckets.get(slice) {
                for &id in ids {
                    if seen.insert(id) {
                        ordered.push(id);
                    }
                }
            }
        }
        ordered
    }
}
