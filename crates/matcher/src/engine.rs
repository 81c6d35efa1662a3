use std::path::Path;
use std::time::Instant;

use canonical::normalize_text;
use index::{LshIndex, LshIndexBuilder};
use perceptual::{jaccard, MinHasher, ShingleGenerator};
use tracing::{debug, info, warn};

use crate::corpus::{read_corpus, CorpusReport};
use crate::types::{DetectorConfig, MatchError, MatchResult, Request, Response};


/// Plagiarism detector over a frozen, in-memory corpus index.
///
/// Immutable once constructed; share it across threads behind an `Arc`.
#[derive(Debug)]
pub struct PlagiarismDetector {
    cfg: DetectorConfig,
    shingler: ShingleGenerator,
    index: LshIndex,
}

impl PlagiarismDetector {
    /// Detector with an empty corpus. Every query succeeds with no matches.
    pub fn new(cfg: DetectorConfig) -> Result<Self, MatchError> {
        let builder = Self::index_builder(&cfg)?;
        Ok(Self::from_parts(cfg, builder))
    }

    /// Detector over `(name, raw_text)` pairs, added in iteration order.
    ///
    /// Unlike [`PlagiarismDetector::from_corpus_dir`], a duplicate name is an
    /// error here.
    pub fn from_documents<I, N, T>(cfg: DetectorConfig, docs: I) -> Result<Self, MatchError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        let mut builder = Self::index_builder(&cfg)?;
        let shingler = ShingleGenerator::new(cfg.perceptual.k);
        for (name, raw) in docs {
            let normalized = normalize_text(raw.as_ref());
            let shingles = shingler.shingles(&normalized);
            builder.add(name, normalized, &shingles)?;
        }
        Ok(Self::from_parts(cfg, builder))
    }

    /// Load every corpus file in `dir` and build the index.
    ///
    /// Files are read and shingled in parallel, then indexed in file-name
    /// order. A missing directory or unreadable file is logged and skipped;
    /// only an invalid `cfg` is an error.
    pub fn from_corpus_dir(
        cfg: DetectorConfig,
        dir: impl AsRef<Path>,
    ) -> Result<(Self, CorpusReport), MatchError> {
        let dir = dir.as_ref();
        let mut builder = Self::index_builder(&cfg)?;
        let shingler = ShingleGenerator::new(cfg.perceptual.k);
        let started = Instant::now();

        let (docs, mut skipped) = read_corpus(dir, &cfg.corpus_extension, &shingler);
        let mut indexed = 0;
        for doc in docs {
            match builder.add(doc.name, doc.normalized, &doc.shingles) {
                Ok(()) => indexed += 1,
                Err(err) => {
                    warn!(error = %err, "failed to index corpus file");
                    skipped += 1;
                }
            }
        }

        let report = CorpusReport { indexed, skipped };
        info!(
            dir = %dir.display(),
            indexed,
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "corpus loaded"
        );
        Ok((Self::from_parts(cfg, builder), report))
    }

    fn index_builder(cfg: &DetectorConfig) -> Result<LshIndexBuilder, MatchError> {
        cfg.validate()?;
        let hasher = MinHasher::from_config(&cfg.perceptual)?;
        Ok(LshIndex::builder(
            cfg.perceptual.minhash_bands,
            cfg.perceptual.minhash_rows_per_band,
            hasher,
        )?)
    }

    fn from_parts(cfg: DetectorConfig, builder: LshIndexBuilder) -> Self {
        Self {
            shingler: ShingleGenerator::new(cfg.perceptual.k),
            cfg,
            index: builder.build(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    /// Number of indexed corpus documents.
    pub fn corpus_size(&self) -> usize {
        self.index.len()
    }

    /// Answer one request. Never fails: pipeline errors become
    /// [`Response::error`] with the request id echoed.
    pub fn handle(&self, request: &Request) -> Response {
        let request_id = request.request_id.clone();
        match self.detect(&request.full_text) {
            Ok(matches) => Response::success(request_id, matches),
            Err(err @ MatchError::EmptyDocument) => Response::error(request_id, err.to_string()),
            Err(err) => Response::error(request_id, format!("Internal error: {err}")),
        }
    }

    /// Corpus documents similar to `full_text`, best match first.
    ///
    /// Candidates come from the LSH index filtered by the approximate
    /// `min_similarity` floor; the reported similarity is the exact Jaccard
    /// coefficient of the shingle sets.
    pub fn detect(&self, full_text: &str) -> Result<Vec<MatchResult>, MatchError> {
        let started = Instant::now();
        let normalized = normalize_text(full_text);
        let query = self.shingler.shingles(&normalized);
        if query.is_empty() {
            return Err(MatchError::EmptyDocument);
        }

        let candidates = self.index.query(&query, self.cfg.min_similarity)?;
        let candidate_count = candidates.len();
        let mut matches: Vec<MatchResult> = candidates
            .into_iter()
            .map(|candidate| {
                let stored = self.shingler.shingles(candidate.content);
                let similarity = jaccard(&query, &stored);
                debug!(
                    file = candidate.name,
                    approx = candidate.similarity,
                    exact = similarity,
                    "candidate verified"
                );
                MatchResult::new(candidate.name, similarity)
            })
            .collect();

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        if let Some(limit) = self.cfg.max_results {
            matches.truncate(limit);
        }

        debug!(
            shingles = query.len(),
            candidates = candidate_count,
            matches = matches.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "detection finished"
        );
        Ok(matches)
    }
}
