use index::IndexError;
use perceptual::{PerceptualConfig, PerceptualError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One detection request as carried on the wire.
///
/// Only `full_text` is required; the other fields are opaque to detection and
/// `request_id` is echoed back in the [`Response`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub full_text: String,
}

impl Request {
    /// Request carrying only the text to check.
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Error,
}

/// A corpus document judged similar to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub file_name: String,
    /// Exact Jaccard similarity of the shingle sets, in `[0, 1]`.
    pub similarity: f64,
    pub description: String,
}

impl MatchResult {
    pub fn new(file_name: impl Into<String>, similarity: f64) -> Self {
        Self {
            file_name: file_name.into(),
            similarity,
            description: format!("Similarity: {:.2}%", similarity * 100.0),
        }
    }
}

/// Reply to a [`Request`].
///
/// `error_message` is present only on [`Status::Error`] and `matches` only on
/// [`Status::Success`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchResult>>,
}

impl Response {
    pub fn success(request_id: Option<String>, matches: Vec<MatchResult>) -> Self {
        Self {
            request_id,
            status: Status::Success,
            error_message: None,
            matches: Some(matches),
        }
    }

    pub fn error(request_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            request_id,
            status: Status::Error,
            error_message: Some(message.into()),
            matches: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Shingling, MinHash and banding parameters.
    pub perceptual: PerceptualConfig,
    /// Approximate-similarity floor applied to LSH candidates.
    pub min_similarity: f64,
    /// Extension of corpus files, compared case-insensitively.
    pub corpus_extension: String,
    /// Cap on returned matches. `None` returns every candidate.
    pub max_results: Option<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            perceptual: PerceptualConfig::default(),
            min_similarity: 0.01,
            corpus_extension: "txt".into(),
            max_results: None,
        }
    }
}

impl DetectorConfig {
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_perceptual(mut self, perceptual: PerceptualConfig) -> Self {
        self.perceptual = perceptual;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        self.perceptual.validate()?;
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(MatchError::InvalidConfig(format!(
                "min_similarity must be within [0, 1] (got {})",
                self.min_similarity
            )));
        }
        if self.corpus_extension.trim().is_empty() {
            return Err(MatchError::InvalidConfig(
                "corpus_extension must not be empty".into(),
            ));
        }
        if self.max_results == Some(0) {
            return Err(MatchError::InvalidConfig(
                "max_results must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Errors produced by the detection pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("Document empty after preprocessing")]
    EmptyDocument,
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Perceptual(#[from] PerceptualError),
    #[error(transparent)]
    Index(#[from] IndexError),
}
