//! Embedding service backend for skill similarity.
//!
//! Provides the `EmbeddingBackend` trait and an HTTP implementation. Scoring
//! never calls the service directly: `prefetch` asks it for every
//! candidate/employee skill pair up front and fills a `PrecomputedSimilarity`
//! table, which scoring then reads synchronously.

use std::collections::HashSet;
use std::future::Future;

use referral_features::{set_key, skill_set, PrecomputedSimilarity, SimilarityRange};
use referral_model::{CandidateProfile, EmployeeProfile};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from embedding backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Backend not available")]
    Unavailable,
}

/// Trait for skill similarity services.
pub trait EmbeddingBackend {
    /// Similarity between two skill lists, in `range()`.
    fn similarity(
        &self,
        a: &[String],
        b: &[String],
    ) -> impl Future<Output = Result<f64, BackendError>> + Send;

    /// Check if the backend is healthy.
    fn health_check(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Native range of the returned scores.
    fn range(&self) -> SimilarityRange;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// Embedding service configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the service HTTP API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub range: SimilarityRange,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 10,
            range: SimilarityRange::Cosine,
        }
    }
}

#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    skills_a: &'a [String],
    skills_b: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

/// HTTP embedding service backend.
pub struct HttpEmbeddingBackend {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl HttpEmbeddingBackend {
    pub fn new(config: EmbeddingConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn parse_response(body: &str) -> Result<f64, BackendError> {
        let response: SimilarityResponse =
            serde_json::from_str(body).map_err(|e| BackendError::ParseError(e.to_string()))?;
        if !response.similarity.is_finite() {
            return Err(BackendError::ParseError(format!(
                "non-finite similarity {}",
                response.similarity
            )));
        }
        Ok(response.similarity)
    }
}

impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn similarity(&self, a: &[String], b: &[String]) -> Result<f64, BackendError> {
        let response = self
            .client
            .post(self.endpoint("similarity"))
            .json(&SimilarityRequest {
                skills_a: a,
                skills_b: b,
            })
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;
        Self::parse_response(&body)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Unavailable)
        }
    }

    fn range(&self) -> SimilarityRange {
        self.config.range
    }

    fn name(&self) -> &'static str {
        "embedding-http"
    }
}

/// Fetch similarities for every distinct employee skill set in the pool.
///
/// Pairs the backend fails on are left out of the table, so scoring falls
/// back to the overlap ratio for them.
pub async fn prefetch<B: EmbeddingBackend>(
    backend: &B,
    candidate: &CandidateProfile,
    employees: &[EmployeeProfile],
) -> PrecomputedSimilarity {
    let mut table = PrecomputedSimilarity::new(backend.range());
    let cand = skill_set(&candidate.skills);
    if cand.is_empty() {
        return table;
    }

    let mut seen = HashSet::new();
    let mut failures = 0usize;
    for employee in employees {
        let emp = skill_set(&employee.skills);
        if emp.is_empty() || !seen.insert(set_key(&emp)) {
            continue;
        }
        match backend.similarity(&cand, &emp).await {
            Ok(score) => table.insert(&cand, &emp, score),
            Err(e) => {
                failures += 1;
                warn!(backend = backend.name(), employee = %employee.id, error = %e, "Similarity fetch failed");
            }
        }
    }

    if failures > 0 {
        info!(fetched = table.len(), failures, "Prefetched skill similarities with failures");
    } else {
        debug!(fetched = table.len(), "Prefetched skill similarities");
    }
    table
}
