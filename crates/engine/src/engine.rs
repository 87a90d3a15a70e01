//! The matching engine: scoring against the current weight snapshot, feedback
//! ingestion, adaptation and state export/import.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use referral_adapt::{
    AdaptationEvent, AdaptationHistory, AdaptationOutcome, ConfigError, EngineState,
    FeedbackBuffer, IngestReceipt, StateError, WeightAdapter, WeightSnapshot, WeightStore,
};
use referral_explain::{attach_explanations, Explainer};
use referral_features::{FeatureExtractor, SkillSimilarity};
use referral_model::{
    CandidateProfile, EmployeeProfile, FeedbackRecord, ValidationError, WeightVector,
};
use referral_rank::{rank_candidates, RankOutcome};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One matching call.
#[derive(Clone, Copy)]
pub struct MatchRequest<'a> {
    pub candidate: &'a CandidateProfile,
    pub employees: &'a [EmployeeProfile],
    pub top_n: Option<usize>,
    /// Overrides the configured target company for this call
    pub target_company: Option<&'a str>,
    pub now: DateTime<Utc>,
    /// Overrides the engine's similarity collaborator for this call
    pub similarity: Option<&'a dyn SkillSimilarity>,
}

impl<'a> MatchRequest<'a> {
    pub fn new(
        candidate: &'a CandidateProfile,
        employees: &'a [EmployeeProfile],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate,
            employees,
            top_n: None,
            target_company: None,
            now,
            similarity: None,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn with_target_company(mut self, company: &'a str) -> Self {
        self.target_company = Some(company);
        self
    }

    pub fn with_similarity(mut self, similarity: &'a dyn SkillSimilarity) -> Self {
        self.similarity = Some(similarity);
        self
    }
}

/// Ranked matches plus the weight snapshot they were scored with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub weights_version: u64,
    #[serde(flatten)]
    pub result: RankOutcome,
}

/// Acknowledgement of one feedback ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAck {
    #[serde(flatten)]
    pub receipt: IngestReceipt,
    /// Set when this ingestion triggered an adaptation attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptation: Option<AdaptationOutcome>,
}

/// A feedback record refused at ingestion.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Feedback rejected: {error} (buffer holds {buffer_len})")]
pub struct FeedbackRejected {
    #[source]
    pub error: ValidationError,
    /// Records held after the refusal
    pub buffer_len: usize,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub weights_version: u64,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
    pub total_feedback: u64,
    pub adaptations: usize,
}

/// Adaptive candidate-to-employee matching engine.
///
/// Safe to share across threads. Scoring reads one immutable weight snapshot
/// per call and never waits on ingestion or adaptation.
pub struct MatchEngine {
    config: EngineConfig,
    weights: WeightStore,
    buffer: Mutex<FeedbackBuffer>,
    adapter: WeightAdapter,
    history: Mutex<AdaptationHistory>,
    similarity: Option<Arc<dyn SkillSimilarity>>,
    explainer: Option<Arc<dyn Explainer>>,
}

impl MatchEngine {
    /// Start from the default weights.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_weights(config, WeightVector::default(), 0, Vec::new())
    }

    /// Resume from persisted state.
    pub fn from_state(config: EngineConfig, state: EngineState) -> Result<Self, EngineError> {
        info!(version = state.version, events = state.history.len(), "Resuming from saved state");
        Self::with_weights(config, state.weights, state.version, state.history)
    }

    fn with_weights(
        config: EngineConfig,
        weights: WeightVector,
        version: u64,
        history: Vec<AdaptationEvent>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let adapter = WeightAdapter::new(config.adaptation.clone())?;
        Ok(Self {
            weights: WeightStore::with_version(weights, version),
            buffer: Mutex::new(FeedbackBuffer::new(&config.buffer)),
            history: Mutex::new(AdaptationHistory::from_events(history, config.history_limit)),
            adapter,
            config,
            similarity: None,
            explainer: None,
        })
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SkillSimilarity>) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The weight snapshot currently in effect.
    pub fn weights(&self) -> Arc<WeightSnapshot> {
        self.weights.snapshot()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn history(&self) -> Vec<AdaptationEvent> {
        self.history.lock().to_vec()
    }

    pub fn stats(&self) -> EngineStats {
        let (buffer_len, buffer_capacity, total_feedback) = {
            let buffer = self.buffer.lock();
            (buffer.len(), buffer.capacity(), buffer.total_accepted())
        };
        EngineStats {
            weights_version: self.weights.snapshot().version,
            buffer_len,
            buffer_capacity,
            total_feedback,
            adaptations: self.history.lock().len(),
        }
    }

    /// Rank the employee pool for one candidate.
    ///
    /// The whole call scores against the snapshot current at entry, even if
    /// an adaptation publishes midway.
    pub fn match_candidate(&self, request: &MatchRequest<'_>) -> MatchOutcome {
        let snapshot = self.weights.snapshot();

        let similarity: Option<&dyn SkillSimilarity> = match request.similarity {
            Some(similarity) => Some(similarity),
            None => self.similarity.as_deref(),
        };
        let mut extractor = FeatureExtractor::new(request.now);
        if let Some(similarity) = similarity {
            extractor = extractor.with_similarity(similarity);
        }

        let filter = match request.target_company {
            Some(company) => self.config.filter.clone().with_target_company(company),
            None => self.config.filter.clone(),
        };

        let mut result = rank_candidates(
            request.candidate,
            request.employees,
            &snapshot.weights,
            &extractor,
            &filter,
            request.top_n,
        );

        if let (Some(explainer), RankOutcome::Ranked { matches, .. }) =
            (self.explainer.as_deref(), &mut result)
        {
            attach_explanations(matches, explainer, request.candidate, request.employees);
        }

        info!(
            candidate = %request.candidate.id,
            pool = request.employees.len(),
            matched = result.matches().len(),
            excluded = result.excluded().len(),
            version = snapshot.version,
            "Matched candidate"
        );

        MatchOutcome {
            weights_version: snapshot.version,
            result,
        }
    }

    /// Validate and buffer one feedback record.
    ///
    /// With `auto_adapt` on, an accepted record that brings the buffer to
    /// `min_samples` or more also runs an adaptation.
    pub fn ingest_feedback(&self, record: FeedbackRecord) -> Result<FeedbackAck, FeedbackRejected> {
        let mut buffer = self.buffer.lock();
        let ingested = buffer.ingest(record);
        let buffer_len = buffer.len();
        drop(buffer);

        let receipt = ingested.map_err(|error| {
            warn!(error = %error, buffer_len, "Rejected feedback");
            FeedbackRejected { error, buffer_len }
        })?;

        let adaptation = (self.config.auto_adapt
            && receipt.accepted()
            && receipt.buffer_len >= self.config.adaptation.min_samples)
            .then(|| self.adapt());

        Ok(FeedbackAck { receipt, adaptation })
    }

    /// Recompute the weights from the buffered window and publish them.
    pub fn adapt(&self) -> AdaptationOutcome {
        let window = self.adapter.config().window_size;
        let (records, available) = {
            let buffer = self.buffer.lock();
            (buffer.recent(window), buffer.len())
        };

        let Some(plan) = self.adapter.plan(&records) else {
            debug!(available, required = self.config.adaptation.min_samples, "Not enough feedback to adapt");
            return AdaptationOutcome::InsufficientData {
                available,
                required: self.config.adaptation.min_samples,
            };
        };

        let deltas = plan.deltas();
        let (previous, next) = match self.weights.update(|current| self.adapter.apply(current, deltas)) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Adapted weights failed validation, keeping current snapshot");
                return AdaptationOutcome::Rejected {
                    reason: e.to_string(),
                };
            }
        };

        let event = AdaptationEvent {
            timestamp: next.published_at,
            version: next.version,
            previous: previous.weights,
            updated: next.weights,
            sample_count: plan.sample_count,
            strength: plan.strength,
            performances: plan.performances,
        };
        self.history.lock().record(event.clone());

        info!(
            version = event.version,
            samples = event.sample_count,
            weights = ?event.updated.as_array(),
            "Adapted weights"
        );
        AdaptationOutcome::Adapted(event)
    }

    /// Current weights, version and history.
    pub fn export_state(&self) -> EngineState {
        let snapshot = self.weights.snapshot();
        EngineState::new(snapshot.weights, snapshot.version, self.history())
    }

    /// Adopt a state document. On any error the current snapshot stays.
    pub fn import_json(&self, json: &str) -> Result<Arc<WeightSnapshot>, EngineError> {
        match EngineState::from_json(json) {
            Ok(state) => Ok(self.import_state(state)),
            Err(e) => {
                warn!(error = %e, "Refused state import, keeping current weights");
                Err(e.into())
            }
        }
    }

    pub fn import_state(&self, state: EngineState) -> Arc<WeightSnapshot> {
        *self.history.lock() = AdaptationHistory::from_events(state.history, self.config.history_limit);
        self.weights.restore(state.weights, state.version)
    }

    /// Adopt a raw weight vector in component order.
    pub fn import_weights(&self, weights: [f64; 5]) -> Result<Arc<WeightSnapshot>, EngineError> {
        match WeightVector::new(weights) {
            Ok(weights) => Ok(self.weights.publish(weights)),
            Err(e) => {
                warn!(error = %e, "Refused weight import, keeping current weights");
                Err(e.into())
            }
        }
    }
}
