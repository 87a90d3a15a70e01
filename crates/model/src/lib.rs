//! Core domain model for the referral matching engine.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `CandidateProfile` / `EmployeeProfile`: the raw records being paired
//! - `Component` / `ComponentScores`: the five scoring factors
//! - `WeightVector`: validated, immutable factor weights
//! - `MatchResult`: a scored candidate-employee pair
//! - `FeedbackRecord`: an outcome observed for a previous match

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking that weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Invalid input rejected by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Outcome score {0} is outside [0, 1]")]
    OutcomeOutOfRange(f64),

    #[error("Component score for {component} is outside [0, 100]: {value}")]
    ComponentScoreOutOfRange { component: Component, value: f64 },

    #[error("Non-finite value for {0}")]
    NonFinite(String),

    #[error("Negative weight for {component}: {value}")]
    NegativeWeight { component: Component, value: f64 },

    #[error("Weight for {component} exceeds 1.0: {value}")]
    WeightAboveOne { component: Component, value: f64 },

    #[error("Weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("Empty match id")]
    EmptyMatchId,
}

/// One of the scoring factors combined into the overall match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    SkillsExpertise,
    CareerExperience,
    PerformanceMetrics,
    AvailabilityEngagement,
    BiasNeutrality,
}

impl Component {
    /// All components in canonical order.
    pub const ALL: [Component; 5] = [
        Component::SkillsExpertise,
        Component::CareerExperience,
        Component::PerformanceMetrics,
        Component::AvailabilityEngagement,
        Component::BiasNeutrality,
    ];

    /// Stable key used in persisted records.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SkillsExpertise => "skills_expertise",
            Self::CareerExperience => "career_experience",
            Self::PerformanceMetrics => "performance_metrics",
            Self::AvailabilityEngagement => "availability_engagement",
            Self::BiasNeutrality => "bias_neutrality",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkillsExpertise => "Skills & Expertise",
            Self::CareerExperience => "Career Experience",
            Self::PerformanceMetrics => "Referral Performance",
            Self::AvailabilityEngagement => "Availability",
            Self::BiasNeutrality => "Equal Treatment",
        }
    }

    /// Position in `Component::ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-component feature values, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skills_expertise: f64,
    pub career_experience: f64,
    pub performance_metrics: f64,
    pub availability_engagement: f64,
    pub bias_neutrality: f64,
}

impl ComponentScores {
    pub fn from_array(values: [f64; 5]) -> Self {
        Self {
            skills_expertise: values[0],
            career_experience: values[1],
            performance_metrics: values[2],
            availability_engagement: values[3],
            bias_neutrality: values[4],
        }
    }

    pub fn as_array(&self) -> [f64; 5] {
        [
            self.skills_expertise,
            self.career_experience,
            self.performance_metrics,
            self.availability_engagement,
            self.bias_neutrality,
        ]
    }

    pub fn get(&self, component: Component) -> f64 {
        self.as_array()[component.index()]
    }

    /// Iterate `(component, score)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Component, f64)> {
        let values = self.as_array();
        Component::ALL.into_iter().zip(values)
    }

    /// Check every score is finite and within [0, 100].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (component, value) in self.iter() {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite(component.key().to_string()));
            }
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::ComponentScoreOutOfRange { component, value });
            }
        }
        Ok(())
    }
}

/// Keyed on-the-wire form of a `WeightVector`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WeightRecord {
    skills_expertise: f64,
    career_experience: f64,
    performance_metrics: f64,
    availability_engagement: f64,
    bias_neutrality: f64,
}

/// Weights combining component scores into the overall score.
///
/// Always valid: every weight is in [0, 1] and the weights sum to 1.0
/// within `WEIGHT_SUM_TOLERANCE`. There is no way to mutate a vector once
/// built; adaptation produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightRecord", into = "WeightRecord")]
pub struct WeightVector {
    weights: [f64; 5],
}

impl WeightVector {
    /// Build a vector from weights in `Component::ALL` order.
    pub fn new(weights: [f64; 5]) -> Result<Self, ValidationError> {
        for (component, value) in Component::ALL.into_iter().zip(weights) {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite(component.key().to_string()));
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeWeight { component, value });
            }
            if value > 1.0 {
                return Err(ValidationError::WeightAboveOne { component, value });
            }
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::WeightSum(sum));
        }

        Ok(Self { weights })
    }

    pub fn get(&self, component: Component) -> f64 {
        self.weights[component.index()]
    }

    pub fn as_array(&self) -> [f64; 5] {
        self.weights
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Component, f64)> {
        Component::ALL.into_iter().zip(self.weights)
    }

    /// Weighted sum of component scores (unrounded).
    pub fn combine(&self, scores: &ComponentScores) -> f64 {
        self.iter().map(|(c, w)| scores.get(c) * w).sum()
    }
}

impl Default for WeightVector {
    /// Hand-tuned starting weights.
    fn default() -> Self {
        Self {
            weights: [0.35, 0.25, 0.20, 0.15, 0.05],
        }
    }
}

impl TryFrom<WeightRecord> for WeightVector {
    type Error = ValidationError;

    fn try_from(r: WeightRecord) -> Result<Self, Self::Error> {
        Self::new([
            r.skills_expertise,
            r.career_experience,
            r.performance_metrics,
            r.availability_engagement,
            r.bias_neutrality,
        ])
    }
}

impl From<WeightVector> for WeightRecord {
    fn from(v: WeightVector) -> Self {
        let [skills_expertise, career_experience, performance_metrics, availability_engagement, bias_neutrality] =
            v.weights;
        Self {
            skills_expertise,
            career_experience,
            performance_metrics,
            availability_engagement,
            bias_neutrality,
        }
    }
}

/// A candidate looking for a referral.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,

    /// Skills, in the order the candidate listed them
    #[serde(default)]
    pub skills: Vec<String>,

    /// Current role/title
    #[serde(default)]
    pub position: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<f64>,

    #[serde(default)]
    pub department: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub location: String,

    /// Past and present employers, most recent first
    #[serde(default)]
    pub company_history: Vec<String>,
}

impl CandidateProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_skills<S: Into<String>>(mut self, skills: impl IntoIterator<Item = S>) -> Self {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_experience(mut self, years: f64) -> Self {
        self.experience_years = Some(years);
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_company_history<S: Into<String>>(
        mut self,
        companies: impl IntoIterator<Item = S>,
    ) -> Self {
        self.company_history = companies.into_iter().map(Into::into).collect();
        self
    }
}

/// An employee who can refer candidates.
///
/// Owned and updated outside the engine; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub id: String,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default)]
    pub position: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<f64>,

    #[serde(default)]
    pub company: String,

    #[serde(default)]
    pub department: String,

    #[serde(default)]
    pub total_referrals: u32,

    #[serde(default)]
    pub successful_referrals: u32,

    /// Average rating, 0-5
    #[serde(default)]
    pub rating: f64,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Last activity timestamp as received (ISO 8601 / RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

fn default_true() -> bool {
    true
}

impl EmployeeProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skills: Vec::new(),
            position: String::new(),
            experience_years: None,
            company: String::new(),
            department: String::new(),
            total_referrals: 0,
            successful_referrals: 0,
            rating: 0.0,
            is_verified: false,
            is_active: true,
            last_activity: None,
        }
    }

    pub fn with_skills<S: Into<String>>(mut self, skills: impl IntoIterator<Item = S>) -> Self {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_experience(mut self, years: f64) -> Self {
        self.experience_years = Some(years);
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_referrals(mut self, total: u32, successful: u32) -> Self {
        self.total_referrals = total;
        self.successful_referrals = successful;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.is_verified = verified;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_last_activity(mut self, timestamp: impl Into<String>) -> Self {
        self.last_activity = Some(timestamp.into());
        self
    }

    /// Whether the employee has made any referrals.
    pub fn has_referral_history(&self) -> bool {
        self.total_referrals > 0
    }

    /// Fraction of referrals that succeeded, or `None` without history.
    ///
    /// Capped at 1.0 in case upstream counts are inconsistent.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_referrals == 0 {
            return None;
        }
        Some((self.successful_referrals as f64 / self.total_referrals as f64).min(1.0))
    }

    /// Rating clamped to [0, 5]; non-finite ratings count as 0.
    pub fn clamped_rating(&self) -> f64 {
        if self.rating.is_finite() {
            self.rating.clamp(0.0, 5.0)
        } else {
            0.0
        }
    }
}

/// Narrative attached to a match by an explainer. Never affects scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (2-3 sentences)
    pub detail: String,

    /// Evidence items supporting this explanation
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
}

/// A piece of evidence supporting an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Type of evidence
    pub kind: String,

    /// The specific value or match
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A scored candidate-employee pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub employee_id: String,

    /// Weighted score, 0-100, one decimal
    pub overall_score: f64,

    /// Data completeness multiplier, 0.3-1.0
    pub confidence: f64,

    /// Per-component scores, each 0-100
    pub breakdown: ComponentScores,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl MatchResult {
    /// The value ranked on: `overall_score * confidence`.
    pub fn rank_score(&self) -> f64 {
        self.overall_score * self.confidence
    }
}

/// How an outcome was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Star rating, 0-5
    Rating,
    /// Referral succeeded (1) or not (0)
    SuccessFlag,
    /// Engagement metric already in [0, 1]
    EngagementScore,
}

impl FeedbackKind {
    /// Map a raw observation to an outcome score.
    ///
    /// Does not clamp: out-of-range input stays out of range so ingestion
    /// can reject it.
    pub fn normalize(&self, raw: f64) -> f64 {
        match self {
            Self::Rating => raw / 5.0,
            Self::SuccessFlag | Self::EngagementScore => raw,
        }
    }
}

/// An observed outcome for an earlier match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Identifier of the originating match
    pub match_id: String,

    /// Component scores at match time
    pub component_scores: ComponentScores,

    /// Overall score at match time, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,

    /// Normalized outcome, 0-1
    pub outcome_score: f64,

    pub kind: FeedbackKind,

    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        match_id: impl Into<String>,
        component_scores: ComponentScores,
        outcome_score: f64,
        kind: FeedbackKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            component_scores,
            overall_score: None,
            outcome_score,
            kind,
            timestamp,
        }
    }

    /// Feedback for a match produced by this engine, snapshotting its breakdown.
    pub fn for_match(
        match_id: impl Into<String>,
        result: &MatchResult,
        outcome_score: f64,
        kind: FeedbackKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            overall_score: Some(result.overall_score),
            ..Self::new(match_id, result.breakdown, outcome_score, kind, timestamp)
        }
    }

    /// Reject records the adapter cannot learn from.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.match_id.trim().is_empty() {
            return Err(ValidationError::EmptyMatchId);
        }
        if !self.outcome_score.is_finite() || !(0.0..=1.0).contains(&self.outcome_score) {
            return Err(ValidationError::OutcomeOutOfRange(self.outcome_score));
        }
        self.component_scores.validate()
    }
}

/// Round to one decimal place.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
