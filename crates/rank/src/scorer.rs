//! Multi-factor scoring of a single pair.

use referral_features::FeatureExtractor;
use referral_model::{
    round_tenth, CandidateProfile, ComponentScores, EmployeeProfile, MatchResult, WeightVector,
};

use crate::confidence::estimate_confidence;

/// Combine component scores into a 0-100 overall score, one decimal.
pub fn overall_score(scores: &ComponentScores, weights: &WeightVector) -> f64 {
    round_tenth(weights.combine(scores)).clamp(0.0, 100.0)
}

/// Score one candidate-employee pair against a weight snapshot.
pub fn score_pair(
    extractor: &FeatureExtractor<'_>,
    weights: &WeightVector,
    candidate: &CandidateProfile,
    employee: &EmployeeProfile,
) -> MatchResult {
    let scores = extractor.extract(candidate, employee);
    let breakdown = ComponentScores::from_array(
        scores
            .as_array()
            .map(|s| round_tenth(s).clamp(0.0, 100.0)),
    );

    MatchResult {
        employee_id: employee.id.clone(),
        overall_score: overall_score(&scores, weights),
        confidence: estimate_confidence(candidate, employee, extractor.now()),
        breakdown,
        explanation: None,
    }
}
