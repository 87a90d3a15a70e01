//! Qualification, scoring and ranking of referral matches.
//!
//! Takes a candidate and a pool of employees, drops employees that fail the
//! qualification rules, scores the rest against one weight snapshot and
//! returns them best-first.

pub mod confidence;
pub mod filter;
pub mod ranker;
pub mod scorer;

use rayon::prelude::*;
use referral_features::FeatureExtractor;
use referral_model::{CandidateProfile, EmployeeProfile, MatchResult, WeightVector};
use serde::Serialize;
use tracing::debug;

pub use confidence::{estimate_confidence, present_indicators, Indicator, MAX_CONFIDENCE, MIN_CONFIDENCE};
pub use filter::{qualify, Exclusion, FilterConfig, STRICT_MIN_SUCCESS_RATE};
pub use ranker::{compare_matches, rank_key, rank_matches};
pub use scorer::{overall_score, score_pair};

/// An employee removed by the qualification filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedEmployee {
    pub employee_id: String,
    #[serde(flatten)]
    pub reason: Exclusion,
}

/// Result of ranking a candidate against an employee pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankOutcome {
    /// At least one employee qualified
    Ranked {
        matches: Vec<MatchResult>,
        excluded: Vec<ExcludedEmployee>,
    },
    /// No employee survived qualification (or the pool was empty)
    NoQualifiedEmployees { excluded: Vec<ExcludedEmployee> },
}

impl RankOutcome {
    pub fn matches(&self) -> &[MatchResult] {
        match self {
            Self::Ranked { matches, .. } => matches,
            Self::NoQualifiedEmployees { .. } => &[],
        }
    }

    pub fn excluded(&self) -> &[ExcludedEmployee] {
        match self {
            Self::Ranked { excluded, .. } | Self::NoQualifiedEmployees { excluded } => excluded,
        }
    }

    pub fn into_matches(self) -> Vec<MatchResult> {
        match self {
            Self::Ranked { matches, .. } => matches,
            Self::NoQualifiedEmployees { .. } => Vec::new(),
        }
    }
}

/// Filter, score and rank an employee pool for one candidate.
///
/// Employees are evaluated in parallel; results are collected in input order
/// so ties resolve the same way on every run.
pub fn rank_candidates(
    candidate: &CandidateProfile,
    employees: &[EmployeeProfile],
    weights: &WeightVector,
    extractor: &FeatureExtractor<'_>,
    filter: &FilterConfig,
    top_n: Option<usize>,
) -> RankOutcome {
    let now = extractor.now();

    let evaluated: Vec<Result<MatchResult, ExcludedEmployee>> = employees
        .par_iter()
        .map(|employee| match qualify(employee, filter, now) {
            Ok(()) => Ok(score_pair(extractor, weights, candidate, employee)),
            Err(reason) => {
                debug!(employee = %employee.id, reason = reason.label(), "Employee excluded");
                Err(ExcludedEmployee {
                    employee_id: employee.id.clone(),
                    reason,
                })
            }
        })
        .collect();

    let mut scored = Vec::with_capacity(evaluated.len());
    let mut excluded = Vec::new();
    for item in evaluated {
        match item {
            Ok(result) => scored.push(result),
            Err(ex) => excluded.push(ex),
        }
    }

    if scored.is_empty() {
        return RankOutcome::NoQualifiedEmployees { excluded };
    }

    RankOutcome::Ranked {
        matches: rank_matches(scored, top_n),
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn candidate() -> CandidateProfile {
        CandidateProfile::new("c1")
            .with_skills(["rust", "sql"])
            .with_position("Junior Engineer")
            .with_experience(1.0)
            .with_department("Platform")
            .with_bio("Systems enthusiast")
    }

    fn pool() -> Vec<EmployeeProfile> {
        vec![
            EmployeeProfile::new("strong")
                .with_skills(["rust", "sql", "aws"])
                .with_position("Senior Engineer")
                .with_department("Platform")
                .with_experience(6.0)
                .with_referrals(10, 8)
                .with_rating(4.8)
                .with_verified(true)
                .with_last_activity("2024-06-29"),
            EmployeeProfile::new("inactive").with_active(false),
            EmployeeProfile::new("weak")
                .with_skills(["cobol"])
                .with_position("Accountant")
                .with_last_activity("2024-06-20"),
            EmployeeProfile::new("stale").with_last_activity("2023-01-01"),
        ]
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let extractor = FeatureExtractor::new(now());
        let outcome = rank_candidates(
            &candidate(),
            &pool(),
            &WeightVector::default(),
            &extractor,
            &FilterConfig::default(),
            None,
        );

        let ids: Vec<_> = outcome.matches().iter().map(|m| m.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "weak"]);

        let excluded: Vec<_> = outcome
            .excluded()
            .iter()
            .map(|e| (e.employee_id.as_str(), e.reason.label()))
            .collect();
        assert_eq!(excluded, vec![("inactive", "inactive"), ("stale", "stale")]);
    }

    #[test]
    fn test_empty_after_filtering() {
        let extractor = FeatureExtractor::new(now());
        let pool = vec![EmployeeProfile::new("gone").with_active(false)];
        let outcome = rank_candidates(
            &candidate(),
            &pool,
            &WeightVector::default(),
            &extractor,
            &FilterConfig::default(),
            Some(5),
        );
        assert!(matches!(outcome, RankOutcome::NoQualifiedEmployees { ref excluded } if excluded.len() == 1));
        assert!(outcome.matches().is_empty());
    }

    #[test]
    fn test_empty_pool() {
        let extractor = FeatureExtractor::new(now());
        let outcome = rank_candidates(
            &candidate(),
            &[],
            &WeightVector::default(),
            &extractor,
            &FilterConfig::default(),
            None,
        );
        assert_eq!(outcome, RankOutcome::NoQualifiedEmployees { excluded: vec![] });
    }

    #[test]
    fn test_same_batch_twice_is_identical() {
        let extractor = FeatureExtractor::new(now());
        let run = || {
            rank_candidates(
                &candidate(),
                &pool(),
                &WeightVector::default(),
                &extractor,
                &FilterConfig::default(),
                Some(3),
            )
        };
        assert_eq!(run(), run());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every match has score in [0, 100] and confidence in [0.3, 1.0].
            #[test]
            fn results_within_bounds(
                skills in proptest::collection::vec("[a-z]{1,6}", 0..6),
                emp_skills in proptest::collection::vec("[a-z]{1,6}", 0..6),
                cand_years in proptest::option::of(0.0f64..40.0),
                emp_years in proptest::option::of(0.0f64..40.0),
                rating in 0.0f64..5.0,
                total in 0u32..30,
                success in 0u32..30,
                weights in proptest::array::uniform5(0.01f64..1.0),
            ) {
                let sum: f64 = weights.iter().sum();
                let normalized = weights.map(|w| w / sum);
                let Ok(weights) = WeightVector::new(normalized) else {
                    return Ok(());
                };

                let mut cand = CandidateProfile::new("c").with_skills(skills);
                cand.experience_years = cand_years;
                let mut emp = EmployeeProfile::new("e")
                    .with_skills(emp_skills)
                    .with_rating(rating)
                    .with_referrals(total, success.min(total));
                emp.experience_years = emp_years;

                let extractor = FeatureExtractor::new(now());
                let result = score_pair(&extractor, &weights, &cand, &emp);
                prop_assert!((0.0..=100.0).contains(&result.overall_score));
                prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&result.confidence));
            }
        }
    }
}
