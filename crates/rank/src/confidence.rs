//! Confidence from data completeness.
//!
//! Confidence measures how much of the input was actually known, not how
//! good the match is. Ten indicators, five per side, each worth 0.1.

use chrono::{DateTime, Utc};
use referral_features::activity_age_days;
use referral_model::{CandidateProfile, EmployeeProfile};
use serde::Serialize;

pub const MIN_CONFIDENCE: f64 = 0.3;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Activity within this many days counts as recent.
pub const RECENT_ACTIVITY_DAYS: i64 = 30;

/// A data-completeness indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    CandidateSkills,
    CandidatePosition,
    CandidateExperience,
    CandidateDepartment,
    CandidateBio,
    EmployeeSkills,
    EmployeePosition,
    EmployeeReferralHistory,
    EmployeeRating,
    EmployeeRecentActivity,
}

impl Indicator {
    pub const ALL: [Indicator; 10] = [
        Indicator::CandidateSkills,
        Indicator::CandidatePosition,
        Indicator::CandidateExperience,
        Indicator::CandidateDepartment,
        Indicator::CandidateBio,
        Indicator::EmployeeSkills,
        Indicator::EmployeePosition,
        Indicator::EmployeeReferralHistory,
        Indicator::EmployeeRating,
        Indicator::EmployeeRecentActivity,
    ];

    fn is_present(&self, c: &CandidateProfile, e: &EmployeeProfile, now: DateTime<Utc>) -> bool {
        match self {
            Self::CandidateSkills => c.skills.iter().any(|s| !s.trim().is_empty()),
            Self::CandidatePosition => !c.position.trim().is_empty(),
            Self::CandidateExperience => c.experience_years.is_some_and(|y| y.is_finite() && y >= 0.0),
            Self::CandidateDepartment => !c.department.trim().is_empty(),
            Self::CandidateBio => !c.bio.trim().is_empty(),
            Self::EmployeeSkills => e.skills.iter().any(|s| !s.trim().is_empty()),
            Self::EmployeePosition => !e.position.trim().is_empty(),
            Self::EmployeeReferralHistory => e.has_referral_history(),
            Self::EmployeeRating => e.clamped_rating() > 0.0,
            Self::EmployeeRecentActivity => activity_age_days(e.last_activity.as_deref(), now)
                .is_some_and(|days| days <= RECENT_ACTIVITY_DAYS),
        }
    }
}

/// Indicators present for this pair.
pub fn present_indicators(
    candidate: &CandidateProfile,
    employee: &EmployeeProfile,
    now: DateTime<Utc>,
) -> Vec<Indicator> {
    Indicator::ALL
        .into_iter()
        .filter(|i| i.is_present(candidate, employee, now))
        .collect()
}

/// Confidence in [0.3, 1.0].
pub fn estimate_confidence(
    candidate: &CandidateProfile,
    employee: &EmployeeProfile,
    now: DateTime<Utc>,
) -> f64 {
    let present = present_indicators(candidate, employee, now).len();
    (present as f64 / Indicator::ALL.len() as f64).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
