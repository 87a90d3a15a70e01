//! Qualification filter applied before scoring.

use chrono::{DateTime, Utc};
use referral_features::{activity_age_days, contains_ignore_case};
use referral_model::EmployeeProfile;
use serde::{Deserialize, Serialize};

/// Success-rate threshold applied when inclusive mode is off and no explicit
/// threshold is configured.
pub const STRICT_MIN_SUCCESS_RATE: f64 = 0.3;

/// Configuration for the qualification filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Inclusive mode: no reliability threshold unless one is set explicitly
    pub inclusive: bool,
    /// Minimum success rate for employees with referral history
    pub min_success_rate: Option<f64>,
    /// Keep only employees whose company contains this text (case-insensitive)
    pub target_company: Option<String>,
    /// Maximum days since last activity
    pub max_inactive_days: Option<i64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            inclusive: true,
            min_success_rate: None,
            target_company: None,
            max_inactive_days: Some(30),
        }
    }
}

impl FilterConfig {
    pub fn with_target_company(mut self, company: impl Into<String>) -> Self {
        self.target_company = Some(company.into());
        self
    }

    /// The reliability threshold actually enforced.
    pub fn effective_min_success_rate(&self) -> Option<f64> {
        match (self.min_success_rate, self.inclusive) {
            (Some(threshold), _) => Some(threshold),
            (None, true) => None,
            (None, false) => Some(STRICT_MIN_SUCCESS_RATE),
        }
    }
}

/// Why an employee was left out of scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    Inactive,
    BelowReliability { success_rate: f64, threshold: f64 },
    CompanyMismatch { company: String },
    Stale { days: i64, max_days: i64 },
}

impl Exclusion {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::BelowReliability { .. } => "below_reliability",
            Self::CompanyMismatch { .. } => "company_mismatch",
            Self::Stale { .. } => "stale",
        }
    }
}

/// Check whether an employee qualifies for scoring.
///
/// Employees without referral history are never excluded for reliability,
/// and an unreadable activity timestamp counts as active.
pub fn qualify(
    employee: &EmployeeProfile,
    config: &FilterConfig,
    now: DateTime<Utc>,
) -> Result<(), Exclusion> {
    if !employee.is_active {
        return Err(Exclusion::Inactive);
    }

    if let (Some(threshold), Some(success_rate)) =
        (config.effective_min_success_rate(), employee.success_rate())
    {
        if success_rate < threshold {
            return Err(Exclusion::BelowReliability {
                success_rate,
                threshold,
            });
        }
    }

    if let Some(target) = config.target_company.as_deref() {
        if !target.trim().is_empty() && !contains_ignore_case(&employee.company, target) {
            return Err(Exclusion::CompanyMismatch {
                company: employee.company.clone(),
            });
        }
    }

    if let Some(max_days) = config.max_inactive_days {
        if let Some(days) = activity_age_days(employee.last_activity.as_deref(), now) {
            if days > max_days {
                return Err(Exclusion::Stale { days, max_days });
            }
        }
    }

    Ok(())
}
