//! Per-pair feature extraction.
//!
//! Every component lands on a 0-100 scale. Missing data maps to documented
//! fallback values, never to an error.

use chrono::{DateTime, Utc};
use referral_model::{CandidateProfile, ComponentScores, EmployeeProfile};
use tracing::{debug, warn};

use crate::activity::activity_age_days;
use crate::similarity::{SimilarityError, SkillSimilarity};
use crate::text::{
    implies_seniority, is_tech_adjacent, jaccard, same_text, skill_overlap, skill_set,
    title_tokens,
};

/// Skills score when either side lists no skills. Non-zero so an unknown
/// never reads as a mismatch.
pub const UNKNOWN_SKILLS_SCORE: f64 = 30.0;

/// Maximum bonus for exact skill overlap.
pub const OVERLAP_BONUS: f64 = 20.0;

/// Equal treatment: never derived from profile attributes.
pub const BIAS_NEUTRALITY_SCORE: f64 = 100.0;

const CAREER_BASE: f64 = 50.0;
const SENIORITY_BONUS: f64 = 20.0;
const SHARED_TOKEN_BONUS: f64 = 5.0;
const DEPARTMENT_BONUS: f64 = 15.0;
const MENTORSHIP_BONUS: f64 = 10.0;
const MENTORSHIP_GAP_YEARS: (f64, f64) = (2.0, 8.0);
const SAME_COMPANY_BONUS: f64 = 15.0;
const TECH_COMPANY_BONUS: f64 = 10.0;

const NEWCOMER_BASE: f64 = 60.0;
const NEWCOMER_RATING_FACTOR: f64 = 8.0;
const REFERRAL_VOLUME_CAP: f64 = 20.0;

const AVAILABILITY_BASE: f64 = 50.0;

/// Computes the five component scores for a candidate-employee pair.
#[derive(Clone, Copy)]
pub struct FeatureExtractor<'a> {
    similarity: Option<&'a dyn SkillSimilarity>,
    now: DateTime<Utc>,
}

impl<'a> FeatureExtractor<'a> {
    /// Create an extractor evaluating activity relative to `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            similarity: None,
            now,
        }
    }

    /// Use a semantic similarity collaborator for the skills component.
    pub fn with_similarity(mut self, similarity: &'a dyn SkillSimilarity) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Extract all components.
    pub fn extract(&self, candidate: &CandidateProfile, employee: &EmployeeProfile) -> ComponentScores {
        ComponentScores {
            skills_expertise: self.skills_expertise(candidate, employee),
            career_experience: career_experience(candidate, employee),
            performance_metrics: performance_metrics(employee),
            availability_engagement: availability_engagement(employee, self.now),
            bias_neutrality: BIAS_NEUTRALITY_SCORE,
        }
    }

    /// Semantic similarity plus an exact-overlap bonus, capped at 100.
    pub fn skills_expertise(&self, candidate: &CandidateProfile, employee: &EmployeeProfile) -> f64 {
        let cand = skill_set(&candidate.skills);
        let emp = skill_set(&employee.skills);
        if cand.is_empty() || emp.is_empty() {
            return UNKNOWN_SKILLS_SCORE;
        }

        let base = self.semantic_base(&cand, &emp, &employee.id);
        let bonus = skill_overlap(&cand, &emp) as f64 / cand.len() as f64 * OVERLAP_BONUS;
        (base + bonus).min(100.0)
    }

    fn semantic_base(&self, cand: &[String], emp: &[String], employee_id: &str) -> f64 {
        let Some(similarity) = self.similarity else {
            return jaccard(cand, emp) * 100.0;
        };

        let mapped = similarity.similarity(cand, emp).and_then(|score| {
            similarity
                .range()
                .to_percent(score)
                .ok_or(SimilarityError::OutOfRange(score))
        });

        match mapped {
            Ok(percent) => percent,
            Err(SimilarityError::Missing) => {
                debug!(collaborator = similarity.name(), employee = employee_id, "No similarity for pair, using overlap ratio");
                jaccard(cand, emp) * 100.0
            }
            Err(e) => {
                warn!(collaborator = similarity.name(), employee = employee_id, error = %e, "Skill similarity failed, using overlap ratio");
                jaccard(cand, emp) * 100.0
            }
        }
    }
}

/// Title, department, experience gap and company affinity.
pub fn career_experience(candidate: &CandidateProfile, employee: &EmployeeProfile) -> f64 {
    let mut score = CAREER_BASE;

    if implies_seniority(&employee.position) && !implies_seniority(&candidate.position) {
        score += SENIORITY_BONUS;
    }

    let cand_tokens = title_tokens(&candidate.position);
    let shared = title_tokens(&employee.position)
        .intersection(&cand_tokens)
        .count();
    score += SHARED_TOKEN_BONUS * shared as f64;

    if same_text(&candidate.department, &employee.department) {
        score += DEPARTMENT_BONUS;
    }

    if let (Some(cand_years), Some(emp_years)) = (candidate.experience_years, employee.experience_years) {
        let gap = emp_years - cand_years;
        if gap >= MENTORSHIP_GAP_YEARS.0 && gap <= MENTORSHIP_GAP_YEARS.1 {
            score += MENTORSHIP_BONUS;
        }
    }

    let history = &candidate.company_history;
    if history.iter().any(|c| same_text(c, &employee.company)) {
        score += SAME_COMPANY_BONUS;
    } else if is_tech_adjacent(&employee.company) && history.iter().any(|c| is_tech_adjacent(c)) {
        score += TECH_COMPANY_BONUS;
    }

    score.min(100.0)
}

/// Referral track record. Employees without history get an inclusive floor.
pub fn performance_metrics(employee: &EmployeeProfile) -> f64 {
    let rating = employee.clamped_rating();

    match employee.success_rate() {
        None => (NEWCOMER_BASE + rating * NEWCOMER_RATING_FACTOR).min(100.0),
        Some(rate) => {
            let volume = (employee.total_referrals as f64 / REFERRAL_VOLUME_CAP).min(1.0);
            0.4 * rate * 100.0 + 0.3 * volume * 100.0 + 0.3 * (rating / 5.0) * 100.0
        }
    }
}

/// Recency of activity, verification and active status.
pub fn availability_engagement(employee: &EmployeeProfile, now: DateTime<Utc>) -> f64 {
    let mut score = AVAILABILITY_BASE;

    // Unknown recency neither helps nor hurts
    score += match activity_age_days(employee.last_activity.as_deref(), now) {
        Some(days) if days <= 7 => 30.0,
        Some(days) if days <= 14 => 20.0,
        Some(days) if days <= 30 => 10.0,
        Some(_) => -10.0,
        None => 0.0,
    };

    if employee.is_verified {
        score += 10.0;
    }
    score += if employee.is_active { 10.0 } else { -20.0 };

    score.clamp(0.0, 100.0)
}
