//! Feature extraction for candidate-employee matching.
//!
//! Provides pure functions for computing the per-pair features used in scoring:
//! - Skill and title normalization
//! - Semantic similarity collaborators with an overlap fallback
//! - Lenient activity timestamp parsing
//! - The five 0-100 component scores

pub mod activity;
pub mod extract;
pub mod similarity;
pub mod text;

pub use activity::{activity_age_days, days_since, parse_timestamp};
pub use extract::{
    availability_engagement, career_experience, performance_metrics, FeatureExtractor,
    BIAS_NEUTRALITY_SCORE, OVERLAP_BONUS, UNKNOWN_SKILLS_SCORE,
};
pub use similarity::{
    set_key, OverlapSimilarity, PrecomputedSimilarity, SimilarityError, SimilarityRange,
    SkillSimilarity,
};
pub use text::{contains_ignore_case, normalize_skill, normalize_text, skill_set};
