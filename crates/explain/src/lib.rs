//! Explanation generation for referral matches.
//!
//! Converts a scored match into a human-readable rationale. Explanations are
//! layered on after ranking and never change a score or an ordering; a
//! failing or absent explainer simply leaves `explanation` empty.

use std::collections::HashMap;

use referral_features::skill_set;
use referral_model::{
    CandidateProfile, Component, EmployeeProfile, EvidenceItem, Explanation, MatchResult,
};
use thiserror::Error;
use tracing::warn;

/// Component score at or above which a factor counts as a strength.
pub const STRENGTH_THRESHOLD: f64 = 75.0;

/// Component score below which a factor counts as a gap.
pub const GAP_THRESHOLD: f64 = 40.0;

/// Errors from an explanation collaborator.
#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Explainer unavailable: {0}")]
    Unavailable(String),

    #[error("Explanation generation failed: {0}")]
    Generation(String),
}

/// Trait for explanation collaborators (template-based or generated narratives).
pub trait Explainer: Send + Sync {
    fn explain(
        &self,
        result: &MatchResult,
        candidate: &CandidateProfile,
        employee: &EmployeeProfile,
    ) -> Result<Explanation, ExplainError>;

    /// Explainer name for logging.
    fn name(&self) -> &'static str;
}

/// Template explainer built from the component breakdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExplainer;

impl Explainer for RuleExplainer {
    fn explain(
        &self,
        result: &MatchResult,
        candidate: &CandidateProfile,
        employee: &EmployeeProfile,
    ) -> Result<Explanation, ExplainError> {
        let strengths = factors(result, |s| s >= STRENGTH_THRESHOLD);
        let gaps = factors(result, |s| s < GAP_THRESHOLD);

        let mut detail = format!(
            "Scored {:.1}/100 with {:.0}% data confidence.",
            result.overall_score,
            result.confidence * 100.0
        );
        if !strengths.is_empty() {
            detail.push_str(&format!(" Strongest factors: {}.", labels(&strengths)));
        }
        if !gaps.is_empty() {
            detail.push_str(&format!(" Weaker factors: {}.", labels(&gaps)));
        }

        let evidence = Component::ALL
            .into_iter()
            .filter_map(|c| component_evidence(c, result, candidate, employee))
            .collect();

        Ok(Explanation {
            summary: summarize_match(result),
            detail,
            evidence,
        })
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

fn factors(result: &MatchResult, keep: impl Fn(f64) -> bool) -> Vec<Component> {
    result
        .breakdown
        .iter()
        .filter(|(c, _)| *c != Component::BiasNeutrality)
        .filter(|(_, s)| keep(*s))
        .map(|(c, _)| c)
        .collect()
}

fn labels(components: &[Component]) -> String {
    components
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Evidence for a single component, if there is anything to show.
pub fn component_evidence(
    component: Component,
    result: &MatchResult,
    candidate: &CandidateProfile,
    employee: &EmployeeProfile,
) -> Option<EvidenceItem> {
    let score = result.breakdown.get(component);

    match component {
        Component::SkillsExpertise => {
            let employee_skills = skill_set(&employee.skills);
            let shared: Vec<_> = skill_set(&candidate.skills)
                .into_iter()
                .filter(|s| employee_skills.contains(s))
                .collect();
            Some(EvidenceItem {
                kind: "shared_skills".to_string(),
                value: if shared.is_empty() {
                    "none".to_string()
                } else {
                    shared.join(", ")
                },
                context: Some(format!("Skills score {:.1}", score)),
            })
        }

        Component::CareerExperience => {
            let role = employee.position.trim();
            if role.is_empty() && employee.company.trim().is_empty() {
                return None;
            }
            Some(EvidenceItem {
                kind: "career".to_string(),
                value: match (role.is_empty(), employee.company.trim().is_empty()) {
                    (false, false) => format!("{} at {}", role, employee.company.trim()),
                    (false, true) => role.to_string(),
                    _ => employee.company.trim().to_string(),
                },
                context: Some(format!("Career score {:.1}", score)),
            })
        }

        Component::PerformanceMetrics => Some(EvidenceItem {
            kind: "referral_history".to_string(),
            value: if employee.has_referral_history() {
                format!(
                    "{}/{} successful referrals",
                    employee.successful_referrals.min(employee.total_referrals),
                    employee.total_referrals
                )
            } else {
                "new referrer".to_string()
            },
            context: Some(format!("Rating {:.1}/5", employee.clamped_rating())),
        }),

        Component::AvailabilityEngagement => Some(EvidenceItem {
            kind: "availability".to_string(),
            value: format!("{:.1}", score),
            context: employee
                .last_activity
                .as_ref()
                .map(|ts| format!("Last active {}", ts)),
        }),

        Component::BiasNeutrality => None,
    }
}

/// One-line summary for a match.
pub fn summarize_match(result: &MatchResult) -> String {
    let weighted = result.rank_score();

    let level = if weighted >= 70.0 {
        "STRONG MATCH"
    } else if weighted >= 50.0 {
        "GOOD MATCH"
    } else {
        "WEAK MATCH"
    };

    let strengths = factors(result, |s| s >= STRENGTH_THRESHOLD);
    if strengths.is_empty() {
        format!("{} ({:.1})", level, result.overall_score)
    } else {
        format!("{} ({:.1}): {}", level, result.overall_score, labels(&strengths))
    }
}

/// Attach explanations to ranked matches. Returns how many were explained.
///
/// Failures are logged and leave `explanation` as `None`.
pub fn attach_explanations(
    matches: &mut [MatchResult],
    explainer: &dyn Explainer,
    candidate: &CandidateProfile,
    employees: &[EmployeeProfile],
) -> usize {
    let by_id: HashMap<&str, &EmployeeProfile> =
        employees.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut explained = 0;
    for result in matches.iter_mut() {
        let Some(employee) = by_id.get(result.employee_id.as_str()) else {
            continue;
        };
        match explainer.explain(result, candidate, employee) {
            Ok(explanation) => {
                result.explanation = Some(explanation);
                explained += 1;
            }
            Err(e) => {
                warn!(explainer = explainer.name(), employee = %result.employee_id, error = %e, "Explanation failed");
            }
        }
    }
    explained
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use referral_model::ComponentScores;

    fn result(scores: [f64; 5], overall: f64, confidence: f64) -> MatchResult {
        MatchResult {
            employee_id: "e1".to_string(),
            overall_score: overall,
            confidence,
            breakdown: ComponentScores::from_array(scores),
            explanation: None,
        }
    }

    struct FailingExplainer;

    impl Explainer for FailingExplainer {
        fn explain(
            &self,
            _result: &MatchResult,
            _candidate: &CandidateProfile,
            _employee: &EmployeeProfile,
        ) -> Result<Explanation, ExplainError> {
            Err(ExplainError::Unavailable("timeout".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_summary_levels() {
        let strong = result([90.0, 80.0, 60.0, 50.0, 100.0], 80.0, 1.0);
        assert_eq!(
            summarize_match(&strong),
            "STRONG MATCH (80.0): Skills & Expertise, Career Experience"
        );

        let weak = result([30.0, 50.0, 60.0, 50.0, 100.0], 50.0, 0.5);
        assert_eq!(summarize_match(&weak), "WEAK MATCH (50.0)");
    }

    #[test]
    fn test_rule_explainer_evidence() {
        let candidate = CandidateProfile::new("c1").with_skills(["Rust", "SQL"]);
        let employee = EmployeeProfile::new("e1")
            .with_skills(["rust", "go"])
            .with_position("Staff Engineer")
            .with_company("Acme")
            .with_referrals(5, 4)
            .with_rating(4.5);
        let r = result([60.0, 80.0, 75.0, 30.0, 100.0], 64.3, 0.8);

        let explanation = RuleExplainer.explain(&r, &candidate, &employee).unwrap();
        assert!(explanation.detail.contains("Strongest factors: Career Experience, Referral Performance"));
        assert!(explanation.detail.contains("Weaker factors: Availability"));

        let kinds: Vec<_> = explanation.evidence.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["shared_skills", "career", "referral_history", "availability"]);
        assert_eq!(explanation.evidence[0].value, "rust");
        assert_eq!(explanation.evidence[1].value, "Staff Engineer at Acme");
        assert_eq!(explanation.evidence[2].value, "4/5 successful referrals");
    }

    #[test]
    fn test_attach_never_changes_scores() {
        let candidate = CandidateProfile::new("c1");
        let employees = vec![EmployeeProfile::new("e1")];
        let original = vec![result([50.0; 5], 50.0, 0.3)];

        let mut explained = original.clone();
        assert_eq!(attach_explanations(&mut explained, &RuleExplainer, &candidate, &employees), 1);
        assert!(explained[0].explanation.is_some());
        assert_eq!(explained[0].overall_score, original[0].overall_score);
        assert_eq!(explained[0].confidence, original[0].confidence);
        assert_eq!(explained[0].breakdown, original[0].breakdown);
    }

    #[test]
    fn test_failing_explainer_leaves_none() {
        let candidate = CandidateProfile::new("c1");
        let employees = vec![EmployeeProfile::new("e1")];
        let mut matches = vec![result([50.0; 5], 50.0, 0.3)];

        assert_eq!(attach_explanations(&mut matches, &FailingExplainer, &candidate, &employees), 0);
        assert!(matches[0].explanation.is_none());
    }
}
