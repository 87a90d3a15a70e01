//! Correlation-driven weight adaptation.
//!
//! Each component's historical scores are correlated with observed outcomes.
//! Components that predict good outcomes gain weight, components that predict
//! poor outcomes lose weight, and everything is kept within
//! `[weight_floor, weight_ceiling]` and renormalized to sum to 1.

use chrono::{DateTime, Utc};
use referral_model::{Component, FeedbackRecord, ValidationError, WeightVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::pearson;

/// Below this many samples a component keeps neutral performance.
pub const MIN_COMPONENT_SAMPLES: usize = 3;

/// Performance that produces no adjustment.
pub const NEUTRAL_PERFORMANCE: f64 = 0.5;

/// Invalid adaptation or buffer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// How aggressively weights move per adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStrength {
    Conservative,
    #[default]
    Auto,
    Aggressive,
}

impl AdaptationStrength {
    pub fn factor(&self) -> f64 {
        match self {
            Self::Conservative => 0.3,
            Self::Auto => 0.6,
            Self::Aggressive => 1.0,
        }
    }
}

impl std::str::FromStr for AdaptationStrength {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "auto" => Ok(Self::Auto),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(invalid("strength", format!("unknown mode '{other}'"))),
        }
    }
}

/// Every tunable of the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptationConfig {
    /// Buffered records required before adapting
    pub min_samples: usize,
    /// Most recent records considered
    pub window_size: usize,
    pub strength: AdaptationStrength,
    pub weight_floor: f64,
    pub weight_ceiling: f64,
    /// Performance above this is rewarded
    pub reward_threshold: f64,
    /// Performance below this is penalized
    pub penalize_threshold: f64,
    /// Base step, scaled by strength
    pub step: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            min_samples: 5,
            window_size: 100,
            strength: AdaptationStrength::Auto,
            weight_floor: 0.05,
            weight_ceiling: 0.6,
            reward_threshold: 0.7,
            penalize_threshold: 0.4,
            step: 0.1,
        }
    }
}

impl AdaptationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = Component::ALL.len() as f64;

        if self.window_size == 0 {
            return Err(invalid("window_size", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.weight_floor) {
            return Err(invalid("weight_floor", "must be in [0, 1)"));
        }
        if !(self.weight_ceiling > self.weight_floor && self.weight_ceiling <= 1.0) {
            return Err(invalid("weight_ceiling", "must be in (weight_floor, 1]"));
        }
        if self.weight_floor * n > 1.0 || self.weight_ceiling * n < 1.0 {
            return Err(invalid(
                "weight_floor/weight_ceiling",
                "no weight vector summing to 1 fits these bounds",
            ));
        }
        if !(0.0..=1.0).contains(&self.penalize_threshold)
            || !(0.0..=1.0).contains(&self.reward_threshold)
            || self.penalize_threshold > self.reward_threshold
        {
            return Err(invalid(
                "thresholds",
                "need 0 <= penalize_threshold <= reward_threshold <= 1",
            ));
        }
        if !(self.step.is_finite() && self.step >= 0.0) {
            return Err(invalid("step", "must be finite and non-negative"));
        }
        Ok(())
    }
}

/// How well one component predicted outcomes over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPerformance {
    pub component: Component,
    pub samples: usize,
    /// `None` when there were too few samples or no variance
    pub correlation: Option<f64>,
    /// `(correlation + 1) / 2`, or neutral
    pub performance: f64,
    /// Raw adjustment before clamping and normalization
    pub delta: f64,
}

/// Per-component adjustments derived from a feedback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentPlan {
    pub sample_count: usize,
    pub strength: AdaptationStrength,
    pub performances: Vec<ComponentPerformance>,
}

impl AdjustmentPlan {
    /// Deltas in `Component::ALL` order.
    pub fn deltas(&self) -> [f64; 5] {
        let mut deltas = [0.0; 5];
        for p in &self.performances {
            deltas[p.component.index()] = p.delta;
        }
        deltas
    }

    pub fn is_noop(&self) -> bool {
        self.performances.iter().all(|p| p.delta == 0.0)
    }
}

/// Audit record of one published adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationEvent {
    pub timestamp: DateTime<Utc>,
    /// Snapshot version produced by this adaptation
    pub version: u64,
    pub previous: WeightVector,
    pub updated: WeightVector,
    pub sample_count: usize,
    pub strength: AdaptationStrength,
    pub performances: Vec<ComponentPerformance>,
}

/// Result of an adaptation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdaptationOutcome {
    /// Not enough feedback yet; weights unchanged
    InsufficientData { available: usize, required: usize },
    /// A new snapshot was published
    Adapted(AdaptationEvent),
    /// The derived weights failed validation; weights unchanged
    Rejected { reason: String },
}

/// Computes new weight vectors from feedback.
#[derive(Debug, Clone, Default)]
pub struct WeightAdapter {
    config: AdaptationConfig,
}

impl WeightAdapter {
    pub fn new(config: AdaptationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Analyze the most recent `window_size` records.
    ///
    /// Returns `None` when fewer than `min_samples` records are available.
    pub fn plan(&self, records: &[FeedbackRecord]) -> Option<AdjustmentPlan> {
        if records.len() < self.config.min_samples || records.is_empty() {
            return None;
        }

        let start = records.len().saturating_sub(self.config.window_size);
        let window = &records[start..];
        let outcomes: Vec<f64> = window.iter().map(|r| r.outcome_score).collect();

        let performances = Component::ALL
            .into_iter()
            .map(|component| {
                let scores: Vec<f64> = window
                    .iter()
                    .map(|r| r.component_scores.get(component))
                    .collect();
                self.component_performance(component, &scores, &outcomes)
            })
            .collect();

        Some(AdjustmentPlan {
            sample_count: window.len(),
            strength: self.config.strength,
            performances,
        })
    }

    fn component_performance(
        &self,
        component: Component,
        scores: &[f64],
        outcomes: &[f64],
    ) -> ComponentPerformance {
        let samples = scores.len();
        let correlation = if samples < MIN_COMPONENT_SAMPLES {
            None
        } else {
            pearson(scores, outcomes)
        };
        let performance = correlation.map_or(NEUTRAL_PERFORMANCE, |r| (r + 1.0) / 2.0);

        let step = self.config.strength.factor() * self.config.step;
        let delta = if performance > self.config.reward_threshold {
            step
        } else if performance < self.config.penalize_threshold {
            -step
        } else {
            0.0
        };

        ComponentPerformance {
            component,
            samples,
            correlation,
            performance,
            delta,
        }
    }

    /// Apply deltas to `current`: clamp to the bounds, then renormalize.
    pub fn apply(&self, current: &WeightVector, deltas: [f64; 5]) -> Result<WeightVector, ValidationError> {
        let (floor, ceiling) = (self.config.weight_floor, self.config.weight_ceiling);
        let mut raw = current.as_array();
        for (w, d) in raw.iter_mut().zip(deltas) {
            *w = (*w + d).clamp(floor, ceiling);
        }
        WeightVector::new(normalize_bounded(raw, floor, ceiling))
    }
}

/// Scale weights to sum to 1 while keeping each within `[floor, ceiling]`.
///
/// Weights that would cross a bound are pinned to it and the remaining mass
/// is spread proportionally over the others, repeating until nothing moves.
/// Requires `floor * n <= 1 <= ceiling * n`.
pub fn normalize_bounded<const N: usize>(raw: [f64; N], floor: f64, ceiling: f64) -> [f64; N] {
    let mut weights = raw;
    let mut pinned = [false; N];

    for _ in 0..=N {
        let pinned_sum: f64 = (0..N).filter(|&i| pinned[i]).map(|i| weights[i]).sum();
        let free: Vec<usize> = (0..N).filter(|&i| !pinned[i]).collect();
        if free.is_empty() {
            break;
        }

        let target = 1.0 - pinned_sum;
        let free_sum: f64 = free.iter().map(|&i| weights[i]).sum();
        for &i in &free {
            weights[i] = if free_sum > 0.0 {
                weights[i] * target / free_sum
            } else {
                target / free.len() as f64
            };
        }

        let mut moved = false;
        for &i in &free {
            if weights[i] < floor {
                weights[i] = floor;
                pinned[i] = true;
                moved = true;
            } else if weights[i] > ceiling {
                weights[i] = ceiling;
                pinned[i] = true;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use referral_model::{ComponentScores, FeedbackKind, WEIGHT_SUM_TOLERANCE};

    fn record(scores: [f64; 5], outcome: f64) -> FeedbackRecord {
        FeedbackRecord::new(
            "m",
            ComponentScores::from_array(scores),
            outcome,
            FeedbackKind::EngagementScore,
            Utc::now(),
        )
    }

    /// Skills track outcomes, everything else is constant.
    fn skills_predictive(n: usize) -> Vec<FeedbackRecord> {
        (0..n)
            .map(|i| {
                let x = (i % 10) as f64 / 10.0;
                record([x * 100.0, 50.0, 60.0, 70.0, 100.0], x)
            })
            .collect()
    }

    fn assert_valid(weights: &WeightVector, config: &AdaptationConfig) {
        assert!((weights.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
        for (_, w) in weights.iter() {
            assert!(w >= config.weight_floor - 1e-12 && w <= config.weight_ceiling + 1e-12);
        }
    }

    #[test]
    fn test_insufficient_data() {
        let adapter = WeightAdapter::default();
        assert!(adapter.plan(&skills_predictive(4)).is_none());
        assert!(adapter.plan(&[]).is_none());
        assert!(adapter.plan(&skills_predictive(5)).is_some());
    }

    #[test]
    fn test_too_few_samples_stay_neutral() {
        let adapter = WeightAdapter::new(AdaptationConfig {
            min_samples: 1,
            ..Default::default()
        })
        .unwrap();
        // Perfectly correlated, but only two samples
        let records = vec![
            record([10.0, 10.0, 10.0, 10.0, 10.0], 0.1),
            record([90.0, 90.0, 90.0, 90.0, 90.0], 0.9),
        ];

        let plan = adapter.plan(&records).unwrap();
        assert_eq!(plan.sample_count, 2);
        for p in &plan.performances {
            assert_eq!(p.samples, 2);
            assert_eq!(p.correlation, None);
            assert_eq!(p.performance, NEUTRAL_PERFORMANCE);
            assert_eq!(p.delta, 0.0);
        }
        assert!(plan.is_noop());
    }

    #[test]
    fn test_positive_correlation_rewarded() {
        let adapter = WeightAdapter::default();
        let plan = adapter.plan(&skills_predictive(20)).unwrap();

        let skills = &plan.performances[Component::SkillsExpertise.index()];
        assert!((skills.correlation.unwrap() - 1.0).abs() < 1e-9);
        assert!((skills.delta - 0.06).abs() < 1e-12);

        // Constant components have no variance: neutral
        let career = &plan.performances[Component::CareerExperience.index()];
        assert_eq!(career.correlation, None);
        assert_eq!(career.performance, NEUTRAL_PERFORMANCE);
        assert_eq!(career.delta, 0.0);

        let current = WeightVector::default();
        let updated = adapter.apply(&current, plan.deltas()).unwrap();
        assert!(updated.get(Component::SkillsExpertise) > current.get(Component::SkillsExpertise));
        assert_valid(&updated, adapter.config());
    }

    #[test]
    fn test_negative_correlation_penalized() {
        let adapter = WeightAdapter::new(AdaptationConfig {
            strength: AdaptationStrength::Aggressive,
            ..Default::default()
        })
        .unwrap();
        let records: Vec<_> = (0..10)
            .map(|i| {
                let x = i as f64 / 10.0;
                record([50.0, (1.0 - x) * 100.0, 60.0, 70.0, 100.0], x)
            })
            .collect();

        let plan = adapter.plan(&records).unwrap();
        let career = &plan.performances[Component::CareerExperience.index()];
        assert!((career.delta + 0.1).abs() < 1e-12);

        let current = WeightVector::default();
        let updated = adapter.apply(&current, plan.deltas()).unwrap();
        assert!(updated.get(Component::CareerExperience) < current.get(Component::CareerExperience));
        assert_valid(&updated, adapter.config());
    }

    #[test]
    fn test_window_limits_history() {
        let adapter = WeightAdapter::new(AdaptationConfig {
            window_size: 10,
            ..Default::default()
        })
        .unwrap();
        // Old records anti-correlate, the newest 10 correlate
        let mut records: Vec<_> = (0..50)
            .map(|i| {
                let x = (i % 10) as f64 / 10.0;
                record([(1.0 - x) * 100.0, 50.0, 60.0, 70.0, 100.0], x)
            })
            .collect();
        records.extend(skills_predictive(10));

        let plan = adapter.plan(&records).unwrap();
        assert_eq!(plan.sample_count, 10);
        assert!(plan.performances[0].delta > 0.0);
    }

    #[test]
    fn test_ceiling_holds_under_repeated_reward() {
        let adapter = WeightAdapter::new(AdaptationConfig {
            strength: AdaptationStrength::Aggressive,
            ..Default::default()
        })
        .unwrap();
        let plan = adapter.plan(&skills_predictive(30)).unwrap();

        let mut weights = WeightVector::default();
        for _ in 0..20 {
            weights = adapter.apply(&weights, plan.deltas()).unwrap();
            assert_valid(&weights, adapter.config());
        }
        let skills = weights.get(Component::SkillsExpertise);
        assert!(skills > 0.55 && skills <= 0.6 + 1e-12);
    }

    #[test]
    fn test_normalize_bounded() {
        let w = normalize_bounded([0.41, 0.25, 0.20, 0.15, 0.05], 0.05, 0.6);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((w[4] - 0.05).abs() < 1e-12);
        assert!(w[0] > 0.35);

        let w = normalize_bounded([0.6, 0.6, 0.6, 0.05, 0.05], 0.05, 0.6);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|&x| (0.05..=0.6).contains(&x)));
    }

    #[test]
    fn test_config_validation() {
        assert!(AdaptationConfig::default().validate().is_ok());

        let bad_floor = AdaptationConfig {
            weight_floor: 0.3,
            ..Default::default()
        };
        assert!(bad_floor.validate().is_err());

        let inverted = AdaptationConfig {
            penalize_threshold: 0.8,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_window = AdaptationConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(WeightAdapter::new(zero_window).is_err());
    }

    #[test]
    fn test_strength_from_str() {
        assert_eq!("Aggressive".parse::<AdaptationStrength>(), Ok(AdaptationStrength::Aggressive));
        assert!("wild".parse::<AdaptationStrength>().is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: adapted weights always sum to 1 and stay within bounds.
            #[test]
            fn adapted_weights_valid(
                rows in proptest::collection::vec(
                    (proptest::array::uniform5(0.0f64..=100.0), 0.0f64..=1.0),
                    5..60,
                ),
                rounds in 1usize..6,
                strength in prop_oneof![
                    Just(AdaptationStrength::Conservative),
                    Just(AdaptationStrength::Auto),
                    Just(AdaptationStrength::Aggressive),
                ],
            ) {
                let config = AdaptationConfig { strength, ..Default::default() };
                let adapter = WeightAdapter::new(config.clone()).unwrap();
                let records: Vec<_> = rows.into_iter().map(|(s, o)| record(s, o)).collect();
                let plan = adapter.plan(&records).unwrap();

                let mut weights = WeightVector::default();
                for _ in 0..rounds {
                    weights = adapter.apply(&weights, plan.deltas()).unwrap();
                    prop_assert!((weights.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
                    for (_, w) in weights.iter() {
                        prop_assert!(w >= config.weight_floor - 1e-9);
                        prop_assert!(w <= config.weight_ceiling + 1e-9);
                    }
                }
            }

            /// Property: a rewarded component never loses weight when nothing else moves.
            #[test]
            fn sole_reward_never_decreases(component_idx in 0usize..5, strength in 0usize..3) {
                let strength = [
                    AdaptationStrength::Conservative,
                    AdaptationStrength::Auto,
                    AdaptationStrength::Aggressive,
                ][strength];
                let adapter = WeightAdapter::new(AdaptationConfig { strength, ..Default::default() }).unwrap();
                let mut deltas = [0.0; 5];
                deltas[component_idx] = strength.factor() * adapter.config().step;

                let current = WeightVector::default();
                let updated = adapter.apply(&current, deltas).unwrap();
                let c = Component::ALL[component_idx];
                prop_assert!(updated.get(c) >= current.get(c) - 1e-12);
            }
        }
    }
}
