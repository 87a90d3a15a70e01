//! Deterministic ordering of scored matches.

use std::cmp::Ordering;

use referral_model::MatchResult;

/// `overall_score * confidence` in hundredths, exact for one-decimal scores
/// and confidences. The float product can differ by an ulp between pairs
/// that tie.
pub fn rank_key(result: &MatchResult) -> i64 {
    let tenths = |v: f64| (v * 10.0).round() as i64;
    tenths(result.overall_score) * tenths(result.confidence)
}

/// Order two matches: `overall_score * confidence` descending, then raw
/// score, then confidence. Equal keys compare `Equal` so a stable sort
/// keeps input order.
pub fn compare_matches(a: &MatchResult, b: &MatchResult) -> Ordering {
    rank_key(b)
        .cmp(&rank_key(a))
        .then_with(|| b.overall_score.total_cmp(&a.overall_score))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}

/// Sort matches best-first and keep at most `top_n`.
pub fn rank_matches(mut matches: Vec<MatchResult>, top_n: Option<usize>) -> Vec<MatchResult> {
    // `sort_by` is stable
    matches.sort_by(compare_matches);
    if let Some(n) = top_n {
        matches.truncate(n);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use referral_model::ComponentScores;

    fn result(id: &str, score: f64, confidence: f64) -> MatchResult {
        MatchResult {
            employee_id: id.to_string(),
            overall_score: score,
            confidence,
            breakdown: ComponentScores::default(),
            explanation: None,
        }
    }

    fn ids(matches: &[MatchResult]) -> Vec<&str> {
        matches.iter().map(|m| m.employee_id.as_str()).collect()
    }

    #[test]
    fn test_orders_by_weighted_score() {
        let ranked = rank_matches(
            vec![result("a", 80.0, 0.5), result("b", 60.0, 1.0), result("c", 90.0, 0.9)],
            None,
        );
        assert_eq!(ids(&ranked), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_tie_breaks() {
        // All have rank score 40
        let ranked = rank_matches(
            vec![result("low", 50.0, 0.8), result("high", 80.0, 0.5), result("mid", 40.0, 1.0)],
            None,
        );
        assert_eq!(ids(&ranked), vec!["high", "low", "mid"]);
    }

    #[test]
    fn test_tie_survives_float_rounding() {
        // 30.1 * 0.9 and 38.7 * 0.7 are both 27.09 but differ as f64 products
        let ranked = rank_matches(vec![result("low", 30.1, 0.9), result("high", 38.7, 0.7)], None);
        assert_eq!(ids(&ranked), vec!["high", "low"]);
    }

    #[test]
    fn test_stable_for_full_ties() {
        let ranked = rank_matches(
            vec![result("first", 70.0, 0.7), result("second", 70.0, 0.7), result("third", 70.0, 0.7)],
            None,
        );
        assert_eq!(ids(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_truncates() {
        let ranked = rank_matches(
            vec![result("a", 10.0, 1.0), result("b", 20.0, 1.0), result("c", 30.0, 1.0)],
            Some(2),
        );
        assert_eq!(ids(&ranked), vec!["c", "b"]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: equal keys keep their relative input order.
            #[test]
            fn ranking_is_stable(keys in proptest::collection::vec((0u8..4, 0u8..3), 1..30)) {
                let input: Vec<MatchResult> = keys
                    .iter()
                    .enumerate()
                    .map(|(i, (s, c))| {
                        result(&i.to_string(), f64::from(*s) * 10.0, 0.4 + f64::from(*c) * 0.2)
                    })
                    .collect();

                let ranked = rank_matches(input, None);
                for pair in ranked.windows(2) {
                    let ordering = compare_matches(&pair[0], &pair[1]);
                    prop_assert_ne!(ordering, Ordering::Greater);
                    if ordering == Ordering::Equal {
                        let a: usize = pair[0].employee_id.parse().unwrap();
                        let b: usize = pair[1].employee_id.parse().unwrap();
                        prop_assert!(a < b);
                    }
                }
            }
        }
    }
}
