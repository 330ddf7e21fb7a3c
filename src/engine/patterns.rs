//! Loss-pattern learning.
//!
//! Aggregates keyed by (category, compound condition key) accumulate only on
//! incorrect verifications. Once a pattern has enough observations, its win
//! rate yields a suggested confidence adjustment. That value is diagnostic
//! output only; nothing in the serving path reads it back.

use crate::db::models::ErrorPattern;

/// Observations before a pattern earns a suggested adjustment.
pub const MIN_PATTERN_SAMPLES: i64 = 5;

/// Step function of the pattern's win rate.
pub fn suggested_adjustment(total_predictions: i64, wins: i64) -> f64 {
    if total_predictions < MIN_PATTERN_SAMPLES {
        return 0.0;
    }
    let win_rate = wins as f64 / total_predictions as f64 * 100.0;
    if win_rate < 30.0 {
        -15.0
    } else if win_rate < 40.0 {
        -10.0
    } else if win_rate < 50.0 {
        -5.0
    } else {
        0.0
    }
}

/// Fold one incorrect verification into a pattern aggregate. Wins stay
/// untouched: only losses feed this table, so the win counter can move only
/// if the aggregation is later extended to correct outcomes.
pub fn record_failure(pat: &mut ErrorPattern, failed_confidence: f64) {
    let old_count = pat.total_predictions as f64;
    pat.total_predictions += 1;
    pat.losses += 1;
    pat.avg_confidence_when_failed =
        (pat.avg_confidence_when_failed * old_count + failed_confidence)
            / pat.total_predictions as f64;
    pat.suggested_adjustment = suggested_adjustment(pat.total_predictions, pat.wins);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BetCategory;
    use approx::assert_relative_eq;

    fn pattern() -> ErrorPattern {
        ErrorPattern {
            category: BetCategory::AwayWin,
            condition_key: "derby_match&sharp_money".to_string(),
            total_predictions: 0,
            wins: 0,
            losses: 0,
            avg_confidence_when_failed: 0.0,
            suggested_adjustment: 0.0,
        }
    }

    #[test]
    fn adjustment_steps_on_win_rate() {
        assert_relative_eq!(suggested_adjustment(10, 2), -15.0); // 20%
        assert_relative_eq!(suggested_adjustment(10, 3), -10.0); // 30%
        assert_relative_eq!(suggested_adjustment(10, 4), -5.0); // 40%
        assert_relative_eq!(suggested_adjustment(10, 5), 0.0); // 50%
    }

    #[test]
    fn small_patterns_suggest_nothing() {
        assert_relative_eq!(suggested_adjustment(4, 0), 0.0);
        assert_relative_eq!(suggested_adjustment(5, 0), -15.0);
    }

    #[test]
    fn failures_accumulate_with_running_confidence_mean() {
        let mut pat = pattern();
        record_failure(&mut pat, 80.0);
        record_failure(&mut pat, 60.0);

        assert_eq!(pat.total_predictions, 2);
        assert_eq!(pat.losses, 2);
        assert_eq!(pat.wins, 0);
        assert_relative_eq!(pat.avg_confidence_when_failed, 70.0);
        // below the sample floor, still neutral
        assert_relative_eq!(pat.suggested_adjustment, 0.0);
    }

    #[test]
    fn all_loss_pattern_hits_the_strongest_penalty() {
        let mut pat = pattern();
        for _ in 0..MIN_PATTERN_SAMPLES {
            record_failure(&mut pat, 75.0);
        }
        assert_relative_eq!(pat.suggested_adjustment, -15.0);
    }
}
