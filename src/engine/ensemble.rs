//! Vote combination for the classifier ensemble.
//!
//! Each available classifier contributes its predicted class, the
//! probability of that class, and its fixed ensemble weight. Majority vote
//! picks the class; the weighted probability average over the majority
//! voters becomes the base confidence; a consensus boost rewards or
//! penalizes agreement.

use serde::Serialize;

use crate::models::ClassifierKind;

/// One classifier's contribution.
#[derive(Debug, Clone, Serialize)]
pub struct VoteDetail {
    pub kind: ClassifierKind,
    pub class: usize,
    /// Probability of the voted class.
    pub probability: f64,
    pub weight: f64,
}

/// Vote combination result, before calibration.
#[derive(Debug, Clone)]
pub struct CombinedVote {
    pub class: usize,
    /// Fraction of voters backing the winning class.
    pub agreement: f64,
    /// Weighted probability average × 100, before the boost.
    pub base_confidence: f64,
    /// Base plus consensus boost, clamped to [30, 95].
    pub raw_confidence: f64,
}

// Float agreement ratios like 2/3 must hit their tier exactly.
const TIER_EPS: f64 = 1e-9;

/// Step function of agreement. Exact table, no interpolation.
pub fn consensus_boost(agreement: f64) -> f64 {
    if agreement >= 1.0 - TIER_EPS {
        15.0
    } else if agreement >= 2.0 / 3.0 - TIER_EPS {
        8.0
    } else if agreement >= 0.5 - TIER_EPS {
        0.0
    } else {
        -10.0
    }
}

/// Combine the available votes. `None` when no classifier voted.
pub fn combine(votes: &[VoteDetail]) -> Option<CombinedVote> {
    if votes.is_empty() {
        return None;
    }

    // Majority vote over {0, 1}. A split ensemble breaks toward the class
    // carrying more ensemble weight.
    let (mut count, mut weight) = ([0usize; 2], [0.0f64; 2]);
    for v in votes {
        let c = v.class.min(1);
        count[c] += 1;
        weight[c] += v.weight;
    }
    let class = if count[1] > count[0] {
        1
    } else if count[0] > count[1] {
        0
    } else {
        usize::from(weight[1] >= weight[0])
    };

    let agreement = count[class] as f64 / votes.len() as f64;

    // Weighted probability over the majority voters only.
    let (mut prob_sum, mut weight_sum) = (0.0, 0.0);
    for v in votes.iter().filter(|v| v.class.min(1) == class) {
        prob_sum += v.probability * v.weight;
        weight_sum += v.weight;
    }
    let base_confidence = prob_sum / weight_sum * 100.0;
    let raw_confidence = (base_confidence + consensus_boost(agreement)).clamp(30.0, 95.0);

    Some(CombinedVote {
        class,
        agreement,
        base_confidence,
        raw_confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vote(kind: ClassifierKind, class: usize, probability: f64, weight: f64) -> VoteDetail {
        VoteDetail {
            kind,
            class,
            probability,
            weight,
        }
    }

    #[test]
    fn boost_table_is_exact() {
        assert_relative_eq!(consensus_boost(1.0), 15.0);
        assert_relative_eq!(consensus_boost(2.0 / 3.0), 8.0);
        assert_relative_eq!(consensus_boost(0.5), 0.0);
        assert_relative_eq!(consensus_boost(1.0 / 3.0), -10.0);
    }

    #[test]
    fn worked_two_against_one_split() {
        // [1,1,0] with weights [1.0,1.2,0.8] and class probabilities
        // [0.7,0.8,0.6]: agreement 2/3 → +8; weighted probability over the
        // majority voters = (0.7×1.0 + 0.8×1.2) / 2.2 ≈ 0.7545.
        let votes = [
            vote(ClassifierKind::RandomForest, 1, 0.7, 1.0),
            vote(ClassifierKind::GradientBoost, 1, 0.8, 1.2),
            vote(ClassifierKind::Logistic, 0, 0.6, 0.8),
        ];
        let out = combine(&votes).unwrap();
        assert_eq!(out.class, 1);
        assert_relative_eq!(out.agreement, 2.0 / 3.0, epsilon = 1e-12);
        let expected_base = (0.7 + 0.8 * 1.2) / 2.2 * 100.0;
        assert_relative_eq!(out.base_confidence, expected_base, epsilon = 1e-9);
        assert_relative_eq!(out.raw_confidence, expected_base + 8.0, epsilon = 1e-9);
    }

    #[test]
    fn unanimous_vote_gets_the_full_boost() {
        let votes = [
            vote(ClassifierKind::RandomForest, 1, 0.6, 1.0),
            vote(ClassifierKind::GradientBoost, 1, 0.6, 1.2),
            vote(ClassifierKind::Logistic, 1, 0.6, 0.8),
        ];
        let out = combine(&votes).unwrap();
        assert_relative_eq!(out.agreement, 1.0);
        assert_relative_eq!(out.raw_confidence, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn confidence_clamps_at_both_ends() {
        let high = [
            vote(ClassifierKind::RandomForest, 1, 0.95, 1.0),
            vote(ClassifierKind::GradientBoost, 1, 0.95, 1.2),
            vote(ClassifierKind::Logistic, 1, 0.95, 0.8),
        ];
        assert_relative_eq!(combine(&high).unwrap().raw_confidence, 95.0);

        // A lone low-probability voter: 55 + 15, fine; force the floor with
        // a split pair instead.
        let low = [
            vote(ClassifierKind::RandomForest, 1, 0.30, 1.0),
            vote(ClassifierKind::Logistic, 0, 0.95, 0.8),
        ];
        assert_relative_eq!(combine(&low).unwrap().raw_confidence, 30.0);
    }

    #[test]
    fn split_pair_breaks_toward_heavier_weight() {
        let votes = [
            vote(ClassifierKind::GradientBoost, 0, 0.8, 1.2),
            vote(ClassifierKind::Logistic, 1, 0.9, 0.8),
        ];
        let out = combine(&votes).unwrap();
        assert_eq!(out.class, 0);
        assert_relative_eq!(out.agreement, 0.5);
        // agreement 0.5 → no boost
        assert_relative_eq!(out.raw_confidence, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn single_voter_is_unanimous() {
        let votes = [vote(ClassifierKind::GradientBoost, 0, 0.7, 1.2)];
        let out = combine(&votes).unwrap();
        assert_eq!(out.class, 0);
        assert_relative_eq!(out.agreement, 1.0);
    }

    #[test]
    fn no_votes_is_none() {
        assert!(combine(&[]).is_none());
    }
}
