use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::MatchFeatures;

/// The wager type being predicted. Every piece of learned state (models,
/// calibration bands, ROI records, error patterns) is partitioned by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetCategory {
    HomeWin,
    AwayWin,
    Draw,
    OverTotal,
    UnderTotal,
    BothTeamsScore,
    DoubleChance,
    Handicap,
}

impl BetCategory {
    pub const ALL: [BetCategory; 8] = [
        BetCategory::HomeWin,
        BetCategory::AwayWin,
        BetCategory::Draw,
        BetCategory::OverTotal,
        BetCategory::UnderTotal,
        BetCategory::BothTeamsScore,
        BetCategory::DoubleChance,
        BetCategory::Handicap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetCategory::HomeWin => "home_win",
            BetCategory::AwayWin => "away_win",
            BetCategory::Draw => "draw",
            BetCategory::OverTotal => "over_total",
            BetCategory::UnderTotal => "under_total",
            BetCategory::BothTeamsScore => "both_teams_score",
            BetCategory::DoubleChance => "double_chance",
            BetCategory::Handicap => "handicap",
        }
    }

    pub fn parse(s: &str) -> Option<BetCategory> {
        BetCategory::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// Match-outcome categories carry a three-way class space
    /// ({0,1,2} = away/draw/home); everything else is a yes/no bet.
    pub fn is_match_outcome(&self) -> bool {
        matches!(
            self,
            BetCategory::HomeWin | BetCategory::AwayWin | BetCategory::Draw
        )
    }

    /// Decimal odds of this category's bet, read from the feature vector.
    pub fn odds_from(&self, f: &MatchFeatures) -> f64 {
        match self {
            BetCategory::HomeWin => f.home_odds,
            BetCategory::AwayWin => f.away_odds,
            BetCategory::Draw => f.draw_odds,
            BetCategory::OverTotal => f.over_odds,
            BetCategory::UnderTotal => f.under_odds,
            BetCategory::BothTeamsScore => f.btts_yes_odds,
            // No dedicated market columns; fall back to the main line.
            BetCategory::DoubleChance | BetCategory::Handicap => f.home_odds,
        }
    }
}

impl std::fmt::Display for BetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `ml_training_data`. Created at prediction time with a null
/// target; the target flips to 0/1 exactly once, at verification.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub id: Option<i64>,
    pub prediction_id: String,
    pub category: BetCategory,
    pub features: MatchFeatures,
    /// None until verified. 1 = the recommended bet landed, 0 = it lost.
    pub target: Option<i64>,
    /// 1 = primary recommendation, 2+ = alternate bets for the same match
    pub rank: i64,
    pub created_at: DateTime<Utc>,
}

/// Prediction-time metadata the verification loop needs back: band
/// confidence, league, odds and stake. Companion row to the training example.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub prediction_id: String,
    pub category: BetCategory,
    pub league_code: String,
    pub predicted_outcome: String,
    pub raw_confidence: f64,
    pub final_confidence: f64,
    pub odds: f64,
    pub stake: f64,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

/// Metadata row in `ensemble_models`, keyed (modelName, betCategory).
/// The serialized artifact itself lives on disk at `model_path`.
#[derive(Debug, Clone)]
pub struct ModelRecord {
    pub id: Option<i64>,
    pub model_name: String,
    pub model_type: String,
    pub category: BetCategory,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub samples_count: i64,
    pub feature_importance_json: Option<String>,
    pub model_path: String,
    pub trained_at: DateTime<Utc>,
}

/// Per-(category, band) calibration counters.
#[derive(Debug, Clone)]
pub struct CalibrationBand {
    pub category: BetCategory,
    /// e.g. "70-80"
    pub band: String,
    pub predicted_count: i64,
    pub actual_wins: i64,
    pub calibration_factor: f64,
}

/// Running ROI aggregate per (category, conditionKey).
#[derive(Debug, Clone)]
pub struct RoiRecord {
    pub category: BetCategory,
    /// "overall" or a single condition tag
    pub condition_key: String,
    pub total_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub total_staked: f64,
    pub total_returned: f64,
    pub roi_percent: f64,
    pub avg_odds: f64,
    pub avg_ev: f64,
}

/// Loss-pattern aggregate per (category, compound condition key).
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pub category: BetCategory,
    /// sorted, "&"-joined condition tags
    pub condition_key: String,
    pub total_predictions: i64,
    pub wins: i64,
    pub losses: i64,
    pub avg_confidence_when_failed: f64,
    /// Diagnostic only; never applied to live confidence.
    pub suggested_adjustment: f64,
}

/// Rolling per-league accuracy diagnostic.
#[derive(Debug, Clone)]
pub struct LeagueLearning {
    pub league_code: String,
    pub category: BetCategory,
    pub total_predictions: i64,
    pub correct_predictions: i64,
    pub accuracy: f64,
    pub avg_confidence: f64,
}

/// Append-only audit row in `learning_log`.
#[derive(Debug, Clone)]
pub struct LearningLogEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub description: String,
    pub data_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in BetCategory::ALL {
            assert_eq!(BetCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(BetCategory::parse("nonsense"), None);
    }

    #[test]
    fn match_outcome_categories_are_three_way() {
        assert!(BetCategory::HomeWin.is_match_outcome());
        assert!(BetCategory::Draw.is_match_outcome());
        assert!(!BetCategory::OverTotal.is_match_outcome());
        assert!(!BetCategory::Handicap.is_match_outcome());
    }

    #[test]
    fn category_odds_pick_the_right_column() {
        let mut f = MatchFeatures::default();
        f.home_odds = 1.5;
        f.over_odds = 2.1;
        assert_eq!(BetCategory::HomeWin.odds_from(&f), 1.5);
        assert_eq!(BetCategory::OverTotal.odds_from(&f), 2.1);
    }
}
