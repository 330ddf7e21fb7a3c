//! Fixed-schema feature vector for match predictions.
//!
//! Every classifier, at training time and at inference time, sees the same
//! ~90 numeric fields in the same order. The schema is declared exactly once
//! through the `feature_schema!` macro below, which emits the struct, the
//! per-field default, the canonical `FIELD_NAMES` order and the `to_vec()`
//! conversion from a single field list. There is no runtime validation of
//! vector order; it is correct by construction.
//!
//! Conventions:
//! - rates and probabilities are percentages (0–100)
//! - odds are decimal odds
//! - `*_flag` fields are 0.0 / 1.0
//! - counts and streaks are plain counts

pub mod builder;
pub mod signals;

pub use builder::build_features;
pub use signals::MatchSignals;

use serde::{Deserialize, Serialize};

macro_rules! feature_schema {
    ( $( $(#[$meta:meta])* $name:ident = $default:expr ),+ $(,)? ) => {
        /// The complete, ordered feature schema. A vector is always complete:
        /// missing raw signals degrade to the defaults declared here.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct MatchFeatures {
            $( $(#[$meta])* pub $name: f64, )+
        }

        impl Default for MatchFeatures {
            fn default() -> Self {
                Self { $( $name: $default, )+ }
            }
        }

        /// Canonical field order. Shared by training and inference; the
        /// serialized `featureOrder` of every artifact must equal this.
        pub const FIELD_NAMES: &[&str] = &[ $( stringify!($name), )+ ];

        impl MatchFeatures {
            /// Ordered numeric array fed to the classifiers. Iterates the
            /// schema in declared order.
            pub fn to_vec(&self) -> Vec<f64> {
                vec![ $( self.$name, )+ ]
            }
        }
    };
}

feature_schema! {
    // ── Recent form (last 5 matches) ────────────────────────────────────
    home_form_points = 1.3,
    away_form_points = 1.3,
    home_win_rate = 50.0,
    away_win_rate = 50.0,
    home_goals_scored_avg = 1.3,
    away_goals_scored_avg = 1.3,
    home_goals_conceded_avg = 1.3,
    away_goals_conceded_avg = 1.3,
    home_unbeaten_streak = 0.0,
    away_unbeaten_streak = 0.0,
    home_clean_sheet_rate = 30.0,
    away_clean_sheet_rate = 30.0,
    home_scoring_streak = 0.0,
    away_scoring_streak = 0.0,
    home_conceding_streak = 0.0,
    away_conceding_streak = 0.0,

    // ── League standings ────────────────────────────────────────────────
    home_table_position = 10.0,
    away_table_position = 10.0,
    /// home position minus away position; positive = away ranked higher
    table_position_gap = 0.0,
    home_points_per_game = 1.3,
    away_points_per_game = 1.3,
    home_home_win_rate = 45.0,
    away_away_win_rate = 30.0,
    home_season_goal_diff = 0.0,
    away_season_goal_diff = 0.0,
    league_avg_goals = 2.6,

    // ── Market odds ─────────────────────────────────────────────────────
    home_odds = 2.5,
    draw_odds = 3.3,
    away_odds = 3.0,
    over_odds = 1.9,
    under_odds = 1.9,
    btts_yes_odds = 1.9,
    implied_home_prob = 40.0,
    implied_draw_prob = 27.0,
    implied_away_prob = 33.0,

    // ── Head to head ────────────────────────────────────────────────────
    h2h_matches = 0.0,
    h2h_home_wins = 0.0,
    h2h_draws = 0.0,
    h2h_away_wins = 0.0,
    h2h_home_goals_avg = 1.2,
    h2h_away_goals_avg = 1.2,

    // ── Expected goals ──────────────────────────────────────────────────
    home_xg_for = 1.3,
    away_xg_for = 1.3,
    home_xg_against = 1.3,
    away_xg_against = 1.3,
    home_xg_diff = 0.0,
    away_xg_diff = 0.0,
    /// actual goals minus xG over the sample; negative = finishing below chances
    home_xg_overperformance = 0.0,
    away_xg_overperformance = 0.0,
    xg_underperformance_flag = 0.0,

    // ── Injuries / availability ─────────────────────────────────────────
    home_injury_count = 0.0,
    away_injury_count = 0.0,
    home_injury_impact = 0.0,
    away_injury_impact = 0.0,
    home_key_players_out = 0.0,
    away_key_players_out = 0.0,

    // ── Referee tendencies ──────────────────────────────────────────────
    referee_cards_per_game = 4.0,
    referee_penalties_per_game = 0.3,
    referee_home_win_rate = 45.0,
    referee_fouls_per_game = 22.0,

    // ── Rest / fatigue ──────────────────────────────────────────────────
    home_rest_days = 7.0,
    away_rest_days = 7.0,
    home_matches_14d = 2.0,
    away_matches_14d = 2.0,

    // ── Motivation ──────────────────────────────────────────────────────
    home_motivation = 50.0,
    away_motivation = 50.0,
    home_must_win_flag = 0.0,
    away_must_win_flag = 0.0,
    derby_flag = 0.0,

    // ── Team class ──────────────────────────────────────────────────────
    /// 1 = elite, 2 = upper, 3 = mid, 4 = lower tier
    home_team_class = 3.0,
    away_team_class = 3.0,
    class_mismatch = 0.0,
    elite_vs_underdog_flag = 0.0,

    // ── Line movement / sharp money ─────────────────────────────────────
    opening_home_odds = 2.5,
    home_line_move_pct = 0.0,
    sharp_money_flag = 0.0,
    volume_spike_flag = 0.0,
    closing_line_value = 0.0,

    // ── Squad / coaching changes ────────────────────────────────────────
    home_coach_change_flag = 0.0,
    away_coach_change_flag = 0.0,
    home_squad_turnover = 0.0,
    away_squad_turnover = 0.0,

    // ── Player impact modifiers ─────────────────────────────────────────
    home_star_player_rating = 0.0,
    away_star_player_rating = 0.0,
    home_attack_impact_mod = 0.0,
    away_attack_impact_mod = 0.0,

    // ── Opposition-strength ("flat-track bully") adjustments ────────────
    home_flat_track_score = 0.0,
    away_flat_track_score = 0.0,
    opposition_strength_adjust = 0.0,
}
