//! Raw signal groups as supplied by the upstream data collaborators.
//!
//! Each provider (form, standings, odds, ...) hands over one already-shaped
//! group of named values. Any group may be absent; a missing feed is normal,
//! not an error, and the builder substitutes schema defaults for the fields
//! that group would have populated.

use serde::{Deserialize, Serialize};

/// Everything known about one upcoming match, straight from the providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSignals {
    pub home_form: Option<TeamFormSignals>,
    pub away_form: Option<TeamFormSignals>,
    pub standings: Option<StandingsSignals>,
    pub odds: Option<OddsSignals>,
    pub head_to_head: Option<HeadToHeadSignals>,
    pub expected_goals: Option<XgSignals>,
    pub home_injuries: Option<InjurySignals>,
    pub away_injuries: Option<InjurySignals>,
    pub referee: Option<RefereeSignals>,
    pub schedule: Option<ScheduleSignals>,
    pub motivation: Option<MotivationSignals>,
    pub squad_changes: Option<SquadSignals>,
    pub line_movement: Option<LineMovementSignals>,
    pub player_impact: Option<PlayerImpactSignals>,
    pub team_class: Option<ClassSignals>,
}

/// Last-five form for one team. Rates are 0–100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFormSignals {
    pub points_avg: f64,
    pub win_rate: f64,
    pub goals_scored_avg: f64,
    pub goals_conceded_avg: f64,
    pub unbeaten_streak: f64,
    pub clean_sheet_rate: f64,
    pub scoring_streak: f64,
    pub conceding_streak: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsSignals {
    pub home_position: f64,
    pub away_position: f64,
    pub home_points_per_game: f64,
    pub away_points_per_game: f64,
    pub home_home_win_rate: f64,
    pub away_away_win_rate: f64,
    pub home_goal_diff: f64,
    pub away_goal_diff: f64,
    pub league_avg_goals: f64,
}

/// Decimal pre-match odds from the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsSignals {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub over: f64,
    pub under: f64,
    pub btts_yes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadToHeadSignals {
    pub matches: f64,
    pub home_wins: f64,
    pub draws: f64,
    pub away_wins: f64,
    pub home_goals_avg: f64,
    pub away_goals_avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgSignals {
    pub home_xg_for: f64,
    pub away_xg_for: f64,
    pub home_xg_against: f64,
    pub away_xg_against: f64,
    /// actual minus expected goals over the sample window
    pub home_overperformance: f64,
    pub away_overperformance: f64,
    pub underperformance_flag: bool,
}

/// Availability report for one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjurySignals {
    pub count: f64,
    /// weighted severity score, 0–10
    pub impact: f64,
    pub key_players_out: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeSignals {
    pub cards_per_game: f64,
    pub penalties_per_game: f64,
    pub home_win_rate: f64,
    pub fouls_per_game: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSignals {
    pub home_rest_days: f64,
    pub away_rest_days: f64,
    pub home_matches_14d: f64,
    pub away_matches_14d: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotivationSignals {
    pub home_motivation: f64,
    pub away_motivation: f64,
    pub home_must_win: bool,
    pub away_must_win: bool,
    pub derby: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadSignals {
    pub home_coach_change: bool,
    pub away_coach_change: bool,
    pub home_squad_turnover: f64,
    pub away_squad_turnover: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMovementSignals {
    pub opening_home_odds: f64,
    /// percent move of the home line since open; negative = shortening
    pub home_line_move_pct: f64,
    pub sharp_money: bool,
    pub volume_spike: bool,
    pub closing_line_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerImpactSignals {
    pub home_star_rating: f64,
    pub away_star_rating: f64,
    pub home_attack_mod: f64,
    pub away_attack_mod: f64,
}

/// Tiering and opposition-strength adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSignals {
    /// 1 = elite .. 4 = lower tier
    pub home_class: f64,
    pub away_class: f64,
    pub home_flat_track_score: f64,
    pub away_flat_track_score: f64,
    pub opposition_strength_adjust: f64,
}
