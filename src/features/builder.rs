//! Deterministic mapping from raw provider signals to the fixed schema.
//!
//! The builder never fails: a provider that returned nothing leaves its
//! fields at their schema defaults. Derived fields (position gap, implied
//! probabilities, xG differentials, class mismatch) are computed here so the
//! providers stay dumb.

use super::signals::MatchSignals;
use super::MatchFeatures;

/// Build a complete feature vector from whatever signals are available.
pub fn build_features(signals: &MatchSignals) -> MatchFeatures {
    let mut f = MatchFeatures::default();

    if let Some(form) = &signals.home_form {
        f.home_form_points = form.points_avg;
        f.home_win_rate = form.win_rate;
        f.home_goals_scored_avg = form.goals_scored_avg;
        f.home_goals_conceded_avg = form.goals_conceded_avg;
        f.home_unbeaten_streak = form.unbeaten_streak;
        f.home_clean_sheet_rate = form.clean_sheet_rate;
        f.home_scoring_streak = form.scoring_streak;
        f.home_conceding_streak = form.conceding_streak;
    }
    if let Some(form) = &signals.away_form {
        f.away_form_points = form.points_avg;
        f.away_win_rate = form.win_rate;
        f.away_goals_scored_avg = form.goals_scored_avg;
        f.away_goals_conceded_avg = form.goals_conceded_avg;
        f.away_unbeaten_streak = form.unbeaten_streak;
        f.away_clean_sheet_rate = form.clean_sheet_rate;
        f.away_scoring_streak = form.scoring_streak;
        f.away_conceding_streak = form.conceding_streak;
    }

    if let Some(st) = &signals.standings {
        f.home_table_position = st.home_position;
        f.away_table_position = st.away_position;
        f.table_position_gap = st.home_position - st.away_position;
        f.home_points_per_game = st.home_points_per_game;
        f.away_points_per_game = st.away_points_per_game;
        f.home_home_win_rate = st.home_home_win_rate;
        f.away_away_win_rate = st.away_away_win_rate;
        f.home_season_goal_diff = st.home_goal_diff;
        f.away_season_goal_diff = st.away_goal_diff;
        f.league_avg_goals = st.league_avg_goals;
    }

    if let Some(odds) = &signals.odds {
        f.home_odds = odds.home;
        f.draw_odds = odds.draw;
        f.away_odds = odds.away;
        f.over_odds = odds.over;
        f.under_odds = odds.under;
        f.btts_yes_odds = odds.btts_yes;
        f.implied_home_prob = implied_pct(odds.home);
        f.implied_draw_prob = implied_pct(odds.draw);
        f.implied_away_prob = implied_pct(odds.away);
    }

    if let Some(h2h) = &signals.head_to_head {
        f.h2h_matches = h2h.matches;
        f.h2h_home_wins = h2h.home_wins;
        f.h2h_draws = h2h.draws;
        f.h2h_away_wins = h2h.away_wins;
        f.h2h_home_goals_avg = h2h.home_goals_avg;
        f.h2h_away_goals_avg = h2h.away_goals_avg;
    }

    if let Some(xg) = &signals.expected_goals {
        f.home_xg_for = xg.home_xg_for;
        f.away_xg_for = xg.away_xg_for;
        f.home_xg_against = xg.home_xg_against;
        f.away_xg_against = xg.away_xg_against;
        f.home_xg_diff = xg.home_xg_for - xg.home_xg_against;
        f.away_xg_diff = xg.away_xg_for - xg.away_xg_against;
        f.home_xg_overperformance = xg.home_overperformance;
        f.away_xg_overperformance = xg.away_overperformance;
        f.xg_underperformance_flag = flag(xg.underperformance_flag);
    }

    if let Some(inj) = &signals.home_injuries {
        f.home_injury_count = inj.count;
        f.home_injury_impact = inj.impact;
        f.home_key_players_out = inj.key_players_out;
    }
    if let Some(inj) = &signals.away_injuries {
        f.away_injury_count = inj.count;
        f.away_injury_impact = inj.impact;
        f.away_key_players_out = inj.key_players_out;
    }

    if let Some(r) = &signals.referee {
        f.referee_cards_per_game = r.cards_per_game;
        f.referee_penalties_per_game = r.penalties_per_game;
        f.referee_home_win_rate = r.home_win_rate;
        f.referee_fouls_per_game = r.fouls_per_game;
    }

    if let Some(s) = &signals.schedule {
        f.home_rest_days = s.home_rest_days;
        f.away_rest_days = s.away_rest_days;
        f.home_matches_14d = s.home_matches_14d;
        f.away_matches_14d = s.away_matches_14d;
    }

    if let Some(m) = &signals.motivation {
        f.home_motivation = m.home_motivation;
        f.away_motivation = m.away_motivation;
        f.home_must_win_flag = flag(m.home_must_win);
        f.away_must_win_flag = flag(m.away_must_win);
        f.derby_flag = flag(m.derby);
    }

    if let Some(sq) = &signals.squad_changes {
        f.home_coach_change_flag = flag(sq.home_coach_change);
        f.away_coach_change_flag = flag(sq.away_coach_change);
        f.home_squad_turnover = sq.home_squad_turnover;
        f.away_squad_turnover = sq.away_squad_turnover;
    }

    if let Some(lm) = &signals.line_movement {
        f.opening_home_odds = lm.opening_home_odds;
        f.home_line_move_pct = lm.home_line_move_pct;
        f.sharp_money_flag = flag(lm.sharp_money);
        f.volume_spike_flag = flag(lm.volume_spike);
        f.closing_line_value = lm.closing_line_value;
    }

    if let Some(p) = &signals.player_impact {
        f.home_star_player_rating = p.home_star_rating;
        f.away_star_player_rating = p.away_star_rating;
        f.home_attack_impact_mod = p.home_attack_mod;
        f.away_attack_impact_mod = p.away_attack_mod;
    }

    if let Some(c) = &signals.team_class {
        f.home_team_class = c.home_class;
        f.away_team_class = c.away_class;
        f.class_mismatch = (c.home_class - c.away_class).abs();
        // Elite side (tier 1) against a lower-tier side (tier 4)
        f.elite_vs_underdog_flag = flag(
            (c.home_class <= 1.0 && c.away_class >= 4.0)
                || (c.away_class <= 1.0 && c.home_class >= 4.0),
        );
        f.home_flat_track_score = c.home_flat_track_score;
        f.away_flat_track_score = c.away_flat_track_score;
        f.opposition_strength_adjust = c.opposition_strength_adjust;
    }

    f
}

/// Decimal odds → implied probability in percent. Guards zero odds.
fn implied_pct(odds: f64) -> f64 {
    if odds <= 1.0 {
        return 0.0;
    }
    100.0 / odds
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::signals::*;
    use crate::features::FIELD_NAMES;
    use approx::assert_relative_eq;

    #[test]
    fn empty_signals_produce_complete_default_vector() {
        let f = build_features(&MatchSignals::default());
        assert_eq!(f, MatchFeatures::default());
        assert_eq!(f.to_vec().len(), FIELD_NAMES.len());
    }

    #[test]
    fn odds_group_drives_implied_probabilities() {
        let signals = MatchSignals {
            odds: Some(OddsSignals {
                home: 2.0,
                draw: 4.0,
                away: 5.0,
                over: 1.9,
                under: 1.9,
                btts_yes: 1.8,
            }),
            ..Default::default()
        };
        let f = build_features(&signals);
        assert_relative_eq!(f.implied_home_prob, 50.0, epsilon = 1e-9);
        assert_relative_eq!(f.implied_draw_prob, 25.0, epsilon = 1e-9);
        assert_relative_eq!(f.implied_away_prob, 20.0, epsilon = 1e-9);
        // Other groups untouched
        assert_relative_eq!(f.home_win_rate, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_odds_do_not_blow_up() {
        let signals = MatchSignals {
            odds: Some(OddsSignals {
                home: 0.0,
                draw: 1.0,
                away: -2.0,
                over: 1.9,
                under: 1.9,
                btts_yes: 1.8,
            }),
            ..Default::default()
        };
        let f = build_features(&signals);
        assert_relative_eq!(f.implied_home_prob, 0.0, epsilon = 1e-9);
        assert_relative_eq!(f.implied_draw_prob, 0.0, epsilon = 1e-9);
        assert_relative_eq!(f.implied_away_prob, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn standings_derive_position_gap() {
        let signals = MatchSignals {
            standings: Some(StandingsSignals {
                home_position: 15.0,
                away_position: 2.0,
                home_points_per_game: 0.9,
                away_points_per_game: 2.3,
                home_home_win_rate: 30.0,
                away_away_win_rate: 60.0,
                home_goal_diff: -12.0,
                away_goal_diff: 28.0,
                league_avg_goals: 2.8,
            }),
            ..Default::default()
        };
        let f = build_features(&signals);
        assert_relative_eq!(f.table_position_gap, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn class_group_derives_mismatch_and_elite_flag() {
        let signals = MatchSignals {
            team_class: Some(ClassSignals {
                home_class: 1.0,
                away_class: 4.0,
                home_flat_track_score: 0.7,
                away_flat_track_score: 0.0,
                opposition_strength_adjust: -0.2,
            }),
            ..Default::default()
        };
        let f = build_features(&signals);
        assert_relative_eq!(f.class_mismatch, 3.0, epsilon = 1e-9);
        assert_relative_eq!(f.elite_vs_underdog_flag, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_injury_feed_degrades_to_defaults() {
        let signals = MatchSignals {
            home_injuries: Some(InjurySignals {
                count: 9.0,
                impact: 7.5,
                key_players_out: 3.0,
            }),
            // away feed absent
            ..Default::default()
        };
        let f = build_features(&signals);
        assert_relative_eq!(f.home_injury_count, 9.0, epsilon = 1e-9);
        assert_relative_eq!(f.away_injury_count, 0.0, epsilon = 1e-9);
    }
}
