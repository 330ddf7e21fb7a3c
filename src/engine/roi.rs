//! Realized-ROI tracking and the confidence adjustment derived from it.
//!
//! Every verification settles a bet: `returned = stake × odds` on a win,
//! zero on a loss. Aggregates are kept per (category, "overall") and per
//! (category, condition tag). Only the "overall" aggregate feeds back into
//! confidence, through a 6-tier step function of its ROI percentage.

use crate::db::models::RoiRecord;

/// Condition key of the aggregate that drives the adjustment.
pub const OVERALL_KEY: &str = "overall";

/// Minimum settled bets before the ROI adjustment kicks in.
pub const MIN_ROI_BETS: i64 = 15;

/// Confidence delta from realized ROI. Tier boundaries are exclusive on the
/// upper end: roi = −10 lands in the "< 0" tier, not "< −10".
pub fn roi_adjustment(rec: &RoiRecord) -> f64 {
    if rec.total_bets < MIN_ROI_BETS {
        return 0.0;
    }
    let roi = rec.roi_percent;
    if roi < -20.0 {
        -12.0
    } else if roi < -10.0 {
        -8.0
    } else if roi < 0.0 {
        -4.0
    } else if roi < 10.0 {
        3.0
    } else if roi < 25.0 {
        6.0
    } else {
        10.0
    }
}

/// Fold one settled bet into a running aggregate. Average odds and EV use
/// the incremental weighted mean so the record never needs its history.
pub fn record_bet(rec: &mut RoiRecord, won: bool, stake: f64, odds: f64, ev: f64) {
    let returned = if won { stake * odds } else { 0.0 };
    let old_count = rec.total_bets as f64;

    rec.total_bets += 1;
    if won {
        rec.wins += 1;
    } else {
        rec.losses += 1;
    }
    rec.total_staked += stake;
    rec.total_returned += returned;
    rec.roi_percent = if rec.total_staked > 0.0 {
        (rec.total_returned - rec.total_staked) / rec.total_staked * 100.0
    } else {
        0.0
    };

    let new_count = rec.total_bets as f64;
    rec.avg_odds = (rec.avg_odds * old_count + odds) / new_count;
    rec.avg_ev = (rec.avg_ev * old_count + ev) / new_count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BetCategory;
    use approx::assert_relative_eq;

    fn record(total_bets: i64, roi_percent: f64) -> RoiRecord {
        RoiRecord {
            category: BetCategory::HomeWin,
            condition_key: OVERALL_KEY.to_string(),
            total_bets,
            wins: 0,
            losses: 0,
            total_staked: 0.0,
            total_returned: 0.0,
            roi_percent,
            avg_odds: 0.0,
            avg_ev: 0.0,
        }
    }

    #[test]
    fn adjustment_tiers_match_the_table() {
        assert_relative_eq!(roi_adjustment(&record(20, -25.0)), -12.0);
        assert_relative_eq!(roi_adjustment(&record(20, -15.0)), -8.0);
        assert_relative_eq!(roi_adjustment(&record(20, -5.0)), -4.0);
        assert_relative_eq!(roi_adjustment(&record(20, 5.0)), 3.0);
        assert_relative_eq!(roi_adjustment(&record(20, 20.0)), 6.0);
        assert_relative_eq!(roi_adjustment(&record(20, 40.0)), 10.0);
    }

    #[test]
    fn tier_boundaries_are_exclusive_above() {
        // roi exactly −10 falls through to the "< 0" tier.
        assert_relative_eq!(roi_adjustment(&record(20, -10.0)), -4.0);
        assert_relative_eq!(roi_adjustment(&record(20, -20.0)), -8.0);
        assert_relative_eq!(roi_adjustment(&record(20, 0.0)), 3.0);
        assert_relative_eq!(roi_adjustment(&record(20, 10.0)), 6.0);
        assert_relative_eq!(roi_adjustment(&record(20, 25.0)), 10.0);
    }

    #[test]
    fn too_few_bets_means_no_adjustment() {
        assert_relative_eq!(roi_adjustment(&record(14, -50.0)), 0.0);
        assert_relative_eq!(roi_adjustment(&record(15, -50.0)), -12.0);
    }

    #[test]
    fn settled_bets_accumulate() {
        let mut rec = record(0, 0.0);
        record_bet(&mut rec, true, 1.0, 2.0, 0.4); // +1.0 profit
        record_bet(&mut rec, false, 1.0, 3.0, 0.2); // −1.0

        assert_eq!(rec.total_bets, 2);
        assert_eq!(rec.wins, 1);
        assert_eq!(rec.losses, 1);
        assert_relative_eq!(rec.total_staked, 2.0);
        assert_relative_eq!(rec.total_returned, 2.0);
        assert_relative_eq!(rec.roi_percent, 0.0);
        assert_relative_eq!(rec.avg_odds, 2.5);
        assert_relative_eq!(rec.avg_ev, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn losing_run_goes_negative() {
        let mut rec = record(0, 0.0);
        for _ in 0..4 {
            record_bet(&mut rec, false, 1.0, 2.0, 0.0);
        }
        record_bet(&mut rec, true, 1.0, 2.0, 0.0);
        // staked 5, returned 2
        assert_relative_eq!(rec.roi_percent, -60.0);
    }
}
