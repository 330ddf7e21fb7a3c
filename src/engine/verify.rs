//! The verification feedback loop.
//!
//! A prediction lives in two states: created (features stored, target null)
//! and verified (target fixed to 0/1). The transition fires at most once;
//! the null-target update guard makes a second `verify` call a no-op rather
//! than a double count. Everything one verification touches (the target
//! flip, the calibration band, the ROI aggregates, the error pattern, the
//! league accuracy, the audit log) commits in a single SQL transaction.

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::db::models::{
    BetCategory, CalibrationBand, ErrorPattern, LeagueLearning, RoiRecord,
};
use crate::db::{self, Database};
use crate::engine::{calibration, conditions, patterns, roi};

/// What a `verify` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The target was already set; nothing was touched.
    AlreadyVerified,
    Applied {
        category: BetCategory,
        won: bool,
        /// Verified-sample growth has crossed the retrain threshold.
        retrain_due: bool,
    },
}

/// Settle one prediction against its real outcome and propagate the result
/// through every learning aggregate.
pub fn verify(
    database: &Database,
    prediction_id: &str,
    won: bool,
    retrain_growth_ratio: f64,
) -> Result<VerifyOutcome> {
    let applied = database.transaction(|conn| {
        let Some(example) = db::get_training_example(conn, prediction_id)? else {
            bail!("unknown prediction id {prediction_id}");
        };
        let Some(prediction) = db::get_prediction(conn, prediction_id)? else {
            bail!("no prediction metadata for {prediction_id}");
        };

        if !db::mark_verified(conn, prediction_id, i64::from(won))? {
            return Ok(None);
        }

        let category = example.category;
        let features = &example.features;

        // (b) calibration band of the raw (pre-calibration) confidence
        let band_label = calibration::band_label(prediction.raw_confidence);
        let mut band = db::get_calibration_band(conn, category, &band_label)?.unwrap_or(
            CalibrationBand {
                category,
                band: band_label.clone(),
                predicted_count: 0,
                actual_wins: 0,
                calibration_factor: 1.0,
            },
        );
        calibration::record_outcome(&mut band, won);
        db::upsert_calibration_band(conn, &band)?;

        // (c) ROI: "overall" plus one record per detected condition
        let ev = prediction.final_confidence / 100.0 * prediction.odds - 1.0;
        let tags = conditions::extract_condition_tags(features);
        let mut keys = vec![roi::OVERALL_KEY.to_string()];
        keys.extend(tags.iter().cloned());
        for key in &keys {
            let mut rec = db::get_roi_record(conn, category, key)?.unwrap_or(RoiRecord {
                category,
                condition_key: key.clone(),
                total_bets: 0,
                wins: 0,
                losses: 0,
                total_staked: 0.0,
                total_returned: 0.0,
                roi_percent: 0.0,
                avg_odds: 0.0,
                avg_ev: 0.0,
            });
            roi::record_bet(&mut rec, won, prediction.stake, prediction.odds, ev);
            db::upsert_roi_record(conn, &rec)?;
        }

        // (d) error pattern, losses only
        if !won {
            let key = conditions::compound_key(&tags);
            let mut pat = db::get_error_pattern(conn, category, &key)?.unwrap_or(ErrorPattern {
                category,
                condition_key: key.clone(),
                total_predictions: 0,
                wins: 0,
                losses: 0,
                avg_confidence_when_failed: 0.0,
                suggested_adjustment: 0.0,
            });
            let neutral_before = pat.suggested_adjustment == 0.0;
            patterns::record_failure(&mut pat, prediction.final_confidence);
            db::upsert_error_pattern(conn, &pat)?;
            if neutral_before && pat.suggested_adjustment != 0.0 {
                db::insert_log(
                    conn,
                    "pattern_detected",
                    &format!(
                        "{category}/{key}: {} losses in {} predictions, suggested {:+.0}",
                        pat.losses, pat.total_predictions, pat.suggested_adjustment
                    ),
                    None,
                )?;
            }
        }

        // (e) rolling per-league accuracy
        let mut league = db::get_league_learning(conn, &prediction.league_code, category)?
            .unwrap_or(LeagueLearning {
                league_code: prediction.league_code.clone(),
                category,
                total_predictions: 0,
                correct_predictions: 0,
                accuracy: 0.0,
                avg_confidence: 0.0,
            });
        let old_count = league.total_predictions as f64;
        league.total_predictions += 1;
        if won {
            league.correct_predictions += 1;
        }
        league.accuracy =
            league.correct_predictions as f64 / league.total_predictions as f64 * 100.0;
        league.avg_confidence = (league.avg_confidence * old_count
            + prediction.final_confidence)
            / league.total_predictions as f64;
        db::upsert_league_learning(conn, &league)?;

        db::insert_log(
            conn,
            "prediction_verified",
            &format!("{prediction_id} ({category}): {}", if won { "won" } else { "lost" }),
            None,
        )?;

        Ok(Some(category))
    })?;

    let Some(category) = applied else {
        debug!(prediction_id, "verification ignored, target already set");
        return Ok(VerifyOutcome::AlreadyVerified);
    };

    // (f) retrain trigger, outside the settlement transaction
    let retrain_due = retrain_is_due(database, category, retrain_growth_ratio)?;
    if retrain_due {
        database.log_event(
            "retrain_due",
            &format!("{category}: verified samples grew past the retrain threshold"),
            None,
        )?;
    }

    info!(prediction_id, %category, won, retrain_due, "verification applied");
    Ok(VerifyOutcome::Applied {
        category,
        won,
        retrain_due,
    })
}

/// Verified-sample growth check: due when the current count exceeds the
/// count at last training by more than the growth ratio. Never due before a
/// first model exists; the first training is demand-driven instead.
pub fn retrain_is_due(
    database: &Database,
    category: BetCategory,
    growth_ratio: f64,
) -> Result<bool> {
    let verified = database.count_verified(category)? as f64;
    match database.last_trained_samples(category)? {
        Some(last) => Ok(verified > last as f64 * (1.0 + growth_ratio)),
        None => Ok(false),
    }
}
