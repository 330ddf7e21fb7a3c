//! The prediction engine: ensemble serving, confidence calibration, ROI
//! feedback and the verification loop behind one facade.
//!
//! Serving path: feature vector → ensemble vote → raw confidence →
//! band calibration factor → ROI adjustment → final recommendation.
//! Feedback path: match result → [`verify`] → calibration / ROI / pattern /
//! league aggregates → retrain trigger.

pub mod calibration;
pub mod conditions;
pub mod ensemble;
pub mod patterns;
pub mod roi;
pub mod verify;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};

use crate::db::models::{BetCategory, PredictionRecord};
use crate::db::Database;
use crate::features::{MatchFeatures, FIELD_NAMES};
use crate::models::{ClassifierKind, ModelRegistry};

pub use ensemble::VoteDetail;
pub use verify::VerifyOutcome;

/// Raw ensemble result for one (features, category) query.
#[derive(Debug, Clone)]
pub struct EnsembleOutput {
    /// False when no classifier produced a vote; confidence is then a
    /// neutral 50 and the caller should treat this as "no recommendation".
    pub available: bool,
    pub prediction: String,
    pub predicted_class: usize,
    pub confidence: f64,
    pub agreement: f64,
    pub votes: Vec<VoteDetail>,
}

impl EnsembleOutput {
    fn unavailable() -> Self {
        EnsembleOutput {
            available: false,
            prediction: "none".to_string(),
            predicted_class: 0,
            confidence: 50.0,
            agreement: 0.0,
            votes: Vec::new(),
        }
    }
}

/// [`EnsembleOutput`] after calibration and ROI adjustment.
#[derive(Debug, Clone)]
pub struct CalibratedPrediction {
    pub ensemble: EnsembleOutput,
    pub raw_confidence: f64,
    pub calibration_factor: f64,
    pub roi_adjustment: f64,
    /// Final servable confidence, in [30, 95].
    pub confidence: f64,
    pub explanation: String,
}

/// Human-facing class name. Match-outcome categories keep the historical
/// three-way map; everything else is a yes/no bet.
pub fn class_label(category: BetCategory, class: usize) -> &'static str {
    if category.is_match_outcome() {
        match class {
            0 => "away",
            1 => "draw",
            2 => "home",
            _ => "unknown",
        }
    } else {
        match class {
            0 => "no",
            1 => "yes",
            _ => "unknown",
        }
    }
}

/// Outcome named by the positive meta-label ("the bet lands").
pub fn positive_label(category: BetCategory) -> &'static str {
    match category {
        BetCategory::HomeWin => "home",
        BetCategory::AwayWin => "away",
        BetCategory::Draw => "draw",
        _ => "yes",
    }
}

pub struct Engine {
    db: Database,
    registry: Arc<ModelRegistry>,
    stake_units: f64,
    retrain_growth_ratio: f64,
}

impl Engine {
    pub fn new(
        db: Database,
        registry: Arc<ModelRegistry>,
        stake_units: f64,
        retrain_growth_ratio: f64,
    ) -> Self {
        Engine {
            db,
            registry,
            stake_units,
            retrain_growth_ratio,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Raw ensemble prediction. Never fails: classifiers that are missing
    /// or error out are skipped, and an empty ensemble degrades to
    /// `available: false`.
    pub fn predict(&self, features: &MatchFeatures, category: BetCategory) -> EnsembleOutput {
        let x = features.to_vec();
        let mut votes = Vec::new();

        for kind in ClassifierKind::ALL {
            let Some(artifact) = self.registry.get(kind, category) else {
                debug!(%kind, %category, "no model artifact, skipping voter");
                continue;
            };
            if artifact.feature_order != FIELD_NAMES {
                warn!(%kind, %category, "artifact feature order does not match the live schema, skipping voter");
                continue;
            }
            let p = artifact.model.predict_proba(&x);
            if !p.is_finite() {
                warn!(%kind, %category, "non-finite probability, skipping voter");
                continue;
            }
            let class = usize::from(p >= 0.5);
            votes.push(VoteDetail {
                kind,
                class,
                probability: if class == 1 { p } else { 1.0 - p },
                weight: crate::models::member_weight(kind),
            });
        }

        let Some(combined) = ensemble::combine(&votes) else {
            return EnsembleOutput::unavailable();
        };

        let prediction = if combined.class == 1 {
            positive_label(category)
        } else {
            "no"
        };
        EnsembleOutput {
            available: true,
            prediction: prediction.to_string(),
            predicted_class: combined.class,
            confidence: combined.raw_confidence,
            agreement: combined.agreement,
            votes,
        }
    }

    /// Ensemble prediction with the band calibration factor and the
    /// category's overall-ROI adjustment applied on top.
    pub fn predict_calibrated(
        &self,
        features: &MatchFeatures,
        category: BetCategory,
    ) -> Result<CalibratedPrediction> {
        let ensemble = self.predict(features, category);
        if !ensemble.available {
            return Ok(CalibratedPrediction {
                raw_confidence: ensemble.confidence,
                calibration_factor: 1.0,
                roi_adjustment: 0.0,
                confidence: ensemble.confidence,
                explanation: format!("{category}: no models available, no recommendation"),
                ensemble,
            });
        }

        let raw = ensemble.confidence;
        let band_label = calibration::band_label(raw);
        let band = self.db.get_calibration_band(category, &band_label)?;
        let factor = calibration::factor_for(raw, band.as_ref());

        let adjustment = self
            .db
            .get_roi_record(category, roi::OVERALL_KEY)?
            .map(|rec| roi::roi_adjustment(&rec))
            .unwrap_or(0.0);

        let confidence = (calibration::apply(raw, factor) + adjustment).clamp(30.0, 95.0);
        let explanation = format!(
            "{category} {}: {} of {} voters agree ({:.0}%), raw {raw:.1}, band {band_label} factor {factor:.2}, roi {adjustment:+.0}",
            ensemble.prediction,
            (ensemble.agreement * ensemble.votes.len() as f64).round() as usize,
            ensemble.votes.len(),
            ensemble.agreement * 100.0,
        );

        Ok(CalibratedPrediction {
            ensemble,
            raw_confidence: raw,
            calibration_factor: factor,
            roi_adjustment: adjustment,
            confidence,
            explanation,
        })
    }

    /// Persist a served prediction so the feedback loop can settle it
    /// later: one training example (target null) plus the prediction-time
    /// metadata row.
    pub fn record_prediction(
        &self,
        prediction_id: &str,
        category: BetCategory,
        league_code: &str,
        features: &MatchFeatures,
        prediction: &CalibratedPrediction,
        rank: i64,
    ) -> Result<()> {
        self.db
            .insert_training_example(prediction_id, category, features, rank)?;
        self.db.insert_prediction(&PredictionRecord {
            prediction_id: prediction_id.to_string(),
            category,
            league_code: league_code.to_string(),
            predicted_outcome: prediction.ensemble.prediction.clone(),
            raw_confidence: prediction.raw_confidence,
            final_confidence: prediction.confidence,
            odds: category.odds_from(features),
            stake: self.stake_units,
            created_at: Utc::now(),
            verified: false,
        })?;
        Ok(())
    }

    /// Settle a recorded prediction against its real outcome.
    pub fn verify(&self, prediction_id: &str, won: bool) -> Result<VerifyOutcome> {
        verify::verify(&self.db, prediction_id, won, self.retrain_growth_ratio)
    }
}
