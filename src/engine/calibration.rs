//! Band-level confidence calibration.
//!
//! Raw confidences land in one of seven fixed 10-point bands spanning
//! 30–100. Each band accumulates how often its predictions actually won;
//! the ratio of the observed win rate to the band midpoint becomes a
//! multiplicative correction, applied only once the band has seen enough
//! verifications to mean anything.

use crate::db::models::CalibrationBand;

/// The seven fixed bands. Raw confidence below 30 or above 95 never occurs
/// (clamped upstream), but `band_label` clamps anyway.
pub const BANDS: [(u32, u32); 7] = [
    (30, 40),
    (40, 50),
    (50, 60),
    (60, 70),
    (70, 80),
    (80, 90),
    (90, 100),
];

/// Minimum verified predictions in a band before its factor is trusted.
pub const MIN_BAND_SAMPLES: i64 = 10;

/// Calibration factors are clamped to this range.
pub const FACTOR_RANGE: (f64, f64) = (0.65, 1.35);

/// "70-80"-style label for a raw confidence.
pub fn band_label(confidence: f64) -> String {
    for (lo, hi) in BANDS {
        if confidence < hi as f64 {
            return format!("{lo}-{hi}");
        }
    }
    let (lo, hi) = BANDS[BANDS.len() - 1];
    format!("{lo}-{hi}")
}

/// Expected win probability at the band's midpoint, e.g. "70-80" → 0.75.
pub fn band_midpoint(lo: u32, hi: u32) -> f64 {
    (lo + hi) as f64 / 200.0
}

/// observed win rate / expected midpoint rate, clamped to [`FACTOR_RANGE`].
pub fn compute_factor(predicted_count: i64, actual_wins: i64, lo: u32, hi: u32) -> f64 {
    if predicted_count <= 0 {
        return 1.0;
    }
    let actual_rate = actual_wins as f64 / predicted_count as f64;
    let factor = actual_rate / band_midpoint(lo, hi);
    factor.clamp(FACTOR_RANGE.0, FACTOR_RANGE.1)
}

/// Fold one verified outcome into a band's counters and recompute its
/// factor. Below [`MIN_BAND_SAMPLES`] the factor stays neutral.
pub fn record_outcome(band: &mut CalibrationBand, won: bool) {
    band.predicted_count += 1;
    if won {
        band.actual_wins += 1;
    }
    band.calibration_factor = if band.predicted_count >= MIN_BAND_SAMPLES {
        let (lo, hi) = band_bounds(&band.band);
        compute_factor(band.predicted_count, band.actual_wins, lo, hi)
    } else {
        1.0
    };
}

/// Multiplicative factor for a raw confidence, given the stored bands for
/// its category. Unknown or under-sampled bands are neutral.
pub fn factor_for(raw_confidence: f64, band: Option<&CalibrationBand>) -> f64 {
    match band {
        Some(b) if b.predicted_count >= MIN_BAND_SAMPLES => {
            let _ = raw_confidence;
            b.calibration_factor
        }
        _ => 1.0,
    }
}

/// Apply a factor and re-clamp into the servable range.
pub fn apply(raw_confidence: f64, factor: f64) -> f64 {
    (raw_confidence * factor).clamp(30.0, 95.0)
}

fn band_bounds(label: &str) -> (u32, u32) {
    label
        .split_once('-')
        .and_then(|(lo, hi)| Some((lo.parse().ok()?, hi.parse().ok()?)))
        .unwrap_or((30, 40))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BetCategory;
    use approx::assert_relative_eq;

    fn fresh_band(label: &str) -> CalibrationBand {
        CalibrationBand {
            category: BetCategory::HomeWin,
            band: label.to_string(),
            predicted_count: 0,
            actual_wins: 0,
            calibration_factor: 1.0,
        }
    }

    #[test]
    fn labels_cover_the_confidence_range() {
        assert_eq!(band_label(30.0), "30-40");
        assert_eq!(band_label(39.9), "30-40");
        assert_eq!(band_label(75.0), "70-80");
        assert_eq!(band_label(95.0), "90-100");
        // out-of-range inputs clamp to the edge bands
        assert_eq!(band_label(12.0), "30-40");
        assert_eq!(band_label(120.0), "90-100");
    }

    #[test]
    fn factor_is_observed_over_expected() {
        // 6 wins in 12 predictions in 70-80: 0.5 / 0.75 = 0.667
        let factor = compute_factor(12, 6, 70, 80);
        assert_relative_eq!(factor, 0.5 / 0.75, epsilon = 1e-9);
        assert_relative_eq!(apply(75.0, factor), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn factor_clamps_to_range() {
        // everything won in 30-40: 1.0 / 0.35 would be ~2.86
        assert_relative_eq!(compute_factor(20, 20, 30, 40), 1.35);
        // nothing won in 90-100
        assert_relative_eq!(compute_factor(20, 0, 90, 100), 0.65);
    }

    #[test]
    fn under_sampled_band_stays_neutral() {
        let mut band = fresh_band("70-80");
        for _ in 0..9 {
            record_outcome(&mut band, false);
        }
        assert_relative_eq!(band.calibration_factor, 1.0, epsilon = 1e-12);
        assert_relative_eq!(factor_for(75.0, Some(&band)), 1.0);

        // The tenth verification crosses the threshold.
        record_outcome(&mut band, false);
        assert_relative_eq!(band.calibration_factor, 0.65);
        assert_relative_eq!(factor_for(75.0, Some(&band)), 0.65);
    }

    #[test]
    fn missing_band_is_neutral() {
        assert_relative_eq!(factor_for(75.0, None), 1.0);
    }

    #[test]
    fn applied_confidence_stays_in_servable_range() {
        assert_relative_eq!(apply(95.0, 1.35), 95.0);
        assert_relative_eq!(apply(35.0, 0.65), 30.0);
    }
}
