use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub mod models;
use models::*;

use crate::features::MatchFeatures;

/// Thread-safe SQLite handle (single connection with mutex).
///
/// Verification-driven counter updates are read-modify-write aggregates, so
/// the feedback loop runs them through [`Database::transaction`]: one
/// transaction per verification, serialized by the connection mutex, which
/// rules out lost updates between concurrent verifications.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Run `f` inside a single SQL transaction. Everything the verification
    /// loop touches for one result commits or rolls back together.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    // ── Training examples ────────────────────────────────────────────────

    /// Store a training example at prediction time (target stays null until
    /// the match is verified).
    pub fn insert_training_example(
        &self,
        prediction_id: &str,
        category: BetCategory,
        features: &MatchFeatures,
        rank: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let features_json = serde_json::to_string(features)?;
        conn.execute(
            "INSERT INTO ml_training_data (prediction_id, bet_category, features_json, target, rank, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            params![prediction_id, category.as_str(), features_json, rank, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_training_example(&self, prediction_id: &str) -> Result<Option<TrainingExample>> {
        let conn = self.conn.lock().unwrap();
        get_training_example(&conn, prediction_id)
    }

    /// Number of verified (target not null) examples for a category.
    pub fn count_verified(&self, category: BetCategory) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ml_training_data WHERE bet_category = ?1 AND target IS NOT NULL",
            params![category.as_str()],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }

    /// All verified examples for a category, oldest first.
    pub fn load_verified_examples(&self, category: BetCategory) -> Result<Vec<TrainingExample>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, prediction_id, bet_category, features_json, target, rank, created_at
             FROM ml_training_data
             WHERE bet_category = ?1 AND target IS NOT NULL
             ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![category.as_str()], map_training_example)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Predictions ──────────────────────────────────────────────────────

    pub fn insert_prediction(&self, rec: &PredictionRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (
                prediction_id, bet_category, league_code, predicted_outcome,
                raw_confidence, final_confidence, odds, stake, created_at, verified
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                rec.prediction_id,
                rec.category.as_str(),
                rec.league_code,
                rec.predicted_outcome,
                rec.raw_confidence,
                rec.final_confidence,
                rec.odds,
                rec.stake,
                rec.created_at,
                rec.verified,
            ],
        )?;
        Ok(())
    }

    pub fn get_prediction(&self, prediction_id: &str) -> Result<Option<PredictionRecord>> {
        let conn = self.conn.lock().unwrap();
        get_prediction(&conn, prediction_id)
    }

    // ── Model metadata ───────────────────────────────────────────────────

    /// Upsert the metadata row for (model_name, bet_category). Retraining
    /// supersedes the previous row; there is no versioned history.
    pub fn upsert_model_record(&self, rec: &ModelRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ensemble_models (
                model_name, model_type, bet_category, accuracy, precision, recall, f1,
                samples_count, feature_importance_json, model_path, trained_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
             ON CONFLICT(model_name, bet_category) DO UPDATE SET
                model_type = excluded.model_type,
                accuracy = excluded.accuracy,
                precision = excluded.precision,
                recall = excluded.recall,
                f1 = excluded.f1,
                samples_count = excluded.samples_count,
                feature_importance_json = excluded.feature_importance_json,
                model_path = excluded.model_path,
                trained_at = excluded.trained_at",
            params![
                rec.model_name,
                rec.model_type,
                rec.category.as_str(),
                rec.accuracy,
                rec.precision,
                rec.recall,
                rec.f1,
                rec.samples_count,
                rec.feature_importance_json,
                rec.model_path,
                rec.trained_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_model_record(
        &self,
        model_name: &str,
        category: BetCategory,
    ) -> Result<Option<ModelRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, model_name, model_type, bet_category, accuracy, precision, recall, f1,
                    samples_count, feature_importance_json, model_path, trained_at
             FROM ensemble_models WHERE model_name = ?1 AND bet_category = ?2",
            params![model_name, category.as_str()],
            map_model_record,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Sample count the category's ensemble was last trained on (max across
    /// classifier kinds), used by the retrain trigger.
    pub fn last_trained_samples(&self, category: BetCategory) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let n: Option<i64> = conn.query_row(
            "SELECT MAX(samples_count) FROM ensemble_models WHERE bet_category = ?1",
            params![category.as_str()],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    // ── Learned aggregates (read side) ───────────────────────────────────

    pub fn load_calibration_bands(&self, category: BetCategory) -> Result<Vec<CalibrationBand>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT bet_category, confidence_band, predicted_count, actual_wins, calibration_factor
             FROM confidence_calibration WHERE bet_category = ?1 ORDER BY confidence_band",
        )?;
        let rows = stmt
            .query_map(params![category.as_str()], map_calibration_band)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_calibration_band(
        &self,
        category: BetCategory,
        band: &str,
    ) -> Result<Option<CalibrationBand>> {
        let conn = self.conn.lock().unwrap();
        get_calibration_band(&conn, category, band)
    }

    pub fn get_roi_record(
        &self,
        category: BetCategory,
        condition_key: &str,
    ) -> Result<Option<RoiRecord>> {
        let conn = self.conn.lock().unwrap();
        get_roi_record(&conn, category, condition_key)
    }

    pub fn load_roi_records(&self, category: BetCategory) -> Result<Vec<RoiRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT bet_category, condition_key, total_bets, wins, losses, total_staked,
                    total_returned, roi_percent, avg_odds, avg_ev
             FROM roi_analytics WHERE bet_category = ?1 ORDER BY condition_key",
        )?;
        let rows = stmt
            .query_map(params![category.as_str()], map_roi_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_error_pattern(
        &self,
        category: BetCategory,
        condition_key: &str,
    ) -> Result<Option<ErrorPattern>> {
        let conn = self.conn.lock().unwrap();
        get_error_pattern(&conn, category, condition_key)
    }

    pub fn get_league_learning(
        &self,
        league_code: &str,
        category: BetCategory,
    ) -> Result<Option<LeagueLearning>> {
        let conn = self.conn.lock().unwrap();
        get_league_learning(&conn, league_code, category)
    }

    // ── Learning log ─────────────────────────────────────────────────────

    pub fn log_event(
        &self,
        event_type: &str,
        description: &str,
        data_json: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        insert_log(&conn, event_type, description, data_json)
    }

    pub fn recent_log(&self, limit: i64) -> Result<Vec<LearningLogEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, event_type, description, data_json, created_at
             FROM learning_log ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(LearningLogEntry {
                    id: row.get(0)?,
                    event_type: row.get(1)?,
                    description: row.get(2)?,
                    data_json: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// ── Row helpers shared with the verification transaction ──────────────────
//
// These take a plain `&Connection` so they work both through the mutex and
// inside `Database::transaction` (rusqlite's Transaction derefs to it).

pub(crate) fn get_training_example(
    conn: &Connection,
    prediction_id: &str,
) -> Result<Option<TrainingExample>> {
    conn.query_row(
        "SELECT id, prediction_id, bet_category, features_json, target, rank, created_at
         FROM ml_training_data WHERE prediction_id = ?1",
        params![prediction_id],
        map_training_example,
    )
    .optional()
    .map_err(Into::into)
}

/// Flip the example's target, only if it is still null. Returns true when a
/// row actually transitioned, the idempotence guard for double verification.
pub(crate) fn mark_verified(conn: &Connection, prediction_id: &str, target: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE ml_training_data SET target = ?2 WHERE prediction_id = ?1 AND target IS NULL",
        params![prediction_id, target],
    )?;
    if changed > 0 {
        conn.execute(
            "UPDATE predictions SET verified = 1 WHERE prediction_id = ?1",
            params![prediction_id],
        )?;
    }
    Ok(changed > 0)
}

pub(crate) fn get_prediction(
    conn: &Connection,
    prediction_id: &str,
) -> Result<Option<PredictionRecord>> {
    conn.query_row(
        "SELECT prediction_id, bet_category, league_code, predicted_outcome, raw_confidence,
                final_confidence, odds, stake, created_at, verified
         FROM predictions WHERE prediction_id = ?1",
        params![prediction_id],
        map_prediction,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn get_calibration_band(
    conn: &Connection,
    category: BetCategory,
    band: &str,
) -> Result<Option<CalibrationBand>> {
    conn.query_row(
        "SELECT bet_category, confidence_band, predicted_count, actual_wins, calibration_factor
         FROM confidence_calibration WHERE bet_category = ?1 AND confidence_band = ?2",
        params![category.as_str(), band],
        map_calibration_band,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn upsert_calibration_band(conn: &Connection, band: &CalibrationBand) -> Result<()> {
    conn.execute(
        "INSERT INTO confidence_calibration (
            bet_category, confidence_band, predicted_count, actual_wins,
            calibration_factor, last_updated
         ) VALUES (?1,?2,?3,?4,?5,?6)
         ON CONFLICT(bet_category, confidence_band) DO UPDATE SET
            predicted_count = excluded.predicted_count,
            actual_wins = excluded.actual_wins,
            calibration_factor = excluded.calibration_factor,
            last_updated = excluded.last_updated",
        params![
            band.category.as_str(),
            band.band,
            band.predicted_count,
            band.actual_wins,
            band.calibration_factor,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub(crate) fn get_roi_record(
    conn: &Connection,
    category: BetCategory,
    condition_key: &str,
) -> Result<Option<RoiRecord>> {
    conn.query_row(
        "SELECT bet_category, condition_key, total_bets, wins, losses, total_staked,
                total_returned, roi_percent, avg_odds, avg_ev
         FROM roi_analytics WHERE bet_category = ?1 AND condition_key = ?2",
        params![category.as_str(), condition_key],
        map_roi_record,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn upsert_roi_record(conn: &Connection, rec: &RoiRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO roi_analytics (
            bet_category, condition_key, total_bets, wins, losses, total_staked,
            total_returned, roi_percent, avg_odds, avg_ev, last_updated
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
         ON CONFLICT(bet_category, condition_key) DO UPDATE SET
            total_bets = excluded.total_bets,
            wins = excluded.wins,
            losses = excluded.losses,
            total_staked = excluded.total_staked,
            total_returned = excluded.total_returned,
            roi_percent = excluded.roi_percent,
            avg_odds = excluded.avg_odds,
            avg_ev = excluded.avg_ev,
            last_updated = excluded.last_updated",
        params![
            rec.category.as_str(),
            rec.condition_key,
            rec.total_bets,
            rec.wins,
            rec.losses,
            rec.total_staked,
            rec.total_returned,
            rec.roi_percent,
            rec.avg_odds,
            rec.avg_ev,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub(crate) fn get_error_pattern(
    conn: &Connection,
    category: BetCategory,
    condition_key: &str,
) -> Result<Option<ErrorPattern>> {
    conn.query_row(
        "SELECT bet_category, condition_key, total_predictions, wins, losses,
                avg_confidence_when_failed, suggested_adjustment
         FROM feature_error_patterns WHERE bet_category = ?1 AND condition_key = ?2",
        params![category.as_str(), condition_key],
        map_error_pattern,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn upsert_error_pattern(conn: &Connection, pat: &ErrorPattern) -> Result<()> {
    conn.execute(
        "INSERT INTO feature_error_patterns (
            bet_category, condition_key, total_predictions, wins, losses,
            avg_confidence_when_failed, suggested_adjustment, last_updated
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(bet_category, condition_key) DO UPDATE SET
            total_predictions = excluded.total_predictions,
            wins = excluded.wins,
            losses = excluded.losses,
            avg_confidence_when_failed = excluded.avg_confidence_when_failed,
            suggested_adjustment = excluded.suggested_adjustment,
            last_updated = excluded.last_updated",
        params![
            pat.category.as_str(),
            pat.condition_key,
            pat.total_predictions,
            pat.wins,
            pat.losses,
            pat.avg_confidence_when_failed,
            pat.suggested_adjustment,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub(crate) fn get_league_learning(
    conn: &Connection,
    league_code: &str,
    category: BetCategory,
) -> Result<Option<LeagueLearning>> {
    conn.query_row(
        "SELECT league_code, bet_category, total_predictions, correct_predictions,
                accuracy, avg_confidence
         FROM league_learning WHERE league_code = ?1 AND bet_category = ?2",
        params![league_code, category.as_str()],
        map_league_learning,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn upsert_league_learning(conn: &Connection, ll: &LeagueLearning) -> Result<()> {
    conn.execute(
        "INSERT INTO league_learning (
            league_code, bet_category, total_predictions, correct_predictions,
            accuracy, avg_confidence, last_updated
         ) VALUES (?1,?2,?3,?4,?5,?6,?7)
         ON CONFLICT(league_code, bet_category) DO UPDATE SET
            total_predictions = excluded.total_predictions,
            correct_predictions = excluded.correct_predictions,
            accuracy = excluded.accuracy,
            avg_confidence = excluded.avg_confidence,
            last_updated = excluded.last_updated",
        params![
            ll.league_code,
            ll.category.as_str(),
            ll.total_predictions,
            ll.correct_predictions,
            ll.accuracy,
            ll.avg_confidence,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_log(
    conn: &Connection,
    event_type: &str,
    description: &str,
    data_json: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO learning_log (event_type, description, data_json, created_at)
         VALUES (?1,?2,?3,?4)",
        params![event_type, description, data_json, Utc::now()],
    )?;
    Ok(())
}

// ── SQL mappers ────────────────────────────────────────────────────────────

fn parse_category(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<BetCategory> {
    let s: String = row.get(idx)?;
    BetCategory::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown bet category {s}").into(),
        )
    })
}

fn map_training_example(row: &rusqlite::Row) -> rusqlite::Result<TrainingExample> {
    let features_json: String = row.get(3)?;
    let features: MatchFeatures = serde_json::from_str(&features_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(TrainingExample {
        id: row.get(0)?,
        prediction_id: row.get(1)?,
        category: parse_category(row, 2)?,
        features,
        target: row.get(4)?,
        rank: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<PredictionRecord> {
    Ok(PredictionRecord {
        prediction_id: row.get(0)?,
        category: parse_category(row, 1)?,
        league_code: row.get(2)?,
        predicted_outcome: row.get(3)?,
        raw_confidence: row.get(4)?,
        final_confidence: row.get(5)?,
        odds: row.get(6)?,
        stake: row.get(7)?,
        created_at: row.get(8)?,
        verified: row.get(9)?,
    })
}

fn map_model_record(row: &rusqlite::Row) -> rusqlite::Result<ModelRecord> {
    Ok(ModelRecord {
        id: row.get(0)?,
        model_name: row.get(1)?,
        model_type: row.get(2)?,
        category: parse_category(row, 3)?,
        accuracy: row.get(4)?,
        precision: row.get(5)?,
        recall: row.get(6)?,
        f1: row.get(7)?,
        samples_count: row.get(8)?,
        feature_importance_json: row.get(9)?,
        model_path: row.get(10)?,
        trained_at: row.get(11)?,
    })
}

fn map_calibration_band(row: &rusqlite::Row) -> rusqlite::Result<CalibrationBand> {
    Ok(CalibrationBand {
        category: parse_category(row, 0)?,
        band: row.get(1)?,
        predicted_count: row.get(2)?,
        actual_wins: row.get(3)?,
        calibration_factor: row.get(4)?,
    })
}

fn map_roi_record(row: &rusqlite::Row) -> rusqlite::Result<RoiRecord> {
    Ok(RoiRecord {
        category: parse_category(row, 0)?,
        condition_key: row.get(1)?,
        total_bets: row.get(2)?,
        wins: row.get(3)?,
        losses: row.get(4)?,
        total_staked: row.get(5)?,
        total_returned: row.get(6)?,
        roi_percent: row.get(7)?,
        avg_odds: row.get(8)?,
        avg_ev: row.get(9)?,
    })
}

fn map_error_pattern(row: &rusqlite::Row) -> rusqlite::Result<ErrorPattern> {
    Ok(ErrorPattern {
        category: parse_category(row, 0)?,
        condition_key: row.get(1)?,
        total_predictions: row.get(2)?,
        wins: row.get(3)?,
        losses: row.get(4)?,
        avg_confidence_when_failed: row.get(5)?,
        suggested_adjustment: row.get(6)?,
    })
}

fn map_league_learning(row: &rusqlite::Row) -> rusqlite::Result<LeagueLearning> {
    Ok(LeagueLearning {
        league_code: row.get(0)?,
        category: parse_category(row, 1)?,
        total_predictions: row.get(2)?,
        correct_predictions: row.get(3)?,
        accuracy: row.get(4)?,
        avg_confidence: row.get(5)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ml_training_data (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    prediction_id TEXT    NOT NULL UNIQUE,
    bet_category  TEXT    NOT NULL,
    features_json TEXT    NOT NULL,
    target        INTEGER,
    rank          INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT    NOT NULL
);

-- Legacy single-model table, superseded by ensemble_models. Kept so old
-- databases keep opening; nothing writes to it anymore.
CREATE TABLE IF NOT EXISTS ml_models (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    model_type    TEXT    NOT NULL,
    accuracy      REAL,
    precision     REAL,
    recall        REAL,
    f1            REAL,
    samples_count INTEGER,
    model_path    TEXT,
    trained_at    TEXT
);

CREATE TABLE IF NOT EXISTS ensemble_models (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    model_name              TEXT    NOT NULL,
    model_type              TEXT    NOT NULL,
    bet_category            TEXT    NOT NULL,
    accuracy                REAL,
    precision               REAL,
    recall                  REAL,
    f1                      REAL,
    samples_count           INTEGER NOT NULL,
    feature_importance_json TEXT,
    model_path              TEXT    NOT NULL,
    trained_at              TEXT    NOT NULL,
    UNIQUE(model_name, bet_category)
);

CREATE TABLE IF NOT EXISTS confidence_calibration (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    bet_category       TEXT    NOT NULL,
    confidence_band    TEXT    NOT NULL,
    predicted_count    INTEGER NOT NULL DEFAULT 0,
    actual_wins        INTEGER NOT NULL DEFAULT 0,
    calibration_factor REAL    NOT NULL DEFAULT 1.0,
    last_updated       TEXT    NOT NULL,
    UNIQUE(bet_category, confidence_band)
);

CREATE TABLE IF NOT EXISTS roi_analytics (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    bet_category   TEXT    NOT NULL,
    condition_key  TEXT    NOT NULL,
    total_bets     INTEGER NOT NULL DEFAULT 0,
    wins           INTEGER NOT NULL DEFAULT 0,
    losses         INTEGER NOT NULL DEFAULT 0,
    total_staked   REAL    NOT NULL DEFAULT 0,
    total_returned REAL    NOT NULL DEFAULT 0,
    roi_percent    REAL    NOT NULL DEFAULT 0,
    avg_odds       REAL    NOT NULL DEFAULT 0,
    avg_ev         REAL    NOT NULL DEFAULT 0,
    last_updated   TEXT    NOT NULL,
    UNIQUE(bet_category, condition_key)
);

CREATE TABLE IF NOT EXISTS feature_error_patterns (
    id                         INTEGER PRIMARY KEY AUTOINCREMENT,
    bet_category               TEXT    NOT NULL,
    condition_key              TEXT    NOT NULL,
    total_predictions          INTEGER NOT NULL DEFAULT 0,
    wins                       INTEGER NOT NULL DEFAULT 0,
    losses                     INTEGER NOT NULL DEFAULT 0,
    avg_confidence_when_failed REAL    NOT NULL DEFAULT 0,
    suggested_adjustment       REAL    NOT NULL DEFAULT 0,
    last_updated               TEXT    NOT NULL,
    UNIQUE(bet_category, condition_key)
);

CREATE TABLE IF NOT EXISTS league_learning (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    league_code         TEXT    NOT NULL,
    bet_category        TEXT    NOT NULL,
    total_predictions   INTEGER NOT NULL DEFAULT 0,
    correct_predictions INTEGER NOT NULL DEFAULT 0,
    accuracy            REAL    NOT NULL DEFAULT 0,
    avg_confidence      REAL    NOT NULL DEFAULT 0,
    last_updated        TEXT    NOT NULL,
    UNIQUE(league_code, bet_category)
);

CREATE TABLE IF NOT EXISTS learning_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type  TEXT    NOT NULL,
    description TEXT    NOT NULL,
    data_json   TEXT,
    created_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    prediction_id     TEXT    NOT NULL UNIQUE,
    bet_category      TEXT    NOT NULL,
    league_code       TEXT    NOT NULL,
    predicted_outcome TEXT    NOT NULL,
    raw_confidence    REAL    NOT NULL,
    final_confidence  REAL    NOT NULL,
    odds              REAL    NOT NULL,
    stake             REAL    NOT NULL,
    created_at        TEXT    NOT NULL,
    verified          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_training_category ON ml_training_data(bet_category);
CREATE INDEX IF NOT EXISTS idx_training_target ON ml_training_data(bet_category, target);
CREATE INDEX IF NOT EXISTS idx_predictions_category ON predictions(bet_category);
CREATE INDEX IF NOT EXISTS idx_log_created ON learning_log(created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().unwrap();

        let conn = db.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('ml_training_data','ml_models','ensemble_models','confidence_calibration',
                  'roi_analytics','feature_error_patterns','league_learning','learning_log',
                  'predictions')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 9);
    }

    #[test]
    fn training_example_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut features = MatchFeatures::default();
        features.home_injury_count = 4.0;

        db.insert_training_example("p-1", BetCategory::HomeWin, &features, 1)
            .unwrap();
        let ex = db.get_training_example("p-1").unwrap().unwrap();
        assert_eq!(ex.category, BetCategory::HomeWin);
        assert_eq!(ex.target, None);
        assert_eq!(ex.features.to_vec(), features.to_vec());
    }

    #[test]
    fn verified_count_ignores_pending_examples() {
        let db = Database::open_in_memory().unwrap();
        let f = MatchFeatures::default();
        db.insert_training_example("p-1", BetCategory::OverTotal, &f, 1)
            .unwrap();
        db.insert_training_example("p-2", BetCategory::OverTotal, &f, 1)
            .unwrap();
        assert_eq!(db.count_verified(BetCategory::OverTotal).unwrap(), 0);

        db.transaction(|tx| {
            assert!(mark_verified(tx, "p-1", 1).unwrap());
            Ok(())
        })
        .unwrap();
        assert_eq!(db.count_verified(BetCategory::OverTotal).unwrap(), 1);
    }

    #[test]
    fn mark_verified_is_single_shot() {
        let db = Database::open_in_memory().unwrap();
        let f = MatchFeatures::default();
        db.insert_training_example("p-1", BetCategory::Draw, &f, 1)
            .unwrap();

        db.transaction(|tx| {
            assert!(mark_verified(tx, "p-1", 0).unwrap());
            assert!(!mark_verified(tx, "p-1", 1).unwrap());
            Ok(())
        })
        .unwrap();

        // Second transition attempt must not have overwritten the target
        let ex = db.get_training_example("p-1").unwrap().unwrap();
        assert_eq!(ex.target, Some(0));
    }

    #[test]
    fn model_record_upsert_supersedes() {
        let db = Database::open_in_memory().unwrap();
        let mut rec = ModelRecord {
            id: None,
            model_name: "random_forest".into(),
            model_type: "tree_ensemble".into(),
            category: BetCategory::HomeWin,
            accuracy: 0.6,
            precision: 0.6,
            recall: 0.6,
            f1: 0.6,
            samples_count: 100,
            feature_importance_json: None,
            model_path: "models/rf_home_win.json".into(),
            trained_at: Utc::now(),
        };
        db.upsert_model_record(&rec).unwrap();
        rec.accuracy = 0.7;
        rec.samples_count = 160;
        db.upsert_model_record(&rec).unwrap();

        let loaded = db
            .get_model_record("random_forest", BetCategory::HomeWin)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.samples_count, 160);
        assert_eq!(
            db.last_trained_samples(BetCategory::HomeWin).unwrap(),
            Some(160)
        );
    }

    #[test]
    fn learning_log_is_append_only_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.log_event("model_retrained", "retrained home_win", None)
            .unwrap();
        db.log_event("pattern_detected", "derby & sharp money", None)
            .unwrap();
        let log = db.recent_log(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].event_type, "pattern_detected");
    }
}
