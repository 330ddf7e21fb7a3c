//! Self-correcting sports-betting prediction engine.
//!
//! An ensemble of three classifiers votes on a fixed-schema feature vector
//! per bet category. Raw confidence is corrected by band-level calibration
//! learned from real outcomes, then nudged by realized ROI. Verified match
//! results drive every learning aggregate and trigger retraining once the
//! verified sample pool has grown enough.
//!
//! Entry points: [`engine::Engine::predict`],
//! [`engine::Engine::predict_calibrated`], [`engine::Engine::verify`] and
//! [`training::Trainer::train_category`].

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod features;
pub mod models;
pub mod training;

pub use config::Config;
pub use db::Database;
pub use engine::Engine;
pub use error::MlError;
pub use models::ModelRegistry;
pub use training::Trainer;
