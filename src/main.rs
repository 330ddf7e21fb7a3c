use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use oddsloop::db::models::BetCategory;
use oddsloop::engine::verify::retrain_is_due;
use oddsloop::training::SCHEDULED_RETRAIN_CATEGORIES;
use oddsloop::{Config, Database, ModelRegistry, Trainer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let registry = Arc::new(ModelRegistry::new(config.model_dir.as_str())?);
    let trainer = Arc::new(Trainer::new(
        db.clone(),
        Arc::clone(&registry),
        config.min_training_samples,
    ));

    // Background retrain scheduler: sweep the scheduled categories and
    // retrain the ones whose verified sample pool has grown enough.
    if config.no_scheduler {
        info!("Retrain scheduler disabled (serve-only mode)");
    } else {
        let sched_db = db.clone();
        let sched_trainer = Arc::clone(&trainer);
        let growth_ratio = config.retrain_growth_ratio;
        let sweep = Duration::from_secs(config.retrain_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep);
            loop {
                interval.tick().await;
                for &label in SCHEDULED_RETRAIN_CATEGORIES {
                    let Some(category) = BetCategory::parse(label) else {
                        warn!(label, "unknown scheduled category, skipping");
                        continue;
                    };
                    match retrain_is_due(&sched_db, category, growth_ratio) {
                        Ok(false) => {}
                        Ok(true) => {
                            info!(%category, "retrain due, training");
                            let t = Arc::clone(&sched_trainer);
                            let result =
                                tokio::task::spawn_blocking(move || t.train_category(category))
                                    .await;
                            match result {
                                Ok(Ok(report)) => info!(
                                    %category,
                                    trained = report.trained.len(),
                                    failed = report.failed.len(),
                                    samples = report.total_samples,
                                    "retrain finished"
                                ),
                                Ok(Err(e)) => warn!(%category, "retrain failed: {e}"),
                                Err(e) => error!(%category, "retrain task panicked: {e}"),
                            }
                        }
                        Err(e) => warn!(%category, "retrain check failed: {e}"),
                    }
                }
            }
        });
    }

    // Periodic learning-stats summary
    {
        let stats_db = db.clone();
        let stats_interval = Duration::from_secs(config.stats_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(stats_interval);
            loop {
                interval.tick().await;
                for category in BetCategory::ALL {
                    match (
                        stats_db.count_verified(category),
                        stats_db.get_roi_record(category, "overall"),
                    ) {
                        (Ok(verified), Ok(roi)) if verified > 0 => {
                            let roi_pct = roi.map(|r| r.roi_percent).unwrap_or(0.0);
                            info!(%category, verified, roi_pct, "learning stats");
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            warn!(%category, "stats query failed: {e}")
                        }
                        _ => {}
                    }
                }
            }
        });
    }

    info!("oddsloop running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
