use clap::Parser;

/// Self-correcting sports betting prediction engine
#[derive(Parser, Debug, Clone)]
#[command(name = "oddsloop", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "oddsloop.db")]
    pub database_path: String,

    /// Directory where serialized model artifacts are stored
    #[arg(long, env = "MODEL_DIR", default_value = "models")]
    pub model_dir: String,

    /// Flat stake per recommendation in units (used for ROI bookkeeping)
    #[arg(long, env = "STAKE_UNITS", default_value = "1.0")]
    pub stake_units: f64,

    /// Minimum verified examples required before a category can train
    #[arg(long, env = "MIN_TRAINING_SAMPLES", default_value = "50")]
    pub min_training_samples: usize,

    /// Retrain when verified samples exceed last-trained count by this ratio
    #[arg(long, env = "RETRAIN_GROWTH_RATIO", default_value = "0.2")]
    pub retrain_growth_ratio: f64,

    /// Retrain scheduler sweep interval in seconds
    #[arg(long, env = "RETRAIN_INTERVAL_SECS", default_value = "3600")]
    pub retrain_interval_secs: u64,

    /// Disable the background retrain scheduler (serve-only mode)
    #[arg(long, env = "NO_SCHEDULER", default_value = "false")]
    pub no_scheduler: bool,

    /// Learning-stats log interval in seconds
    #[arg(long, env = "STATS_INTERVAL_SECS", default_value = "900")]
    pub stats_interval_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stake_units <= 0.0 {
            anyhow::bail!("stake_units must be positive");
        }
        if self.min_training_samples == 0 {
            anyhow::bail!("min_training_samples must be at least 1");
        }
        if !(0.0..=10.0).contains(&self.retrain_growth_ratio) {
            anyhow::bail!("retrain_growth_ratio must be between 0.0 and 10.0");
        }
        if self.retrain_interval_secs == 0 {
            anyhow::bail!("retrain_interval_secs must be positive");
        }
        Ok(())
    }
}
