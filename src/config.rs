//! Process configuration.
//!
//! Loaded from a YAML file, with a `DATABASE_URL` environment-variable
//! override for the connection string layered on top — the same split
//! `db::Database::connect` uses for `PG_POOL_SIZE`.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Scheduler sleep between cycles, in milliseconds.
    #[serde(default = "default_match_interval_ms")]
    pub default_match_interval_ms: u64,
    /// Lock reclamation threshold, in seconds.
    #[serde(default = "default_order_lock_timeout_seconds")]
    pub order_lock_timeout_seconds: i64,
    /// Default batch size for newly registered matchers.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: u32,
}

fn default_match_interval_ms() -> u64 {
    1000
}
fn default_order_lock_timeout_seconds() -> i64 {
    60
}
fn default_batch_size() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineConfig {
    /// Intervals the close-out sweep runs for. Defaults to all supported
    /// intervals.
    #[serde(default = "default_sweep_intervals")]
    pub sweep_intervals: Vec<String>,
}

fn default_sweep_intervals() -> Vec<String> {
    vec!["1m", "5m", "15m", "30m", "1h", "4h", "1d", "1w"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// If true, publish failures are dropped after one retry; if false,
    /// logged and dropped.
    #[serde(default)]
    pub best_effort: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_log_file() -> String {
    "spotmatch-core.log".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            use_json: false,
            log_dir: default_log_dir(),
            log_file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Overridden by the `DATABASE_URL` environment variable when set.
    pub database_url: String,
    pub matching: MatchingConfig,
    #[serde(default = "default_kline_config")]
    pub kline: KlineConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Per-call deadline for datastore operations, in milliseconds.
    #[serde(default = "default_datastore_deadline_ms")]
    pub datastore_deadline_ms: u64,
}

fn default_kline_config() -> KlineConfig {
    KlineConfig {
        sweep_intervals: default_sweep_intervals(),
    }
}

fn default_datastore_deadline_ms() -> u64 {
    5000
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_yaml::from_str(&raw)?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        Ok(config)
    }

    pub fn datastore_deadline(&self) -> Duration {
        Duration::from_millis(self.datastore_deadline_ms)
    }

    pub fn match_interval(&self) -> Duration {
        Duration::from_millis(self.matching.default_match_interval_ms)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { best_effort: true }
    }
}
