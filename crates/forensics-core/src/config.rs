use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18080;
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Top-level config (forensics.toml + FORENSICS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub middleware: MiddlewareConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Number of concurrent analysis worker tasks (spec §5 default 3).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            worker_count: default_worker_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Rate-limit / duplicate-upload middleware tunables (spec §4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Token bucket capacity R (default 5).
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,
    /// Sliding window W in seconds (default 60).
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Duplicate-upload rolling window in hours (default 24).
    #[serde(default = "default_duplicate_window_hours")]
    pub duplicate_window_hours: i64,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            rate_capacity: default_rate_capacity(),
            rate_window_secs: default_rate_window_secs(),
            duplicate_window_hours: default_duplicate_window_hours(),
        }
    }
}

/// Quota tunables (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_free_quota")]
    pub daily_free_quota: i64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_free_quota: default_daily_free_quota(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Job-queue tunables (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    #[serde(default = "default_retry_backoffs_secs")]
    pub retry_backoffs_secs: Vec<u64>,
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: i64,
    #[serde(default = "default_failure_ttl_secs")]
    pub failure_ttl_secs: i64,
    /// Backpressure threshold — enqueue refuses new jobs past this pending count (spec §5).
    #[serde(default = "default_max_pending_jobs")]
    pub max_pending_jobs: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            job_timeout_secs: default_job_timeout_secs(),
            retry_backoffs_secs: default_retry_backoffs_secs(),
            result_ttl_secs: default_result_ttl_secs(),
            failure_ttl_secs: default_failure_ttl_secs(),
            max_pending_jobs: default_max_pending_jobs(),
        }
    }
}

/// External analysis API tunables (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_base_url")]
    pub base_url: String,
    #[serde(default = "default_analysis_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: default_analysis_base_url(),
            timeout_secs: default_analysis_timeout_secs(),
        }
    }
}

/// Object store tunables (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_blob_base_url")]
    pub blob_base_url: String,
    #[serde(default = "default_blob_ttl_hours")]
    pub blob_ttl_hours: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            blob_base_url: default_blob_base_url(),
            blob_ttl_hours: default_blob_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_worker_count() -> usize {
    3
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.forensics-bot/forensics.db", home)
}
fn default_rate_capacity() -> u32 {
    5
}
fn default_rate_window_secs() -> u64 {
    60
}
fn default_duplicate_window_hours() -> i64 {
    24
}
fn default_daily_free_quota() -> i64 {
    3
}
fn default_max_upload_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_job_timeout_secs() -> u64 {
    300
}
fn default_retry_backoffs_secs() -> Vec<u64> {
    vec![10, 30, 60]
}
fn default_result_ttl_secs() -> i64 {
    3600
}
fn default_failure_ttl_secs() -> i64 {
    24 * 3600
}
fn default_max_pending_jobs() -> i64 {
    500
}
fn default_analysis_base_url() -> String {
    "https://detector.internal".to_string()
}
fn default_analysis_timeout_secs() -> u64 {
    30
}
fn default_blob_base_url() -> String {
    "https://blobs.internal".to_string()
}
fn default_blob_ttl_hours() -> i64 {
    24
}

impl AppConfig {
    /// Load config from a TOML file with FORENSICS_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. FORENSICS_CONFIG env var
    ///   3. ~/.forensics-bot/forensics.toml
    ///
    /// Nested sections are separated by a double underscore, e.g.
    /// `FORENSICS_MIDDLEWARE__RATE_CAPACITY=10` overrides
    /// `middleware.rate_capacity` — a single underscore would also split
    /// inside the multi-word leaf field name itself.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("FORENSICS_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: AppConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("FORENSICS_").split("__"))
            .extract()
            .map_err(|e| crate::error::ForensicsError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.forensics-bot/forensics.toml", home)
}
