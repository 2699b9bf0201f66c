use std::fmt;

use tracing::trace;

use crate::{PoolId, ServerId, balancer::BalanceMethod};

/// Engine-level monitoring configuration.
///
/// Values map to the environment surface (`NTP_TIMEOUT`,
/// `SYNC_INTERVAL_MINUTES`, `TIME_TOLERANCE_SECONDS`, `MAX_RETRY_ATTEMPTS`,
/// `MAX_CONCURRENT_CHECKS`). Intervals are kept in seconds internally; the
/// environment accepts minutes for the sync interval.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MonitorConfig {
    /// Per-check timeout in seconds.
    #[serde(default = "default_ntp_timeout_secs")]
    pub ntp_timeout_secs: u64,

    /// Poll cycle interval in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Maximum acceptable |offset| before a clock correction is attempted.
    #[serde(default = "default_time_tolerance_secs")]
    pub time_tolerance_secs: f64,

    /// Consecutive failures before a server goes offline; also the retry
    /// budget for clock corrections.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Upper bound on concurrent health checks per cycle.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Trailing window length (samples per server) for rolling statistics.
    #[serde(default = "default_retention_samples")]
    pub retention_samples: usize,

    /// Pool whose selected member drives the clock-sync decision.
    /// Defaults to the first enabled pool when unset.
    #[serde(default)]
    pub sync_pool_id: Option<PoolId>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ntp_timeout_secs: default_ntp_timeout_secs(),
            sync_interval_secs: default_sync_interval_secs(),
            time_tolerance_secs: default_time_tolerance_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            max_concurrent_checks: default_max_concurrent_checks(),
            retention_samples: default_retention_samples(),
            sync_pool_id: None,
        }
    }
}

fn default_ntp_timeout_secs() -> u64 {
    10
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_time_tolerance_secs() -> f64 {
    5.0
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_max_concurrent_checks() -> usize {
    10
}

fn default_retention_samples() -> usize {
    120
}

/// How aggressively the anomaly detector flags deviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Sensitivity {
    /// Number of standard deviations a sample must stray from the rolling
    /// mean to count as anomalous.
    pub fn k(self) -> f64 {
        match self {
            Sensitivity::Low => 3.5,
            Sensitivity::Medium => 3.0,
            Sensitivity::High => 2.5,
        }
    }
}

/// Alerting thresholds and hysteresis settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlertConfig {
    /// Response time hard threshold in milliseconds.
    #[serde(default = "default_response_time_ms")]
    pub response_time_ms: f64,

    /// |offset| hard threshold in milliseconds.
    #[serde(default = "default_offset_ms")]
    pub offset_ms: f64,

    /// Minimum acceptable uptime percentage over the evaluation window.
    #[serde(default = "default_uptime_percent")]
    pub uptime_percent: f64,

    /// Consecutive breaching (resp. clean) samples before an alert opens
    /// (resp. auto-resolves).
    #[serde(default = "default_debounce")]
    pub debounce: usize,

    #[serde(default = "default_sensitivity")]
    pub sensitivity: Sensitivity,

    /// Master switch for threshold rules.
    #[serde(default = "default_true")]
    pub thresholds_enabled: bool,

    /// Master switch for statistical anomaly detection.
    #[serde(default = "default_true")]
    pub anomaly_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            response_time_ms: default_response_time_ms(),
            offset_ms: default_offset_ms(),
            uptime_percent: default_uptime_percent(),
            debounce: default_debounce(),
            sensitivity: default_sensitivity(),
            thresholds_enabled: true,
            anomaly_enabled: true,
        }
    }
}

fn default_response_time_ms() -> f64 {
    1000.0
}

fn default_offset_ms() -> f64 {
    100.0
}

fn default_uptime_percent() -> f64 {
    95.0
}

fn default_debounce() -> usize {
    3
}

fn default_sensitivity() -> Sensitivity {
    Sensitivity::Medium
}

fn default_true() -> bool {
    true
}

/// Static configuration for one monitored server.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServerConfig {
    pub id: ServerId,
    pub name: String,
    pub host: String,
    #[serde(default = "default_ntp_port")]
    pub port: u16,
    /// Relative weight for weighted balancing; 0 excludes the member.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_ntp_port() -> u16 {
    123
}

fn default_weight() -> f64 {
    1.0
}

/// Static configuration for a pool of servers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PoolConfig {
    pub id: PoolId,
    pub name: String,
    #[serde(default = "default_method")]
    pub method: BalanceMethod,
    /// Member server ids in registration order.
    pub members: Vec<ServerId>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_method() -> BalanceMethod {
    BalanceMethod::Weighted
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// Invalid configuration rejected at the administrative boundary.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ntp_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "NTP_TIMEOUT must be greater than 0".into(),
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "sync interval must be greater than 0".into(),
            ));
        }
        if self.time_tolerance_secs < 0.0 {
            return Err(ConfigError::InvalidValue(
                "TIME_TOLERANCE_SECONDS must not be negative".into(),
            ));
        }
        if self.max_concurrent_checks == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_CONCURRENT_CHECKS must be greater than 0".into(),
            ));
        }
        if self.retention_samples == 0 {
            return Err(ConfigError::InvalidValue(
                "retention_samples must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.response_time_ms <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "response_time_ms threshold must be positive".into(),
            ));
        }
        if self.offset_ms <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "offset_ms threshold must be positive".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.uptime_percent) {
            return Err(ConfigError::InvalidValue(
                "uptime_percent must be between 0 and 100".into(),
            ));
        }
        if self.debounce == 0 {
            return Err(ConfigError::InvalidValue(
                "debounce must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        self.alerts.validate()?;
        Ok(())
    }

    /// Overlay environment variables on top of file-provided values.
    ///
    /// `SYNC_INTERVAL_MINUTES` is accepted in minutes for compatibility
    /// with the deployment surface.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>("NTP_TIMEOUT") {
            self.monitor.ntp_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("SYNC_INTERVAL_MINUTES") {
            self.monitor.sync_interval_secs = v * 60;
        }
        if let Some(v) = env_parse::<f64>("TIME_TOLERANCE_SECONDS") {
            self.monitor.time_tolerance_secs = v;
        }
        if let Some(v) = env_parse::<u32>("MAX_RETRY_ATTEMPTS") {
            self.monitor.max_retry_attempts = v;
        }
        if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_CHECKS") {
            self.monitor.max_concurrent_checks = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
