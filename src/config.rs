//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file, or falls back to defaults when no file
//!     exists. an existing but invalid file stops startup.
//!
//! structure:
//!     - PollingConfig: sampling cadence and per-read device timeout.
//!     - DeviceConfig: which device client to use and where the dish lives.
//!     - ServerConfig: loopback address of the json api.
//!     - HistoryConfig / LogsConfig: sizes of the rolling windows.
//!     - LoggingConfig: console log level.
//!
//! every section is optional; a missing section takes its defaults.
//!
//! ==============================================================================

use anyhow::{bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// upper bound on a single device read
    pub timeout_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 2, timeout_ms: 1500 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// real terminal over http
    Dish,
    /// fake telemetry, no hardware needed
    Simulated,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    /// status endpoint, used when kind = "dish"
    pub url: String,
    /// simulated dish only
    pub base_down_mbps: f64,
    pub base_up_mbps: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::Dish,
            url: "http://192.168.100.1:9201/status".to_string(),
            base_down_mbps: 180.0,
            base_up_mbps: 15.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1:8000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        // one minute at the default 2s cadence
        Self { capacity: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogsConfig {
    pub capacity: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// log every poll at info instead of debug
    pub show_samples: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_samples: false }
    }
}

impl DashboardConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DashboardConfig = toml::from_str(content)
            .context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// runs before tracing is initialized (the log level comes from here),
    /// so it reports on stdout.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let paths = [
            PathBuf::from("config").join("dashboard.toml"),
            PathBuf::from("..").join("config").join("dashboard.toml"),
        ];
        Self::load_first(&paths)
    }

    /// first existing file wins; defaults only when none exists
    ///
    /// a file that exists but fails to parse or validate is an error, never
    /// a silent fallback to defaults.
    pub fn load_first(paths: &[PathBuf]) -> anyhow::Result<Self> {
        for path in paths {
            if path.exists() {
                let config = Self::load(path)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                println!("[CONFIG] Loaded from {}", path.display());
                return Ok(config);
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Ok(Self::default())
    }

    /// reject settings the sampler or store cannot honor
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.polling.interval_seconds == 0 {
            bail!("polling.interval_seconds must be at least 1");
        }
        if self.polling.timeout_ms == 0 || self.polling.timeout() > self.polling.interval() {
            bail!(
                "polling.timeout_ms must be between 1 and the polling interval ({} ms)",
                self.polling.interval().as_millis()
            );
        }
        if self.history.capacity == 0 {
            bail!("history.capacity must be at least 1");
        }
        if self.logs.capacity == 0 {
            bail!("logs.capacity must be at least 1");
        }
        let addr = self.bind_addr()?;
        if !addr.ip().is_loopback() {
            bail!("server.bind must be a loopback address, got {}", addr);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind address {:?}", self.server.bind))
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        info!("┌─────────────────────────────────────────┐");
        info!("│        DASHBOARD CONFIGURATION          │");
        info!("├─────────────────────────────────────────┤");
        info!("│ Device: {:?}", self.device.kind);
        if self.device.kind == DeviceKind::Dish {
            info!("│ Dish URL: {}", self.device.url);
        }
        info!("│ Poll Interval: {}s (timeout {}ms)", self.polling.interval_seconds, self.polling.timeout_ms);
        info!("│ History: {} samples | Logs: {} entries", self.history.capacity, self.logs.capacity);
        info!("│ API: http://{}", self.server.bind);
        info!("│ Log Level: {}", self.logging.level);
        info!("└─────────────────────────────────────────┘");
    }
}
