use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// NUT daemons to monitor. At least one entry is required.
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// One upsd daemon to poll. `name` becomes the `server` label on metrics
/// and the `{server}` segment of REST routes.
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_nut_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Connect at startup instead of on the first query. Startup failures
    /// are logged, not fatal; the daemon may come up later.
    #[serde(default)]
    pub eager_connect: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub collect_status_metrics: bool,
    #[serde(default = "default_true")]
    pub collect_variable_metrics: bool,
    /// `LIST CLIENT` costs one extra round-trip per device per scrape.
    #[serde(default = "default_true")]
    pub collect_client_metrics: bool,
}

fn default_nut_port() -> u16 {
    3493
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    5
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9199
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            collect_status_metrics: true,
            collect_variable_metrics: true,
            collect_client_metrics: true,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("NUT_MONITOR").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Checks the assembled configuration. Separate from [`Config::load`]
    /// so command-line overrides can complete the monitor list first.
    pub fn validate(&self) -> Result<()> {
        if self.monitors.is_empty() {
            bail!("no NUT servers configured: add a [[monitors]] entry with name and host");
        }
        let mut names = BTreeSet::new();
        for monitor in &self.monitors {
            if monitor.name.is_empty() {
                bail!("a [[monitors]] entry has an empty name");
            }
            if monitor.host.is_empty() {
                bail!("monitor '{}' has an empty host", monitor.name);
            }
            if !names.insert(monitor.name.as_str()) {
                bail!("duplicate monitor name: '{}'", monitor.name);
            }
            if monitor.connect_timeout_secs == 0 || monitor.read_timeout_secs == 0 {
                bail!(
                    "monitor '{}': timeouts must be at least 1 second",
                    monitor.name
                );
            }
        }
        Ok(())
    }
}

impl MonitorConfig {
    /// A monitor with default port and timeouts; handy in tests and docs.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: default_nut_port(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            eager_connect: false,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
