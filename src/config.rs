use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::TimeDelta;
use tracing::trace;

use crate::MetricKind;

/// Largest window chrono can represent in whole seconds
pub const MAX_WINDOW_SECS: u64 = (i64::MAX / 1000) as u64;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,

    /// How long CPU/memory must stay above threshold before alerting
    #[serde(default = "default_window_secs")]
    pub sustained_secs: u64,

    /// Minimum time between any two outbound notifications
    #[serde(default = "default_window_secs")]
    pub throttle_secs: u64,

    /// Period between cycle starts
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Path whose filesystem is reported as disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub exporter: ExporterConfig,

    #[serde(default)]
    pub alert: Alert,

    #[serde(default)]
    pub secrets: SecretsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            sustained_secs: default_window_secs(),
            throttle_secs: default_window_secs(),
            interval_secs: default_interval(),
            disk_path: default_disk_path(),
            probe: ProbeConfig::default(),
            exporter: ExporterConfig::default(),
            alert: Alert::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Config {
    /// Reject values that cannot drive the poll loop.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        for (name, secs) in [
            ("sustained_secs", self.sustained_secs),
            ("throttle_secs", self.throttle_secs),
        ] {
            if secs > MAX_WINDOW_SECS {
                bail!("{name} must not exceed {MAX_WINDOW_SECS}, got {secs}");
            }
        }
        Ok(())
    }

    pub fn sustained_duration(&self) -> TimeDelta {
        window(self.sustained_secs)
    }

    pub fn throttle_window(&self) -> TimeDelta {
        window(self.throttle_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Per-kind alert thresholds. Usage kinds are percentages, latency is milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_usage_threshold")]
    pub cpu: f64,
    #[serde(default = "default_usage_threshold")]
    pub memory: f64,
    #[serde(default = "default_usage_threshold")]
    pub disk: f64,
    #[serde(default = "default_latency_threshold")]
    pub latency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: default_usage_threshold(),
            memory: default_usage_threshold(),
            disk: default_usage_threshold(),
            latency: default_latency_threshold(),
        }
    }
}

impl Thresholds {
    pub fn for_kind(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Disk => self.disk,
            MetricKind::Latency => self.latency,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_host")]
    pub host: String,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: default_probe_host(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    Slack(Slack),
    Discord(Discord),
    Webhook(Webhook),
}

impl Default for Alert {
    fn default() -> Self {
        Alert::Slack(Slack::default())
    }
}

impl Alert {
    /// Channel name attached to every notification.
    pub fn channel(&self) -> &str {
        match self {
            Alert::Slack(slack) => &slack.channel,
            Alert::Discord(discord) => &discord.channel,
            Alert::Webhook(webhook) => &webhook.channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Slack {
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_slack_api")]
    pub api_url: String,
    /// Secret path holding the bot token
    #[serde(default = "default_slack_secret_path")]
    pub secret_path: String,
    #[serde(default = "default_slack_secret_field")]
    pub secret_field: String,
}

impl Default for Slack {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            api_url: default_slack_api(),
            secret_path: default_slack_secret_path(),
            secret_field: default_slack_secret_field(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
}

/// Where transport credentials come from
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SecretsConfig {
    /// HashiCorp Vault KV v2
    Vault {
        /// Defaults to `VAULT_ADDR`
        addr: Option<String>,
        /// Defaults to `VAULT_TOKEN`
        token: Option<String>,
    },

    /// Single environment variable, for local runs
    Env {
        #[serde(default = "default_secret_env")]
        var: String,
    },
}

impl Default for SecretsConfig {
    fn default() -> Self {
        SecretsConfig::Vault {
            addr: None,
            token: None,
        }
    }
}

/// Saturates instead of wrapping for windows past [`MAX_WINDOW_SECS`].
fn window(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

fn default_usage_threshold() -> f64 {
    80.0
}

fn default_latency_threshold() -> f64 {
    200.0
}

fn default_window_secs() -> u64 {
    300
}

fn default_interval() -> u64 {
    15
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_probe_host() -> String {
    "8.8.8.8".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((crate::util::get_addr(), crate::util::get_port()))
}

fn default_channel() -> String {
    "#monitoring".to_string()
}

fn default_slack_api() -> String {
    "https://slack.com/api".to_string()
}

fn default_slack_secret_path() -> String {
    "secret/data/slack_api_token".to_string()
}

fn default_slack_secret_field() -> String {
    "bot_token".to_string()
}

fn default_secret_env() -> String {
    "SLACK_BOT_TOKEN".to_string()
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in {path}"))?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
