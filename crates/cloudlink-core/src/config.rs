use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poller::Poller;
use crate::retry::RetrySpec;

/// Seconds as `f64` to a `Duration`; negative or non-finite values become zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Retry parameters for transport failures (`[connection.retry]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Stop retrying once this many seconds have passed since the first attempt.
    pub timeout_secs: f64,
    /// Delay before the second attempt, in seconds (e.g. 0.5 = 500ms).
    pub retry_delay_secs: f64,
    /// Multiplier applied to the delay after every failed attempt (>= 1).
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            retry_delay_secs: 1.0,
            backoff: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn to_spec(&self) -> RetrySpec {
        RetrySpec::new(
            secs(self.timeout_secs),
            secs(self.retry_delay_secs),
            self.backoff,
        )
    }
}

/// Per-connection transport settings (`[connection]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Permit plaintext (non-TLS) endpoints. Off by default.
    pub allow_insecure: bool,
    /// Add a unique `cache-busting` parameter to GET requests.
    pub cache_busting: bool,
    /// Proxy URL. Takes precedence over the environment.
    pub proxy_url: Option<String>,
    /// Consult `http_proxy` / `HTTP_PROXY` when `proxy_url` is unset.
    pub trust_env: bool,
    /// Connect timeout for a single attempt.
    pub connect_timeout_secs: u64,
    /// Total timeout for a single attempt (connect + transfer).
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            allow_insecure: false,
            cache_busting: false,
            proxy_url: None,
            trust_env: true,
            connect_timeout_secs: 15,
            request_timeout_secs: 60,
            user_agent: concat!("cloudlink/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Build a poller from config values. `max_attempts == 0` means no attempt bound.
fn poller(interval_secs: f64, max_attempts: u32, timeout_secs: Option<f64>) -> Poller {
    let mut poller = Poller::new(secs(interval_secs));
    if max_attempts > 0 {
        poller = poller.max_attempts(max_attempts);
    }
    if let Some(t) = timeout_secs {
        poller = poller.timeout(secs(t));
    }
    poller
}

/// Waiting for an asynchronous request to leave the pending state (`[poll]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: f64,
    /// Give up after this many status queries (0 = unbounded).
    pub max_attempts: u32,
    /// Give up after this many seconds (unset = unbounded).
    pub timeout_secs: Option<f64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10.0,
            max_attempts: 3,
            timeout_secs: None,
        }
    }
}

impl PollConfig {
    pub fn to_poller(&self) -> Poller {
        poller(self.interval_secs, self.max_attempts, self.timeout_secs)
    }
}

/// Waiting for a cancellation to be confirmed (`[confirm]`). Same fields as
/// [`PollConfig`], with a longer default bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    pub interval_secs: f64,
    /// 0 = unbounded.
    pub max_attempts: u32,
    pub timeout_secs: Option<f64>,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10.0,
            max_attempts: 30,
            timeout_secs: None,
        }
    }
}

impl ConfirmConfig {
    pub fn to_poller(&self) -> Poller {
        poller(self.interval_secs, self.max_attempts, self.timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/cloudlink/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudlinkConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub confirm: ConfirmConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cloudlink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CloudlinkConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<CloudlinkConfig> {
    if !path.exists() {
        let default_cfg = CloudlinkConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(path)
}

pub fn load_from(path: &Path) -> Result<CloudlinkConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: CloudlinkConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CloudlinkConfig::default();
        assert!(!cfg.connection.allow_insecure);
        assert!(!cfg.connection.cache_busting);
        assert!(cfg.connection.proxy_url.is_none());
        assert_eq!(cfg.connection.retry.timeout_secs, 30.0);
        assert_eq!(cfg.poll.max_attempts, 3);
        assert_eq!(cfg.confirm.max_attempts, 30);
        assert!(cfg.connection.user_agent.starts_with("cloudlink/"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CloudlinkConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CloudlinkConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_sections() {
        let toml = r#"
            [connection]
            allow_insecure = true
            proxy_url = "http://127.0.0.1:3128"

            [connection.retry]
            retry_delay_secs = 0.5
            backoff = 2.0

            [poll]
            interval_secs = 2.5
        "#;
        let cfg: CloudlinkConfig = toml::from_str(toml).unwrap();
        assert!(cfg.connection.allow_insecure);
        assert_eq!(cfg.connection.proxy_url.as_deref(), Some("http://127.0.0.1:3128"));
        assert_eq!(cfg.connection.connect_timeout_secs, 15);
        assert_eq!(cfg.connection.retry.timeout_secs, 30.0);
        let spec = cfg.connection.retry.to_spec();
        assert_eq!(spec.retry_delay(), Duration::from_millis(500));
        assert_eq!(spec.backoff(), 2.0);
        assert_eq!(cfg.poll.to_poller().interval(), Duration::from_millis(2500));
        assert_eq!(cfg.poll.max_attempts, 3);
        assert_eq!(cfg.confirm, ConfirmConfig::default());
    }

    #[test]
    fn partial_confirm_section_keeps_its_own_defaults() {
        let toml = r#"
            [poll]
            max_attempts = 0

            [confirm]
            interval_secs = 2.0
        "#;
        let cfg: CloudlinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.confirm.max_attempts, 30);
        assert_eq!(
            cfg.confirm.to_poller(),
            Poller::new(Duration::from_secs(2)).max_attempts(30)
        );
        // 0 lifts the attempt bound
        assert_eq!(cfg.poll.to_poller(), Poller::new(Duration::from_secs(10)));
    }

    #[test]
    fn negative_seconds_become_zero() {
        let retry = RetryConfig {
            timeout_secs: -1.0,
            retry_delay_secs: f64::NAN,
            backoff: 1.0,
        };
        let spec = retry.to_spec();
        assert_eq!(spec.timeout(), Duration::ZERO);
        assert_eq!(spec.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn load_or_init_creates_file_then_reads_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, CloudlinkConfig::default());

        fs::write(&path, "[connection]\ncache_busting = true\n").unwrap();
        let loaded = load_or_init_at(&path).unwrap();
        assert!(loaded.connection.cache_busting);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[connection\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }
}
