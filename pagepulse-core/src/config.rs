//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pagepulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pagepulse/` (~/.config/pagepulse/)
//! - State/Logs: `$XDG_STATE_HOME/pagepulse/` (~/.local/state/pagepulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment name that enables tracking unconditionally.
pub const PRODUCTION: &str = "production";

/// Longest identity cookie lifetime accepted from configuration, in days.
pub const MAX_COOKIE_AGE_DAYS: u32 = 3650;

/// Default downstream collector.
pub const DEFAULT_RELAY_URL: &str = "https://user-events-api.azurewebsites.net/api/UserEvents";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Tracking switch and environment
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Downstream collector
    #[serde(default)]
    pub relay: RelayConfig,

    /// Anonymous identity cookies
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Authenticated-caller detection
    #[serde(default)]
    pub auth: AuthConfig,

    /// Settings handed to the page-side session tracker
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Site-wide tracking switch.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Admin toggle. Outside production, identity cookies are only assigned
    /// when this is on.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deployment environment (production, staging, development, local)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: default_environment(),
        }
    }
}

impl TrackingConfig {
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }

    /// Whether identity assignment runs for requests in this deployment.
    pub fn assigns_identity(&self) -> bool {
        self.is_production() || self.enabled
    }
}

fn default_true() -> bool {
    true
}

fn default_environment() -> String {
    PRODUCTION.to_string()
}

/// HTTP listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

/// How the ingest endpoint waits on the relay.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Respond only after the relay attempt completes or times out; relay
    /// failures become a 500.
    #[default]
    Await,
    /// Respond 202 right away and relay on a spawned task.
    Detached,
}

/// Downstream collector configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Collector URL receiving `POST` of each enriched event
    #[serde(default = "default_relay_url")]
    pub url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,

    /// Static organization tag stamped on every event
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Bearer token for the collector, if it requires one
    pub api_key: Option<String>,

    #[serde(default)]
    pub mode: RelayMode,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            timeout_secs: default_relay_timeout(),
            organization: default_organization(),
            api_key: None,
            mode: RelayMode::default(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "relay.url must be an http(s) URL, got {:?}",
                self.url
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(Error::Config(
                "relay.timeout_secs must be between 1 and 60".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_relay_timeout() -> u64 {
    5
}

fn default_organization() -> String {
    "Devfinity".to_string()
}

/// Anonymous identity cookie configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Query parameter carrying a campaign-supplied identifier
    #[serde(default = "default_campaign_param")]
    pub campaign_param: String,

    /// Cookie lifetime in days
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            campaign_param: default_campaign_param(),
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_campaign_param() -> String {
    "campaign_user_id".to_string()
}

fn default_max_age_days() -> u32 {
    365
}

/// Authenticated-caller detection
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Cookie name prefixes that mark a logged-in session
    #[serde(default = "default_session_cookie_prefixes")]
    pub session_cookie_prefixes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_prefixes: default_session_cookie_prefixes(),
        }
    }
}

fn default_session_cookie_prefixes() -> Vec<String> {
    vec!["wordpress_logged_in_".to_string()]
}

/// Settings handed to the page-side session tracker
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Path of the ingest endpoint on the collector host, joined to the
    /// page's origin by the beacon
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Minimum gap between two sessions that may send, in milliseconds
    #[serde(default = "default_throttle_window_ms")]
    pub throttle_window_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            throttle_window_ms: default_throttle_window_ms(),
        }
    }
}

fn default_rest_url() -> String {
    crate::server::INGEST_PATH.to_string()
}

fn default_throttle_window_ms() -> u64 {
    60_000
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section that has constraints beyond its types
    pub fn validate(&self) -> Result<()> {
        self.relay.validate()?;
        if self.identity.campaign_param.trim().is_empty() {
            return Err(Error::Config(
                "identity.campaign_param must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_COOKIE_AGE_DAYS).contains(&self.identity.max_age_days) {
            return Err(Error::Config(format!(
                "identity.max_age_days must be between 1 and {}",
                MAX_COOKIE_AGE_DAYS
            )));
        }
        if self.client.throttle_window_ms == 0 {
            return Err(Error::Config(
                "client.throttle_window_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pagepulse/config.toml` (~/.config/pagepulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pagepulse").join("config.toml")
    }

    /// Returns the state directory path (for logs and client-side state)
    ///
    /// `$XDG_STATE_HOME/pagepulse/` (~/.local/state/pagepulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pagepulse")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pagepulse/pagepulse.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pagepulse.log")
    }
}
