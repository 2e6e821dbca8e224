// src/config.rs

//! Manages service configuration: loading from TOML, environment overrides, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Which credential store implementation to run against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    #[default]
    Mysql,
    /// Track accounts in process memory only. Nothing is provisioned.
    Memory,
}

/// Connection settings for the credential store.
#[derive(Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database holding the bookkeeping table.
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            user: String::new(),
            password: String::new(),
            server: String::new(),
            port: default_db_port(),
            schema: default_schema(),
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn default_db_port() -> u16 {
    3306
}
fn default_schema() -> String {
    "ps_otu_sql".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Settings for the identity REST API.
#[derive(Serialize, Deserialize, Clone)]
pub struct IdentityConfig {
    pub api_url: String,
    pub api_key: String,
    /// Authorizing group identifiers whose groups are synchronized.
    pub ldap_groups: Vec<String>,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            ldap_groups: Vec::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("ldap_groups", &self.ldap_groups)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9597
}

/// `ldap_groups` may be written as a single (comma-separated) string or as a list.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum LdapGroupsConfig {
    One(String),
    Many(Vec<String>),
}

impl Default for LdapGroupsConfig {
    fn default() -> Self {
        LdapGroupsConfig::Many(Vec::new())
    }
}

#[derive(Deserialize)]
struct RawIdentityConfig {
    #[serde(default)]
    api_url: String,
    #[serde(default)]
    api_key: String,
    #[serde(default, alias = "ldap_group")]
    ldap_groups: LdapGroupsConfig,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    request_timeout: Duration,
}

impl Default for RawIdentityConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            ldap_groups: LdapGroupsConfig::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(with = "humantime_serde", default = "default_interval")]
    poll_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_interval")]
    cleanup_interval: Duration,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    identity: RawIdentityConfig,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_interval() -> Duration {
    Duration::from_secs(60)
}

/// Represents the final, validated, and resolved service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    /// How often the reconcile task polls the identity source.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How often the sweep task drops expired accounts.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval: default_interval(),
            cleanup_interval: default_interval(),
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Splits a comma-separated group list, dropping blanks.
fn split_groups(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Parses TOML into a resolved but not yet validated configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        let ldap_groups = match raw.identity.ldap_groups {
            LdapGroupsConfig::One(s) => split_groups(&s),
            LdapGroupsConfig::Many(list) => list
                .iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
        };
        Ok(Config {
            log_level: raw.log_level,
            poll_interval: raw.poll_interval,
            cleanup_interval: raw.cleanup_interval,
            database: raw.database,
            identity: IdentityConfig {
                api_url: raw.identity.api_url,
                api_key: raw.identity.api_key,
                ldap_groups,
                request_timeout: raw.identity.request_timeout,
            },
            metrics: raw.metrics,
        })
    }

    /// Creates a new `Config` instance by reading, parsing and validating a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file '{path}'"))
    }

    /// Loads the file at `path` (or the defaults), applies overrides from `lookup` and
    /// validates the result.
    pub fn load<F>(path: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Applies the environment variables understood by the service. Unset or empty
    /// variables leave the current value alone, as does an interval of 0.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = get("DB_SERVER") {
            self.database.server = v;
        }
        if let Some(v) = get("DB_PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => self.database.port = port,
                Err(_) => warn!("Ignoring invalid DB_PORT '{}'.", v),
            }
        }
        if let Some(v) = get("API_URL") {
            self.identity.api_url = v;
        }
        if let Some(v) = get("API_KEY") {
            self.identity.api_key = v;
        }
        if let Some(v) = get("LDAP_GROUP") {
            self.identity.ldap_groups = split_groups(&v);
        }
        if let Some(v) = get("POLL_INTERVAL") {
            match v.trim().parse::<u64>() {
                Ok(0) => warn!("Ignoring POLL_INTERVAL=0, keeping {:?}.", self.poll_interval),
                Ok(secs) => self.poll_interval = Duration::from_secs(secs),
                Err(_) => warn!("Ignoring invalid POLL_INTERVAL '{}'.", v),
            }
        }
        if let Some(v) = get("CLEANUP_INTERVAL") {
            match v.trim().parse::<u64>() {
                Ok(0) => warn!("Ignoring CLEANUP_INTERVAL=0, keeping {:?}.", self.cleanup_interval),
                Ok(secs) => self.cleanup_interval = Duration::from_secs(secs),
                Err(_) => warn!("Ignoring invalid CLEANUP_INTERVAL '{}'.", v),
            }
        }
        if let Some(v) = get("METRICS_PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => self.metrics.port = port,
                Err(_) => warn!("Ignoring invalid METRICS_PORT '{}'.", v),
            }
        }
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll_interval cannot be 0"));
        }
        if self.cleanup_interval.is_zero() {
            return Err(anyhow!("cleanup_interval cannot be 0"));
        }

        if self.database.backend == StoreBackend::Mysql {
            if self.database.user.trim().is_empty() {
                return Err(anyhow!("database.user (DB_USER) cannot be empty"));
            }
            if self.database.password.is_empty() {
                return Err(anyhow!("database.password (DB_PASSWORD) cannot be empty"));
            }
            if self.database.server.trim().is_empty() {
                return Err(anyhow!("database.server (DB_SERVER) cannot be empty"));
            }
            if self.database.port == 0 {
                return Err(anyhow!("database.port cannot be 0"));
            }
            if self.database.max_connections == 0 {
                return Err(anyhow!("database.max_connections cannot be 0"));
            }
        }
        if crate::core::store::identifier::validate_schema(&self.database.schema).is_err() {
            return Err(anyhow!(
                "database.schema '{}' must contain only letters, digits and underscores",
                self.database.schema
            ));
        }

        let api_url = Url::parse(&self.identity.api_url).with_context(|| {
            format!(
                "identity.api_url (API_URL) '{}' is not a valid URL",
                self.identity.api_url
            )
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(anyhow!("identity.api_url must use http or https"));
        }
        if self.identity.api_key.trim().is_empty() {
            return Err(anyhow!("identity.api_key (API_KEY) cannot be empty"));
        }
        if self.identity.ldap_groups.is_empty() {
            return Err(anyhow!(
                "identity.ldap_groups (LDAP_GROUP) must name at least one group"
            ));
        }
        if self.identity.request_timeout.is_zero() {
            return Err(anyhow!("identity.request_timeout cannot be 0"));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(anyhow!("metrics.port cannot be 0"));
        }
        Ok(())
    }
}
