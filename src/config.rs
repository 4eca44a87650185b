//! Configuration management for ovh-dynhost.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Named OVH API endpoints.
const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log verbosity; the `--log-level` flag wins over this.
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// Service returning the caller's public IPv4 as plain text.
    #[serde(default = "default_ip_service")]
    pub ip_service: String,

    /// Timeout for every outbound HTTP call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// OVH API credentials.
    #[serde(default)]
    pub ovh: OvhConfig,

    /// DynHost records to keep in sync, processed in order.
    #[serde(default)]
    pub dynhosts: Vec<Target>,
}

fn default_ip_service() -> String {
    "https://api.ipify.org".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_endpoint() -> String {
    "ovh-eu".to_string()
}

/// Log levels, least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// OVH API credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvhConfig {
    /// Endpoint name (e.g. "ovh-eu") or a full base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Application key (or environment variable name if prefixed with $).
    #[serde(default)]
    pub application_key: Option<String>,
    /// Application secret (or environment variable name if prefixed with $).
    #[serde(default)]
    pub application_secret: Option<String>,
    /// Consumer key obtained with `ovh-dynhost auth`.
    #[serde(default)]
    pub consumer_key: Option<String>,
}

impl Default for OvhConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            application_key: None,
            application_secret: None,
            consumer_key: None,
        }
    }
}

/// One DynHost record to keep in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Zone name (e.g. "example.com").
    pub domain: String,
    /// Sub-domain ("home" for home.example.com); absent means the zone apex.
    #[serde(default)]
    pub subdomain: Option<String>,
}

impl Target {
    pub fn new(domain: impl Into<String>, subdomain: Option<&str>) -> Self {
        Self {
            domain: domain.into(),
            subdomain: subdomain.map(str::to_string),
        }
    }

    /// Get the display name (subdomain.domain).
    pub fn display_name(&self) -> String {
        match self.subdomain.as_deref() {
            Some(sub) if !sub.is_empty() => format!("{}.{}", sub, self.domain),
            _ => self.domain.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            ip_service: default_ip_service(),
            timeout_secs: default_timeout(),
            ovh: OvhConfig::default(),
            dynhosts: Vec::new(),
        }
    }
}

impl Config {
    /// Locations searched when no path is given, in order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("ovh-dynhost").join("config.toml")),
            Some(PathBuf::from("/etc/ovh-dynhost/config.toml")),
            Some(PathBuf::from("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load configuration from a specific path, then apply `OVH_*` environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DdnsError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.ovh = config.ovh.with_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot describe a record.
    pub fn validate(&self) -> Result<()> {
        if let Some(target) = self.dynhosts.iter().find(|t| t.domain.trim().is_empty()) {
            return Err(DdnsError::Config(format!(
                "dynhost entry with empty domain (subdomain {:?})",
                target.subdomain
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DdnsError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// HTTP timeout applied to every outbound call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OvhConfig {
    /// Apply `OVH_ENDPOINT`, `OVH_APPLICATION_KEY`, `OVH_APPLICATION_SECRET`
    /// and `OVH_CONSUMER_KEY` on top of the file values.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("OVH_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(key) = lookup("OVH_APPLICATION_KEY") {
            self.application_key = Some(key);
        }
        if let Some(secret) = lookup("OVH_APPLICATION_SECRET") {
            self.application_secret = Some(secret);
        }
        if let Some(consumer_key) = lookup("OVH_CONSUMER_KEY") {
            self.consumer_key = Some(consumer_key);
        }
        self
    }

    /// Base URL of the configured endpoint.
    pub fn endpoint_url(&self) -> Result<String> {
        let endpoint = resolve_env(&self.endpoint);
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        ENDPOINTS
            .iter()
            .find(|(name, _)| *name == endpoint)
            .map(|(_, url)| url.to_string())
            .ok_or_else(|| DdnsError::Config(format!("unknown OVH endpoint {:?}", endpoint)))
    }

    /// Application key and secret, both required for any API call.
    pub fn application_credentials(&self) -> Result<(String, String)> {
        let key = required(&self.application_key, "application_key")?;
        let secret = required(&self.application_secret, "application_secret")?;
        Ok((key, secret))
    }

    /// Consumer key, required for authenticated calls.
    pub fn consumer_key(&self) -> Result<String> {
        required(&self.consumer_key, "consumer_key").map_err(|_| {
            DdnsError::Config(
                "no consumer key configured, run `ovh-dynhost auth` first".to_string(),
            )
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .as_deref()
        .map(resolve_env)
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
        .ok_or_else(|| DdnsError::Config(format!("missing OVH {}", name)))
}

/// Resolve environment variable references (values starting with $).
pub(crate) fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
log_level = "debug"
timeout_secs = 5

[ovh]
endpoint = "ovh-ca"
application_key = "ak"
application_secret = "as"

[[dynhosts]]
domain = "example.com"
subdomain = "home"

[[dynhosts]]
domain = "example.org"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.ip_service, "https://api.ipify.org");
        assert_eq!(config.ovh.endpoint, "ovh-eu");
        assert!(config.dynhosts.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.dynhosts,
            vec![
                Target::new("example.com", Some("home")),
                Target::new("example.org", None),
            ]
        );
        assert_eq!(
            config.ovh.endpoint_url().unwrap(),
            "https://ca.api.ovh.com/1.0"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.dynhosts.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, DdnsError::Config(_)));
    }

    #[test]
    fn test_empty_domain_rejected() {
        let config: Config = toml::from_str("[[dynhosts]]\ndomain = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_consumer_key() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let err = config.ovh.consumer_key().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        assert!(config.ovh.application_credentials().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let ovh = OvhConfig::default().with_env_overrides(|name| match name {
            "OVH_CONSUMER_KEY" => Some("ck".to_string()),
            "OVH_ENDPOINT" => Some("http://127.0.0.1:8080/".to_string()),
            _ => None,
        });
        assert_eq!(ovh.consumer_key().unwrap(), "ck");
        assert_eq!(ovh.endpoint_url().unwrap(), "http://127.0.0.1:8080");
        assert!(ovh.application_credentials().is_err());
    }

    #[test]
    fn test_unknown_endpoint() {
        let ovh = OvhConfig {
            endpoint: "ovh-mars".to_string(),
            ..OvhConfig::default()
        };
        assert!(ovh.endpoint_url().is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            Target::new("example.com", Some("home")).display_name(),
            "home.example.com"
        );
        assert_eq!(Target::new("example.com", None).display_name(), "example.com");
    }

    #[test]
    fn test_log_levels_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_resolve_env_with_value() {
        assert_eq!(resolve_env("plain_value"), "plain_value");
    }

    #[test]
    fn test_resolve_env_with_existing_var() {
        std::env::set_var("TEST_OVH_DYNHOST_VAR", "resolved_value");
        assert_eq!(resolve_env("$TEST_OVH_DYNHOST_VAR"), "resolved_value");
        std::env::remove_var("TEST_OVH_DYNHOST_VAR");
    }

    #[test]
    fn test_unresolved_secret_is_missing() {
        let ovh = OvhConfig {
            consumer_key: Some("$NONEXISTENT_VAR_12345".to_string()),
            ..OvhConfig::default()
        };
        assert!(ovh.consumer_key().is_err());
    }
}
