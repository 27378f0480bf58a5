//! Client configuration
//!
//! Settings can come from (later sources are usually layered on top by the caller):
//! 1. Built-in defaults (local server, API version 0, local timezone)
//! 2. A JSON file
//! 3. `LATHERMAIL_*` environment variables

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{LathermailClient, DEFAULT_API_VERSION, DEFAULT_URL};
use crate::error::{LathermailError, LathermailResult};
use crate::timezone::Zone;
use crate::transport::ReqwestTransport;

/// Settings needed to build a [`LathermailClient`]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server base URL
    pub url: String,
    pub api_version: u32,
    /// Inbox identifier
    pub user: Option<String>,
    /// Inbox password
    pub password: Option<String>,
    /// `local`, an IANA zone name or a fixed offset like `+03:00`
    pub timezone: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            user: None,
            password: None,
            timezone: None,
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> LathermailResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LathermailError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> LathermailResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LathermailError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Load configuration from `LATHERMAIL_*` environment variables
    pub fn from_env() -> LathermailResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    ///
    /// Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> LathermailResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LATHERMAIL_URL") {
            config.url = url;
        }
        if let Some(version) = lookup("LATHERMAIL_API_VERSION") {
            config.api_version = version.trim().parse().map_err(|_| {
                LathermailError::Config(format!("LATHERMAIL_API_VERSION is not a number: {}", version))
            })?;
        }
        config.user = lookup("LATHERMAIL_INBOX");
        config.password = lookup("LATHERMAIL_PASSWORD");
        config.timezone = lookup("LATHERMAIL_TIMEZONE");
        if let Some(timeout) = lookup("LATHERMAIL_TIMEOUT_SECS") {
            config.timeout_secs = Some(timeout.trim().parse().map_err(|_| {
                LathermailError::Config(format!("LATHERMAIL_TIMEOUT_SECS is not a number: {}", timeout))
            })?);
        }

        Ok(config)
    }

    /// Configured timezone, system local when unset
    pub fn zone(&self) -> LathermailResult<Zone> {
        match &self.timezone {
            Some(name) => name.parse(),
            None => Ok(Zone::Local),
        }
    }

    /// Build a client from these settings
    pub fn build_client(&self) -> LathermailResult<LathermailClient> {
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| LathermailError::Config("inbox (user) is not set".to_string()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| LathermailError::Config("password is not set".to_string()))?;

        let mut builder = LathermailClient::builder(user, password)
            .url(self.url.as_str())
            .api_version(self.api_version)
            .timezone(self.zone()?);
        if let Some(secs) = self.timeout_secs {
            builder = builder.transport(ReqwestTransport::with_timeout(Duration::from_secs(secs))?);
        }
        builder.build()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timezone", &self.timezone)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LathermailClient {
    /// Build a client from a [`ClientConfig`]
    pub fn from_config(config: &ClientConfig) -> LathermailResult<Self> {
        config.build_client()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "url": "http://mail.test:5000/",
            "api_version": 1,
            "user": "u1",
            "password": "p1",
            "timezone": "Europe/Berlin",
            "timeout_secs": 10
        }"#;

        let config = ClientConfig::from_json(json).unwrap();
        assert_eq!(config.url, "http://mail.test:5000/");
        assert_eq!(config.api_version, 1);
        assert_eq!(config.user.as_deref(), Some("u1"));
        assert_eq!(config.timeout_secs, Some(10));
        assert!(matches!(config.zone().unwrap(), Zone::Named(_)));

        let client = config.build_client().unwrap();
        assert_eq!(client.api_url().as_str(), "http://mail.test:5000/api/1/");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ClientConfig::from_json(r#"{ "user": "u1" }"#).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.zone().unwrap(), Zone::Local);

        // No password: cannot build a client
        assert!(matches!(config.build_client(), Err(LathermailError::Config(_))));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LATHERMAIL_URL", "http://env.test/"),
            ("LATHERMAIL_API_VERSION", "2"),
            ("LATHERMAIL_INBOX", "inbox"),
            ("LATHERMAIL_PASSWORD", "secret"),
            ("LATHERMAIL_TIMEZONE", "+02:00"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.url, "http://env.test/");
        assert_eq!(config.api_version, 2);
        assert_eq!(config.user.as_deref(), Some("inbox"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(matches!(config.zone().unwrap(), Zone::Fixed(_)));
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_bad_lookup_values() {
        let result = ClientConfig::from_lookup(|name| {
            (name == "LATHERMAIL_API_VERSION").then(|| "zero".to_string())
        });
        assert!(matches!(result, Err(LathermailError::Config(_))));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = ClientConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
