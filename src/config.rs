//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use crate::error::ConfigError;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

pub const ENV_CLIENT_ID: &str = "O365_CLIENT_ID";
pub const ENV_TENANT_ID: &str = "O365_TENANT_ID";
pub const ENV_TOKEN_FILE: &str = "O365_TOKEN_FILE";
pub const ENV_TIMEZONE: &str = "TZ";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub api: ApiConfig,
    pub token: TokenConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub tenant: String,
    pub authority: String,
    pub scopes: ScopesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopesConfig {
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub graph_base_url: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub file_name: String,
    /// Resolved location of the token file, filled in by [`Config::load`].
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub timezone: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = toml::from_str(CONFIG_TOML)
            .map_err(|e| ConfigError::Invalid(format!("embedded config.toml: {e}")))?;

        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(client_id) = var(ENV_CLIENT_ID) {
            config.oauth.client_id = client_id;
        }

        if let Some(tenant) = var(ENV_TENANT_ID) {
            config.oauth.tenant = tenant;
        }

        if let Some(timezone) = var(ENV_TIMEZONE) {
            config.display.timezone = timezone;
        }

        config.validate()?;

        config.token.path = match var(ENV_TOKEN_FILE) {
            Some(path) => PathBuf::from(path),
            None => default_token_path(&config.token.file_name)?,
        };

        if config.display.timezone.parse::<Tz>().is_err() {
            warn!(
                "Unknown display time zone '{}', falling back to UTC",
                config.display.timezone
            );
            config.display.timezone = "UTC".to_string();
        }

        Ok(config)
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.client_id.is_empty() {
            return Err(ConfigError::Missing(ENV_CLIENT_ID));
        }

        if self.oauth.tenant.is_empty() {
            return Err(ConfigError::Missing(ENV_TENANT_ID));
        }

        Url::parse(&self.oauth.authority)
            .map_err(|e| ConfigError::Invalid(format!("authority URL: {e}")))?;
        Url::parse(&self.api.graph_base_url)
            .map_err(|e| ConfigError::Invalid(format!("Graph base URL: {e}")))?;

        if self.oauth.scopes.scopes.is_empty() {
            return Err(ConfigError::Invalid("no OAuth scopes configured".into()));
        }

        Ok(())
    }

    /// Space-separated scope string for token requests.
    pub fn scope(&self) -> String {
        self.oauth.scopes.scopes.join(" ")
    }

    /// Get the device code endpoint for Azure AD.
    pub fn device_code_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/devicecode",
            self.oauth.authority.trim_end_matches('/'),
            self.oauth.tenant
        )
    }

    /// Get the token URL for Azure AD.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.oauth.authority.trim_end_matches('/'),
            self.oauth.tenant
        )
    }

    pub fn token_file(&self) -> &Path {
        &self.token.path
    }

    /// The time zone events are displayed in.
    pub fn display_timezone(&self) -> Tz {
        self.display.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_seconds)
    }
}

/// Default token location.
///
/// Returns `~/.config/o365cal/token.json` on Linux and
/// `~/Library/Application Support/de.malvik.o365cal/token.json` on macOS.
fn default_token_path(file_name: &str) -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("de", "malvik", "o365cal")
        .map(|dirs| dirs.config_dir().join(file_name))
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "could not determine config directory; set {ENV_TOKEN_FILE}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_CLIENT_ID, "test-client"),
            (ENV_TENANT_ID, "test-tenant"),
            (ENV_TOKEN_FILE, "/tmp/o365cal-test/token.json"),
        ]
    }

    #[test]
    fn test_config_parsing() {
        let result = toml::from_str::<Config>(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());
    }

    #[test]
    fn test_missing_client_id() {
        let result = Config::load_with(env_of(&[(ENV_TENANT_ID, "t")]));
        assert!(matches!(result, Err(ConfigError::Missing(ENV_CLIENT_ID))));
    }

    #[test]
    fn test_missing_tenant_id() {
        let result = Config::load_with(env_of(&[(ENV_CLIENT_ID, "c"), (ENV_TENANT_ID, "  ")]));
        assert!(matches!(result, Err(ConfigError::Missing(ENV_TENANT_ID))));
    }

    #[test]
    fn test_urls() {
        let config = Config::load_with(env_of(&full_env())).unwrap();

        assert_eq!(
            config.device_code_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/token"
        );
        assert_eq!(config.scope(), "Calendars.Read User.Read offline_access");
    }

    #[test]
    fn test_token_file_override() {
        let config = Config::load_with(env_of(&full_env())).unwrap();
        assert_eq!(config.token_file(), Path::new("/tmp/o365cal-test/token.json"));
    }

    #[test]
    fn test_default_token_file_name() {
        let config = Config::load_with(env_of(&[
            (ENV_CLIENT_ID, "c"),
            (ENV_TENANT_ID, "t"),
        ]));
        // Home directory may be unavailable in sandboxed test runs
        if let Ok(config) = config {
            assert!(config.token_file().ends_with("token.json"));
        }
    }

    #[test]
    fn test_timezone() {
        let mut env = full_env();
        env.push((ENV_TIMEZONE, "Europe/Oslo"));
        let config = Config::load_with(env_of(&env)).unwrap();
        assert_eq!(config.display_timezone(), chrono_tz::Europe::Oslo);

        let config = Config::load_with(env_of(&full_env())).unwrap();
        assert_eq!(config.display_timezone(), chrono_tz::UTC);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let mut env = full_env();
        env.push((ENV_TIMEZONE, "Mars/Olympus_Mons"));
        let config = Config::load_with(env_of(&env)).unwrap();
        assert_eq!(config.display.timezone, "UTC");
        assert_eq!(config.display_timezone(), chrono_tz::UTC);
    }
}
