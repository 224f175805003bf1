//! OAuth2 device-code client for Azure AD authentication.

use crate::config::Config;
use crate::error::AuthError;
use crate::store::SecretString;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Grant type for completing a device-code flow (RFC 8628).
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// User has not finished signing in yet.
pub const AUTHORIZATION_PENDING: &str = "authorization_pending";
/// Client is polling too fast.
pub const SLOW_DOWN: &str = "slow_down";
/// The device code is no longer valid.
pub const EXPIRED_TOKEN: &str = "expired_token";

/// A credential to exchange at the token endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    DeviceCode(&'a str),
    RefreshToken(&'a str),
}

impl Grant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::DeviceCode(_) => DEVICE_CODE_GRANT_TYPE,
            Self::RefreshToken(_) => "refresh_token",
        }
    }
}

/// Device authorization response from Azure AD.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeChallenge {
    /// Only ever sent back to the token endpoint.
    pub device_code: SecretString,
    /// Short code the user types at `verification_uri`.
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until the device code expires.
    #[serde(default = "default_challenge_expires_in")]
    pub expires_in: u64,
    /// Minimum seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

fn default_challenge_expires_in() -> u64 {
    900
}

fn default_poll_interval() -> u64 {
    5
}

/// Token response from Azure AD.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default = "default_token_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_expires_in() -> u64 {
    3600
}

/// OAuth error body returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ProviderError {
    /// First line of the description, or the error code.
    pub fn message(&self) -> &str {
        self.error_description
            .as_deref()
            .and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
            .unwrap_or(self.error.as_str())
    }
}

/// Why a token exchange did not produce a token.
#[derive(Error, Debug)]
pub enum GrantError {
    #[error("{}", .0.message())]
    Provider(ProviderError),

    #[error("token request failed: {0}")]
    Transport(String),
}

impl GrantError {
    /// OAuth error code, if the provider sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Provider(e) => Some(e.error.as_str()),
            Self::Transport(_) => None,
        }
    }
}

/// The provider's device-code and token endpoints.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Start a device-code flow.
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError>;

    /// Exchange a grant for tokens.
    async fn exchange(&self, grant: Grant<'_>) -> Result<TokenResponse, GrantError>;
}

/// OAuth2 client for Azure AD device-code authentication.
pub struct AzureAdClient {
    client_id: String,
    scope: String,
    device_code_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl AzureAdClient {
    /// Create a new OAuth2 client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client_id: config.oauth.client_id.clone(),
            scope: config.scope(),
            device_code_url: config.device_code_url(),
            token_url: config.token_url(),
            http_client,
        })
    }
}

#[async_trait]
impl TokenEndpoint for AzureAdClient {
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.device_code_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::InitFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::InitFailed(e.to_string()))?;

        if !status.is_success() {
            // Raw body only at debug level
            debug!("Device code request failed: HTTP {} - {}", status, body);
            let reason = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.message().to_string())
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(AuthError::InitFailed(reason));
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::InitFailed(format!("invalid device code response: {e}")))
    }

    async fn exchange(&self, grant: Grant<'_>) -> Result<TokenResponse, GrantError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("grant_type", grant.grant_type()),
        ];
        match grant {
            Grant::DeviceCode(code) => params.push(("device_code", code)),
            Grant::RefreshToken(token) => {
                params.push(("refresh_token", token));
                params.push(("scope", self.scope.as_str()));
            }
        }

        debug!("Requesting token with grant type {}", grant.grant_type());

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GrantError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GrantError::Transport(e.to_string()))?;

        parse_token_body(status, &body)
    }
}

/// Interpret a token endpoint response.
///
/// Error bodies are accepted on any status; some servers answer 200 with an
/// OAuth error object.
fn parse_token_body(status: reqwest::StatusCode, body: &str) -> Result<TokenResponse, GrantError> {
    if status.is_success() {
        if let Ok(token) = serde_json::from_str::<TokenResponse>(body) {
            return Ok(token);
        }
    }

    match serde_json::from_str::<ProviderError>(body) {
        Ok(err) => Err(GrantError::Provider(err)),
        Err(_) if status.is_success() => Err(GrantError::Transport(
            "invalid token response".to_string(),
        )),
        Err(_) => Err(GrantError::Provider(ProviderError {
            error: format!("http_{}", status.as_u16()),
            error_description: Some(format!("token endpoint returned HTTP {}", status.as_u16())),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_parse_token_success() {
        let body = r#"{"token_type":"Bearer","scope":"Calendars.Read","expires_in":4371,
            "access_token":"eyJ0eXAi","refresh_token":"0.AAAA"}"#;
        let token = parse_token_body(StatusCode::OK, body).unwrap();
        assert_eq!(token.access_token.expose(), "eyJ0eXAi");
        assert_eq!(token.refresh_token.unwrap().expose(), "0.AAAA");
        assert_eq!(token.expires_in, 4371);
    }

    #[test]
    fn test_parse_pending() {
        let body = r#"{"error":"authorization_pending","error_description":"AADSTS70016: OAuth 2.0 device flow error. Authorization is pending.\r\nTrace ID: 1234"}"#;
        let err = parse_token_body(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(err.code(), Some(AUTHORIZATION_PENDING));
        assert_eq!(
            err.to_string(),
            "AADSTS70016: OAuth 2.0 device flow error. Authorization is pending."
        );
    }

    #[test]
    fn test_parse_error_in_success_status() {
        let body = r#"{"error":"slow_down"}"#;
        let err = parse_token_body(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.code(), Some(SLOW_DOWN));
        assert_eq!(err.to_string(), "slow_down");
    }

    #[test]
    fn test_parse_non_json_error() {
        let err = parse_token_body(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert_eq!(err.code(), Some("http_502"));

        let err = parse_token_body(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, GrantError::Transport(_)));
    }

    #[test]
    fn test_device_code_defaults() {
        let body = r#"{"device_code":"DAQABAAEAAA","user_code":"FQK5HW3UF",
            "verification_uri":"https://microsoft.com/devicelogin"}"#;
        let challenge: DeviceCodeChallenge = serde_json::from_str(body).unwrap();
        assert_eq!(challenge.interval, 5);
        assert_eq!(challenge.expires_in, 900);
        assert_eq!(challenge.user_code, "FQK5HW3UF");
        assert!(!format!("{:?}", challenge).contains("DAQABAAEAAA"));
    }

    #[test]
    fn test_grant_types() {
        assert_eq!(Grant::DeviceCode("x").grant_type(), DEVICE_CODE_GRANT_TYPE);
        assert_eq!(Grant::RefreshToken("x").grant_type(), "refresh_token");
    }
}
