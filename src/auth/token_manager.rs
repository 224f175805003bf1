//! Token lifecycle: device-code sign-in, persistence, expiry checks and silent refresh.
//!
//! Nothing is cached between invocations. Every check rebuilds the state from
//! the stored record and the current time.

use crate::auth::oauth::{
    DeviceCodeChallenge, Grant, TokenEndpoint, TokenResponse, AUTHORIZATION_PENDING,
    EXPIRED_TOKEN, SLOW_DOWN,
};
use crate::clock::Clock;
use crate::error::{AuthError, StoreError};
use crate::store::{self, CredentialRecord, SecretString, TokenStore};
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

/// Added to the polling interval each time the provider answers `slow_down`.
pub const SLOW_DOWN_INCREMENT: StdDuration = StdDuration::from_secs(5);

/// Upper bound on a device-code expiry window, in seconds.
const MAX_CHALLENGE_SECONDS: u64 = 24 * 60 * 60;

/// Snapshot of the stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    NotAuthenticated,
    Valid {
        expires_at: DateTime<Utc>,
        remaining: Duration,
    },
    Expired {
        refreshable: bool,
    },
}

/// Hands out valid access tokens, refreshing them when possible.
pub struct TokenManager<E, S, C> {
    endpoint: E,
    store: S,
    clock: C,
}

impl<E, S, C> TokenManager<E, S, C>
where
    E: TokenEndpoint,
    S: TokenStore,
    C: Clock,
{
    pub fn new(endpoint: E, store: S, clock: C) -> Self {
        Self {
            endpoint,
            store,
            clock,
        }
    }

    /// Read the stored record; malformed data counts as absent.
    pub fn load(&self) -> Option<CredentialRecord> {
        self.store.load()
    }

    /// Whether `record` is expired right now. `None` is always expired.
    pub fn is_expired(&self, record: Option<&CredentialRecord>) -> bool {
        store::is_expired(record, self.clock.now())
    }

    /// Stamp `record` with the current time and persist it.
    pub fn save(&self, mut record: CredentialRecord) -> Result<CredentialRecord, StoreError> {
        record.obtained_at = self.clock.now();
        self.store.save(&record)?;
        Ok(record)
    }

    pub fn status(&self) -> TokenStatus {
        let Some(record) = self.load() else {
            return TokenStatus::NotAuthenticated;
        };

        if self.is_expired(Some(&record)) {
            TokenStatus::Expired {
                refreshable: record.has_refresh_token(),
            }
        } else {
            let expires_at = record.expires_at();
            TokenStatus::Valid {
                expires_at,
                remaining: expires_at - self.clock.now(),
            }
        }
    }

    /// Start the device-code flow.
    pub async fn start_device_auth(&self) -> Result<DeviceCodeChallenge, AuthError> {
        let challenge = self.endpoint.request_device_code().await?;
        info!(
            "Device code issued, expires in {}s, polling every {}s",
            challenge.expires_in, challenge.interval
        );
        Ok(challenge)
    }

    /// Poll the token endpoint until the user completes sign-in.
    ///
    /// The challenge's `expires_in` is a hard deadline; no wait extends past it.
    pub async fn poll_for_token(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<CredentialRecord, AuthError> {
        let window = challenge.expires_in.min(MAX_CHALLENGE_SECONDS) as i64;
        let deadline = self.clock.now() + Duration::seconds(window);
        let mut interval = StdDuration::from_secs(challenge.interval.max(1));

        loop {
            let now = self.clock.now();
            if now >= deadline {
                info!("Device code flow timed out");
                return Err(AuthError::Timeout);
            }

            let remaining = (deadline - now).to_std().unwrap_or_default();
            self.clock.sleep(interval.min(remaining)).await;

            match self
                .endpoint
                .exchange(Grant::DeviceCode(challenge.device_code.expose()))
                .await
            {
                Ok(response) => {
                    let record = self.save(record_from_response(response, None))?;
                    info!("Device sign-in complete, token expires at {}", record.expires_at());
                    return Ok(record);
                }
                Err(err) => match err.code() {
                    Some(AUTHORIZATION_PENDING) => debug!("Authorization pending"),
                    Some(SLOW_DOWN) => {
                        interval += SLOW_DOWN_INCREMENT;
                        debug!("Provider asked to slow down, interval now {:?}", interval);
                    }
                    Some(EXPIRED_TOKEN) => {
                        info!("Device code expired");
                        return Err(AuthError::Timeout);
                    }
                    Some(code) => {
                        info!("Device code flow rejected: {}", code);
                        return Err(AuthError::Rejected(err.to_string()));
                    }
                    None => warn!("Token poll failed, retrying: {}", err),
                },
            }
        }
    }

    /// Exchange the record's refresh token for a new access token.
    ///
    /// Fails with [`AuthError::RefreshUnavailable`] when there is no refresh
    /// token or the provider refuses it.
    pub async fn refresh(&self, record: &CredentialRecord) -> Result<CredentialRecord, AuthError> {
        let Some(refresh_token) = record.refresh_token.as_ref().filter(|t| !t.is_empty()) else {
            return Err(AuthError::RefreshUnavailable("no refresh token stored".into()));
        };

        let response = self
            .endpoint
            .exchange(Grant::RefreshToken(refresh_token.expose()))
            .await
            .map_err(|e| {
                debug!("Token refresh failed: {}", e);
                AuthError::RefreshUnavailable(e.to_string())
            })?;

        let record = self.save(record_from_response(response, Some(refresh_token)))?;
        info!("Token refreshed, expires at {}", record.expires_at());
        Ok(record)
    }

    /// A currently valid access token, refreshed if needed.
    ///
    /// Never starts interactive sign-in; fails with [`AuthError::Required`] instead.
    pub async fn get_valid_access_token(&self) -> Result<SecretString, AuthError> {
        let Some(record) = self.load() else {
            debug!("No stored token");
            return Err(AuthError::Required);
        };

        if !record.is_expired_at(self.clock.now()) {
            return Ok(record.access_token);
        }

        if !record.has_refresh_token() {
            debug!("Stored token expired and cannot be refreshed");
            return Err(AuthError::Required);
        }

        match self.refresh(&record).await {
            Ok(refreshed) => Ok(refreshed.access_token),
            Err(AuthError::RefreshUnavailable(reason)) => {
                info!("Refresh unavailable: {}", reason);
                Err(AuthError::Required)
            }
            Err(e) => Err(e),
        }
    }
}

/// Build a record from a token response. `obtained_at` is set on save.
///
/// Azure AD does not always rotate refresh tokens, so the previous one is kept
/// when the response has none.
fn record_from_response(
    response: TokenResponse,
    previous_refresh: Option<&SecretString>,
) -> CredentialRecord {
    CredentialRecord {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or_else(|| previous_refresh.cloned()),
        expires_in: response.expires_in,
        obtained_at: DateTime::<Utc>::UNIX_EPOCH,
        token_type: response.token_type,
        scope: response.scope,
    }
}

/// Format duration as human-readable string (e.g., "45 min", "1 hour").
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();

    if total_minutes < 1 {
        "< 1 min".to_string()
    } else if total_minutes < 60 {
        format!("{} min", total_minutes)
    } else {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}
