//! Credential persistence.
//!
//! The credential record is stored as a single JSON object. Freshness is
//! never stored; it is derived from `obtained_at`, `expires_in` and the
//! current time.

mod file;
#[cfg(test)]
mod memory;
pub mod secure;

pub use file::FileTokenStore;
#[cfg(test)]
pub use memory::MemoryTokenStore;
pub use secure::SecretString;

use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their nominal expiry.
pub const EXPIRY_BUFFER: Duration = Duration::seconds(1800);

/// Lifetime assumed when a stored record has no `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Upper bound on `expires_in` used in date arithmetic.
const MAX_EXPIRES_IN: u64 = u32::MAX as u64;

/// Persisted OAuth credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: SecretString,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<SecretString>,

    /// Seconds of validity from `obtained_at`.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,

    /// When the record was last written.
    #[serde(with = "timestamp")]
    pub obtained_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

impl CredentialRecord {
    /// Nominal expiry reported by the provider.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = Duration::seconds(self.expires_in.min(MAX_EXPIRES_IN) as i64);
        self.obtained_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The instant from which the record counts as expired.
    pub fn stale_at(&self) -> DateTime<Utc> {
        self.expires_at()
            .checked_sub_signed(EXPIRY_BUFFER)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether the record is expired at `now`. The buffer edge itself counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.stale_at()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Freshness check where a missing record is always expired.
pub fn is_expired(record: Option<&CredentialRecord>, now: DateTime<Utc>) -> bool {
    match record {
        Some(record) => record.is_expired_at(now),
        None => true,
    }
}

/// Unix timestamps with a fractional part, stored as JSON numbers.
///
/// Written with microsecond precision, rounded up so a reloaded value is never
/// earlier than the stamped one. Integer and fractional values both load.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const MICROS_PER_SEC: f64 = 1_000_000.0;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut micros = value.timestamp_micros();
        if value.timestamp_subsec_nanos() % 1_000 != 0 {
            micros += 1;
        }
        serializer.serialize_f64(micros as f64 / MICROS_PER_SEC)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        let micros = (secs * MICROS_PER_SEC).round();
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return Err(de::Error::custom(format!("timestamp out of range: {secs}")));
        }
        DateTime::from_timestamp_micros(micros as i64)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
    }
}

/// Storage backend for the credential record.
pub trait TokenStore: Send + Sync {
    /// Read the stored record. Missing or malformed data yields `None`.
    fn load(&self) -> Option<CredentialRecord>;

    /// Replace the stored record.
    fn save(&self, record: &CredentialRecord) -> Result<(), StoreError>;
}
