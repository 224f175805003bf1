//! Command handlers.
//!
//! Each handler asks the token manager for credentials and prints its result to stdout.

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::auth::graph::GraphClient;
use crate::auth::oauth::{AzureAdClient, TokenEndpoint};
use crate::auth::token_manager::{format_duration, TokenManager, TokenStatus};
use crate::calendar::{render_day, render_upcoming, DateRange};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{AppError, AuthError};
use crate::store::{FileTokenStore, TokenStore};

/// Event limit for single-day views.
const DAY_EVENT_LIMIT: u32 = 20;
/// Event limit for multi-day views.
const UPCOMING_EVENT_LIMIT: u32 = 50;

pub type Tokens = TokenManager<AzureAdClient, FileTokenStore, SystemClock>;

/// Outcome of the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    NotAuthenticated,
    Valid { remaining: Duration },
    Refreshed,
    NeedsAuth,
}

impl StatusReport {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Refreshed)
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotAuthenticated => "❌ Not authenticated. Run: o365cal auth".to_string(),
            Self::Valid { remaining } => {
                format!("✅ Authenticated (token valid for {})", format_duration(*remaining))
            }
            Self::Refreshed => "✅ Token refreshed successfully".to_string(),
            Self::NeedsAuth => "❌ Token expired. Run: o365cal auth".to_string(),
        }
    }
}

/// Inspect the stored token, refreshing it when it has expired.
///
/// Only failures that sign-in cannot fix, such as a token file that cannot be
/// written, are returned as errors.
pub async fn check_status<E, S, C>(tokens: &TokenManager<E, S, C>) -> Result<StatusReport, AuthError>
where
    E: TokenEndpoint,
    S: TokenStore,
    C: Clock,
{
    match tokens.status() {
        TokenStatus::NotAuthenticated => Ok(StatusReport::NotAuthenticated),
        TokenStatus::Valid { remaining, .. } => Ok(StatusReport::Valid { remaining }),
        TokenStatus::Expired { refreshable: false } => Ok(StatusReport::NeedsAuth),
        TokenStatus::Expired { refreshable: true } => match tokens.get_valid_access_token().await {
            Ok(_) => Ok(StatusReport::Refreshed),
            Err(e) if e.requires_sign_in() => Ok(StatusReport::NeedsAuth),
            Err(e) => Err(e),
        },
    }
}

pub struct App {
    tokens: Tokens,
    graph: GraphClient,
    timezone: Tz,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let endpoint = AzureAdClient::new(config)?;
        let store = FileTokenStore::new(config.token_file());
        info!("Using token file {:?}", store.path());

        Ok(Self {
            tokens: TokenManager::new(endpoint, store, SystemClock),
            graph: GraphClient::new(config)?,
            timezone: config.display_timezone(),
        })
    }

    /// Run the device-code sign-in.
    pub async fn auth(&self, open_browser: bool) -> Result<(), AppError> {
        let challenge = self.tokens.start_device_auth().await?;

        println!("\n🔐 To authenticate, visit:\n{}\n", challenge.verification_uri);
        println!("Enter code: {}\n", challenge.user_code);

        if open_browser {
            if let Err(e) = open::that(&challenge.verification_uri) {
                warn!("Failed to open browser: {}", e);
            }
        }

        eprintln!("Waiting for authorization...");
        self.tokens.poll_for_token(&challenge).await?;

        println!("✅ Authentication successful! Token saved.");
        Ok(())
    }

    /// Report whether a usable token exists, refreshing it if needed.
    pub async fn status(&self) -> Result<(), AppError> {
        let report = check_status(&self.tokens).await?;
        println!("{}", report.message());
        if !report.is_authenticated() {
            return Ok(());
        }

        let token = self.tokens.get_valid_access_token().await?;
        match self.graph.get_user_profile(token.expose()).await {
            Ok(profile) => {
                println!("   User: {}", profile.display_name_or_upn());
                println!("   Email: {}", profile.email());
            }
            Err(e) => warn!("Could not fetch user profile: {}", e),
        }

        Ok(())
    }

    pub async fn today(&self) -> Result<(), AppError> {
        let range = DateRange::today(Utc::now(), self.timezone);
        self.show_day(range, "Today", "No events today.").await
    }

    pub async fn tomorrow(&self) -> Result<(), AppError> {
        let range = DateRange::tomorrow(Utc::now(), self.timezone);
        self.show_day(range, "Tomorrow", "No events tomorrow.").await
    }

    pub async fn upcoming(&self, days: u32) -> Result<(), AppError> {
        let range = DateRange::upcoming(Utc::now(), self.timezone, days);
        let token = self.tokens.get_valid_access_token().await?;
        let events = self
            .graph
            .calendar_view(token.expose(), range.start, range.end, UPCOMING_EVENT_LIMIT)
            .await?;

        println!("{}", render_upcoming(range.days, &events, self.timezone));
        Ok(())
    }

    async fn show_day(
        &self,
        range: DateRange,
        heading: &str,
        empty_message: &str,
    ) -> Result<(), AppError> {
        let token = self.tokens.get_valid_access_token().await?;
        let events = self
            .graph
            .calendar_view(token.expose(), range.start, range.end, DAY_EVENT_LIMIT)
            .await?;

        println!(
            "{}",
            render_day(heading, empty_message, range.first_day, &events, self.timezone)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::scripted::{provider_error, token, ScriptedEndpoint};
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::store::{CredentialRecord, MemoryTokenStore, SecretString};
    use chrono::{DateTime, TimeZone};

    type TestTokens = TokenManager<ScriptedEndpoint, MemoryTokenStore, ManualClock>;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn tokens(endpoint: ScriptedEndpoint, store: MemoryTokenStore) -> TestTokens {
        TokenManager::new(endpoint, store, ManualClock::new(start()))
    }

    /// A one-hour record obtained `age` ago.
    fn stored(refresh: Option<&str>, age: Duration) -> MemoryTokenStore {
        MemoryTokenStore::with_record(CredentialRecord {
            access_token: "old-access".into(),
            refresh_token: refresh.map(SecretString::from),
            expires_in: 3600,
            obtained_at: start() - age,
            token_type: None,
            scope: None,
        })
    }

    #[tokio::test]
    async fn test_status_not_authenticated() {
        let tokens = tokens(ScriptedEndpoint::default(), MemoryTokenStore::new());

        let report = check_status(&tokens).await.unwrap();

        assert_eq!(report, StatusReport::NotAuthenticated);
        assert!(!report.is_authenticated());
        assert_eq!(report.message(), "❌ Not authenticated. Run: o365cal auth");
    }

    #[tokio::test]
    async fn test_status_valid_shows_remaining_time() {
        let tokens = tokens(
            ScriptedEndpoint::default(),
            stored(Some("R"), Duration::minutes(15)),
        );

        let report = check_status(&tokens).await.unwrap();

        assert_eq!(
            report,
            StatusReport::Valid {
                remaining: Duration::minutes(45)
            }
        );
        assert!(report.is_authenticated());
        assert_eq!(report.message(), "✅ Authenticated (token valid for 45 min)");
    }

    #[tokio::test]
    async fn test_status_expired_is_refreshed() {
        let tokens = tokens(
            ScriptedEndpoint::answering(vec![Ok(token("new-access", None))]),
            stored(Some("R"), Duration::minutes(40)),
        );

        let report = check_status(&tokens).await.unwrap();

        assert_eq!(report, StatusReport::Refreshed);
        assert_eq!(report.message(), "✅ Token refreshed successfully");
        let saved = tokens.load().unwrap();
        assert_eq!(saved.access_token.expose(), "new-access");
        assert_eq!(saved.obtained_at, start());
    }

    #[tokio::test]
    async fn test_status_expired_without_refresh_token_needs_auth() {
        let tokens = tokens(
            ScriptedEndpoint::default(),
            stored(None, Duration::minutes(40)),
        );

        let report = check_status(&tokens).await.unwrap();

        assert_eq!(report, StatusReport::NeedsAuth);
        assert!(!report.is_authenticated());
        assert_eq!(report.message(), "❌ Token expired. Run: o365cal auth");
    }

    #[tokio::test]
    async fn test_status_rejected_refresh_needs_auth() {
        let tokens = tokens(
            ScriptedEndpoint::answering(vec![Err(provider_error("invalid_grant"))]),
            stored(Some("R"), Duration::hours(2)),
        );

        assert_eq!(check_status(&tokens).await.unwrap(), StatusReport::NeedsAuth);
    }

    #[tokio::test]
    async fn test_status_surfaces_storage_failure() {
        struct ReadOnlyStore(MemoryTokenStore);

        impl TokenStore for ReadOnlyStore {
            fn load(&self) -> Option<CredentialRecord> {
                self.0.load()
            }

            fn save(&self, _record: &CredentialRecord) -> Result<(), StoreError> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
            }
        }

        let tokens = TokenManager::new(
            ScriptedEndpoint::answering(vec![Ok(token("new-access", None))]),
            ReadOnlyStore(stored(Some("R"), Duration::hours(2))),
            ManualClock::new(start()),
        );

        assert!(matches!(
            check_status(&tokens).await,
            Err(AuthError::Storage(_))
        ));
    }
}
