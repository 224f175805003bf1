//! Microsoft Graph API client for the user profile and calendar view.

use crate::calendar::models::EventListResponse;
use crate::calendar::CalendarEvent;
use crate::config::Config;
use crate::error::ApiError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fields requested for each event.
const EVENT_FIELDS: &str = "subject,start,end,location,isAllDay";

/// Timestamp format Graph expects in `calendarView` ranges.
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    /// Create a new Graph client.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_connect_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.api.graph_base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Fetch the current user's profile.
    pub async fn get_user_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let url = format!("{}/me", self.base_url);
        let request = self.http_client.get(&url).bearer_auth(access_token);
        send_json(request).await
    }

    /// Fetch event occurrences between `start` and `end`, ordered by start time.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        top: u32,
    ) -> Result<Vec<CalendarEvent>, ApiError> {
        let url = format!("{}/me/calendarView", self.base_url);
        let params = calendar_view_params(start, end, top);

        debug!("Fetching calendar view {} .. {}", params[0].1, params[1].1);

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&params[..]);
        let response: EventListResponse = send_json(request).await?;

        debug!("Fetched {} events", response.value.len());
        Ok(response.value)
    }
}

fn calendar_view_params(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    top: u32,
) -> [(&'static str, String); 5] {
    [
        ("startDateTime", start.format(GRAPH_TIME_FORMAT).to_string()),
        ("endDateTime", end.format(GRAPH_TIME_FORMAT).to_string()),
        ("$top", top.to_string()),
        ("$orderby", "start/dateTime".to_string()),
        ("$select", EVENT_FIELDS.to_string()),
    ]
}

async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

    let status = response.status();
    match status.as_u16() {
        200..=299 => response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string())),
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden),
        429 => Err(ApiError::RateLimited),
        // Raw body only at debug level
        code => {
            let body = response.text().await.unwrap_or_default();
            debug!("Graph request failed: HTTP {} - {}", status, body);
            Err(ApiError::GraphRequestFailed(format!("HTTP {}", code)))
        }
    }
}

/// User profile from Microsoft Graph /me endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier for the user.
    #[serde(default)]
    pub id: String,

    /// User's display name.
    pub display_name: Option<String>,

    /// User's email address.
    pub mail: Option<String>,

    /// User Principal Name (typically email-like format).
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
