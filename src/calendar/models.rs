//! Calendar data models for Microsoft Graph events.

use serde::{Deserialize, Serialize};

/// A single event occurrence from `/me/calendarView`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub subject: Option<String>,

    pub start: Option<DateTimeTimeZone>,

    pub end: Option<DateTimeTimeZone>,

    pub location: Option<Location>,

    /// All-day events carry midnight-to-midnight times that should not be converted.
    #[serde(default)]
    pub is_all_day: bool,
}

impl CalendarEvent {
    /// Subject, or "No Subject" when missing or blank.
    pub fn subject_or_default(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("No Subject")
    }

    /// Location display name, if any.
    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|l| l.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    /// Raw start `dateTime` string as sent by Graph.
    pub fn raw_start(&self) -> &str {
        self.start.as_ref().map_or("", |s| s.date_time.as_str())
    }
}

/// Graph `dateTimeTimeZone` resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    /// Local wall time, e.g. `2026-10-19T09:30:00.0000000`.
    pub date_time: String,

    /// Zone the wall time is expressed in. Usually `UTC`.
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: Option<String>,
}

/// Paged list wrapper returned by Graph collection endpoints.
#[derive(Debug, Deserialize)]
pub struct EventListResponse {
    #[serde(default)]
    pub value: Vec<CalendarEvent>,
}
