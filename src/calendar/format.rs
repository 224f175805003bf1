//! Human-readable rendering of calendar events.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use super::models::{CalendarEvent, DateTimeTimeZone};
use crate::error::ParseError;

/// Wall-clock format Graph uses once fractional seconds are dropped.
const GRAPH_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Resolve a Graph `timeZone` value. Missing means UTC.
pub fn resolve_time_zone(name: Option<&str>) -> Result<Tz, ParseError> {
    match name.map(str::trim) {
        None | Some("") | Some("UTC") => Ok(chrono_tz::UTC),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| ParseError::UnknownTimeZone(name.to_string())),
    }
}

/// Parse a Graph wall time in `time_zone` and convert it to `display`.
///
/// An unknown source zone is treated as UTC.
pub fn parse_graph_datetime(
    raw: &str,
    time_zone: Option<&str>,
    display: Tz,
) -> Result<DateTime<Tz>, ParseError> {
    let trimmed = raw.split('.').next().unwrap_or_default().trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let naive = NaiveDateTime::parse_from_str(trimmed, GRAPH_LOCAL_FORMAT)
        .map_err(|_| ParseError::InvalidDateTime(raw.to_string()))?;

    let source = resolve_time_zone(time_zone).unwrap_or_else(|e| {
        debug!("{}, assuming UTC", e);
        chrono_tz::UTC
    });

    source
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&display))
        .ok_or_else(|| ParseError::InvalidDateTime(raw.to_string()))
}

fn parse_endpoint(value: Option<&DateTimeTimeZone>, display: Tz) -> Result<DateTime<Tz>, ParseError> {
    let value = value.ok_or(ParseError::Empty)?;
    parse_graph_datetime(&value.date_time, value.time_zone.as_deref(), display)
}

/// Leading `len` bytes of `s`, or all of it when shorter.
fn prefix(s: &str, len: usize) -> &str {
    s.get(..len).unwrap_or(s)
}

/// The date an event is listed under, in the display zone.
pub fn event_date(event: &CalendarEvent, display: Tz) -> String {
    if !event.is_all_day {
        if let Ok(start) = parse_endpoint(event.start.as_ref(), display) {
            return start.format("%Y-%m-%d").to_string();
        }
    }
    prefix(event.raw_start(), 10).to_string()
}

/// Format a calendar event for display.
pub fn format_event(event: &CalendarEvent, display: Tz) -> String {
    let raw_start = event.raw_start();

    let (date, time) = if event.is_all_day {
        (prefix(raw_start, 10).to_string(), "All Day".to_string())
    } else {
        match (
            parse_endpoint(event.start.as_ref(), display),
            parse_endpoint(event.end.as_ref(), display),
        ) {
            (Ok(start), Ok(end)) => (
                start.format("%Y-%m-%d").to_string(),
                format!(
                    "{} - {} {}",
                    start.format("%I:%M %p"),
                    end.format("%I:%M %p"),
                    start.format("%Z")
                ),
            ),
            (start, end) => {
                if let Err(e) = start.and(end) {
                    debug!("Showing raw times for '{}': {}", event.subject_or_default(), e);
                }
                (
                    prefix(raw_start, 10).to_string(),
                    raw_start.get(11..16).unwrap_or_default().to_string(),
                )
            }
        }
    };

    let mut line = format!("• {} {}: {}", date, time, event.subject_or_default());
    if let Some(location) = event.location_name() {
        line.push_str(" @ ");
        line.push_str(location);
    }
    line
}

/// Render a single day's agenda, e.g. for `today` and `tomorrow`.
pub fn render_day(
    heading: &str,
    empty_message: &str,
    day: NaiveDate,
    events: &[CalendarEvent],
    display: Tz,
) -> String {
    if events.is_empty() {
        return empty_message.to_string();
    }

    let mut lines = vec![format!("📅 {} ({}):", heading, day.format("%Y-%m-%d")), String::new()];
    lines.extend(events.iter().map(|e| format_event(e, display)));
    lines.join("\n")
}

/// Render several days, grouped under a header per date.
pub fn render_upcoming(days: u32, events: &[CalendarEvent], display: Tz) -> String {
    if events.is_empty() {
        return format!("No events in the next {} days.", days);
    }

    let mut lines = vec![format!("📅 Next {} days:", days)];
    let mut current_date: Option<String> = None;

    for event in events {
        let date = event_date(event, display);
        if current_date.as_deref() != Some(date.as_str()) {
            lines.push(String::new());
            lines.push(format!("{}:", date));
            current_date = Some(date);
        }
        lines.push(format_event(event, display));
    }

    lines.join("\n")
}
