//! Calendar events from Microsoft Graph.
//!
//! This module provides:
//! - Event models for `/me/calendarView` responses
//! - Day ranges aligned to the display time zone
//! - Text rendering for the `today`, `tomorrow` and `upcoming` commands

pub mod format;
pub mod models;
pub mod range;

pub use format::{render_day, render_upcoming};
pub use models::CalendarEvent;
pub use range::DateRange;
