//! Command-line arguments.

use clap::{Parser, Subcommand};

/// Longest range `upcoming` accepts.
const MAX_UPCOMING_DAYS: i64 = 366;

#[derive(Parser, Debug)]
#[command(name = "o365cal", version)]
#[command(about = "Show your Office 365 calendar from the terminal")]
#[command(
    long_about = "Show your Office 365 calendar from the terminal.\n\n\
    Sign in once with `o365cal auth` using the device-code flow; the token is stored \
    locally and refreshed automatically.\n\n\
    Requires O365_CLIENT_ID and O365_TENANT_ID. Set TZ to choose the display time zone."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in with Microsoft using a device code
    Auth {
        /// Open the verification page in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Check authentication status
    Status,

    /// Show today's events
    Today,

    /// Show tomorrow's events
    Tomorrow,

    /// Show events for the next few days
    Upcoming {
        /// Number of days to show, starting today
        #[arg(
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(1..=MAX_UPCOMING_DAYS)
        )]
        days: u32,
    },
}
