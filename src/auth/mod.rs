//! Azure AD authentication module.
//!
//! Provides the OAuth2 device-code flow, a Microsoft Graph API client,
//! and token lifecycle management with silent refresh.

pub mod graph;
pub mod oauth;
#[cfg(test)]
pub mod scripted;
pub mod token_manager;
