//! Token endpoint with canned answers for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::oauth::{
    DeviceCodeChallenge, Grant, GrantError, ProviderError, TokenEndpoint, TokenResponse,
    AUTHORIZATION_PENDING,
};
use crate::error::AuthError;
use crate::store::SecretString;

/// Replays scripted answers, then reports `authorization_pending`.
#[derive(Default)]
pub struct ScriptedEndpoint {
    device: Mutex<Option<Result<DeviceCodeChallenge, AuthError>>>,
    answers: Mutex<VecDeque<Result<TokenResponse, GrantError>>>,
    grants: Mutex<Vec<&'static str>>,
}

impl ScriptedEndpoint {
    pub fn answering(answers: Vec<Result<TokenResponse, GrantError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Default::default()
        }
    }

    /// Answer the next device-code request with `result`.
    pub fn offer_device_code(&self, result: Result<DeviceCodeChallenge, AuthError>) {
        *self.device.lock().unwrap() = Some(result);
    }

    /// Grant types exchanged so far, in order.
    pub fn grants(&self) -> Vec<&'static str> {
        self.grants.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenEndpoint for ScriptedEndpoint {
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        self.device
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AuthError::InitFailed("unscripted".into())))
    }

    async fn exchange(&self, grant: Grant<'_>) -> Result<TokenResponse, GrantError> {
        self.grants.lock().unwrap().push(grant.grant_type());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(provider_error(AUTHORIZATION_PENDING)))
    }
}

pub fn provider_error(code: &str) -> GrantError {
    GrantError::Provider(ProviderError {
        error: code.to_string(),
        error_description: None,
    })
}

/// A one-hour bearer token.
pub fn token(access: &str, refresh: Option<&str>) -> TokenResponse {
    TokenResponse {
        access_token: access.into(),
        token_type: Some("Bearer".into()),
        expires_in: 3600,
        refresh_token: refresh.map(SecretString::from),
        scope: None,
    }
}
