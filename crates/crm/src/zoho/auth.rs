//! Zoho OAuth2 token management
//!
//! Keeps an access token valid across CRM calls without user interaction:
//! tokens are refreshed proactively once they pass their (buffered) expiry,
//! and a call rejected with 401 triggers exactly one refresh and one retry.

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::sync::Arc;

use super::CrmError;
use super::api::TokenResponse;
use crate::config::{CredentialStore, Credentials};
use crate::http::{HttpRequest, HttpResponse, Method, Transport};
use crate::models::{DEFAULT_EXPIRES_IN_SECS, TokenState};

/// Scheme prefix Zoho expects in the `Authorization` header
pub const AUTH_SCHEME: &str = "Zoho-oauthtoken";

/// Owner of the access token lifecycle
pub struct TokenManager {
    credentials: Credentials,
    state: TokenState,
    store: CredentialStore,
    transport: Arc<dyn Transport>,
}

impl TokenManager {
    /// Create a manager starting from the token state persisted in `store`
    pub fn new(
        credentials: &Credentials,
        store: CredentialStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let state = store.token_state();
        Self {
            credentials: credentials.clone(),
            state,
            store,
            transport,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> &TokenState {
        &self.state
    }

    /// Cached token, even if expired (used for optional bearer headers)
    pub fn cached_token(&self) -> Option<&str> {
        self.state.access_token.as_deref()
    }

    /// Whether the cached token must be refreshed before use
    pub fn is_expired(&self) -> bool {
        self.state.is_expired()
    }

    /// Return the cached token, refreshing it first if it has expired
    pub fn get_valid_token(&mut self) -> Result<String, CrmError> {
        if self.is_expired() {
            info!("Access token expired, refreshing");
            self.refresh()?;
        }
        self.state
            .access_token
            .clone()
            .ok_or_else(|| CrmError::Auth("no access token available".to_string()))
    }

    /// Exchange the refresh token for a new access token and persist it
    ///
    /// Any refusal from the token endpoint is an [`CrmError::Auth`]; the
    /// refresh itself is never retried.
    pub fn refresh(&mut self) -> Result<&TokenState, CrmError> {
        info!("Refreshing access token");

        let request = HttpRequest::new(Method::Post, self.credentials.token_url()).form(&[
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ]);

        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(CrmError::Auth(format!(
                "token refresh rejected ({}): {}",
                response.status, response.body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            CrmError::Auth(format!("malformed token response: {} ({})", e, response.body))
        })?;

        if token.error.is_some() {
            return Err(CrmError::Auth(format!(
                "token refresh rejected: {}",
                response.body
            )));
        }

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrmError::Auth("token response has no access_token".to_string()))?;
        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        self.state = TokenState::issued(access_token, expires_in, Utc::now().timestamp());

        // The new token is usable even if it cannot be written back
        if let Err(e) = self.store.save_token_state(&self.state) {
            warn!(
                "Failed to persist refreshed token to {}: {:#}",
                self.store.path().display(),
                e
            );
        }

        if let Some(expires_at) = self.state.expires_at_utc() {
            info!("Token refreshed, expires at {}", expires_at);
        }
        Ok(&self.state)
    }

    /// Make one authenticated CRM call
    ///
    /// `endpoint` is a path on the API domain (e.g. `/crm/v2/Contacts`).
    /// A 401 triggers one refresh and one retry; a second 401 is an
    /// [`CrmError::Auth`]. An empty 2xx body yields `{"data": []}`.
    pub fn call(
        &mut self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, CrmError> {
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };
        let url = format!("{}{}", self.credentials.api_domain, endpoint);

        let token = self.get_valid_token()?;
        let mut response = self.send(method, &url, &token, body.as_ref())?;

        if response.status == 401 {
            warn!(
                "{} {} returned 401, refreshing token and retrying",
                method,
                endpoint_path(&endpoint)
            );
            let token = self.refresh()?.access_token.clone().unwrap_or_default();
            response = self.send(method, &url, &token, body.as_ref())?;

            if response.status == 401 {
                return Err(CrmError::Auth(format!(
                    "{} {} rejected after token refresh: {}",
                    method,
                    endpoint_path(&endpoint),
                    response.body
                )));
            }
        }

        if !response.is_success() {
            return Err(CrmError::Api {
                status: response.status,
                body: response.body,
            });
        }

        parse_body(&endpoint, &response.body)
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, CrmError> {
        let mut request = HttpRequest::new(method, url)
            .header("Authorization", format!("{} {}", AUTH_SCHEME, token));
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .json(body.clone());
        }
        Ok(self.transport.send(&request)?)
    }
}

/// Decode a 2xx body
fn parse_body(endpoint: &str, body: &str) -> Result<Value, CrmError> {
    if body.trim().is_empty() {
        return Ok(json!({ "data": [] }));
    }

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(e) if is_search_endpoint(endpoint) => {
            debug!("Unparsable search response treated as no results: {}", e);
            Ok(json!({ "data": [] }))
        }
        Err(e) => Err(CrmError::Data(format!(
            "invalid JSON from {}: {}",
            endpoint_path(endpoint),
            e
        ))),
    }
}

fn is_search_endpoint(endpoint: &str) -> bool {
    endpoint_path(endpoint).ends_with("/search")
}

/// Endpoint without its query string (the query may contain an email)
fn endpoint_path(endpoint: &str) -> &str {
    endpoint.split('?').next().unwrap_or(endpoint)
}
