//! Access token state tracked between CRM calls

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds shaved off the provider's stated lifetime so a token is treated
/// as dead before the provider actually rejects it. Never more than half
/// the lifetime.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Current access token and when it stops being usable
///
/// `expires_at` is epoch seconds and already includes [`EXPIRY_BUFFER_SECS`].
/// A state without a token (or with `expires_at == 0`) is expired, which
/// forces a refresh on first use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub expires_at: i64,
}

impl TokenState {
    /// State restored from persisted values
    pub fn new(access_token: Option<String>, expires_at: i64) -> Self {
        Self {
            access_token: access_token.filter(|t| !t.is_empty()),
            expires_at,
        }
    }

    /// State for a freshly issued token
    pub fn issued(access_token: impl Into<String>, expires_in: i64, now: i64) -> Self {
        let buffer = EXPIRY_BUFFER_SECS.min(expires_in / 2).max(0);
        Self {
            access_token: Some(access_token.into()),
            expires_at: now + expires_in - buffer,
        }
    }

    /// Whether the token must be refreshed at `now` (epoch seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.access_token.is_none() || now >= self.expires_at
    }

    /// Whether the token must be refreshed right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Expiry as a timestamp, for display
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_expired() {
        assert!(TokenState::default().is_expired());
    }

    #[test]
    fn test_issued_applies_buffer() {
        let state = TokenState::issued("tok", 3600, 1_000);
        assert_eq!(state.expires_at, 1_000 + 3600 - 60);
        assert!(!state.is_expired_at(1_000));
        assert!(!state.is_expired_at(4_539));
        assert!(state.is_expired_at(4_540));
    }

    #[test]
    fn test_short_lifetime_keeps_half() {
        let state = TokenState::issued("tok", 30, 1_000);
        assert_eq!(state.expires_at, 1_015);
        assert!(!state.is_expired_at(1_000));
        assert!(state.is_expired_at(1_015));

        // Exactly twice the buffer still gets the full buffer
        assert_eq!(TokenState::issued("tok", 120, 0).expires_at, 60);
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let state = TokenState::new(Some(String::new()), i64::MAX);
        assert!(state.access_token.is_none());
        assert!(state.is_expired());
    }

    #[test]
    fn test_restored_valid_token() {
        let later = Utc::now().timestamp() + 600;
        let state = TokenState::new(Some("tok".into()), later);
        assert!(!state.is_expired());
        assert!(state.expires_at_utc().is_some());
    }
}
