//! Credential file loading for the Zoho CRM API
//!
//! Credentials and the last access token live together in a `KEY=value`
//! file (`~/.zoho_env` by default). Keys may carry a `ZOHO_` prefix; the
//! prefixed form wins when both spellings are present.

use anyhow::Result;
use config::EnvFile;
use std::path::{Path, PathBuf};

use crate::models::TokenState;

/// Credentials filename in the user's home directory
pub const CREDENTIALS_FILE: &str = ".zoho_env";

/// API host used when the file has no `API_DOMAIN`
pub const DEFAULT_API_DOMAIN: &str = "https://www.zohoapis.com";

/// Accounts host serving the token endpoint
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";

const KEY_PREFIX: &str = "ZOHO_";

const CLIENT_ID: &str = "CLIENT_ID";
const CLIENT_SECRET: &str = "CLIENT_SECRET";
const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
const API_DOMAIN: &str = "API_DOMAIN";
const ACCOUNTS_URL: &str = "ACCOUNTS_URL";
const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
const TOKEN_EXPIRES_AT: &str = "TOKEN_EXPIRES_AT";

/// Why the credential file could not be used
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("credential file is missing required keys: {}", .0.join(", "))]
    Incomplete(Vec<String>),
    #[error("cannot read credential file: {0}")]
    Io(String),
}

/// OAuth2 client credentials. Read once at startup, never modified.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub api_domain: String,
    pub accounts_url: String,
}

impl Credentials {
    /// Token endpoint on the accounts host
    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_url.trim_end_matches('/'))
    }
}

/// The credential file: source of [`Credentials`] and home of the
/// persisted [`TokenState`]
#[derive(Debug)]
pub struct CredentialStore {
    file: EnvFile,
}

impl CredentialStore {
    /// Default location (~/.zoho_env)
    pub fn default_path() -> Option<PathBuf> {
        config::home_path(CREDENTIALS_FILE)
    }

    /// Open the credential file at `path`
    pub fn open(path: &Path) -> Result<Self, CredentialError> {
        if !path.exists() {
            return Err(CredentialError::Missing(path.to_path_buf()));
        }
        let file = EnvFile::load(path).map_err(|e| CredentialError::Io(format!("{:#}", e)))?;
        Ok(Self { file })
    }

    /// Build a store from file content (nothing is read from disk)
    pub fn from_content(path: &Path, content: &str) -> Self {
        Self {
            file: EnvFile::parse(path, content),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Look up a key, preferring its `ZOHO_`-prefixed spelling
    fn lookup(&self, key: &str) -> Option<&str> {
        self.file
            .get(&format!("{}{}", KEY_PREFIX, key))
            .or_else(|| self.file.get(key))
            .filter(|v| !v.is_empty())
    }

    /// Read the client credentials, failing if any mandatory key is absent
    pub fn credentials(&self) -> Result<Credentials, CredentialError> {
        let missing: Vec<String> = [CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN]
            .iter()
            .filter(|key| self.lookup(key).is_none())
            .map(|key| format!("{}{}", KEY_PREFIX, key))
            .collect();

        if !missing.is_empty() {
            return Err(CredentialError::Incomplete(missing));
        }

        let value = |key: &str| self.lookup(key).unwrap_or_default().to_string();

        Ok(Credentials {
            client_id: value(CLIENT_ID),
            client_secret: value(CLIENT_SECRET),
            refresh_token: value(REFRESH_TOKEN),
            api_domain: self
                .lookup(API_DOMAIN)
                .unwrap_or(DEFAULT_API_DOMAIN)
                .trim_end_matches('/')
                .to_string(),
            accounts_url: self
                .lookup(ACCOUNTS_URL)
                .unwrap_or(DEFAULT_ACCOUNTS_URL)
                .to_string(),
        })
    }

    /// Persisted token state; absent or unparsable values mean "expired"
    pub fn token_state(&self) -> TokenState {
        let expires_at = self
            .lookup(TOKEN_EXPIRES_AT)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        TokenState::new(self.lookup(ACCESS_TOKEN).map(str::to_string), expires_at)
    }

    /// Write the token state back, leaving every other line untouched
    pub fn save_token_state(&mut self, state: &TokenState) -> Result<()> {
        let token = state.access_token.as_deref().unwrap_or_default();
        let expires_at = state.expires_at.to_string();
        self.set(ACCESS_TOKEN, token);
        self.set(TOKEN_EXPIRES_AT, &expires_at);
        self.file.save()
    }

    /// Update whichever spelling of `key` the file already uses
    fn set(&mut self, key: &str, value: &str) {
        let prefixed = format!("{}{}", KEY_PREFIX, key);
        if !self.file.contains(&prefixed) && self.file.contains(key) {
            self.file.set(key, value);
        } else {
            self.file.set(&prefixed, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = "# Zoho API\nZOHO_CLIENT_ID=id-1\nZOHO_CLIENT_SECRET=secret-1\nZOHO_REFRESH_TOKEN=refresh-1\nZOHO_API_DOMAIN=https://www.zohoapis.eu/\n";

    #[test]
    fn test_parse_full_credentials() {
        let store = CredentialStore::from_content(Path::new(".zoho_env"), FULL);
        let creds = store.credentials().unwrap();
        assert_eq!(creds.client_id, "id-1");
        assert_eq!(creds.client_secret, "secret-1");
        assert_eq!(creds.refresh_token, "refresh-1");
        assert_eq!(creds.api_domain, "https://www.zohoapis.eu");
        assert_eq!(creds.token_url(), "https://accounts.zoho.com/oauth/v2/token");
    }

    #[test]
    fn test_unprefixed_keys_and_defaults() {
        let content = "CLIENT_ID=a\nCLIENT_SECRET=b\nREFRESH_TOKEN=c\n";
        let store = CredentialStore::from_content(Path::new("env"), content);
        let creds = store.credentials().unwrap();
        assert_eq!(creds.client_id, "a");
        assert_eq!(creds.api_domain, DEFAULT_API_DOMAIN);
    }

    #[test]
    fn test_missing_keys_are_reported() {
        let store = CredentialStore::from_content(Path::new("env"), "ZOHO_CLIENT_ID=a\n");
        match store.credentials() {
            Err(CredentialError::Incomplete(keys)) => {
                assert_eq!(keys, vec!["ZOHO_CLIENT_SECRET", "ZOHO_REFRESH_TOKEN"]);
            }
            other => panic!("expected Incomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_token_state_is_expired() {
        let store = CredentialStore::from_content(Path::new("env"), FULL);
        let state = store.token_state();
        assert!(state.access_token.is_none());
        assert_eq!(state.expires_at, 0);
        assert!(state.is_expired());
    }

    #[test]
    fn test_open_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = CredentialStore::open(&temp_dir.path().join(".zoho_env"));
        assert!(matches!(result, Err(CredentialError::Missing(_))));
    }

    #[test]
    fn test_save_token_state_appends_then_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".zoho_env");
        std::fs::write(&path, FULL).unwrap();

        let mut store = CredentialStore::open(&path).unwrap();
        store
            .save_token_state(&TokenState::new(Some("tok-1".into()), 100))
            .unwrap();
        store
            .save_token_state(&TokenState::new(Some("tok-2".into()), 200))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Zoho API\nZOHO_CLIENT_ID=id-1\n"));
        assert_eq!(content.matches("ZOHO_ACCESS_TOKEN=").count(), 1);
        assert!(content.contains("ZOHO_ACCESS_TOKEN=tok-2\n"));
        assert!(content.contains("ZOHO_TOKEN_EXPIRES_AT=200\n"));

        let reopened = CredentialStore::open(&path).unwrap();
        assert_eq!(reopened.token_state(), TokenState::new(Some("tok-2".into()), 200));
    }

    #[test]
    fn test_save_keeps_unprefixed_spelling() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".zoho_env");
        std::fs::write(&path, "CLIENT_ID=a\nACCESS_TOKEN=old\nTOKEN_EXPIRES_AT=1\n").unwrap();

        let mut store = CredentialStore::open(&path).unwrap();
        store
            .save_token_state(&TokenState::new(Some("new".into()), 9))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "CLIENT_ID=a\nACCESS_TOKEN=new\nTOKEN_EXPIRES_AT=9\n");
    }
}
