//! Zoho CRM integration
//!
//! This module provides:
//! - OAuth2 refresh-token handling with retry-on-401
//! - CRM client for contact search and name updates
//! - Request/response shapes for the CRM v2 API

mod auth;
mod client;
mod error;

pub use auth::{AUTH_SCHEME, TokenManager};
pub use client::{API_VERSION, CONTACTS_MODULE, CrmClient};
pub use error::CrmError;

/// Zoho API request and response types
pub mod api {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize};

    /// Response from the OAuth token endpoint
    ///
    /// Zoho reports some failures with HTTP 200 and an `error` field.
    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: Option<String>,
        pub expires_in: Option<i64>,
        pub error: Option<String>,
    }

    /// Response from a record search
    ///
    /// A missing or `null` `data` means no contact matched.
    #[derive(Debug, Default, Deserialize)]
    pub struct SearchResponse {
        #[serde(default)]
        pub data: Option<Vec<Contact>>,
    }

    impl SearchResponse {
        /// Matching contacts, empty when there are none
        pub fn into_contacts(self) -> Vec<Contact> {
            self.data.unwrap_or_default()
        }
    }

    /// Contact as returned by the search endpoint (only the fields we use)
    #[derive(Debug, Clone, Deserialize)]
    pub struct Contact {
        #[serde(deserialize_with = "record_id")]
        pub id: String,
        #[serde(rename = "Full_Name")]
        pub full_name: Option<String>,
    }

    /// Body of a record update call
    #[derive(Debug, Serialize)]
    pub struct UpdateRequest {
        pub data: Vec<NameUpdate>,
    }

    /// One record's new name fields
    #[derive(Debug, Serialize)]
    pub struct NameUpdate {
        pub id: String,
        #[serde(rename = "First_Name")]
        pub first_name: String,
        #[serde(rename = "Last_Name")]
        pub last_name: String,
    }

    /// Response from a record update call
    #[derive(Debug, Default, Deserialize)]
    pub struct UpdateResponse {
        #[serde(default)]
        pub data: Vec<UpdateResult>,
    }

    /// Per-record result of an update
    #[derive(Debug, Deserialize)]
    pub struct UpdateResult {
        pub code: Option<String>,
        pub message: Option<String>,
    }

    impl UpdateResponse {
        /// Code that confirms a record was written
        pub const SUCCESS: &'static str = "SUCCESS";

        /// Whether the first (and only) record was confirmed
        pub fn is_success(&self) -> bool {
            self.data
                .first()
                .and_then(|r| r.code.as_deref())
                .is_some_and(|code| code == Self::SUCCESS)
        }
    }

    /// Record ids are strings in Zoho's API but accept bare numbers too
    fn record_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(s),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("invalid record id: {}", other))),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_contact_id_string_or_number() {
            let contact: Contact =
                serde_json::from_value(json!({"id": "42", "Full_Name": "Ada L"})).unwrap();
            assert_eq!(contact.id, "42");
            assert_eq!(contact.full_name.as_deref(), Some("Ada L"));

            let contact: Contact = serde_json::from_value(json!({"id": 7})).unwrap();
            assert_eq!(contact.id, "7");
            assert!(contact.full_name.is_none());

            assert!(serde_json::from_value::<Contact>(json!({"id": null})).is_err());
        }

        #[test]
        fn test_search_response_null_data_is_empty() {
            let response: SearchResponse = serde_json::from_value(json!({"data": null})).unwrap();
            assert!(response.into_contacts().is_empty());

            let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
            assert!(response.into_contacts().is_empty());
        }

        #[test]
        fn test_update_request_field_names() {
            let body = UpdateRequest {
                data: vec![NameUpdate {
                    id: "42".into(),
                    first_name: "Ada".into(),
                    last_name: "Lovelace".into(),
                }],
            };
            assert_eq!(
                serde_json::to_value(&body).unwrap(),
                json!({"data": [{"id": "42", "First_Name": "Ada", "Last_Name": "Lovelace"}]})
            );
        }

        #[test]
        fn test_update_response_success() {
            let ok: UpdateResponse =
                serde_json::from_value(json!({"data": [{"code": "SUCCESS", "status": "success"}]}))
                    .unwrap();
            assert!(ok.is_success());

            let rejected: UpdateResponse = serde_json::from_value(
                json!({"data": [{"code": "INVALID_DATA", "message": "invalid data"}]}),
            )
            .unwrap();
            assert!(!rejected.is_success());
            assert!(!UpdateResponse::default().is_success());
        }
    }
}
