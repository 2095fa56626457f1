//! Zoho CRM API client
//!
//! Contact search by email and name updates, each as a single call through
//! the [`TokenManager`].

use log::debug;
use serde_json::Value;

use super::api::{Contact, NameUpdate, SearchResponse, UpdateRequest, UpdateResponse};
use super::{CrmError, TokenManager};
use crate::http::Method;
use crate::models::{ContactId, NameParts, RemoteRecord};

/// CRM REST API version segment
pub const API_VERSION: &str = "v2";

/// Module holding the contacts we sync
pub const CONTACTS_MODULE: &str = "Contacts";

/// Zoho CRM client for one module
pub struct CrmClient {
    tokens: TokenManager,
    module: String,
}

impl CrmClient {
    /// Create a client for the Contacts module
    pub fn new(tokens: TokenManager) -> Self {
        Self::for_module(tokens, CONTACTS_MODULE)
    }

    /// Create a client for another module
    pub fn for_module(tokens: TokenManager, module: impl Into<String>) -> Self {
        Self {
            tokens,
            module: module.into(),
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    fn module_path(&self) -> String {
        format!("/crm/{}/{}", API_VERSION, self.module)
    }

    /// Find the contact whose email equals `email`
    ///
    /// The first result wins when several contacts share the address.
    pub fn search_by_email(&mut self, email: &str) -> Result<Option<RemoteRecord>, CrmError> {
        let endpoint = format!(
            "{}/search?criteria=(Email:equals:{})",
            self.module_path(),
            urlencoding::encode(email)
        );

        let value = self.tokens.call(Method::Get, &endpoint, None)?;
        let contacts = serde_json::from_value::<SearchResponse>(value)
            .map_err(|e| CrmError::Data(format!("unexpected search response: {}", e)))?
            .into_contacts();

        if contacts.len() > 1 {
            debug!("{} contacts share one email, using the first", contacts.len());
        }

        Ok(contacts.into_iter().next().map(into_remote))
    }

    /// Write new first/last name fields to one record
    ///
    /// Returns `true` only when the CRM confirms the record with `SUCCESS`.
    /// A response of any other shape counts as not confirmed.
    pub fn update_name(&mut self, id: &ContactId, name: &NameParts) -> Result<bool, CrmError> {
        let request = UpdateRequest {
            data: vec![NameUpdate {
                id: id.as_str().to_string(),
                first_name: name.first.clone(),
                last_name: name.last.clone(),
            }],
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| CrmError::Data(format!("cannot encode update: {}", e)))?;

        let value = self.tokens.call(Method::Put, &self.module_path(), Some(body))?;
        Ok(confirmed(value))
    }
}

fn into_remote(contact: Contact) -> RemoteRecord {
    RemoteRecord::new(contact.id, contact.full_name.unwrap_or_default())
}

fn confirmed(value: Value) -> bool {
    match serde_json::from_value::<UpdateResponse>(value) {
        Ok(response) => response.is_success(),
        Err(e) => {
            debug!("Unrecognized update response: {}", e);
            false
        }
    }
}
