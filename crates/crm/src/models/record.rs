//! Desired-state records loaded from the spreadsheet

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalize an email into the natural key used to join rows to CRM contacts
pub fn natural_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// One spreadsheet row: the name a contact should end up with in the CRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Trimmed, lower-cased contact email
    pub natural_key: String,
    /// Contact email as written in the sheet
    pub contact_email: String,
    /// Canonical name to push to the CRM
    pub display_name: String,
    /// Informal name, carried through to the annotated CSV
    pub nickname: String,
    /// Addresses that receive payment receipts
    pub payment_emails: Vec<String>,
}

impl DesiredRecord {
    /// Create a record with only the mandatory fields
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        let contact_email = email.into().trim().to_string();
        Self {
            natural_key: natural_key(&contact_email),
            contact_email,
            display_name: display_name.into().trim().to_string(),
            nickname: String::new(),
            payment_emails: Vec::new(),
        }
    }

    /// Record for a single email with a caller-supplied name
    ///
    /// Mirrors a spreadsheet row where every name and email column is filled
    /// with the override values.
    pub fn with_override(email: &str, name: &str) -> Self {
        let mut record = Self::new(email, name);
        record.nickname = record.display_name.clone();
        record.payment_emails = vec![record.contact_email.clone()];
        record
    }

    /// Set the nickname
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    /// Set the payment-receipt addresses
    pub fn payment_emails(mut self, emails: Vec<String>) -> Self {
        self.payment_emails = emails;
        self
    }
}

/// Desired records keyed by natural key, in first-seen row order
///
/// Inserting a key that already exists replaces the earlier record in place,
/// so the last row wins while the row order stays stable.
#[derive(Debug, Clone, Default)]
pub struct DesiredRecords {
    records: Vec<DesiredRecord>,
    index: HashMap<String, usize>,
}

impl DesiredRecords {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it replaced
    pub fn insert(&mut self, record: DesiredRecord) -> Option<DesiredRecord> {
        match self.index.get(&record.natural_key) {
            Some(&idx) => Some(std::mem::replace(&mut self.records[idx], record)),
            None => {
                self.index
                    .insert(record.natural_key.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    /// Look up a record by natural key (the key is normalized first)
    pub fn get(&self, key: &str) -> Option<&DesiredRecord> {
        self.index
            .get(&natural_key(key))
            .map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in row order
    pub fn iter(&self) -> std::slice::Iter<'_, DesiredRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a DesiredRecords {
    type Item = &'a DesiredRecord;
    type IntoIter = std::slice::Iter<'a, DesiredRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<DesiredRecord> for DesiredRecords {
    fn from_iter<T: IntoIterator<Item = DesiredRecord>>(iter: T) -> Self {
        let mut records = Self::new();
        for record in iter {
            records.insert(record);
        }
        records
    }
}
