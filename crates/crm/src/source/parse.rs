//! CSV parsing into desired records

use super::SourceError;
use crate::models::{DesiredRecord, DesiredRecords, natural_key};

/// Header of the join-key column
pub const EMAIL_COLUMN: &str = "Contact email";
/// Header of the desired display name column
pub const NAME_COLUMN: &str = "Name";
pub const NICKNAME_COLUMN: &str = "Nickname";
pub const PAYMENT_EMAILS_COLUMN: &str = "Emails for payment receipts";

/// Parse CSV text into desired records
///
/// The mandatory columns must be present in the header. Rows with an empty
/// email are skipped; missing optional cells become empty strings.
pub fn parse_csv(content: &str) -> Result<DesiredRecords, SourceError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = [EMAIL_COLUMN, NAME_COLUMN]
        .iter()
        .filter(|name| column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::Schema {
            missing,
            found: headers.clone(),
        });
    }

    let email_idx = column(EMAIL_COLUMN);
    let name_idx = column(NAME_COLUMN);
    let nickname_idx = column(NICKNAME_COLUMN);
    let payment_idx = column(PAYMENT_EMAILS_COLUMN);

    let mut records = DesiredRecords::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        let email = cell(email_idx);
        if natural_key(&email).is_empty() {
            continue;
        }

        let record = DesiredRecord::new(email, cell(name_idx))
            .nickname(cell(nickname_idx))
            .payment_emails(split_emails(&cell(payment_idx)));
        records.insert(record);
    }

    Ok(records)
}

/// Split a cell holding several addresses separated by `,` or `;`
fn split_emails(cell: &str) -> Vec<String> {
    cell.split([',', ';'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
