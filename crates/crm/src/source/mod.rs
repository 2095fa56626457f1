//! Desired-record sources
//!
//! Records come from a local CSV file or from a spreadsheet URL. Both paths
//! end in [`parse_csv`], which produces [`DesiredRecords`] keyed by the
//! normalized contact email.

mod fetch;
mod parse;

pub use fetch::{FETCH_TIMEOUT, SheetFetcher, looks_like_markup, normalize_sheet_url};
pub use parse::{EMAIL_COLUMN, NAME_COLUMN, NICKNAME_COLUMN, PAYMENT_EMAILS_COLUMN, parse_csv};

use log::info;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::DesiredRecords;

/// Local file read when no source is given
pub const DEFAULT_CSV_FILE: &str = "vendors.csv";

/// Failure to produce a record set. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("missing required columns {missing:?} (found {found:?})")]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("failed to fetch spreadsheet: {0}")]
    Fetch(String),

    #[error("spreadsheet download timed out: {0}")]
    Timeout(String),

    #[error("unexpected spreadsheet format: {0}")]
    Format(String),

    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Where the desired records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    File(PathBuf),
    Url(String),
}

impl RecordSource {
    /// Interpret `input` as a URL when it has an http(s) scheme, else a path
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    /// Load the record set; `fetcher` is only used for URL sources
    pub fn load(&self, fetcher: &SheetFetcher) -> Result<DesiredRecords, SourceError> {
        let records = match self {
            Self::File(path) => load_file(path)?,
            Self::Url(url) => parse_csv(&fetcher.fetch(url)?)?,
        };
        info!("Loaded {} records from {}", records.len(), self);
        Ok(records)
    }
}

impl Default for RecordSource {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_CSV_FILE))
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Read and parse a local CSV file
pub fn load_file(path: &Path) -> Result<DesiredRecords, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_csv(&content)
}
