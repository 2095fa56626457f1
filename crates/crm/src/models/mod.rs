//! Domain models for the name sync

mod contact;
mod outcome;
mod record;
mod token;

pub use contact::{ContactId, NameParts, RemoteRecord};
pub use outcome::{OutcomeRecord, OutcomeStatus, RunLog, RunSummary};
pub use record::{DesiredRecord, DesiredRecords, natural_key};
pub use token::{DEFAULT_EXPIRES_IN_SECS, EXPIRY_BUFFER_SECS, TokenState};
