//! CRM crate - Canonical contact names from a spreadsheet into Zoho CRM
//!
//! This crate provides the name sync logic independent of any front end:
//! - Domain models (DesiredRecord, RemoteRecord, OutcomeRecord, RunLog)
//! - Credential file loading and token persistence
//! - Zoho OAuth token management and the CRM contacts client
//! - Record sources (local CSV or spreadsheet URL)
//! - Sync engine with per-record outcomes and checkpointing
//! - Result sinks (JSON audit and annotated CSV)
//!
//! All network traffic goes through the [`http::Transport`] trait.

pub mod config;
pub mod http;
pub mod models;
pub mod report;
pub mod source;
pub mod sync;
pub mod zoho;

pub use crate::config::{CredentialError, CredentialStore, Credentials};
pub use http::{ScriptedTransport, Transport, TransportError, UreqTransport};
pub use models::{
    ContactId, DesiredRecord, DesiredRecords, NameParts, OutcomeRecord, OutcomeStatus,
    RemoteRecord, RunLog, RunSummary, TokenState,
};
pub use report::{FileSink, InMemorySink, ResultSink};
pub use source::{RecordSource, SheetFetcher, SourceError};
pub use sync::{BatchEnd, SyncEngine, SyncError, SyncOptions};
pub use zoho::{CrmClient, CrmError, TokenManager};
