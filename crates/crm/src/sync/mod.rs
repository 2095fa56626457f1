//! Sync engine for pushing canonical names into the CRM
//!
//! Each desired record runs through search, compare and (when the names
//! differ) update. Records are processed strictly one after another.

mod engine;
mod timing;

pub use engine::{
    BatchEnd, DEFAULT_CHECKPOINT_EVERY, DEFAULT_RECORD_DELAY, SyncEngine, SyncError, SyncOptions,
};
pub use timing::{checkpoint_due, should_pause};
