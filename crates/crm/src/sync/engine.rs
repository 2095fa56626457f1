//! Per-record sync state machine and batch driver

use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::timing::{checkpoint_due, should_pause};
use crate::models::{
    DesiredRecord, DesiredRecords, NameParts, OutcomeRecord, RemoteRecord, RunLog, natural_key,
};
use crate::report::ResultSink;
use crate::zoho::{CrmClient, CrmError};

/// Pause between two records of a batch
pub const DEFAULT_RECORD_DELAY: Duration = Duration::from_millis(500);

/// Records between two checkpoints
pub const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Options for the batch driver
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause between records as a simple rate limit
    pub record_delay: Duration,
    /// Checkpoint after every N records (0 disables)
    pub checkpoint_every: usize,
    /// Set to stop the batch before the next record
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            record_delay: DEFAULT_RECORD_DELAY,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            cancel: None,
        }
    }
}

/// Conditions that stop a run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Authentication is gone; every further call would fail the same way
    #[error(transparent)]
    Auth(CrmError),
    /// Single-record mode without an override name for an email the source
    /// does not contain
    #[error("{0} is not in the record source")]
    UnknownRecord(String),
}

/// How a batch ended when no fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    Completed,
    /// Cancelled before the remaining records were started
    Interrupted { processed: usize },
}

/// Drives desired records through the CRM and accumulates outcomes
///
/// All calls on one engine belong to one run and share one [`RunLog`].
pub struct SyncEngine {
    client: CrmClient,
    options: SyncOptions,
    log: RunLog,
}

impl SyncEngine {
    pub fn new(client: CrmClient, options: SyncOptions) -> Self {
        Self {
            client,
            options,
            log: RunLog::default(),
        }
    }

    pub fn client(&self) -> &CrmClient {
        &self.client
    }

    /// Outcomes so far
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn into_log(self) -> RunLog {
        self.log
    }

    /// Run one record through search, compare and update
    ///
    /// Every failure becomes an `Error` outcome in the log. An
    /// authentication failure is additionally returned as
    /// [`SyncError::Auth`] so the caller can stop the run.
    pub fn process_record(&mut self, record: &DesiredRecord) -> Result<OutcomeRecord, SyncError> {
        let (outcome, fatal) = self.settle(record);
        match fatal {
            Some(e) => Err(SyncError::Auth(e)),
            None => Ok(outcome),
        }
    }

    /// Process every record in source order
    ///
    /// Pauses between records, checkpoints through `sink` periodically and
    /// checks the cancel flag before each record. `on_progress` receives
    /// `(done, total, outcome)` after every record. The caller is expected
    /// to [`finish`](ResultSink::finish) the sink whatever the result.
    pub fn process_all<F>(
        &mut self,
        records: &DesiredRecords,
        sink: &mut dyn ResultSink,
        mut on_progress: F,
    ) -> Result<BatchEnd, SyncError>
    where
        F: FnMut(usize, usize, &OutcomeRecord),
    {
        let total = records.len();
        self.log.extend_total(total);
        info!("Processing {} records", total);

        for (i, record) in records.iter().enumerate() {
            if self.is_cancelled() {
                info!("Batch interrupted after {} of {} records", i, total);
                return Ok(BatchEnd::Interrupted { processed: i });
            }

            let done = i + 1;
            let (outcome, fatal) = self.settle(record);
            on_progress(done, total, &outcome);

            if let Some(e) = fatal {
                warn!("Stopping batch after {} of {} records: {}", done, total, e);
                return Err(SyncError::Auth(e));
            }

            if checkpoint_due(done, self.options.checkpoint_every) {
                self.checkpoint(sink);
            }

            if should_pause(done, total) && !self.options.record_delay.is_zero() {
                std::thread::sleep(self.options.record_delay);
            }
        }

        info!("Batch complete: {} records processed", total);
        Ok(BatchEnd::Completed)
    }

    /// Process a single email
    ///
    /// With `override_name` the source is bypassed and that name is used.
    /// Without it the email must be present in `records`.
    pub fn process_one(
        &mut self,
        email: &str,
        override_name: Option<&str>,
        records: &DesiredRecords,
    ) -> Result<OutcomeRecord, SyncError> {
        let record = match override_name {
            Some(name) => DesiredRecord::with_override(email, name),
            None => records
                .get(email)
                .cloned()
                .ok_or_else(|| SyncError::UnknownRecord(natural_key(email)))?,
        };
        self.log.extend_total(1);
        self.process_record(&record)
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn checkpoint(&self, sink: &mut dyn ResultSink) {
        if let Err(e) = sink.checkpoint(&self.log) {
            warn!("Checkpoint after {} records failed: {:#}", self.log.len(), e);
        }
    }

    /// Run the state machine and append the outcome to the log
    fn settle(&mut self, record: &DesiredRecord) -> (OutcomeRecord, Option<CrmError>) {
        let (outcome, fatal) = self.evaluate(record);
        debug!("{} -> {}", record.natural_key, outcome.status.as_str());
        self.log.push(outcome.clone());
        (outcome, fatal)
    }

    fn evaluate(&mut self, record: &DesiredRecord) -> (OutcomeRecord, Option<CrmError>) {
        let key = &record.natural_key;

        let remote = match self.client.search_by_email(key) {
            Ok(Some(remote)) => remote,
            Ok(None) => return (OutcomeRecord::not_found(record), None),
            Err(e) => {
                let message = format!("search for {} failed: {}", key, e);
                return failure(record, None, message, e);
            }
        };

        if remote.current_name == record.display_name {
            return (OutcomeRecord::already_correct(record, &remote), None);
        }

        if record.display_name.is_empty() {
            let message = format!("no name to write for {} (record {})", key, remote.id);
            warn!("{}", message);
            return (OutcomeRecord::failed(record, Some(&remote), message), None);
        }

        let name = NameParts::split(&record.display_name);
        match self.client.update_name(&remote.id, &name) {
            Ok(true) => {
                info!(
                    "Updated record {}: '{}' -> '{}'",
                    remote.id, remote.current_name, record.display_name
                );
                (OutcomeRecord::updated(record, &remote), None)
            }
            Ok(false) => {
                let message = format!("update failed for record {}", remote.id);
                warn!("{}", message);
                (OutcomeRecord::failed(record, Some(&remote), message), None)
            }
            Err(e) => {
                let message = format!("update of record {} failed: {}", remote.id, e);
                failure(record, Some(&remote), message, e)
            }
        }
    }
}

/// Fold a call error into an `Error` outcome, keeping it if it is fatal
fn failure(
    record: &DesiredRecord,
    remote: Option<&RemoteRecord>,
    message: String,
    error: CrmError,
) -> (OutcomeRecord, Option<CrmError>) {
    warn!("{}", message);
    let outcome = OutcomeRecord::failed(record, remote, message);
    (outcome, error.is_fatal().then_some(error))
}
