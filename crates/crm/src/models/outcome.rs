//! Per-record outcomes and the run-scoped log they accumulate in

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContactId, DesiredRecord, RemoteRecord};

/// Terminal state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Name differed and the CRM confirmed the update
    Updated,
    /// Name already matched; no write was issued
    AlreadyCorrect,
    /// No CRM contact has this email
    NotFound,
    /// A call failed or the CRM rejected the update
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::AlreadyCorrect => "already_correct",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

/// What happened to one desired record. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub natural_key: String,
    pub desired_name: String,
    /// Name the CRM held before this run (None when no contact was matched)
    pub prior_name: Option<String>,
    pub remote_id: Option<ContactId>,
    pub status: OutcomeStatus,
    /// Diagnostic for `Error` outcomes
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl OutcomeRecord {
    fn base(record: &DesiredRecord, remote: Option<&RemoteRecord>, status: OutcomeStatus) -> Self {
        Self {
            natural_key: record.natural_key.clone(),
            desired_name: record.display_name.clone(),
            prior_name: remote.map(|r| r.current_name.clone()),
            remote_id: remote.map(|r| r.id.clone()),
            status,
            error: None,
            processed_at: Utc::now(),
        }
    }

    pub fn updated(record: &DesiredRecord, remote: &RemoteRecord) -> Self {
        Self::base(record, Some(remote), OutcomeStatus::Updated)
    }

    pub fn already_correct(record: &DesiredRecord, remote: &RemoteRecord) -> Self {
        Self::base(record, Some(remote), OutcomeStatus::AlreadyCorrect)
    }

    pub fn not_found(record: &DesiredRecord) -> Self {
        Self::base(record, None, OutcomeStatus::NotFound)
    }

    pub fn failed(
        record: &DesiredRecord,
        remote: Option<&RemoteRecord>,
        message: impl Into<String>,
    ) -> Self {
        let mut outcome = Self::base(record, remote, OutcomeStatus::Error);
        outcome.error = Some(message.into());
        outcome
    }

    /// Whether a CRM contact was matched for this record
    pub fn was_found(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Aggregate counters for a run, derived from its outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records in the source
    pub total: usize,
    pub processed: usize,
    pub found: usize,
    pub updated: usize,
    pub already_correct: usize,
    pub not_found: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
}

/// Append-only sequence of outcomes for one run
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    total: usize,
    outcomes: Vec<OutcomeRecord>,
}

impl RunLog {
    /// Empty log for a source with `total` records
    pub fn new(total: usize) -> Self {
        Self {
            total,
            outcomes: Vec::new(),
        }
    }

    /// Count `additional` more records toward the run total
    pub fn extend_total(&mut self, additional: usize) {
        self.total += additional;
    }

    pub fn push(&mut self, outcome: OutcomeRecord) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[OutcomeRecord] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Fold the outcomes into counters
    pub fn summary(&self) -> RunSummary {
        self.outcomes.iter().fold(
            RunSummary {
                total: self.total,
                ..RunSummary::default()
            },
            |mut summary, outcome| {
                summary.processed += 1;
                if outcome.was_found() {
                    summary.found += 1;
                }
                match outcome.status {
                    OutcomeStatus::Updated => summary.updated += 1,
                    OutcomeStatus::AlreadyCorrect => summary.already_correct += 1,
                    OutcomeStatus::NotFound => summary.not_found += 1,
                    OutcomeStatus::Error => {
                        summary.error_count += 1;
                        if let Some(message) = &outcome.error {
                            summary.errors.push(message.clone());
                        }
                    }
                }
                summary
            },
        )
    }
}
