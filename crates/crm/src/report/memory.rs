//! In-memory result sink
//!
//! Keeps every snapshot it receives. Used by tests to observe when the
//! engine checkpoints.

use anyhow::Result;

use super::ResultSink;
use crate::models::RunLog;

/// ResultSink that records snapshots instead of writing files
#[derive(Debug, Default)]
pub struct InMemorySink {
    checkpoints: Vec<RunLog>,
    finished: Option<RunLog>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkpointed log, oldest first
    pub fn checkpoints(&self) -> &[RunLog] {
        &self.checkpoints
    }

    /// Number of outcomes in each checkpoint
    pub fn checkpoint_sizes(&self) -> Vec<usize> {
        self.checkpoints.iter().map(RunLog::len).collect()
    }

    /// The log passed to `finish`, if it was called
    pub fn finished(&self) -> Option<&RunLog> {
        self.finished.as_ref()
    }
}

impl ResultSink for InMemorySink {
    fn checkpoint(&mut self, log: &RunLog) -> Result<()> {
        self.checkpoints.push(log.clone());
        Ok(())
    }

    fn finish(&mut self, log: &RunLog) -> Result<()> {
        self.finished = Some(log.clone());
        Ok(())
    }
}
