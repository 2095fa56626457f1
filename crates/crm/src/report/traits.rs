//! Result sink trait definition

use anyhow::Result;

use crate::models::RunLog;

/// Destination for a run's accumulated outcomes
///
/// The sync engine calls [`checkpoint`](ResultSink::checkpoint) periodically
/// during a batch and [`finish`](ResultSink::finish) once at the end. Both
/// receive the full log so far; implementations may overwrite earlier output.
pub trait ResultSink {
    /// Persist partial progress
    fn checkpoint(&mut self, log: &RunLog) -> Result<()>;

    /// Persist the final state of the run
    fn finish(&mut self, log: &RunLog) -> Result<()>;
}
