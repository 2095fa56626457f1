//! Batch pacing decisions
//!
//! Pure functions so the checkpoint and delay policy can be tested without
//! a CRM or a clock.

/// Check if a checkpoint is due after `processed` records.
///
/// # Arguments
/// * `processed` - Records finished so far in this batch (1-based count)
/// * `every` - Checkpoint interval; 0 disables periodic checkpoints
pub fn checkpoint_due(processed: usize, every: usize) -> bool {
    every > 0 && processed > 0 && processed.is_multiple_of(every)
}

/// Check if the driver should pause before the next record.
///
/// There is no pause after the last record of a batch.
pub fn should_pause(processed: usize, total: usize) -> bool {
    processed < total
}
