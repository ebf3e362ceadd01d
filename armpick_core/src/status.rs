//! Cycle outcome reported to the caller after each pick-and-place attempt.

use crate::error::PickError;
use crate::workspace::WorkspacePoint;

/// Result of one full pick-and-place cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The object was placed and the ledger advanced; the arm is at HOME.
    Placed { placement: WorkspacePoint },
    /// The cycle failed with a recoverable reason; the arm is back at HOME
    /// (via the two-step safe pose) and the ledger is untouched.
    Failed { reason: PickError },
}

impl CycleOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, CycleOutcome::Placed { .. })
    }
}
