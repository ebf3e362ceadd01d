use thiserror::Error;

/// Typed failure reasons for a pick-and-place cycle.
#[derive(Debug, Error, Clone)]
pub enum PickError {
    #[error("point ({x:.1}, {y:.1}, {z:.1}) outside workspace bounds")]
    OutOfBounds { x: f32, y: f32, z: f32 },
    #[error("target unreachable: joint {joint} wants {angle_deg:.1} deg, past its limit")]
    Unreachable { joint: u8, angle_deg: f32 },
    #[error("zone '{0}' is at capacity")]
    ZoneFull(String),
    #[error("no placement slots remaining")]
    NoSlotsRemaining,
    #[error("a pick cycle is already in flight")]
    Busy,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timeout waiting for transport")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
}

impl PickError {
    /// Recoverable errors downgrade to a failed cycle after safety recovery;
    /// the rest are fatal and re-raised to the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PickError::Transport(_) | PickError::Timeout)
    }

    /// Exhaustion errors are detected before any motion is commanded, so
    /// they fail the cycle without driving recovery.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, PickError::ZoneFull(_) | PickError::NoSlotsRemaining)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing arm transport")]
    MissingArm,
    #[error("missing placement mode")]
    MissingMode,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
