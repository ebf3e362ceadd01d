//! Maps `Box<dyn Error>` from trait boundaries to typed `PickError`.
//!
//! The traits in `armpick_traits` use `Box<dyn Error + Send + Sync>` for
//! maximum flexibility; this module converts those to our typed error enum,
//! with an optional feature-gated path for `armpick_hardware::HwError`
//! downcasting.

use crate::error::PickError;

/// Map a trait-boundary error to a typed `PickError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> PickError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<armpick_hardware::error::HwError>() {
            return match hw {
                armpick_hardware::error::HwError::Timeout => PickError::Timeout,
                other => PickError::Transport(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PickError::Timeout
    } else {
        PickError::Transport(s)
    }
}
