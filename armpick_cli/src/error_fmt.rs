//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_SESSION;

fn pick_error_name(e: &armpick_core::PickError) -> &'static str {
    use armpick_core::PickError::*;
    match e {
        OutOfBounds { .. } => "OutOfBounds",
        Unreachable { .. } => "Unreachable",
        ZoneFull(_) => "ZoneFull",
        NoSlotsRemaining => "NoSlotsRemaining",
        Busy => "Busy",
        Transport(_) => "Transport",
        Timeout => "Timeout",
        State(_) => "State",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use armpick_core::{BuildError, PickError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingArm => {
                "What happened: No arm transport was provided to the sequencer.\nLikely causes: The servo bus failed to initialize or was not wired into the builder.\nHow to fix: Ensure the arm is created successfully and passed via with_arm(...).".to_string()
            }
            BuildError::MissingMode => {
                "What happened: No placement mode was configured.\nLikely causes: The [placement] table is missing from the config.\nHow to fix: Add a [placement] table (mode = \"tower\", \"zones\" or \"slots\") and rerun.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PickError>() {
        // Specific domain cases first
        if matches!(pe, PickError::Timeout) {
            return "What happened: The detection feed stalled past the watchdog threshold.\nLikely causes: Camera unplugged, detector crashed, or detect_hz set far above what the pipeline can sustain.\nHow to fix: Check the camera connection and lower session.detect_hz in the config.".to_string();
        }
        if let PickError::Transport(msg) = pe {
            return format!(
                "What happened: The servo bus rejected a command ({msg}).\nLikely causes: I2C wiring fault, arm power loss, or address conflict on the bus.\nHow to fix: Check the arm's power and the I2C cabling, then start a new session. The arm attempted safety recovery before exiting."
            );
        }
        if let PickError::OutOfBounds { x, y, z } = pe {
            return format!(
                "What happened: A mapped target ({x:.1}, {y:.1}, {z:.1}) fell outside the safe workspace.\nLikely causes: Stale camera calibration or objects placed at the table edge.\nHow to fix: Re-run the mapping calibration or widen [workspace] in the config."
            );
        }
        // Fallback to generic for other domain errors
        return format!(
            "What happened: {pe}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("i2c") || lower.contains("open arm bus") {
        return "What happened: Failed to open the arm's I2C bus.\nLikely causes: I2C disabled on the Pi, wrong bus index, or insufficient permissions.\nHow to fix: Enable I2C (raspi-config), check the wiring, and ensure the process may access /dev/i2c-1.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing tables ([workspace], [motion], [placement], ...) or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Slot CSV header special-case
    if lower.contains("slot csv must have headers") {
        return "Invalid headers in slot CSV. Expected 'x,y,z'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map fatal pick errors (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use armpick_core::PickError;
    if let Some(pe) = err.downcast_ref::<PickError>() {
        return match pe {
            PickError::Timeout => 4,
            PickError::Transport(_) => 5,
            _ => 3,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use armpick_core::PickError;
    use serde_json::json;

    if let Some(pe) = err.downcast_ref::<PickError>() {
        let msg = humanize(err);
        let details = LAST_SESSION.get();
        let reason_name = pick_error_name(pe);

        let detail_obj = match pe {
            PickError::Timeout => details.map(|s| {
                json!({ "detect_hz": s.detect_hz, "max_run_ms": s.max_run_ms })
            }),
            PickError::Transport(_) => {
                details.map(|s| json!({ "max_placements": s.max_placements }))
            }
            _ => None,
        };

        let obj = if let Some(d) = detail_obj {
            json!({ "reason": reason_name, "details": d, "message": msg })
        } else {
            json!({ "reason": reason_name, "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
