//! Session assembly: config mapping, transport selection, and the run itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use armpick_core::error::Result as CoreResult;
use armpick_core::runner::{SessionCfg, SessionReport};
use armpick_traits::{Detector, FrameSource, ServoArm};

use crate::cli::{CliSession, LAST_SESSION};

/// Session cap overrides from the command line; `None` defers to the config.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOverrides {
    pub max_placements: Option<u32>,
    pub max_run_ms: Option<u64>,
    pub detect_hz: Option<u32>,
}

/// Map the TOML schema to core types, apply CLI overrides, and run one full
/// sorting session on the given transports.
pub fn run_session(
    cfg: &armpick_config::Config,
    slots_override: Option<Vec<[f32; 3]>>,
    overrides: SessionOverrides,
    hw: (
        impl ServoArm + 'static,
        impl FrameSource + Send + 'static,
        impl Detector + Send + 'static,
    ),
    shutdown: Arc<AtomicBool>,
) -> CoreResult<SessionReport> {
    let stabilizer: armpick_core::StabilizerCfg = (&cfg.stabilizer).into();
    let mapping: armpick_core::MappingCfg = (&cfg.mapping).into();
    let solver: armpick_core::SolverCfg = (&cfg.solver).into();
    let limits: armpick_core::JointLimits = (&cfg.limits).into();
    let bounds: armpick_core::WorkspaceBounds = (&cfg.workspace).into();
    let motion: armpick_core::MotionCfg = (&cfg.motion).into();

    let resolved = match slots_override {
        Some(s) => Some(s),
        None => cfg.resolved_slots()?,
    };
    let mode = armpick_core::config::placement_from_config(&cfg.placement, resolved);

    let mut session = SessionCfg {
        max_placements: cfg.session.max_placements,
        max_run_ms: cfg.session.max_run_ms,
        detect_hz: cfg.session.detect_hz,
    };
    if let Some(n) = overrides.max_placements {
        session.max_placements = n;
    }
    if let Some(ms) = overrides.max_run_ms {
        session.max_run_ms = ms;
    }
    if let Some(hz) = overrides.detect_hz {
        session.detect_hz = hz;
    }
    let _ = LAST_SESSION.set(CliSession {
        max_placements: session.max_placements,
        max_run_ms: session.max_run_ms,
        detect_hz: session.detect_hz,
    });

    let (arm, camera, detector) = hw;
    let stop_check: Option<Box<dyn Fn() -> bool + Send + Sync>> =
        Some(Box::new(move || shutdown.load(Ordering::Relaxed)));

    armpick_core::runner::run_session(
        arm, camera, detector, stabilizer, mapping, solver, limits, bounds, motion, mode, session,
        stop_check, None,
    )
}

/// One-line JSON summary of a finished session.
pub fn report_json(report: &SessionReport, runtime_ms: Option<u64>) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "status": "complete",
        "placed": report.placed,
        "failed_cycles": report.failed_cycles,
        "stack_height_mm": report.ledger.stack_height,
        "next_slot_index": report.ledger.next_slot_index,
        "zone_counts": report.ledger.zone_counts,
    });
    if let Some(ms) = runtime_ms {
        obj["runtime_ms"] = serde_json::json!(ms);
    }
    obj
}
