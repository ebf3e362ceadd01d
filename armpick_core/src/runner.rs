//! Session orchestration: detection feed in, pick cycles out.
//!
//! `run_session` owns the full loop of the sorting station: it spawns the
//! background detection feed, streams every frame through the stability
//! gate, and hands each chosen stable target to the sequencer, until the
//! session cap, the run-time cap, an operator stop, or a fatal fault ends
//! the run.

use std::time::Duration;

use armpick_traits::clock::{Clock, MonotonicClock};
use armpick_traits::{Detection, Detector, FrameSource, ServoArm};

use crate::config::{MappingCfg, MotionCfg, SolverCfg, StabilizerCfg};
use crate::error::{PickError, Result};
use crate::feed::DetectionFeed;
use crate::ledger::{PlacementLedger, PlacementMode};
use crate::pose::JointLimits;
use crate::stabilizer::DetectionStabilizer;
use crate::status::CycleOutcome;
use crate::workspace::WorkspaceBounds;

/// Session-level caps. Defaults match a five-cup demo run.
#[derive(Debug, Clone, Copy)]
pub struct SessionCfg {
    /// Stop after this many successful placements.
    pub max_placements: u32,
    /// Hard wall-clock cap for the whole session.
    pub max_run_ms: u64,
    /// Target detection rate for the camera feed.
    pub detect_hz: u32,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            max_placements: 5,
            max_run_ms: 600_000,
            detect_hz: 5,
        }
    }
}

/// What a finished session did. Returned on every graceful end; fatal
/// transport faults surface as errors instead.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub placed: u32,
    pub failed_cycles: u32,
    pub ledger: PlacementLedger,
}

/// Stall watchdog threshold: at least four detection periods and a two
/// second floor (model inference can hiccup), capped strictly below the
/// session cap so the watchdog can still fire first.
#[inline]
fn stall_threshold_ms(period_ms: u64, max_run_ms: u64) -> u64 {
    period_ms
        .saturating_mul(4)
        .max(2_000)
        .min(max_run_ms.saturating_sub(1))
        .max(1)
}

/// Largest stable detection wins: box area is the nearest-object proxy, and
/// the nearest cup is the one least likely to be occluded mid-reach.
fn select_target(stable: &[Detection]) -> Option<&Detection> {
    stable
        .iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Run a full sorting session until a cap, an operator stop, or a fault.
///
/// The caps end the session gracefully with a report; a sustained feed
/// stall or a transport fault ends it with an error (the sequencer has
/// already attempted safety recovery by then).
#[allow(clippy::too_many_arguments)]
pub fn run_session<A, F, D>(
    arm: A,
    camera: F,
    detector: D,
    stabilizer: StabilizerCfg,
    mapping: MappingCfg,
    solver: SolverCfg,
    limits: JointLimits,
    bounds: WorkspaceBounds,
    motion: MotionCfg,
    mode: PlacementMode,
    session: SessionCfg,
    stop_check: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<SessionReport>
where
    A: ServoArm + 'static,
    F: FrameSource + Send + 'static,
    D: Detector + Send + 'static,
{
    // The gate counts support over previous frames only, so a threshold at
    // or above the history size could never fire and the arm would sit idle.
    if stabilizer.stability_threshold >= stabilizer.history_size {
        return Err(crate::error::Report::new(
            crate::error::BuildError::InvalidConfig(
                "stabilizer threshold must be below the history size",
            ),
        ));
    }

    let period_ms = crate::util::period_ms(session.detect_hz);
    let stall_ms = stall_threshold_ms(period_ms, session.max_run_ms);

    let feed = DetectionFeed::spawn(camera, detector, session.detect_hz, MonotonicClock::new());
    let mut gate = DetectionStabilizer::new(stabilizer);
    let mut core = crate::builder::build_sequencer(
        arm, mode, mapping, solver, limits, bounds, motion, (640, 480), clock,
    )?;

    tracing::info!(
        max_placements = session.max_placements,
        detect_hz = session.detect_hz,
        "session start"
    );

    let start = std::time::Instant::now();
    let mut report = SessionReport::default();

    loop {
        let elapsed_ms: u64 = {
            let ms = start.elapsed().as_millis();
            (ms.min(u128::from(u64::MAX))) as u64
        };

        if let Some(check) = stop_check.as_deref() {
            if check() {
                tracing::info!(placed = report.placed, "operator stop");
                break;
            }
        }
        if elapsed_ms >= session.max_run_ms {
            tracing::warn!(placed = report.placed, "session run time exceeded");
            break;
        }
        if elapsed_ms >= stall_ms && feed.stalled_ms() > stall_ms {
            return Err(crate::error::Report::new(PickError::Timeout));
        }

        // Every buffered frame goes through the gate, including the ones
        // captured while the previous cycle held the arm, so warm-up state
        // reflects what the camera actually saw.
        let mut stable: Vec<Detection> = Vec::new();
        let mut frame_size = None;
        for frame in feed.drain() {
            stable = gate.observe(&frame.detections);
            frame_size = Some(frame.frame_size);
        }
        if let Some(fs) = frame_size {
            core.frame_size = fs;
        }

        let Some(target) = select_target(&stable).copied() else {
            std::thread::sleep(Duration::from_millis(period_ms));
            continue;
        };

        match core.run_cycle(&target)? {
            CycleOutcome::Placed { .. } => {
                report.placed += 1;
                if report.placed >= session.max_placements {
                    tracing::info!(placed = report.placed, "session cap reached");
                    break;
                }
            }
            CycleOutcome::Failed { reason } => {
                report.failed_cycles += 1;
                if reason.is_exhaustion() {
                    tracing::warn!(error = %reason, "no destinations left, ending session");
                    break;
                }
            }
        }
    }

    report.ledger = core.ledger_snapshot();
    Ok(report)
}
