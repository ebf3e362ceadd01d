//! The motion state machine (`SequencerCore`).
//!
//! Drives one pick-and-place cycle through a fixed phase order, dwelling
//! after every command: the servo bus gives no motion-complete feedback, so
//! a duration-proportional sleep is the only way to know a move finished.
//! Recoverable failures route through the two-step safety recovery instead
//! of leaving the arm mid-sequence.

use std::sync::Arc;

use armpick_traits::clock::Clock;
use armpick_traits::{Detection, ServoArm};

use crate::config::{MappingCfg, MotionCfg, SolverCfg};
use crate::error::{PickError, Result};
use crate::hw_error::map_transport_error;
use crate::ledger::{PlacementLedger, PlacementMode};
use crate::mapper;
use crate::pose::{self, GripperState, JointLimits, JointPose};
use crate::status::CycleOutcome;
use crate::util::move_duration_ms;
use crate::workspace::{WorkspaceBounds, WorkspacePoint};

/// Phases of one cycle, in execution order. HOME bookends the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Home,
    ApproachSource,
    DescendSource,
    Grasp,
    Lift,
    Transit,
    ApproachDest,
    DescendDest,
    Release,
    Retreat,
}

impl Phase {
    pub const CYCLE: [Phase; 11] = [
        Phase::Home,
        Phase::ApproachSource,
        Phase::DescendSource,
        Phase::Grasp,
        Phase::Lift,
        Phase::Transit,
        Phase::ApproachDest,
        Phase::DescendDest,
        Phase::Release,
        Phase::Retreat,
        Phase::Home,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Home => "home",
            Phase::ApproachSource => "approach_source",
            Phase::DescendSource => "descend_source",
            Phase::Grasp => "grasp",
            Phase::Lift => "lift",
            Phase::Transit => "transit",
            Phase::ApproachDest => "approach_dest",
            Phase::DescendDest => "descend_dest",
            Phase::Release => "release",
            Phase::Retreat => "retreat",
        }
    }
}

/// Unified core for both dynamic (boxed) and generic (static dispatch)
/// variants. Owns the arm, the placement ledger, and the last commanded
/// pose; nothing else in the system may cache an arm position.
pub struct SequencerCore<A: ServoArm> {
    pub(crate) arm: A,
    pub(crate) mapping: MappingCfg,
    pub(crate) solver: SolverCfg,
    pub(crate) limits: JointLimits,
    pub(crate) bounds: WorkspaceBounds,
    pub(crate) motion: MotionCfg,
    pub(crate) mode: PlacementMode,
    pub(crate) ledger: PlacementLedger,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) frame_size: (u32, u32),

    pub(crate) current_pose: JointPose,
    pub(crate) gripper: GripperState,
    pub(crate) in_flight: bool,
}

impl<A: ServoArm> core::fmt::Debug for SequencerCore<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SequencerCore")
            .field("placed_count", &self.ledger.placed_count)
            .field("gripper", &self.gripper)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl<A: ServoArm> SequencerCore<A> {
    /// Read-only snapshot of the session ledger.
    pub fn ledger_snapshot(&self) -> PlacementLedger {
        self.ledger.clone()
    }

    /// Last commanded joint pose (the arm's position between cycles).
    pub fn current_pose(&self) -> &JointPose {
        &self.current_pose
    }

    pub fn gripper(&self) -> GripperState {
        self.gripper
    }

    /// True while a cycle is executing.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Run one full pick-and-place cycle for a stabilized detection.
    ///
    /// Recoverable failures (`OutOfBounds`, `Unreachable`) drive safety
    /// recovery and come back as `CycleOutcome::Failed`; placement-mode
    /// exhaustion fails without commanding any motion; transport errors
    /// are fatal and re-raised after one best-effort recovery. The ledger
    /// advances only on the success path.
    pub fn run_cycle(&mut self, target: &Detection) -> Result<CycleOutcome> {
        if self.in_flight {
            return Ok(CycleOutcome::Failed {
                reason: PickError::Busy,
            });
        }
        self.in_flight = true;
        let res = self.cycle_inner(target);
        self.in_flight = false;

        match res {
            Ok(placement) => {
                tracing::info!(
                    x = placement.x,
                    y = placement.y,
                    z = placement.z,
                    placed = self.ledger.placed_count,
                    "cycle complete"
                );
                Ok(CycleOutcome::Placed { placement })
            }
            Err(e) if e.is_exhaustion() => {
                // No motion was commanded; the arm is still at HOME.
                tracing::warn!(error = %e, "placement exhausted");
                Ok(CycleOutcome::Failed { reason: e })
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "cycle failed, recovering");
                self.recover().map_err(eyre::Report::new)?;
                Ok(CycleOutcome::Failed { reason: e })
            }
            Err(e) => {
                // Transport faults: try to reach a safe pose once, then
                // propagate as fatal.
                tracing::error!(error = %e, "transport fault, attempting recovery");
                if let Err(rec) = self.recover() {
                    tracing::error!(error = %rec, "recovery also failed");
                }
                Err(eyre::Report::new(e))
            }
        }
    }

    fn cycle_inner(&mut self, target: &Detection) -> std::result::Result<WorkspacePoint, PickError> {
        let source = mapper::to_workspace(target, self.frame_size, &self.mapping);
        self.bounds.validate(&source)?;

        // Destination is reserved up front so exhaustion never moves the
        // arm; the ticket is applied only after RETREAT -> HOME succeeds.
        let (dest, ticket) = self.mode.next_destination(target, &self.ledger)?;
        self.bounds.validate(&dest)?;

        tracing::info!(
            sx = source.x,
            sy = source.y,
            sz = source.z,
            dx = dest.x,
            dy = dest.y,
            dz = dest.z,
            confidence = target.confidence,
            "cycle start"
        );

        for phase in Phase::CYCLE {
            tracing::debug!(phase = phase.name(), "enter phase");
            self.execute_phase(phase, &source, &dest)?;
        }

        self.mode.apply(ticket, &mut self.ledger);
        Ok(dest)
    }

    fn execute_phase(
        &mut self,
        phase: Phase,
        source: &WorkspacePoint,
        dest: &WorkspacePoint,
    ) -> std::result::Result<(), PickError> {
        let clearance = self.motion.approach_offset;
        match phase {
            Phase::Home => self.move_home(),
            Phase::ApproachSource => {
                self.move_to_point(&source.raised(clearance))?;
                // Open before descending onto the object.
                self.command_gripper(GripperState::Open)
            }
            Phase::DescendSource => self.move_to_point(source),
            Phase::Grasp => self.command_gripper(GripperState::Closed),
            Phase::Lift => self.move_to_point(&source.raised(clearance)),
            Phase::Transit => {
                // Carry at clearance above the taller of the two heights.
                let travel = WorkspacePoint {
                    x: dest.x,
                    y: dest.y,
                    z: source.z.max(dest.z) + clearance,
                };
                self.move_to_point(&travel)
            }
            Phase::ApproachDest => self.move_to_point(&dest.raised(clearance)),
            Phase::DescendDest => self.move_to_point(dest),
            Phase::Release => self.command_gripper(GripperState::Open),
            Phase::Retreat => self.move_to_point(&dest.raised(clearance)),
        }
    }

    /// Two-step safety recovery: gripper open and a raised safe pose
    /// first, HOME second. Never jumps straight home -- dragging a
    /// half-closed gripper across the workspace is how cups get knocked
    /// over. Transport errors propagate to the caller.
    pub fn recover(&mut self) -> std::result::Result<(), PickError> {
        tracing::warn!("safety recovery");
        self.command_gripper(GripperState::Open)?;
        let safe = self.arm_space_pose(self.motion.safe_deg);
        self.move_to_pose(safe)?;
        self.move_home()
    }

    // ── Motion primitives ────────────────────────────────────────────────────

    fn move_home(&mut self) -> std::result::Result<(), PickError> {
        let home = self.arm_space_pose(self.motion.home_deg);
        self.move_to_pose(home)
    }

    /// Validate, solve, and move to a workspace point with the current
    /// gripper angle held.
    fn move_to_point(&mut self, point: &WorkspacePoint) -> std::result::Result<(), PickError> {
        self.bounds.validate(point)?;
        let pose = pose::solve(point, self.gripper, None, &self.solver, &self.limits)?;
        self.move_to_pose(pose)
    }

    /// Issue one 6-joint command and dwell it out. The commanded duration
    /// scales with the largest joint delta; the dwell is
    /// `max(min_dwell, move_ms + settle_pad)`.
    fn move_to_pose(&mut self, pose: JointPose) -> std::result::Result<(), PickError> {
        // The solver clamps, but hardware commands are re-checked anyway:
        // joint-space poses (home/safe) bypass the solver.
        if !self.limits.contains(&pose) {
            let (j, a) = pose
                .0
                .iter()
                .enumerate()
                .find(|(j, a)| !(self.limits.min_deg[*j]..=self.limits.max_deg[*j]).contains(a))
                .map(|(j, a)| (j, *a))
                .unwrap_or((0, pose.0[0]));
            return Err(PickError::Unreachable {
                joint: (j + 1) as u8,
                angle_deg: a,
            });
        }

        let delta = self.current_pose.max_delta_deg(&pose);
        let move_ms = move_duration_ms(
            delta,
            self.motion.ms_per_degree,
            self.motion.min_move_ms,
            self.motion.max_move_ms,
        );
        tracing::trace!(delta_deg = delta, move_ms, "joint command");
        self.arm
            .set_joints(&pose.0, move_ms)
            .map_err(|e| map_transport_error(&*e))?;
        self.current_pose = pose;

        let dwell = (move_ms as u64 + self.motion.settle_pad_ms).max(self.motion.min_dwell_ms);
        self.clock.sleep(std::time::Duration::from_millis(dwell));
        Ok(())
    }

    /// Command only the gripper joint and wait out its settle time, so the
    /// next arm move never races a still-closing gripper.
    fn command_gripper(&mut self, state: GripperState) -> std::result::Result<(), PickError> {
        let angle = state.angle(&self.solver);
        tracing::trace!(?state, angle, "gripper command");
        self.arm
            .set_joint(6, angle, self.motion.gripper_move_ms)
            .map_err(|e| map_transport_error(&*e))?;
        self.gripper = state;
        self.current_pose = self.current_pose.with_gripper(angle);
        self.clock
            .sleep(std::time::Duration::from_millis(self.motion.gripper_settle_ms));
        Ok(())
    }

    /// A joint-space pose (home/safe) with the current gripper angle.
    fn arm_space_pose(&self, arm_deg: [f32; 5]) -> JointPose {
        JointPose([
            arm_deg[0],
            arm_deg[1],
            arm_deg[2],
            arm_deg[3],
            arm_deg[4],
            self.gripper.angle(&self.solver),
        ])
    }
}
