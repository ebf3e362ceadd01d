//! Type-state builder for `Sequencer` and generic `build_sequencer` constructor.
//!
//! The builder enforces at compile time that the arm and the placement mode
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use armpick_traits::clock::{Clock, MonotonicClock};

use crate::config::{MappingCfg, MotionCfg, SolverCfg};
use crate::error::{BuildError, Result};
use crate::ledger::{PlacementLedger, PlacementMode};
use crate::pose::{GripperState, JointLimits, JointPose};
use crate::sequencer::SequencerCore;
use crate::status::CycleOutcome;
use crate::workspace::WorkspaceBounds;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Public dynamic (boxed) sequencer that hides the generic core.
pub struct Sequencer {
    pub(crate) inner: SequencerCore<Box<dyn armpick_traits::ServoArm>>,
}

impl core::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sequencer")
            .field("placed_count", &self.inner.ledger.placed_count)
            .field("gripper", &self.inner.gripper)
            .field("in_flight", &self.inner.in_flight)
            .finish()
    }
}

impl Sequencer {
    /// Start building a Sequencer.
    pub fn builder() -> SequencerBuilder<Missing, Missing> {
        SequencerBuilder::default()
    }

    /// Run one full pick-and-place cycle for a stabilized detection.
    pub fn run_cycle(&mut self, target: &armpick_traits::Detection) -> Result<CycleOutcome> {
        self.inner.run_cycle(target)
    }

    /// Drive the two-step safety recovery directly (open, safe pose, home).
    pub fn recover(&mut self) -> Result<()> {
        self.inner.recover().map_err(eyre::Report::new)
    }

    /// Read-only snapshot of the session ledger.
    pub fn ledger_snapshot(&self) -> PlacementLedger {
        self.inner.ledger_snapshot()
    }

    /// Last commanded joint pose.
    pub fn current_pose(&self) -> &JointPose {
        self.inner.current_pose()
    }

    pub fn gripper(&self) -> GripperState {
        self.inner.gripper()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Sequencer`. All fields are validated on `build()`.
pub struct SequencerBuilder<A, P> {
    arm: Option<Box<dyn armpick_traits::ServoArm>>,
    mode: Option<PlacementMode>,
    mapping: Option<MappingCfg>,
    solver: Option<SolverCfg>,
    limits: Option<JointLimits>,
    bounds: Option<WorkspaceBounds>,
    motion: Option<MotionCfg>,
    frame_size: Option<(u32, u32)>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _a: PhantomData<A>,
    _p: PhantomData<P>,
}

impl Default for SequencerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            arm: None,
            mode: None,
            mapping: None,
            solver: None,
            limits: None,
            bounds: None,
            motion: None,
            frame_size: None,
            clock: None,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Validate configuration and construct a `SequencerCore`.
///
/// Single source of truth for validation, used by both
/// `SequencerBuilder::try_build()` and `build_sequencer()`.
#[allow(clippy::too_many_arguments)]
fn validate_and_build<A: armpick_traits::ServoArm>(
    arm: A,
    mut mode: PlacementMode,
    mut mapping: MappingCfg,
    solver: SolverCfg,
    limits: JointLimits,
    bounds: WorkspaceBounds,
    motion: MotionCfg,
    frame_size: (u32, u32),
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<SequencerCore<A>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if frame_size.0 == 0 || frame_size.1 == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "frame size must be nonzero",
        )));
    }
    if bounds.x_min >= bounds.x_max || bounds.y_min >= bounds.y_max || bounds.z_min >= bounds.z_max
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "workspace bounds must have min < max on every axis",
        )));
    }
    for j in 0..6 {
        if limits.min_deg[j] > limits.max_deg[j] {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "joint limits must have min <= max",
            )));
        }
    }
    if !(motion.ms_per_degree.is_finite() && motion.ms_per_degree > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "ms_per_degree must be positive",
        )));
    }
    if motion.min_move_ms > motion.max_move_ms {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "min_move_ms must be <= max_move_ms",
        )));
    }
    if motion.approach_offset.is_sign_negative() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "approach_offset must be >= 0",
        )));
    }
    let grip_range = limits.min_deg[5]..=limits.max_deg[5];
    if !grip_range.contains(&solver.gripper_open_deg)
        || !grip_range.contains(&solver.gripper_closed_deg)
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "gripper angles must lie within joint 6 limits",
        )));
    }
    for pose in [&motion.home_deg, &motion.safe_deg] {
        for (j, a) in pose.iter().enumerate() {
            if !(limits.min_deg[j]..=limits.max_deg[j]).contains(a) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "home and safe poses must lie within joint limits",
                )));
            }
        }
    }
    match &mode {
        PlacementMode::Tower { cup_height, .. } => {
            if !(cup_height.is_finite() && *cup_height > 0.0) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "cup_height must be positive",
                )));
            }
        }
        PlacementMode::Zone { zones, .. } => {
            if zones.is_empty() {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "zone placement needs at least one zone",
                )));
            }
            if zones.iter().any(|z| z.capacity == 0) {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "zone capacity must be > 0",
                )));
            }
        }
        PlacementMode::Slot { slots } => {
            if slots.is_empty() {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "slot placement needs at least one slot",
                )));
            }
        }
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    // Area bands resolve by first match, so order them largest first here.
    if let crate::config::DepthModel::AreaBands { bands, .. } = &mut mapping.depth {
        bands.sort_by(|a, b| b.min_area.total_cmp(&a.min_area));
    }
    if let PlacementMode::Zone { zones, .. } = &mut mode {
        let mut ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != zones.len() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "zone ids must be unique",
            )));
        }
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    // The arm is assumed parked at HOME with the gripper closed; the first
    // cycle's HOME phase makes that true regardless.
    let gripper = GripperState::Closed;
    let current_pose = JointPose([
        motion.home_deg[0],
        motion.home_deg[1],
        motion.home_deg[2],
        motion.home_deg[3],
        motion.home_deg[4],
        gripper.angle(&solver),
    ]);

    Ok(SequencerCore {
        arm,
        mapping,
        solver,
        limits,
        bounds,
        motion,
        mode,
        ledger: PlacementLedger::default(),
        clock,
        frame_size,
        current_pose,
        gripper,
        in_flight: false,
    })
}

impl<A, P> SequencerBuilder<A, P> {
    /// Fallible build available in any type-state; reports missing pieces.
    pub fn try_build(self) -> Result<Sequencer> {
        let arm = self
            .arm
            .ok_or_else(|| eyre::Report::new(BuildError::MissingArm))?;
        let mode = self
            .mode
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMode))?;

        let inner = validate_and_build(
            arm,
            mode,
            self.mapping.unwrap_or_default(),
            self.solver.unwrap_or_default(),
            self.limits.unwrap_or_default(),
            self.bounds.unwrap_or_default(),
            self.motion.unwrap_or_default(),
            self.frame_size.unwrap_or((640, 480)),
            self.clock,
        )?;

        Ok(Sequencer { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<A, P> SequencerBuilder<A, P> {
    pub fn with_mapping(mut self, mapping: MappingCfg) -> Self {
        self.mapping = Some(mapping);
        self
    }
    pub fn with_solver(mut self, solver: SolverCfg) -> Self {
        self.solver = Some(solver);
        self
    }
    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = Some(limits);
        self
    }
    pub fn with_bounds(mut self, bounds: WorkspaceBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }
    /// Camera frame size in pixels; defaults to 640x480.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> SequencerBuilder<Missing, P> {
    pub fn with_arm(self, arm: impl armpick_traits::ServoArm + 'static) -> SequencerBuilder<Set, P> {
        SequencerBuilder {
            arm: Some(Box::new(arm)),
            mode: self.mode,
            mapping: self.mapping,
            solver: self.solver,
            limits: self.limits,
            bounds: self.bounds,
            motion: self.motion,
            frame_size: self.frame_size,
            clock: self.clock,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<A> SequencerBuilder<A, Missing> {
    pub fn with_placement(self, mode: PlacementMode) -> SequencerBuilder<A, Set> {
        SequencerBuilder {
            arm: self.arm,
            mode: Some(mode),
            mapping: self.mapping,
            solver: self.solver,
            limits: self.limits,
            bounds: self.bounds,
            motion: self.motion,
            frame_size: self.frame_size,
            clock: self.clock,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl SequencerBuilder<Set, Set> {
    /// Validate and build. Only available once arm and placement are set.
    pub fn build(self) -> Result<Sequencer> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type SequencerG<A> = SequencerCore<A>;

/// Build a generic, statically-dispatched `SequencerG` from a concrete arm.
///
/// Delegates to the shared `validate_and_build`; no duplicated validation.
#[allow(clippy::too_many_arguments)]
pub fn build_sequencer<A>(
    arm: A,
    mode: PlacementMode,
    mapping: MappingCfg,
    solver: SolverCfg,
    limits: JointLimits,
    bounds: WorkspaceBounds,
    motion: MotionCfg,
    frame_size: (u32, u32),
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<SequencerG<A>>
where
    A: armpick_traits::ServoArm + 'static,
{
    validate_and_build(
        arm, mode, mapping, solver, limits, bounds, motion, frame_size, clock,
    )
}
