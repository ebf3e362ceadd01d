//! Runtime configuration types for the sequencer core.
//!
//! These are the structs `SequencerCore` runs on. They are separate from the
//! TOML-deserialized schema in `armpick_config`; converters at the bottom
//! bridge the two so the CLI can stay thin.

use crate::workspace::{WorkspaceBounds, WorkspacePoint};

/// Detection stability gate parameters.
#[derive(Debug, Clone)]
pub struct StabilizerCfg {
    /// Ring-buffer capacity in frames (oldest evicted first).
    pub history_size: usize,
    /// Minimum matching previous frames for a detection to be stable.
    pub stability_threshold: usize,
    /// Per-axis centre tolerance in pixels.
    pub pixel_tolerance: f32,
}

impl Default for StabilizerCfg {
    fn default() -> Self {
        Self {
            history_size: 10,
            stability_threshold: 3,
            pixel_tolerance: 20.0,
        }
    }
}

/// Depth heuristic for the mapper. The arm has no depth sensor; box area is
/// the only proxy available (larger box means nearer, hence a higher band).
#[derive(Debug, Clone)]
pub enum DepthModel {
    /// All objects rest on the table at this height.
    Surface(f32),
    /// Area bands ordered largest threshold first at build time; the first
    /// band whose `min_area` is at or below the observed area wins.
    AreaBands {
        bands: Vec<AreaBand>,
        fallback_z: f32,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct AreaBand {
    pub min_area: f32,
    pub z: f32,
}

/// Static per-axis affine mapping from normalized image space to the arm
/// frame. Supplied by an external calibration step; nothing here is learned.
#[derive(Debug, Clone)]
pub struct MappingCfg {
    pub x_scale: f32,
    pub x_offset: f32,
    pub y_scale: f32,
    pub y_offset: f32,
    pub depth: DepthModel,
}

impl Default for MappingCfg {
    fn default() -> Self {
        Self {
            x_scale: 150.0,
            x_offset: 0.0,
            y_scale: -75.0,
            y_offset: 275.0,
            depth: DepthModel::Surface(50.0),
        }
    }
}

/// Coefficients of the linear pose approximation (see `pose::solve`).
#[derive(Debug, Clone, Copy)]
pub struct SolverCfg {
    pub neutral_deg: f32,
    pub reach_reference: f32,
    pub shoulder_gain: f32,
    pub height_reference: f32,
    pub elbow_gain: f32,
    pub wrist_neutral_deg: f32,
    pub gripper_open_deg: f32,
    pub gripper_closed_deg: f32,
    /// Raw angles past a joint limit by more than this fail as unreachable
    /// instead of being silently clamped.
    pub clamp_tolerance_deg: f32,
}

impl Default for SolverCfg {
    fn default() -> Self {
        Self {
            neutral_deg: 90.0,
            reach_reference: 150.0,
            shoulder_gain: 0.05,
            height_reference: 50.0,
            elbow_gain: 0.1,
            wrist_neutral_deg: 90.0,
            gripper_open_deg: 180.0,
            gripper_closed_deg: 30.0,
            clamp_tolerance_deg: 30.0,
        }
    }
}

/// Dwell and speed discipline for the state machine. The hardware has no
/// motion-complete feedback: the dwell after each command IS the
/// synchronization mechanism, not an optimization.
#[derive(Debug, Clone, Copy)]
pub struct MotionCfg {
    /// Vertical clearance above grasp/place points (mm).
    pub approach_offset: f32,
    /// Commanded move duration per degree of the largest joint delta.
    pub ms_per_degree: f32,
    pub min_move_ms: u32,
    pub max_move_ms: u32,
    /// Lower bound on the post-command dwell.
    pub min_dwell_ms: u64,
    /// Extra settle time added on top of the commanded move duration.
    pub settle_pad_ms: u64,
    /// Commanded duration for gripper-only moves.
    pub gripper_move_ms: u32,
    /// Dwell after a gripper command before any arm motion. Moving the arm
    /// while the gripper is still closing is a real race on this hardware.
    pub gripper_settle_ms: u64,
    /// Arm joints (1..=5) of the home pose.
    pub home_deg: [f32; 5],
    /// Raised intermediate pose used by safety recovery.
    pub safe_deg: [f32; 5],
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            approach_offset: 10.0,
            ms_per_degree: 20.0,
            min_move_ms: 500,
            max_move_ms: 3000,
            min_dwell_ms: 500,
            settle_pad_ms: 500,
            gripper_move_ms: 1000,
            gripper_settle_ms: 1000,
            home_deg: [90.0; 5],
            safe_deg: [90.0, 40.0, 50.0, 90.0, 90.0],
        }
    }
}

// ── Converters from the TOML schema ──────────────────────────────────────────

impl From<&armpick_config::Stabilizer> for StabilizerCfg {
    fn from(s: &armpick_config::Stabilizer) -> Self {
        Self {
            history_size: s.history_size,
            stability_threshold: s.stability_threshold,
            pixel_tolerance: s.pixel_tolerance,
        }
    }
}

impl From<&armpick_config::Mapping> for MappingCfg {
    fn from(m: &armpick_config::Mapping) -> Self {
        let depth = match &m.depth {
            armpick_config::Depth::Surface { z } => DepthModel::Surface(*z),
            armpick_config::Depth::AreaBands { bands, fallback_z } => DepthModel::AreaBands {
                bands: bands
                    .iter()
                    .map(|(min_area, z)| AreaBand {
                        min_area: *min_area,
                        z: *z,
                    })
                    .collect(),
                fallback_z: *fallback_z,
            },
        };
        Self {
            x_scale: m.x_scale,
            x_offset: m.x_offset,
            y_scale: m.y_scale,
            y_offset: m.y_offset,
            depth,
        }
    }
}

impl From<&armpick_config::Workspace> for WorkspaceBounds {
    fn from(w: &armpick_config::Workspace) -> Self {
        Self {
            x_min: w.x_min,
            x_max: w.x_max,
            y_min: w.y_min,
            y_max: w.y_max,
            z_min: w.z_min,
            z_max: w.z_max,
        }
    }
}

impl From<&armpick_config::Solver> for SolverCfg {
    fn from(s: &armpick_config::Solver) -> Self {
        Self {
            neutral_deg: s.neutral_deg,
            reach_reference: s.reach_reference,
            shoulder_gain: s.shoulder_gain,
            height_reference: s.height_reference,
            elbow_gain: s.elbow_gain,
            wrist_neutral_deg: s.wrist_neutral_deg,
            gripper_open_deg: s.gripper_open_deg,
            gripper_closed_deg: s.gripper_closed_deg,
            clamp_tolerance_deg: s.clamp_tolerance_deg,
        }
    }
}

impl From<&armpick_config::Motion> for MotionCfg {
    fn from(m: &armpick_config::Motion) -> Self {
        Self {
            approach_offset: m.approach_offset,
            ms_per_degree: m.ms_per_degree,
            min_move_ms: m.min_move_ms,
            max_move_ms: m.max_move_ms,
            min_dwell_ms: m.min_dwell_ms,
            settle_pad_ms: m.settle_pad_ms,
            gripper_move_ms: m.gripper_move_ms,
            gripper_settle_ms: m.gripper_settle_ms,
            home_deg: m.home_deg,
            safe_deg: m.safe_deg,
        }
    }
}

impl From<&armpick_config::Limits> for crate::pose::JointLimits {
    fn from(l: &armpick_config::Limits) -> Self {
        Self {
            min_deg: l.min_deg,
            max_deg: l.max_deg,
        }
    }
}

/// Build a placement mode from the TOML schema. Slot CSV resolution happens
/// in `armpick_config`; this takes the already-resolved table.
pub fn placement_from_config(
    p: &armpick_config::Placement,
    resolved_slots: Option<Vec<[f32; 3]>>,
) -> crate::ledger::PlacementMode {
    use crate::ledger::{PlacementMode, ZoneCfg, ZonePolicy};
    match p {
        armpick_config::Placement::Tower { base, cup_height } => PlacementMode::Tower {
            base: WorkspacePoint::from(*base),
            cup_height: *cup_height,
        },
        armpick_config::Placement::Zones { zones, policy } => PlacementMode::Zone {
            zones: zones
                .iter()
                .map(|z| ZoneCfg {
                    id: z.id.clone(),
                    position: WorkspacePoint::from(z.position),
                    capacity: z.capacity,
                })
                .collect(),
            policy: match policy {
                armpick_config::ZonePolicy::RoundRobin => ZonePolicy::RoundRobin,
                armpick_config::ZonePolicy::LeastOccupied => ZonePolicy::LeastOccupied,
            },
        },
        armpick_config::Placement::Slots { slots, .. } => PlacementMode::Slot {
            slots: resolved_slots
                .unwrap_or_else(|| slots.clone())
                .into_iter()
                .map(WorkspacePoint::from)
                .collect(),
        },
    }
}
