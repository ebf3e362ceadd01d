//! Joint poses, mechanical limits, and the linear pose approximation.
//!
//! The solver reproduces the original firmware's deliberately crude mapping
//! from workspace coordinates to servo angles: a planar `atan2` for the
//! base and linear gains for shoulder and elbow. It is NOT inverse
//! kinematics and must not be "fixed" into one; observable placement
//! positions are the compatibility contract.

use crate::config::SolverCfg;
use crate::error::PickError;
use crate::workspace::WorkspacePoint;

/// Joint indices into a [`JointPose`]. Hardware ids are `index + 1`.
pub const BASE: usize = 0;
pub const SHOULDER: usize = 1;
pub const ELBOW: usize = 2;
pub const WRIST_TILT: usize = 3;
pub const WRIST_ROTATE: usize = 4;
pub const GRIPPER: usize = 5;

/// Whether the gripper is currently holding something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperState {
    Open,
    Closed,
}

impl GripperState {
    pub fn angle(self, cfg: &SolverCfg) -> f32 {
        match self {
            GripperState::Open => cfg.gripper_open_deg,
            GripperState::Closed => cfg.gripper_closed_deg,
        }
    }
}

/// A full set of commanded joint angles in degrees, gripper included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose(pub [f32; 6]);

impl JointPose {
    /// Largest per-joint angular distance to `other`. Drives the commanded
    /// move duration: the slowest joint sets the pace.
    pub fn max_delta_deg(&self, other: &JointPose) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f32, f32::max)
    }

    /// The same pose with a different gripper angle.
    pub fn with_gripper(mut self, angle_deg: f32) -> Self {
        self.0[GRIPPER] = angle_deg;
        self
    }
}

/// Per-joint mechanical limits in degrees.
#[derive(Debug, Clone, Copy)]
pub struct JointLimits {
    pub min_deg: [f32; 6],
    pub max_deg: [f32; 6],
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            min_deg: [0.0; 6],
            max_deg: [180.0, 180.0, 180.0, 180.0, 270.0, 180.0],
        }
    }
}

impl JointLimits {
    /// Clamp every joint into its `[min, max]`. Idempotent.
    pub fn clamp(&self, pose: JointPose) -> JointPose {
        let mut out = pose.0;
        for (j, a) in out.iter_mut().enumerate() {
            *a = a.clamp(self.min_deg[j], self.max_deg[j]);
        }
        JointPose(out)
    }

    /// True when every joint already lies within its limits.
    pub fn contains(&self, pose: &JointPose) -> bool {
        pose.0
            .iter()
            .enumerate()
            .all(|(j, a)| (self.min_deg[j]..=self.max_deg[j]).contains(a))
    }

    /// First joint whose raw angle exceeds its limit by more than
    /// `tolerance_deg`, if any.
    fn violation(&self, pose: &JointPose, tolerance_deg: f32) -> Option<(usize, f32)> {
        pose.0.iter().enumerate().find_map(|(j, &a)| {
            if a < self.min_deg[j] - tolerance_deg || a > self.max_deg[j] + tolerance_deg {
                Some((j, a))
            } else {
                None
            }
        })
    }
}

/// Map a workspace target to a joint pose.
///
/// - base: planar heading `atan2(x, y)` offset by the neutral heading,
/// - shoulder: linear in planar distance beyond the reach reference,
/// - elbow: linear in height above the height reference,
/// - wrists: held neutral,
/// - gripper: from `gripper` unless `gripper_override_deg` is given.
///
/// Every output angle is clamped to its joint's limits. If a raw angle
/// exceeds a limit by more than `cfg.clamp_tolerance_deg` the target is
/// reported unreachable instead; the original silently clamped, which made
/// out-of-reach targets fail invisibly.
pub fn solve(
    target: &WorkspacePoint,
    gripper: GripperState,
    gripper_override_deg: Option<f32>,
    cfg: &SolverCfg,
    limits: &JointLimits,
) -> Result<JointPose, PickError> {
    let base = cfg.neutral_deg + target.x.atan2(target.y).to_degrees();
    let shoulder =
        cfg.neutral_deg + (target.planar_distance() - cfg.reach_reference) * cfg.shoulder_gain;
    let elbow = cfg.neutral_deg - (target.z - cfg.height_reference) * cfg.elbow_gain;
    let gripper_deg = gripper_override_deg.unwrap_or_else(|| gripper.angle(cfg));

    let raw = JointPose([
        base,
        shoulder,
        elbow,
        cfg.wrist_neutral_deg,
        cfg.wrist_neutral_deg,
        gripper_deg,
    ]);

    if let Some((j, a)) = limits.violation(&raw, cfg.clamp_tolerance_deg) {
        return Err(PickError::Unreachable {
            joint: (j + 1) as u8,
            angle_deg: a,
        });
    }
    Ok(limits.clamp(raw))
}
