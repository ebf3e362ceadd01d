//! Workspace geometry: points in the arm frame and the safe-cuboid check.

use crate::error::PickError;

/// A point in the arm's workspace frame, millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorkspacePoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The same point raised by `dz` (approach/lift clearance).
    #[inline]
    pub fn raised(&self, dz: f32) -> Self {
        Self {
            x: self.x,
            y: self.y,
            z: self.z + dz,
        }
    }

    /// Planar distance from the arm base.
    #[inline]
    pub fn planar_distance(&self) -> f32 {
        self.x.hypot(self.y)
    }
}

impl From<[f32; 3]> for WorkspacePoint {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Safe cuboid the arm may move into. Every target point must pass this
/// check before pose solving, and again for the computed placement point.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl WorkspaceBounds {
    /// Pure inequality check against the six bound fields.
    pub fn validate(&self, p: &WorkspacePoint) -> Result<(), PickError> {
        let inside = (self.x_min..=self.x_max).contains(&p.x)
            && (self.y_min..=self.y_max).contains(&p.y)
            && (self.z_min..=self.z_max).contains(&p.z);
        if inside {
            Ok(())
        } else {
            Err(PickError::OutOfBounds {
                x: p.x,
                y: p.y,
                z: p.z,
            })
        }
    }
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        Self {
            x_min: -150.0,
            x_max: 150.0,
            y_min: 200.0,
            y_max: 350.0,
            z_min: 50.0,
            z_max: 250.0,
        }
    }
}
