//! Hardware implementations of the `armpick_traits` collaborators.
//!
//! The simulated variants run anywhere and back the CLI's default mode;
//! the real DOFBOT I2C driver is behind the `hardware` feature.

pub mod error;

#[cfg(feature = "hardware")]
pub mod dofbot;
#[cfg(feature = "hardware")]
pub use dofbot::DofbotArm;

use armpick_traits::{Detection, Detector, Frame, FrameSource, ServoArm};

use crate::error::HwError;

/// Simulated six-servo arm: tracks commanded angles, validates joint ids,
/// and logs every command the way the real bus driver does.
pub struct SimulatedArm {
    angles_deg: [f32; 6],
}

impl SimulatedArm {
    pub fn new() -> Self {
        // Matches the physical arm's parked pose.
        Self {
            angles_deg: [90.0, 90.0, 90.0, 90.0, 90.0, 30.0],
        }
    }

    pub fn angles(&self) -> [f32; 6] {
        self.angles_deg
    }
}

impl Default for SimulatedArm {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoArm for SimulatedArm {
    fn set_joint(
        &mut self,
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !(1..=6).contains(&id) {
            return Err(Box::new(HwError::InvalidJoint(id)));
        }
        tracing::info!(id, angle_deg, duration_ms, "servo move (simulated)");
        self.angles_deg[id as usize - 1] = angle_deg;
        Ok(())
    }

    fn set_joints(
        &mut self,
        angles_deg: &[f32; 6],
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(?angles_deg, duration_ms, "pose move (simulated)");
        self.angles_deg = *angles_deg;
        Ok(())
    }

    fn read_joint(&mut self, id: u8) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        if !(1..=6).contains(&id) {
            return Err(Box::new(HwError::InvalidJoint(id)));
        }
        Ok(self.angles_deg[id as usize - 1])
    }
}

/// Simulated camera producing blank 640x480 frames.
pub struct SimulatedCamera {
    frames: u64,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self { frames: 0 }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SimulatedCamera {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>> {
        self.frames += 1;
        Ok(Frame {
            width: 640,
            height: 480,
            data: Vec::new(),
        })
    }
}

/// Simulated detector: one cup near the centre of the frame with a little
/// deterministic jitter, so a full sim session exercises the stability gate
/// the way a real camera would.
pub struct SimulatedDetector {
    tick: u32,
}

impl SimulatedDetector {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    fn jitter(&mut self) -> f32 {
        // Small xorshift-derived offset in [-4, 4] pixels.
        let mut x = self.tick.wrapping_mul(2_654_435_761).max(1);
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        (x % 9) as f32 - 4.0
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SimulatedDetector {
    fn detect(
        &mut self,
        _frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        self.tick = self.tick.wrapping_add(1);
        let dx = self.jitter();
        let dy = self.jitter();
        Ok(vec![Detection {
            x: 290.0 + dx,
            y: 210.0 + dy,
            w: 60.0,
            h: 60.0,
            confidence: 0.92,
        }])
    }
}
