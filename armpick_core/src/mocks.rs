//! Test and helper mocks for armpick_core.

use std::sync::{Arc, Mutex};

use armpick_traits::{Detection, Detector, Frame, FrameSource, ServoArm};

/// One recorded arm command.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmCommand {
    Joint {
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    },
    Joints {
        angles_deg: [f32; 6],
        duration_ms: u32,
    },
}

/// Arm spy: records every command, shares the log via `Arc` so tests keep a
/// handle after the arm moves into the sequencer. Can be armed to fail on
/// the Nth `set_joints` call to exercise fault paths.
#[derive(Default)]
pub struct RecordingArm {
    log: Arc<Mutex<Vec<ArmCommand>>>,
    fail_on_joints_call: Option<usize>,
    joints_calls: usize,
}

impl RecordingArm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the Nth (1-based) `set_joints` call with an I/O error.
    pub fn fail_on_joints_call(mut self, n: usize) -> Self {
        self.fail_on_joints_call = Some(n);
        self
    }

    /// Shared handle to the command log.
    pub fn log(&self) -> Arc<Mutex<Vec<ArmCommand>>> {
        self.log.clone()
    }
}

impl ServoArm for RecordingArm {
    fn set_joint(
        &mut self,
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log.lock().map_err(|_| poisoned())?.push(ArmCommand::Joint {
            id,
            angle_deg,
            duration_ms,
        });
        Ok(())
    }

    fn set_joints(
        &mut self,
        angles_deg: &[f32; 6],
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.joints_calls += 1;
        if self.fail_on_joints_call == Some(self.joints_calls) {
            return Err(Box::new(std::io::Error::other("injected bus fault")));
        }
        self.log.lock().map_err(|_| poisoned())?.push(ArmCommand::Joints {
            angles_deg: *angles_deg,
            duration_ms,
        });
        Ok(())
    }

    fn read_joint(&mut self, id: u8) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        let log = self.log.lock().map_err(|_| poisoned())?;
        let angle = log.iter().rev().find_map(|c| match c {
            ArmCommand::Joint {
                id: cid, angle_deg, ..
            } if *cid == id => Some(*angle_deg),
            ArmCommand::Joints { angles_deg, .. } => {
                angles_deg.get(id as usize - 1).copied()
            }
            _ => None,
        });
        Ok(angle.unwrap_or(90.0))
    }
}

fn poisoned() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other("command log poisoned"))
}

/// Camera that returns the same blank frame forever.
pub struct StaticCamera {
    pub width: u32,
    pub height: u32,
}

impl Default for StaticCamera {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl FrameSource for StaticCamera {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Frame {
            width: self.width,
            height: self.height,
            data: Vec::new(),
        })
    }
}

/// Detector replaying a scripted sequence of per-frame detection sets,
/// holding the last entry once the script runs out.
pub struct ScriptedDetector {
    script: Vec<Vec<Detection>>,
    cursor: usize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl Detector for ScriptedDetector {
    fn detect(
        &mut self,
        _frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        let idx = self.cursor.min(self.script.len().saturating_sub(1));
        self.cursor += 1;
        Ok(self.script.get(idx).cloned().unwrap_or_default())
    }
}
