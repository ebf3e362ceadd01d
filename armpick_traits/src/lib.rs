pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// A single candidate object reported by the detector for one frame.
///
/// `x`/`y` are the top-left corner of the bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    /// Bounding-box centre in pixels.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Bounding-box area in square pixels (depth proxy: larger means nearer).
    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }
}

/// One camera frame. The sequencer core never inspects pixels; only the
/// detector does, so the payload stays opaque here.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Six-servo arm transport. Joints are 1..=6; joint 6 is the gripper.
///
/// The hardware gives no motion-complete feedback: `set_joint*` returns as
/// soon as the command is on the wire, and the caller owns the dwell.
pub trait ServoArm {
    fn set_joint(
        &mut self,
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn set_joints(
        &mut self,
        angles_deg: &[f32; 6],
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn read_joint(&mut self, id: u8) -> Result<f32, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: ServoArm + ?Sized> ServoArm for Box<T> {
    fn set_joint(
        &mut self,
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_joint(id, angle_deg, duration_ms)
    }

    fn set_joints(
        &mut self,
        angles_deg: &[f32; 6],
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_joints(angles_deg, duration_ms)
    }

    fn read_joint(&mut self, id: u8) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_joint(id)
    }
}

/// Camera collaborator producing frames on demand.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>> {
        (**self).grab()
    }
}

/// Opaque trained-model detector; may be slow, callers throttle.
pub trait Detector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).detect(frame)
    }
}
