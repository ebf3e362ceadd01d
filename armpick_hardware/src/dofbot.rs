//! I2C servo driver for the DOFBOT arm controller board.
//!
//! The controller sits on the I2C bus at address 0x15. Single-joint moves
//! write a pulse/duration record at `0x10 + id`; full-pose moves write a
//! 13-byte block at 0x1D. The board acks the write immediately and offers
//! no motion-complete signal, which is why the sequencer dwells.

use rppal::i2c::I2c;

use crate::error::HwError;

const ARM_ADDR: u16 = 0x15;
const REG_SERVO_BASE: u8 = 0x10;
const REG_ALL_SERVOS: u8 = 0x1d;

/// Standard servos run 900..=3100 counts over 0..=180 degrees; joint 5 is a
/// 270 degree servo with its own pulse range.
fn pulse_for(id: u8, angle_deg: f32) -> u16 {
    // Joints 2..=4 are mounted mirrored on this arm.
    let angle = if (2..=4).contains(&id) {
        180.0 - angle_deg
    } else {
        angle_deg
    };
    if id == 5 {
        ((angle / 270.0) * (3700.0 - 380.0) + 380.0).round() as u16
    } else {
        ((angle / 180.0) * (3100.0 - 900.0) + 900.0).round() as u16
    }
}

pub struct DofbotArm {
    bus: I2c,
}

impl DofbotArm {
    pub fn new() -> Result<Self, HwError> {
        let mut bus = I2c::new().map_err(|e| HwError::I2c(e.to_string()))?;
        bus.set_slave_address(ARM_ADDR)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(Self { bus })
    }

    fn write_joint(&mut self, id: u8, angle_deg: f32, duration_ms: u32) -> Result<(), HwError> {
        if !(1..=6).contains(&id) {
            return Err(HwError::InvalidJoint(id));
        }
        let pulse = pulse_for(id, angle_deg);
        let time = duration_ms.min(u32::from(u16::MAX)) as u16;
        let buf = [
            (pulse >> 8) as u8,
            (pulse & 0xff) as u8,
            (time >> 8) as u8,
            (time & 0xff) as u8,
        ];
        self.bus
            .block_write(REG_SERVO_BASE + id, &buf)
            .map_err(|e| HwError::I2c(e.to_string()))
    }

    fn write_all(&mut self, angles_deg: &[f32; 6], duration_ms: u32) -> Result<(), HwError> {
        let time = duration_ms.min(u32::from(u16::MAX)) as u16;
        let mut buf = [0u8; 13];
        for (i, &angle) in angles_deg.iter().enumerate() {
            let pulse = pulse_for(i as u8 + 1, angle);
            buf[i * 2] = (pulse >> 8) as u8;
            buf[i * 2 + 1] = (pulse & 0xff) as u8;
        }
        buf[12] = (time / 100).min(255) as u8;
        self.bus
            .block_write(REG_ALL_SERVOS, &buf)
            .map_err(|e| HwError::I2c(e.to_string()))
    }

    fn read_position(&mut self, id: u8) -> Result<f32, HwError> {
        if !(1..=6).contains(&id) {
            return Err(HwError::InvalidJoint(id));
        }
        // Position readback: write the query register, then read two bytes.
        self.bus
            .block_write(REG_SERVO_BASE + id + 0x20, &[0])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mut out = [0u8; 2];
        self.bus
            .block_read(REG_SERVO_BASE + id + 0x20, &mut out)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let pulse = u16::from_be_bytes(out) as f32;
        let angle = if id == 5 {
            (pulse - 380.0) / (3700.0 - 380.0) * 270.0
        } else {
            (pulse - 900.0) / (3100.0 - 900.0) * 180.0
        };
        let angle = if (2..=4).contains(&id) {
            180.0 - angle
        } else {
            angle
        };
        Ok(angle)
    }
}

impl armpick_traits::ServoArm for DofbotArm {
    fn set_joint(
        &mut self,
        id: u8,
        angle_deg: f32,
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(id, angle_deg, duration_ms, "i2c joint write");
        self.write_joint(id, angle_deg, duration_ms)?;
        Ok(())
    }

    fn set_joints(
        &mut self,
        angles_deg: &[f32; 6],
        duration_ms: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(?angles_deg, duration_ms, "i2c pose write");
        self.write_all(angles_deg, duration_ms)?;
        Ok(())
    }

    fn read_joint(&mut self, id: u8) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_position(id)?)
    }
}
