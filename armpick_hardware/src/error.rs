use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("servo bus timeout")]
    Timeout,
    #[error("invalid joint id {0}, expected 1..=6")]
    InvalidJoint(u8),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
