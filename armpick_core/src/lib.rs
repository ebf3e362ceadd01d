#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core pick-and-place logic (hardware-agnostic).
//!
//! This crate provides the hardware-independent sequencing engine. All
//! hardware interactions go through the `armpick_traits::ServoArm`,
//! `FrameSource`, and `Detector` traits.
//!
//! ## Architecture
//!
//! - **Stabilizer**: detection stability gate over a frame ring buffer
//!   (`stabilizer` module)
//! - **Mapper**: pixel-space to arm-frame affine mapping with an area-based
//!   depth heuristic (`mapper` module)
//! - **Pose**: linear joint-angle approximation and limit clamping (`pose`
//!   module)
//! - **Workspace**: safe-cuboid bounds checking (`workspace` module)
//! - **Sequencer**: the phase state machine with dwell-based motion
//!   synchronization (`sequencer` module)
//! - **Ledger**: placement bookkeeping for tower, zone, and slot modes
//!   (`ledger` module)
//! - **Runner**: full-session orchestration over a background detection
//!   feed (`runner` module)
//!
//! ## Units
//!
//! Workspace coordinates are millimetres in the arm frame; joint angles are
//! degrees; detector coordinates are pixels.

pub mod builder;
pub mod config;
pub mod error;
pub mod feed;
pub mod hw_error;
pub mod ledger;
pub mod mapper;
pub mod mocks;
pub mod pose;
pub mod runner;
pub mod sequencer;
pub mod stabilizer;
pub mod status;
pub mod util;
pub mod workspace;

pub use builder::{Sequencer, SequencerBuilder, SequencerG, build_sequencer};
pub use config::{
    AreaBand, DepthModel, MappingCfg, MotionCfg, SolverCfg, StabilizerCfg, placement_from_config,
};
pub use error::{BuildError, PickError, Result};
pub use feed::{DetectionFeed, FrameReport};
pub use ledger::{PlacementLedger, PlacementMode, ZoneCfg, ZonePolicy};
pub use pose::{GripperState, JointLimits, JointPose};
pub use runner::{SessionCfg, SessionReport, run_session};
pub use sequencer::{Phase, SequencerCore};
pub use stabilizer::DetectionStabilizer;
pub use status::CycleOutcome;
pub use workspace::{WorkspaceBounds, WorkspacePoint};
