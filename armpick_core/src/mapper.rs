//! Image-space to workspace-frame mapping.
//!
//! A fixed per-axis affine transform over centre-normalized pixel
//! coordinates. No camera model and no learned parameters; the coefficients
//! come from an external calibration step and are plain configuration.

use armpick_traits::Detection;

use crate::config::{DepthModel, MappingCfg};
use crate::workspace::WorkspacePoint;

/// Map a detection's bbox centre into the arm frame.
///
/// Pure function: same inputs, same output, no global state. The centre is
/// normalized to `[-1, 1]` against the frame size, then scaled and offset
/// per axis; `z` comes from the configured depth model.
pub fn to_workspace(
    detection: &Detection,
    frame_size: (u32, u32),
    mapping: &MappingCfg,
) -> WorkspacePoint {
    let (cx, cy) = detection.center();
    let half_w = (frame_size.0.max(1) as f32) / 2.0;
    let half_h = (frame_size.1.max(1) as f32) / 2.0;
    let x_norm = (cx - half_w) / half_w;
    let y_norm = (cy - half_h) / half_h;

    WorkspacePoint {
        x: mapping.x_scale * x_norm + mapping.x_offset,
        y: mapping.y_scale * y_norm + mapping.y_offset,
        z: depth_for(detection.area(), &mapping.depth),
    }
}

/// Resolve `z` from the depth model. For area bands, a larger box means a
/// nearer object; bands are ordered largest threshold first and the first
/// one at or below the observed area wins.
fn depth_for(area: f32, model: &DepthModel) -> f32 {
    match model {
        DepthModel::Surface(z) => *z,
        DepthModel::AreaBands { bands, fallback_z } => bands
            .iter()
            .find(|b| area >= b.min_area)
            .map(|b| b.z)
            .unwrap_or(*fallback_z),
    }
}
