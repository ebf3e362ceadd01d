#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and slot-table parsing for the pick-and-place system.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The slot CSV loader enforces strict `x,y,z` headers so a calibrated
//!   pyramid/slot table can be swapped in without touching the TOML.
//!
//! All lengths are millimetres, all angles degrees. Joint order is the
//! DOFBOT convention: base, shoulder, elbow, wrist tilt, wrist rotate,
//! gripper (ids 1..=6).

use serde::Deserialize;

/// Detection stability gate over recent frames.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Stabilizer {
    /// Ring-buffer capacity in frames.
    pub history_size: usize,
    /// Minimum matching previous frames for a detection to count as stable.
    pub stability_threshold: usize,
    /// Per-axis centre tolerance in pixels.
    pub pixel_tolerance: f32,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self {
            history_size: 10,
            stability_threshold: 3,
            pixel_tolerance: 20.0,
        }
    }
}

/// Depth heuristic used by the coordinate mapper.
///
/// TOML:
/// ```toml
/// [mapping.depth]
/// mode = "surface"
/// z = 50.0
/// ```
/// or
/// ```toml
/// [mapping.depth]
/// mode = "area_bands"
/// bands = [[15000.0, 60.0], [5000.0, 80.0]]
/// fallback_z = 100.0
/// ```
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Depth {
    /// Objects sit on the table at a fixed height.
    Surface { z: f32 },
    /// Bounding-box area as an inverse-size depth proxy. Each band is
    /// `[min_area_px2, z_mm]`; the largest threshold at or below the
    /// observed area wins.
    AreaBands { bands: Vec<(f32, f32)>, fallback_z: f32 },
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Surface { z: 50.0 }
    }
}

/// Static image-to-workspace affine mapping (externally calibrated).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Mapping {
    /// Workspace x per unit of normalized image x (image centre = 0).
    pub x_scale: f32,
    pub x_offset: f32,
    /// Workspace y per unit of normalized image y.
    pub y_scale: f32,
    pub y_offset: f32,
    pub depth: Depth,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            x_scale: 150.0,
            x_offset: 0.0,
            // Image y grows downward; nearer rows of the table map to
            // smaller workspace y, hence the negative scale.
            y_scale: -75.0,
            y_offset: 275.0,
            depth: Depth::default(),
        }
    }
}

/// Safe cuboid the arm is allowed to reach into.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Workspace {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl Default for Workspace {
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

/// Mechanical servo limits, indexed base..gripper.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Limits {
    pub min_deg: [f32; 6],
    pub max_deg: [f32; 6],
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_deg: [0.0; 6],
            // Servo 5 on the DOFBOT is a 270-degree unit.
            max_deg: [180.0, 180.0, 180.0, 180.0, 270.0, 180.0],
        }
    }
}

/// Coefficients of the linear pose approximation.
///
/// This is deliberately not an inverse-kinematics model; the gains were
/// hand-tuned against the physical arm and behavioral parity matters more
/// than geometric accuracy.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Solver {
    pub neutral_deg: f32,
    /// Planar distance (mm) at which the shoulder sits at neutral.
    pub reach_reference: f32,
    /// Degrees of shoulder per mm of planar distance beyond the reference.
    pub shoulder_gain: f32,
    /// Height (mm) at which the elbow sits at neutral.
    pub height_reference: f32,
    /// Degrees of elbow per mm of height above the reference.
    pub elbow_gain: f32,
    pub wrist_neutral_deg: f32,
    pub gripper_open_deg: f32,
    pub gripper_closed_deg: f32,
    /// Raw angles past a limit by more than this are unreachable rather
    /// than silently clamped.
    pub clamp_tolerance_deg: f32,
}

impl Default for Solver {
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

/// Dwell and speed discipline for the motion state machine.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Motion {
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
    /// Dwell after a gripper command before any arm motion.
    pub gripper_settle_ms: u64,
    /// Arm joints (1..=5) of the home pose.
    pub home_deg: [f32; 5],
    /// Raised intermediate pose used by safety recovery.
    pub safe_deg: [f32; 5],
}

impl Default for Motion {
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

/// One named drop zone.
#[derive(Debug, Deserialize, Clone)]
pub struct Zone {
    pub id: String,
    pub position: [f32; 3],
    pub capacity: u32,
}

/// Built-in zone selection policies. The core additionally accepts a custom
/// classifier callback, which has no TOML spelling.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZonePolicy {
    #[default]
    RoundRobin,
    LeastOccupied,
}

/// Placement mode: exactly one of the three stacking variants.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Stack straight up at a fixed (x, y).
    Tower { base: [f32; 3], cup_height: f32 },
    /// Sort into named zones with per-zone capacities.
    Zones {
        zones: Vec<Zone>,
        #[serde(default)]
        policy: ZonePolicy,
    },
    /// Place into an ordered slot table (e.g. pyramid positions), either
    /// inline or loaded from a calibrated CSV.
    Slots {
        #[serde(default)]
        slots: Vec<[f32; 3]>,
        #[serde(default)]
        csv: Option<std::path::PathBuf>,
    },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Tower {
            base: [0.0, 250.0, 50.0],
            cup_height: 120.0,
        }
    }
}

/// Session-level caps and pacing.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Session {
    /// Stop after this many successful placements.
    pub max_placements: u32,
    /// Hard wall-clock cap for one session (ms).
    pub max_run_ms: u64,
    /// Frame acquisition + detection rate.
    pub detect_hz: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            max_placements: 5,
            max_run_ms: 600_000,
            detect_hz: 5,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub stabilizer: Stabilizer,
    pub mapping: Mapping,
    pub workspace: Workspace,
    pub limits: Limits,
    pub solver: Solver,
    pub motion: Motion,
    pub placement: Placement,
    pub session: Session,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// One calibrated slot row. Strict CSV headers: `x,y,z`.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SlotRow {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub fn load_slots_csv(path: &std::path::Path) -> eyre::Result<Vec<[f32; 3]>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open slot CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["x", "y", "z"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "slot CSV must have headers 'x,y,z', got: {}",
            actual.join(",")
        );
    }

    let mut slots = Vec::new();
    for (idx, rec) in rdr.deserialize::<SlotRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !(row.x.is_finite() && row.y.is_finite() && row.z.is_finite()) {
                    eyre::bail!("slot CSV row {} has a non-finite coordinate", idx + 2);
                }
                slots.push([row.x, row.y, row.z]);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if slots.is_empty() {
        eyre::bail!("slot CSV {:?} contains no rows", path);
    }
    Ok(slots)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stabilizer
        if self.stabilizer.history_size == 0 {
            eyre::bail!("stabilizer.history_size must be >= 1");
        }
        if self.stabilizer.stability_threshold == 0 {
            eyre::bail!("stabilizer.stability_threshold must be >= 1");
        }
        if self.stabilizer.stability_threshold >= self.stabilizer.history_size {
            // Support is counted over the previous frames only, so at most
            // history_size - 1 frames can ever agree with the current one.
            eyre::bail!("stabilizer.stability_threshold must be less than history_size");
        }
        if !(self.stabilizer.pixel_tolerance.is_finite() && self.stabilizer.pixel_tolerance > 0.0) {
            eyre::bail!("stabilizer.pixel_tolerance must be > 0");
        }

        // Mapping
        for v in [
            self.mapping.x_scale,
            self.mapping.x_offset,
            self.mapping.y_scale,
            self.mapping.y_offset,
        ] {
            if !v.is_finite() {
                eyre::bail!("mapping coefficients must be finite");
            }
        }
        if let Depth::AreaBands { bands, fallback_z } = &self.mapping.depth {
            if bands.is_empty() {
                eyre::bail!("mapping.depth.bands must not be empty");
            }
            if !fallback_z.is_finite() {
                eyre::bail!("mapping.depth.fallback_z must be finite");
            }
            for (min_area, z) in bands {
                if !(min_area.is_finite() && *min_area >= 0.0) {
                    eyre::bail!("mapping.depth band area thresholds must be >= 0");
                }
                if !z.is_finite() {
                    eyre::bail!("mapping.depth band heights must be finite");
                }
            }
        }

        // Workspace cuboid
        if self.workspace.x_min >= self.workspace.x_max {
            eyre::bail!("workspace.x_min must be < workspace.x_max");
        }
        if self.workspace.y_min >= self.workspace.y_max {
            eyre::bail!("workspace.y_min must be < workspace.y_max");
        }
        if self.workspace.z_min >= self.workspace.z_max {
            eyre::bail!("workspace.z_min must be < workspace.z_max");
        }

        // Joint limits
        for j in 0..6 {
            if self.limits.min_deg[j] > self.limits.max_deg[j] {
                eyre::bail!("limits.min_deg[{}] exceeds limits.max_deg[{}]", j, j);
            }
        }

        // Solver
        if !(self.solver.clamp_tolerance_deg.is_finite() && self.solver.clamp_tolerance_deg >= 0.0)
        {
            eyre::bail!("solver.clamp_tolerance_deg must be >= 0");
        }
        if self.solver.gripper_open_deg == self.solver.gripper_closed_deg {
            eyre::bail!("solver gripper open and closed angles must differ");
        }

        // Motion
        if self.motion.approach_offset <= 0.0 {
            eyre::bail!("motion.approach_offset must be > 0");
        }
        if self.motion.min_move_ms == 0 || self.motion.max_move_ms < self.motion.min_move_ms {
            eyre::bail!("motion move duration bounds must satisfy 0 < min <= max");
        }
        if !(self.motion.ms_per_degree.is_finite() && self.motion.ms_per_degree > 0.0) {
            eyre::bail!("motion.ms_per_degree must be > 0");
        }

        // Placement
        match &self.placement {
            Placement::Tower { cup_height, .. } => {
                if !(cup_height.is_finite() && *cup_height > 0.0) {
                    eyre::bail!("placement.cup_height must be > 0");
                }
            }
            Placement::Zones { zones, .. } => {
                if zones.is_empty() {
                    eyre::bail!("placement.zones must not be empty");
                }
                let mut seen = std::collections::BTreeSet::new();
                for z in zones {
                    if z.id.is_empty() {
                        eyre::bail!("zone ids must not be empty");
                    }
                    if !seen.insert(z.id.as_str()) {
                        eyre::bail!("duplicate zone id '{}'", z.id);
                    }
                    if z.capacity == 0 {
                        eyre::bail!("zone '{}' capacity must be >= 1", z.id);
                    }
                }
            }
            Placement::Slots { slots, csv } => {
                if slots.is_empty() && csv.is_none() {
                    eyre::bail!("placement.slots requires inline slots or a csv path");
                }
                if !slots.is_empty() && csv.is_some() {
                    eyre::bail!("placement.slots: choose inline slots or csv, not both");
                }
            }
        }

        // Session
        if self.session.max_run_ms == 0 {
            eyre::bail!("session.max_run_ms must be >= 1");
        }
        if self.session.detect_hz == 0 {
            eyre::bail!("session.detect_hz must be >= 1");
        }

        Ok(())
    }

    /// Resolve the slot table, reading the CSV when one is configured.
    pub fn resolved_slots(&self) -> eyre::Result<Option<Vec<[f32; 3]>>> {
        match &self.placement {
            Placement::Slots { slots, csv: None } => Ok(Some(slots.clone())),
            Placement::Slots { csv: Some(path), .. } => Ok(Some(load_slots_csv(path)?)),
            _ => Ok(None),
        }
    }
}
