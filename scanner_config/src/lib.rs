#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and waypoint parsing for the beam scanner.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The waypoint CSV loader enforces headers and rejects non-finite poses.
use serde::Deserialize;

/// Waypoint CSV schema.
///
/// Expected headers:
/// x,y,pol
///
/// Example:
/// x,y,pol
/// 10.0,20.0,0.0
/// 10.0,25.0,45.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct WaypointRow {
    pub x: f64,
    pub y: f64,
    pub pol: f64,
}

/// Workspace travel limits. Closed intervals, millimetres and degrees.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BoundsCfg {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub pol_min: f64,
    pub pol_max: f64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MotionCfg {
    pub xy_speed: f64,
    pub pol_speed: f64,
    pub xy_accel: f64,
    pub xy_decel: f64,
    pub pol_accel: f64,
    pub pol_decel: f64,
    pub trigger_interval_mm: f64,
    /// Multiplier applied to the raw travel time when seeding timeouts.
    pub safety_factor: f64,
    /// Fixed seconds added on top of the scaled travel time.
    pub fixed_margin_s: f64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            xy_speed: 40.0,
            pol_speed: 10.0,
            xy_accel: 100.0,
            xy_decel: 100.0,
            pol_accel: 50.0,
            pol_decel: 50.0,
            trigger_interval_mm: 1.0,
            safety_factor: 3.0,
            fixed_margin_s: 3.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct WaitCfg {
    /// Status polling period while waiting for a move.
    pub poll_ms: u64,
    /// Absolute torque above which a warning is logged.
    pub torque_limit: f64,
    /// Extra attempts for a failed position read.
    pub read_retries: u32,
}

impl Default for WaitCfg {
    fn default() -> Self {
        Self {
            poll_ms: 250,
            torque_limit: 10.0,
            read_retries: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sim,
    Dmc,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControllerCfg {
    pub backend: Backend,
    /// `host:port` of the controller; required for the dmc backend.
    pub address: Option<String>,
    pub io_timeout_ms: u64,
    pub counts_per_mm: f64,
    pub counts_per_deg: f64,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            backend: Backend::Sim,
            address: None,
            io_timeout_ms: 1000,
            counts_per_mm: 1000.0,
            counts_per_deg: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimulatorCfg {
    pub x_init: f64,
    pub y_init: f64,
    pub pol_init: f64,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            x_init: 145.0,
            y_init: 145.0,
            pol_init: -100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct StopCfg {
    /// Consecutive positive polls of the stop hook before a move is stopped.
    pub debounce_n: u8,
}

impl Default for StopCfg {
    fn default() -> Self {
        Self { debounce_n: 1 }
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

#[derive(Debug, Deserialize)]
pub struct Config {
    pub bounds: BoundsCfg,
    #[serde(default)]
    pub motion: MotionCfg,
    #[serde(default)]
    pub wait: WaitCfg,
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub simulator: SimulatorCfg,
    #[serde(default)]
    pub stop: StopCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_waypoints_csv(path: &std::path::Path) -> eyre::Result<Vec<WaypointRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open waypoint CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["x", "y", "pol"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "waypoint CSV must have headers 'x,y,pol', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<WaypointRow>().enumerate() {
        let line = idx + 2;
        match rec {
            Ok(row) if row.x.is_finite() && row.y.is_finite() && row.pol.is_finite() => {
                rows.push(row)
            }
            Ok(_) => eyre::bail!("invalid CSV row {}: values must be finite", line),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", line, e),
        }
    }
    if rows.is_empty() {
        eyre::bail!("waypoint CSV {:?} has no rows", path);
    }
    Ok(rows)
}

fn check_range(name: &str, min: f64, max: f64) -> eyre::Result<()> {
    if !(min.is_finite() && max.is_finite()) {
        eyre::bail!("bounds.{name}_min/{name}_max must be finite");
    }
    if min > max {
        eyre::bail!("bounds.{name}_min must be <= bounds.{name}_max");
    }
    Ok(())
}

fn check_rate(name: &str, v: f64) -> eyre::Result<()> {
    if !(v.is_finite() && v > 0.0) {
        eyre::bail!("{name} must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Bounds
        let b = &self.bounds;
        check_range("x", b.x_min, b.x_max)?;
        check_range("y", b.y_min, b.y_max)?;
        check_range("pol", b.pol_min, b.pol_max)?;

        // Motion
        let m = &self.motion;
        check_rate("motion.xy_speed", m.xy_speed)?;
        check_rate("motion.pol_speed", m.pol_speed)?;
        check_rate("motion.xy_accel", m.xy_accel)?;
        check_rate("motion.xy_decel", m.xy_decel)?;
        check_rate("motion.pol_accel", m.pol_accel)?;
        check_rate("motion.pol_decel", m.pol_decel)?;
        check_rate("motion.trigger_interval_mm", m.trigger_interval_mm)?;
        if !(m.safety_factor.is_finite() && m.safety_factor >= 1.0) {
            eyre::bail!("motion.safety_factor must be >= 1.0");
        }
        if !(m.fixed_margin_s.is_finite() && m.fixed_margin_s >= 0.0) {
            eyre::bail!("motion.fixed_margin_s must be >= 0");
        }
        if m.fixed_margin_s > 3600.0 {
            eyre::bail!("motion.fixed_margin_s is unreasonably large (>1h)");
        }

        // Wait
        if !(1..=60_000).contains(&self.wait.poll_ms) {
            eyre::bail!("wait.poll_ms must be in 1..=60000");
        }
        check_rate("wait.torque_limit", self.wait.torque_limit)?;
        if self.wait.read_retries > 100 {
            eyre::bail!("wait.read_retries is unreasonably large (>100)");
        }

        // Controller
        let c = &self.controller;
        if c.io_timeout_ms == 0 {
            eyre::bail!("controller.io_timeout_ms must be >= 1");
        }
        check_rate("controller.counts_per_mm", c.counts_per_mm)?;
        check_rate("controller.counts_per_deg", c.counts_per_deg)?;
        if c.backend == Backend::Dmc
            && c.address.as_deref().is_none_or(|a| a.trim().is_empty())
        {
            eyre::bail!("controller.address is required for the dmc backend");
        }

        // Simulator start pose must be reachable
        let s = &self.simulator;
        let inside = |v: f64, lo: f64, hi: f64| v.is_finite() && (lo..=hi).contains(&v);
        if !(inside(s.x_init, b.x_min, b.x_max)
            && inside(s.y_init, b.y_min, b.y_max)
            && inside(s.pol_init, b.pol_min, b.pol_max))
        {
            eyre::bail!("simulator start pose must lie within bounds");
        }

        // Stop hook
        if self.stop.debounce_n == 0 {
            eyre::bail!("stop.debounce_n must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
