//! Runtime configuration for the move engine.
//!
//! These are separate from the TOML-deserialized config in `scanner_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

use scanner_traits::{MoveEstimate, Position};

/// Closed-interval workspace limits per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub pol_min: f64,
    pub pol_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 400.0,
            y_min: 0.0,
            y_max: 300.0,
            pol_min: -200.0,
            pol_max: 180.0,
        }
    }
}

impl Bounds {
    pub fn contains(&self, p: &Position) -> bool {
        (self.x_min..=self.x_max).contains(&p.x)
            && (self.y_min..=self.y_max).contains(&p.y)
            && (self.pol_min..=self.pol_max).contains(&p.pol)
    }

    /// Every limit finite and each `min <= max`.
    pub fn is_valid(&self) -> bool {
        let ok = |lo: f64, hi: f64| lo.is_finite() && hi.is_finite() && lo <= hi;
        ok(self.x_min, self.x_max) && ok(self.y_min, self.y_max) && ok(self.pol_min, self.pol_max)
    }
}

/// Speeds, ramps and trigger spacing sent to the backend, plus the estimate
/// used to seed move timeouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCfg {
    /// mm/s
    pub xy_speed: f64,
    /// deg/s
    pub pol_speed: f64,
    pub xy_accel: f64,
    pub xy_decel: f64,
    pub pol_accel: f64,
    pub pol_decel: f64,
    pub trigger_interval_mm: f64,
    pub estimate: MoveEstimate,
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
            estimate: MoveEstimate::default(),
        }
    }
}

/// Behaviour of `wait_for_move` and position reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitCfg {
    pub poll_interval: Duration,
    /// Absolute polarization torque above which a warning is counted.
    pub torque_limit: f64,
    /// Extra attempts after a failed position read.
    pub read_retries: u32,
}

impl Default for WaitCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            torque_limit: 10.0,
            read_retries: 2,
        }
    }
}
