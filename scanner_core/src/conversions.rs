//! `From` implementations bridging `scanner_config` types to runtime types.

use std::time::Duration;

use scanner_traits::MoveEstimate;

use crate::config::{Bounds, MotionCfg, WaitCfg};
use crate::util::duration_from_secs;

impl From<&scanner_config::BoundsCfg> for Bounds {
    fn from(c: &scanner_config::BoundsCfg) -> Self {
        Self {
            x_min: c.x_min,
            x_max: c.x_max,
            y_min: c.y_min,
            y_max: c.y_max,
            pol_min: c.pol_min,
            pol_max: c.pol_max,
        }
    }
}

impl From<&scanner_config::MotionCfg> for MotionCfg {
    fn from(c: &scanner_config::MotionCfg) -> Self {
        Self {
            xy_speed: c.xy_speed,
            pol_speed: c.pol_speed,
            xy_accel: c.xy_accel,
            xy_decel: c.xy_decel,
            pol_accel: c.pol_accel,
            pol_decel: c.pol_decel,
            trigger_interval_mm: c.trigger_interval_mm,
            estimate: MoveEstimate {
                safety_factor: c.safety_factor,
                fixed_margin: duration_from_secs(c.fixed_margin_s).unwrap_or(Duration::ZERO),
            },
        }
    }
}

impl From<&scanner_config::WaitCfg> for WaitCfg {
    fn from(c: &scanner_config::WaitCfg) -> Self {
        Self {
            poll_interval: Duration::from_millis(c.poll_ms),
            torque_limit: c.torque_limit,
            read_retries: c.read_retries,
        }
    }
}
