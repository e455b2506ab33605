//! Simulated scanner: straight-line motion computed lazily from the clock.
//!
//! Nothing runs in the background. Each query interpolates between the pose
//! at `begin_move` and the target using the elapsed time on the shared clock.
//! There is no acceleration model, so ramp settings are accepted and ignored.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scanner_traits::{
    Axis, BoxError, Clock, MonotonicClock, MotionController, MotorStatus, MoveEstimate, Position,
};

/// Simulated travel takes this fraction of the engine's estimate.
pub const MOVE_TIME_FACTOR: f64 = 0.9;
/// Torque reading reported on every query.
pub const SIM_TORQUE: f64 = 0.99;
/// Pose of a freshly constructed simulator.
pub const SIM_START: Position = Position::new(145.0, 145.0, -100.0);

#[derive(Debug, Clone, Copy)]
struct SimMove {
    origin: Position,
    target: Position,
    started: Instant,
    move_time: Duration,
}

impl SimMove {
    fn portion(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.move_time {
            1.0
        } else {
            elapsed.as_secs_f64() / self.move_time.as_secs_f64()
        }
    }
}

pub struct SimulatedController {
    clock: Arc<dyn Clock + Send + Sync>,
    estimate: MoveEstimate,
    xy_speed: f64,
    pol_speed: f64,
    position: Position,
    active: Option<SimMove>,
    motor_enabled: bool,
    trigger_interval_mm: f64,
    trigger_armed: bool,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new(Arc::new(MonotonicClock::new()))
    }
}

impl SimulatedController {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            clock,
            estimate: MoveEstimate::default(),
            xy_speed: 40.0,
            pol_speed: 10.0,
            position: SIM_START,
            active: None,
            motor_enabled: true,
            trigger_interval_mm: 1.0,
            trigger_armed: false,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Estimate parameters used to derive the simulated travel time.
    /// Keep these equal to the engine's so `move_time` stays `0.9 × estimate`.
    pub fn with_estimate(mut self, estimate: MoveEstimate) -> Self {
        self.estimate = estimate;
        self
    }

    /// Cutting motor power freezes the pose where it is.
    pub fn set_motor_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.freeze();
        }
        self.motor_enabled = enabled;
        tracing::debug!(enabled, "sim motor power");
    }

    pub fn motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    pub fn trigger_interval_mm(&self) -> f64 {
        self.trigger_interval_mm
    }

    pub fn trigger_armed(&self) -> bool {
        self.trigger_armed
    }

    /// Travel time for a move from `from` to `to` at the current speeds.
    pub fn move_time(&self, from: &Position, to: &Position) -> Duration {
        self.estimate
            .estimate(from, to, self.xy_speed, self.pol_speed)
            .mul_f64(MOVE_TIME_FACTOR)
    }

    fn current(&self) -> Position {
        match &self.active {
            None => self.position,
            Some(mv) => {
                let portion = mv.portion(self.clock.now());
                if portion >= 1.0 {
                    mv.target
                } else {
                    mv.origin.lerp(&mv.target, portion).rounded_to_tenth()
                }
            }
        }
    }

    /// Settle the active move at the current pose.
    fn freeze(&mut self) {
        self.position = self.current();
        self.active = None;
    }

    /// Retire a move whose travel time has fully elapsed.
    fn settle(&mut self) {
        if let Some(mv) = self.active
            && mv.portion(self.clock.now()) >= 1.0
        {
            self.position = mv.target;
            self.active = None;
        }
    }
}

impl MotionController for SimulatedController {
    fn is_connected(&mut self) -> bool {
        true
    }

    fn set_xy_speed(&mut self, mm_per_s: f64) -> Result<(), BoxError> {
        self.xy_speed = mm_per_s;
        Ok(())
    }

    fn set_pol_speed(&mut self, deg_per_s: f64) -> Result<(), BoxError> {
        self.pol_speed = deg_per_s;
        Ok(())
    }

    fn set_xy_accel(&mut self, _mm_per_s2: f64) -> Result<(), BoxError> {
        Ok(())
    }

    fn set_xy_decel(&mut self, _mm_per_s2: f64) -> Result<(), BoxError> {
        Ok(())
    }

    fn set_pol_accel(&mut self, _deg_per_s2: f64) -> Result<(), BoxError> {
        Ok(())
    }

    fn set_pol_decel(&mut self, _deg_per_s2: f64) -> Result<(), BoxError> {
        Ok(())
    }

    fn pol_torque(&mut self) -> Result<f64, BoxError> {
        Ok(SIM_TORQUE)
    }

    fn motor_status(&mut self) -> Result<MotorStatus, BoxError> {
        self.settle();
        let mut status = MotorStatus {
            x_power: self.motor_enabled,
            y_power: self.motor_enabled,
            pol_power: self.motor_enabled,
            pol_torque: Some(SIM_TORQUE),
            ..MotorStatus::default()
        };
        if let Some(mv) = &self.active {
            status.x_motion = mv.origin.x != mv.target.x;
            status.y_motion = mv.origin.y != mv.target.y;
            status.pol_motion = mv.origin.pol != mv.target.pol;
        }
        Ok(status)
    }

    fn read_position(&mut self) -> Result<Position, BoxError> {
        self.settle();
        Ok(self.current())
    }

    fn set_zero(&mut self, axis: Axis) -> Result<(), BoxError> {
        self.freeze();
        self.position = self.position.with_zeroed(axis);
        tracing::debug!(%axis, pose = %self.position, "sim zero");
        Ok(())
    }

    fn set_trigger_interval(&mut self, interval_mm: f64) -> Result<(), BoxError> {
        self.trigger_interval_mm = interval_mm;
        Ok(())
    }

    fn begin_move(&mut self, target: Position, with_trigger: bool) -> Result<(), BoxError> {
        self.freeze();
        self.trigger_armed = with_trigger;
        if !self.motor_enabled {
            tracing::debug!("sim motor unpowered; move ignored");
            return Ok(());
        }
        let origin = self.position;
        let move_time = self.move_time(&origin, &target);
        tracing::debug!(from = %origin, to = %target, move_time_s = move_time.as_secs_f64(), "sim move");
        self.active = Some(SimMove {
            origin,
            target,
            started: self.clock.now(),
            move_time,
        });
        Ok(())
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        self.freeze();
        self.trigger_armed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_traits::clock::test_clock::TestClock;

    fn sim() -> (TestClock, SimulatedController) {
        let clock = TestClock::new();
        let sim = SimulatedController::new(Arc::new(clock.clone()));
        (clock, sim)
    }

    #[test]
    fn idle_reads_return_stored_pose() {
        let (_clock, mut sim) = sim();
        assert_eq!(sim.read_position().unwrap(), SIM_START);
        assert!(!sim.motor_status().unwrap().in_motion());
    }

    #[test]
    fn interpolates_and_rounds_to_a_tenth() {
        let (clock, mut sim) = sim();
        let target = Position::new(245.0, 245.0, -100.0);
        let total = sim.move_time(&SIM_START, &target);
        sim.begin_move(target, false).unwrap();
        clock.advance(total / 2);
        let p = sim.read_position().unwrap();
        assert!((p.x - 195.0).abs() <= 0.1, "{p}");
        assert_eq!(p.x, p.rounded_to_tenth().x);
        let st = sim.motor_status().unwrap();
        assert!(st.x_motion && st.y_motion && !st.pol_motion);
    }

    #[test]
    fn arrives_exactly_at_target() {
        let (clock, mut sim) = sim();
        let target = Position::new(100.0, 20.0, 15.0);
        sim.begin_move(target, true).unwrap();
        assert!(sim.trigger_armed());
        clock.advance(Duration::from_secs(600));
        assert_eq!(sim.read_position().unwrap(), target);
        assert!(!sim.motor_status().unwrap().in_motion());
    }

    #[test]
    fn halt_freezes_mid_move() {
        let (clock, mut sim) = sim();
        sim.begin_move(Position::new(345.0, 145.0, -100.0), false).unwrap();
        clock.advance(Duration::from_secs(3));
        sim.halt().unwrap();
        let frozen = sim.read_position().unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(sim.read_position().unwrap(), frozen);
        assert!(frozen.x > 145.0 && frozen.x < 345.0);
    }

    #[test]
    fn unpowered_motor_reports_power_fail_and_stays_put() {
        let (clock, mut sim) = sim();
        sim.set_motor_enabled(false);
        sim.begin_move(Position::new(0.0, 0.0, 0.0), false).unwrap();
        clock.advance(Duration::from_secs(60));
        let st = sim.motor_status().unwrap();
        assert!(st.power_fail());
        assert!(!st.in_motion());
        assert_eq!(sim.read_position().unwrap(), SIM_START);
    }

    #[test]
    fn zeroing_redefines_named_components() {
        let (_clock, mut sim) = sim();
        sim.set_zero(Axis::Pol).unwrap();
        assert_eq!(sim.read_position().unwrap(), Position::new(145.0, 145.0, 0.0));
    }
}
