//! The move lifecycle engine (`MoveEngine`).
//!
//! Tracks the current pose and the pending target, validates and starts moves,
//! and classifies their outcome by polling the backend. State is explicit:
//! `Idle` or `Moving`, never inferred from cached backend flags alone.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use scanner_traits::{
    Axis, BoxError, Clock, MotionController, MotorStatus, MoveStatus, Position,
};

use crate::config::{Bounds, MotionCfg, WaitCfg};
use crate::error::{MotionError, Report, Result};
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveMove {
    pub(crate) started: Instant,
    pub(crate) timeout: Duration,
    pub(crate) target: Position,
    pub(crate) stop_requested: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum MoveState {
    Idle,
    Moving(ActiveMove),
}

/// Engine over any backend. `Scanner` is the boxed flavour built by
/// `Scanner::builder()`; `build_engine` yields a statically dispatched one.
pub struct MoveEngine<C: MotionController> {
    pub(crate) controller: C,
    pub(crate) bounds: Bounds,
    pub(crate) motion: MotionCfg,
    pub(crate) wait: WaitCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,

    pub(crate) position: Position,
    pub(crate) next_pos: Position,
    pub(crate) state: MoveState,
    pub(crate) last_status: MoveStatus,
    pub(crate) torque_warnings: u32,

    pub(crate) stop_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) stop_debounce_n: u8,
    pub(crate) stop_count: u8,
}

impl<C: MotionController> core::fmt::Debug for MoveEngine<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MoveEngine")
            .field("position", &self.position)
            .field("next_pos", &self.next_pos)
            .field("state", &self.state)
            .field("last_status", &self.last_status)
            .finish()
    }
}

/// Map a backend result into the engine's error type, tagging the operation.
fn hw<T>(r: std::result::Result<T, BoxError>, what: &'static str) -> Result<T> {
    r.map_err(|e| Report::new(map_hw_error(&*e))).wrap_err(what)
}

fn check_rate(v: f64, msg: &'static str) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(Report::new(MotionError::InvalidSetting(msg)))
    }
}

/// Parse an operator-supplied axis name (`x`, `y`, `pol`, `xy`, any case).
pub fn parse_axis(name: &str) -> Result<Axis> {
    name.parse::<Axis>()
        .map_err(|e| Report::new(MotionError::UnsupportedAxis(e.0)))
}

/// Ordered classification of one status poll. The first matching rule wins:
/// stop request, timeout, power failure, arrival. Anything else is in progress.
pub(crate) fn classify(
    stop_requested: bool,
    timed_out: bool,
    motor: Option<&MotorStatus>,
    pose: &Position,
    target: &Position,
) -> MoveStatus {
    if stop_requested {
        return MoveStatus::stopped();
    }
    if timed_out {
        return MoveStatus::timed_out();
    }
    match motor {
        Some(m) if m.power_fail() => MoveStatus::power_failed(),
        Some(m) if !m.in_motion() && pose.approx_eq(target) => MoveStatus::succeeded(),
        // no fresh status means no verdict yet
        _ => MoveStatus::default(),
    }
}

impl<C: MotionController> MoveEngine<C> {
    // ── Connection & settings ────────────────────────────────────────────────

    pub fn is_connected(&mut self) -> bool {
        self.controller.is_connected()
    }

    /// Affects moves started after this call.
    pub fn set_xy_speed(&mut self, mm_per_s: f64) -> Result<()> {
        check_rate(mm_per_s, "xy speed must be > 0")?;
        hw(self.controller.set_xy_speed(mm_per_s), "set xy speed")?;
        self.motion.xy_speed = mm_per_s;
        Ok(())
    }

    /// Affects moves started after this call.
    pub fn set_pol_speed(&mut self, deg_per_s: f64) -> Result<()> {
        check_rate(deg_per_s, "pol speed must be > 0")?;
        hw(self.controller.set_pol_speed(deg_per_s), "set pol speed")?;
        self.motion.pol_speed = deg_per_s;
        Ok(())
    }

    pub fn set_xy_accel(&mut self, mm_per_s2: f64) -> Result<()> {
        check_rate(mm_per_s2, "xy accel must be > 0")?;
        hw(self.controller.set_xy_accel(mm_per_s2), "set xy accel")?;
        self.motion.xy_accel = mm_per_s2;
        Ok(())
    }

    pub fn set_xy_decel(&mut self, mm_per_s2: f64) -> Result<()> {
        check_rate(mm_per_s2, "xy decel must be > 0")?;
        hw(self.controller.set_xy_decel(mm_per_s2), "set xy decel")?;
        self.motion.xy_decel = mm_per_s2;
        Ok(())
    }

    pub fn set_pol_accel(&mut self, deg_per_s2: f64) -> Result<()> {
        check_rate(deg_per_s2, "pol accel must be > 0")?;
        hw(self.controller.set_pol_accel(deg_per_s2), "set pol accel")?;
        self.motion.pol_accel = deg_per_s2;
        Ok(())
    }

    pub fn set_pol_decel(&mut self, deg_per_s2: f64) -> Result<()> {
        check_rate(deg_per_s2, "pol decel must be > 0")?;
        hw(self.controller.set_pol_decel(deg_per_s2), "set pol decel")?;
        self.motion.pol_decel = deg_per_s2;
        Ok(())
    }

    /// Spacing handed to the backend for the acquisition trigger.
    pub fn set_trigger_interval(&mut self, interval_mm: f64) -> Result<()> {
        check_rate(interval_mm, "trigger interval must be > 0")?;
        hw(
            self.controller.set_trigger_interval(interval_mm),
            "set trigger interval",
        )?;
        self.motion.trigger_interval_mm = interval_mm;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Diagnostic only; never gates a move.
    pub fn get_pol_torque(&mut self) -> Result<f64> {
        hw(self.controller.pol_torque(), "read pol torque")
    }

    /// Fresh snapshot from the backend.
    pub fn get_motor_status(&mut self) -> Result<MotorStatus> {
        hw(self.controller.motor_status(), "read motor status")
    }

    /// Current pose. When `cached` and idle, answers without touching the
    /// backend. Otherwise reads fresh, with up to `retry` extra attempts;
    /// if every attempt fails the last known pose is returned.
    pub fn get_position(&mut self, cached: bool, retry: u32) -> Position {
        if cached && !self.is_moving() {
            return self.position;
        }
        let attempts = retry.saturating_add(1);
        for attempt in 1..=attempts {
            match self.controller.read_position() {
                Ok(p) => {
                    self.position = p;
                    return p;
                }
                Err(e) => tracing::warn!(attempt, attempts, error = %e, "position read failed"),
            }
        }
        tracing::warn!(pose = %self.position, "position unavailable; using last known pose");
        self.position
    }

    /// `get_position(true, <configured retries>)`.
    pub fn position(&mut self) -> Position {
        self.get_position(true, self.wait.read_retries)
    }

    pub fn position_in_bounds(&self, pos: &Position) -> bool {
        self.bounds.contains(pos)
    }

    /// Advisory travel time at the current speeds; seeds move timeouts.
    pub fn estimate_move_time(&self, from: &Position, to: &Position) -> Duration {
        self.motion
            .estimate
            .estimate(from, to, self.motion.xy_speed, self.motion.pol_speed)
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, MoveState::Moving(_))
    }

    pub fn next_pos(&self) -> Position {
        self.next_pos
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn motion_cfg(&self) -> &MotionCfg {
        &self.motion
    }

    pub fn wait_cfg(&self) -> &WaitCfg {
        &self.wait
    }

    /// Start instant of the move in flight, if any.
    pub fn move_started_at(&self) -> Option<Instant> {
        match self.state {
            MoveState::Moving(active) => Some(active.started),
            MoveState::Idle => None,
        }
    }

    /// Torque excursions counted by `wait_for_move` since construction.
    pub fn torque_warnings(&self) -> u32 {
        self.torque_warnings
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    // ── Move lifecycle ───────────────────────────────────────────────────────

    /// Set the target of the next move, snapped to the controller's
    /// resolution. The target is left unchanged on error.
    pub fn set_next_pos(&mut self, pos: Position) -> Result<()> {
        if !self.bounds.contains(&pos) {
            return Err(Report::new(MotionError::OutOfBounds(pos)));
        }
        self.ensure_idle("set the next position")?;
        let snapped = self.controller.quantize(&pos);
        if !self.bounds.contains(&snapped) {
            return Err(Report::new(MotionError::OutOfBounds(snapped)));
        }
        if snapped != pos {
            tracing::debug!(requested = %pos, target = %snapped, "target snapped to controller resolution");
        }
        self.next_pos = snapped;
        Ok(())
    }

    /// Begin moving to `next_pos`. With `timeout = None` the timeout is
    /// derived from `estimate_move_time`.
    pub fn start_move(&mut self, with_trigger: bool, timeout: Option<Duration>) -> Result<()> {
        self.ensure_idle("start a move")?;
        let target = self.next_pos;
        if !self.bounds.contains(&target) {
            return Err(Report::new(MotionError::OutOfBounds(target)));
        }
        let from = self.get_position(false, self.wait.read_retries);
        let timeout = timeout.unwrap_or_else(|| self.estimate_move_time(&from, &target));

        hw(self.controller.begin_move(target, with_trigger), "begin move")?;
        self.state = MoveState::Moving(ActiveMove {
            started: self.clock.now(),
            timeout,
            target,
            stop_requested: false,
        });
        self.last_status = MoveStatus::default();
        self.stop_count = 0;
        tracing::info!(
            %from,
            to = %target,
            timeout_s = timeout.as_secs_f64(),
            with_trigger,
            "move started"
        );
        Ok(())
    }

    /// Halt immediately and take the pose at the halt as the current position.
    ///
    /// If the backend refuses the halt the move stays marked as stop-requested,
    /// so the next status poll still resolves it as stopped.
    pub fn stop_move(&mut self) -> Result<()> {
        let was_moving = match &mut self.state {
            MoveState::Moving(active) => {
                active.stop_requested = true;
                true
            }
            MoveState::Idle => false,
        };
        hw(self.controller.halt(), "halt")?;
        let pose = self.get_position(false, self.wait.read_retries);
        if was_moving {
            self.state = MoveState::Idle;
            self.last_status = MoveStatus::stopped();
            tracing::info!(%pose, "move stopped");
        }
        Ok(())
    }

    /// Non-blocking status of the current move. Once a terminal status is
    /// seen the engine returns to idle and keeps answering with that status
    /// until the next `start_move`.
    pub fn get_move_status(&mut self) -> MoveStatus {
        let MoveState::Moving(active) = self.state else {
            return self.last_status;
        };
        let elapsed = self.clock.elapsed(active.started);
        let motor = match self.controller.motor_status() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "motor status read failed");
                None
            }
        };
        let pose = self.get_position(false, self.wait.read_retries);
        let status = classify(
            active.stop_requested,
            elapsed > active.timeout,
            motor.as_ref(),
            &pose,
            &active.target,
        );
        tracing::debug!(
            ?status,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            %pose,
            "move status"
        );
        if status.should_stop() {
            self.finish(status)
        } else {
            status
        }
    }

    /// Block until the move ends. A `timeout` replaces the one given to
    /// `start_move`, still measured from the move's start. Returns the last
    /// terminal status at once when no move is active.
    pub fn wait_for_move(&mut self, timeout: Option<Duration>) -> MoveStatus {
        match (&mut self.state, timeout) {
            (MoveState::Idle, _) => return self.last_status,
            (MoveState::Moving(active), Some(t)) => active.timeout = t,
            (MoveState::Moving(_), None) => {}
        }
        let mut status = self.get_move_status();
        while !status.should_stop() {
            if self.poll_stop_check() {
                tracing::warn!("stop requested");
                if let Err(e) = self.stop_move() {
                    tracing::warn!(error = %e, "halt failed on stop request");
                }
                status = self.get_move_status();
                continue;
            }
            self.clock.sleep(self.wait.poll_interval);
            status = self.get_move_status();
            self.sample_torque();
        }
        status
    }

    /// Drive the named axes to zero and wait. Same guards and timeout rules
    /// as any other move.
    pub fn home_axis(&mut self, axis: Axis, timeout: Option<Duration>) -> Result<MoveStatus> {
        self.ensure_idle("home an axis")?;
        let target = self.get_position(false, self.wait.read_retries).with_zeroed(axis);
        self.set_next_pos(target)?;
        tracing::info!(%axis, to = %target, "homing");
        self.start_move(false, timeout)?;
        Ok(self.wait_for_move(timeout))
    }

    /// Redefine the named components of the current pose as zero, without motion.
    pub fn set_zero_axis(&mut self, axis: Axis) -> Result<()> {
        self.ensure_idle("zero an axis")?;
        hw(self.controller.set_zero(axis), "set zero")?;
        let pose = self.get_position(false, self.wait.read_retries);
        tracing::info!(%axis, %pose, "axis zeroed");
        Ok(())
    }

    // ── Private ──────────────────────────────────────────────────────────────

    /// Refuse `op` while a move is tracked or the backend reports motion.
    fn ensure_idle(&mut self, op: &'static str) -> Result<()> {
        if self.is_moving() || self.get_motor_status()?.in_motion() {
            return Err(Report::new(MotionError::InMotion(op)));
        }
        Ok(())
    }

    /// Fold a terminal status: halt on error (best-effort), take the final
    /// pose and return to idle.
    fn finish(&mut self, status: MoveStatus) -> MoveStatus {
        if (status.is_error() || status.stop_signal)
            && let Err(e) = self.controller.halt()
        {
            tracing::warn!(error = %e, "halt failed after move ended");
        }
        let pose = self.get_position(false, self.wait.read_retries);
        self.state = MoveState::Idle;
        self.last_status = status;
        match status.outcome() {
            Some(outcome) if status.is_error() => {
                tracing::error!(%outcome, %pose, "move ended in error");
            }
            Some(outcome) => tracing::info!(%outcome, %pose, "move finished"),
            None => {}
        }
        status
    }

    fn sample_torque(&mut self) {
        match self.controller.pol_torque() {
            Ok(t) if t.abs() > self.wait.torque_limit => {
                self.torque_warnings = self.torque_warnings.saturating_add(1);
                tracing::warn!(
                    torque = t,
                    limit = self.wait.torque_limit,
                    "polarization torque above limit"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "torque read failed"),
        }
    }

    /// Debounced poll of the operator stop hook.
    fn poll_stop_check(&mut self) -> bool {
        let Some(check) = &self.stop_check else {
            return false;
        };
        if check() {
            self.stop_count = self.stop_count.saturating_add(1);
            if self.stop_count >= self.stop_debounce_n {
                self.stop_count = 0;
                return true;
            }
        } else {
            self.stop_count = 0;
        }
        false
    }
}
