//! Type-state builder for `Scanner` and generic `build_engine` constructor.
//!
//! The builder enforces at compile time that a controller and workspace bounds
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use eyre::WrapErr;
use scanner_traits::{Clock, MonotonicClock, MotionController, MoveStatus, Position};

use crate::config::{Bounds, MotionCfg, WaitCfg};
use crate::engine::{MoveEngine, MoveState};
use crate::error::{BuildError, Report, Result};
use crate::hw_error::map_hw_error;

/// Engine over a boxed backend, chosen at runtime.
pub type Scanner = MoveEngine<Box<dyn MotionController>>;

impl MoveEngine<Box<dyn MotionController>> {
    /// Start building a Scanner.
    pub fn builder() -> ScannerBuilder<Missing, Missing> {
        ScannerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Scanner`. All fields are validated on `build()`.
pub struct ScannerBuilder<C, B> {
    controller: Option<Box<dyn MotionController>>,
    bounds: Option<Bounds>,
    motion: Option<MotionCfg>,
    wait: Option<WaitCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    stop_debounce_n: Option<u8>,
    _c: PhantomData<C>,
    _b: PhantomData<B>,
}

impl Default for ScannerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            controller: None,
            bounds: None,
            motion: None,
            wait: None,
            clock: None,
            stop_check: None,
            stop_debounce_n: None,
            _c: PhantomData,
            _b: PhantomData,
        }
    }
}

/// Validate configuration, push settings to the backend and read the
/// starting pose.
///
/// Shared by `ScannerBuilder::try_build()` and `build_engine()`.
fn validate_and_build<C: MotionController>(
    mut controller: C,
    bounds: Bounds,
    motion: MotionCfg,
    wait: WaitCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    stop_debounce_n: u8,
) -> Result<MoveEngine<C>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !bounds.is_valid() {
        return Err(Report::new(BuildError::InvalidConfig(
            "bounds must be finite with min <= max on every axis",
        )));
    }
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !(positive(motion.xy_speed) && positive(motion.pol_speed)) {
        return Err(Report::new(BuildError::InvalidConfig(
            "speeds must be > 0",
        )));
    }
    if !(positive(motion.xy_accel)
        && positive(motion.xy_decel)
        && positive(motion.pol_accel)
        && positive(motion.pol_decel))
    {
        return Err(Report::new(BuildError::InvalidConfig(
            "accelerations must be > 0",
        )));
    }
    if !positive(motion.trigger_interval_mm) {
        return Err(Report::new(BuildError::InvalidConfig(
            "trigger interval must be > 0",
        )));
    }
    if !(motion.estimate.safety_factor.is_finite() && motion.estimate.safety_factor >= 1.0) {
        return Err(Report::new(BuildError::InvalidConfig(
            "safety factor must be >= 1",
        )));
    }
    if wait.poll_interval.is_zero() {
        return Err(Report::new(BuildError::InvalidConfig(
            "poll interval must be > 0",
        )));
    }
    if !positive(wait.torque_limit) {
        return Err(Report::new(BuildError::InvalidConfig(
            "torque limit must be > 0",
        )));
    }

    // ── Backend setup ────────────────────────────────────────────────────────
    let apply = |r: std::result::Result<(), scanner_traits::BoxError>| {
        r.map_err(|e| Report::new(map_hw_error(&*e)))
    };
    apply(controller.set_xy_speed(motion.xy_speed)).wrap_err("apply xy speed")?;
    apply(controller.set_pol_speed(motion.pol_speed)).wrap_err("apply pol speed")?;
    apply(controller.set_xy_accel(motion.xy_accel)).wrap_err("apply xy accel")?;
    apply(controller.set_xy_decel(motion.xy_decel)).wrap_err("apply xy decel")?;
    apply(controller.set_pol_accel(motion.pol_accel)).wrap_err("apply pol accel")?;
    apply(controller.set_pol_decel(motion.pol_decel)).wrap_err("apply pol decel")?;
    apply(controller.set_trigger_interval(motion.trigger_interval_mm))
        .wrap_err("apply trigger interval")?;

    let position = read_initial_position(&mut controller, wait.read_retries)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };

    tracing::debug!(%position, "scanner ready");

    Ok(MoveEngine {
        controller,
        bounds,
        motion,
        wait,
        clock,
        position,
        next_pos: position,
        state: MoveState::Idle,
        last_status: MoveStatus::default(),
        torque_warnings: 0,
        stop_check,
        stop_debounce_n: stop_debounce_n.max(1),
        stop_count: 0,
    })
}

fn read_initial_position<C: MotionController>(controller: &mut C, retries: u32) -> Result<Position> {
    let mut attempts = 0;
    loop {
        match controller.read_position() {
            Ok(p) => return Ok(p),
            Err(e) if attempts < retries => {
                attempts += 1;
                tracing::warn!(retries = attempts, error = %e, "initial position read failed, retrying");
            }
            Err(e) => {
                return Err(Report::new(map_hw_error(&*e)).wrap_err("initial position read"));
            }
        }
    }
}

impl<C, B> ScannerBuilder<C, B> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Scanner> {
        let controller = self
            .controller
            .ok_or_else(|| Report::new(BuildError::MissingController))?;
        let bounds = self
            .bounds
            .ok_or_else(|| Report::new(BuildError::MissingBounds))?;

        validate_and_build(
            controller,
            bounds,
            self.motion.unwrap_or_default(),
            self.wait.unwrap_or_default(),
            self.clock,
            self.stop_check,
            self.stop_debounce_n.unwrap_or(1),
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<C, B> ScannerBuilder<C, B> {
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }
    pub fn with_wait(mut self, wait: WaitCfg) -> Self {
        self.wait = Some(wait);
        self
    }
    /// Share a clock with the backend; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Operator stop hook polled once per `wait_for_move` cycle.
    pub fn with_stop_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.stop_check = Some(Box::new(f));
        self
    }
    pub fn with_stop_debounce(mut self, n: u8) -> Self {
        self.stop_debounce_n = Some(n.max(1));
        self
    }
}

// Setters that advance type-state
impl<B> ScannerBuilder<Missing, B> {
    pub fn with_controller(
        self,
        controller: impl MotionController + 'static,
    ) -> ScannerBuilder<Set, B> {
        ScannerBuilder {
            controller: Some(Box::new(controller)),
            bounds: self.bounds,
            motion: self.motion,
            wait: self.wait,
            clock: self.clock,
            stop_check: self.stop_check,
            stop_debounce_n: self.stop_debounce_n,
            _c: PhantomData,
            _b: PhantomData,
        }
    }
}

impl<C> ScannerBuilder<C, Missing> {
    pub fn with_bounds(self, bounds: Bounds) -> ScannerBuilder<C, Set> {
        ScannerBuilder {
            controller: self.controller,
            bounds: Some(bounds),
            motion: self.motion,
            wait: self.wait,
            clock: self.clock,
            stop_check: self.stop_check,
            stop_debounce_n: self.stop_debounce_n,
            _c: PhantomData,
            _b: PhantomData,
        }
    }
}

impl ScannerBuilder<Set, Set> {
    /// Validate and build. Only available once controller and bounds are set.
    pub fn build(self) -> Result<Scanner> {
        self.try_build()
    }
}

/// Build a statically dispatched engine over a concrete backend.
///
/// Delegates to the shared `validate_and_build`.
#[allow(clippy::too_many_arguments)]
pub fn build_engine<C>(
    controller: C,
    bounds: Bounds,
    motion: Option<MotionCfg>,
    wait: Option<WaitCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    stop_debounce_n: Option<u8>,
) -> Result<MoveEngine<C>>
where
    C: MotionController + 'static,
{
    validate_and_build(
        controller,
        bounds,
        motion.unwrap_or_default(),
        wait.unwrap_or_default(),
        clock,
        stop_check,
        stop_debounce_n.unwrap_or(1),
    )
}
