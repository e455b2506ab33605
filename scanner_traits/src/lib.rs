//! Shared contracts for the beam scanner stack: the time source, the
//! controller transport, the backend motion contract and the pose/status
//! value types they exchange.

pub mod clock;
pub mod model;
pub mod transport;

pub use clock::{Clock, MonotonicClock};
pub use model::{
    Axis, MotorStatus, MoveEstimate, MoveOutcome, MoveStatus, ParseAxisError, POL_TOLERANCE_DEG,
    Position,
};
pub use transport::Transport;

/// Error type crossing the backend boundary; the engine maps it to typed errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Operations every scanner backend provides, whether it drives real
/// hardware or simulates it.
///
/// Units are millimetres for X/Y and degrees for polarization throughout.
pub trait MotionController {
    fn is_connected(&mut self) -> bool;

    fn set_xy_speed(&mut self, mm_per_s: f64) -> Result<(), BoxError>;
    fn set_pol_speed(&mut self, deg_per_s: f64) -> Result<(), BoxError>;
    fn set_xy_accel(&mut self, mm_per_s2: f64) -> Result<(), BoxError>;
    fn set_xy_decel(&mut self, mm_per_s2: f64) -> Result<(), BoxError>;
    fn set_pol_accel(&mut self, deg_per_s2: f64) -> Result<(), BoxError>;
    fn set_pol_decel(&mut self, deg_per_s2: f64) -> Result<(), BoxError>;

    fn pol_torque(&mut self) -> Result<f64, BoxError>;
    fn motor_status(&mut self) -> Result<MotorStatus, BoxError>;
    fn read_position(&mut self) -> Result<Position, BoxError>;

    /// Redefine the named components of the current pose as zero. No motion.
    fn set_zero(&mut self, axis: Axis) -> Result<(), BoxError>;

    /// Trigger spacing for the external data-acquisition collaborator.
    fn set_trigger_interval(&mut self, interval_mm: f64) -> Result<(), BoxError>;

    /// Start an absolute move to `target` and return without waiting.
    fn begin_move(&mut self, target: Position, with_trigger: bool) -> Result<(), BoxError>;

    /// Stop all axes immediately.
    fn halt(&mut self) -> Result<(), BoxError>;

    /// The pose the controller will actually settle at when asked for
    /// `target`. Backends that command in encoder counts round here.
    fn quantize(&self, target: &Position) -> Position {
        *target
    }
}

impl<T: MotionController + ?Sized> MotionController for Box<T> {
    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }
    fn set_xy_speed(&mut self, mm_per_s: f64) -> Result<(), BoxError> {
        (**self).set_xy_speed(mm_per_s)
    }
    fn set_pol_speed(&mut self, deg_per_s: f64) -> Result<(), BoxError> {
        (**self).set_pol_speed(deg_per_s)
    }
    fn set_xy_accel(&mut self, mm_per_s2: f64) -> Result<(), BoxError> {
        (**self).set_xy_accel(mm_per_s2)
    }
    fn set_xy_decel(&mut self, mm_per_s2: f64) -> Result<(), BoxError> {
        (**self).set_xy_decel(mm_per_s2)
    }
    fn set_pol_accel(&mut self, deg_per_s2: f64) -> Result<(), BoxError> {
        (**self).set_pol_accel(deg_per_s2)
    }
    fn set_pol_decel(&mut self, deg_per_s2: f64) -> Result<(), BoxError> {
        (**self).set_pol_decel(deg_per_s2)
    }
    fn pol_torque(&mut self) -> Result<f64, BoxError> {
        (**self).pol_torque()
    }
    fn motor_status(&mut self) -> Result<MotorStatus, BoxError> {
        (**self).motor_status()
    }
    fn read_position(&mut self) -> Result<Position, BoxError> {
        (**self).read_position()
    }
    fn set_zero(&mut self, axis: Axis) -> Result<(), BoxError> {
        (**self).set_zero(axis)
    }
    fn set_trigger_interval(&mut self, interval_mm: f64) -> Result<(), BoxError> {
        (**self).set_trigger_interval(interval_mm)
    }
    fn begin_move(&mut self, target: Position, with_trigger: bool) -> Result<(), BoxError> {
        (**self).begin_move(target, with_trigger)
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        (**self).halt()
    }
    fn quantize(&self, target: &Position) -> Position {
        (**self).quantize(target)
    }
}
