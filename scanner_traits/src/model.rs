//! Value types shared by the engine and every backend.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Two polarization angles closer than this compare as equal.
pub const POL_TOLERANCE_DEG: f64 = 0.2;

/// Scanner pose: planar X/Y in millimetres and polarization angle in degrees.
///
/// `PartialEq` is exact. Use [`Position::approx_eq`] when deciding whether a
/// move reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub pol: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, pol: f64) -> Self {
        Self { x, y, pol }
    }

    /// Exact on X/Y, within [`POL_TOLERANCE_DEG`] on polarization.
    pub fn approx_eq(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y && (self.pol - other.pol).abs() < POL_TOLERANCE_DEG
    }

    /// Planar Euclidean distance between the X/Y components.
    pub fn xy_distance(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Absolute polarization travel to `other`.
    pub fn pol_distance(&self, other: &Position) -> f64 {
        (other.pol - self.pol).abs()
    }

    /// Point at `portion` (0..=1) of the straight line from `self` to `to`.
    pub fn lerp(&self, to: &Position, portion: f64) -> Position {
        let p = portion.clamp(0.0, 1.0);
        Position {
            x: self.x + (to.x - self.x) * p,
            y: self.y + (to.y - self.y) * p,
            pol: self.pol + (to.pol - self.pol) * p,
        }
    }

    /// Every component rounded to one decimal place.
    pub fn rounded_to_tenth(&self) -> Position {
        let r = |v: f64| (v * 10.0).round() / 10.0;
        Position {
            x: r(self.x),
            y: r(self.y),
            pol: r(self.pol),
        }
    }

    /// Copy of `self` with the components named by `axis` set to zero.
    pub fn with_zeroed(&self, axis: Axis) -> Position {
        let mut p = *self;
        if axis.includes_x() {
            p.x = 0.0;
        }
        if axis.includes_y() {
            p.y = 0.0;
        }
        if axis.includes_pol() {
            p.pol = 0.0;
        }
        p
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.pol.is_finite()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={:.1}, y={:.1}, pol={:.1})", self.x, self.y, self.pol)
    }
}

/// Axis selector for homing and zeroing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Pol,
    /// Both planar axes.
    Xy,
}

impl Axis {
    pub fn includes_x(self) -> bool {
        matches!(self, Axis::X | Axis::Xy)
    }

    pub fn includes_y(self) -> bool {
        matches!(self, Axis::Y | Axis::Xy)
    }

    pub fn includes_pol(self) -> bool {
        matches!(self, Axis::Pol)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Pol => "pol",
            Axis::Xy => "xy",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an axis name is not one of `x`, `y`, `pol`, `xy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAxisError(pub String);

impl fmt::Display for ParseAxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported axis '{}' (expected x, y, pol or xy)", self.0)
    }
}

impl std::error::Error for ParseAxisError {}

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "pol" => Ok(Axis::Pol),
            "xy" => Ok(Axis::Xy),
            _ => Err(ParseAxisError(s.to_string())),
        }
    }
}

/// Snapshot of the drive: power and motion flags per axis plus an optional
/// polarization torque reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorStatus {
    pub x_power: bool,
    pub y_power: bool,
    pub pol_power: bool,
    pub x_motion: bool,
    pub y_motion: bool,
    pub pol_motion: bool,
    pub pol_torque: Option<f64>,
}

impl MotorStatus {
    /// All axes powered and at rest.
    pub fn powered_idle() -> Self {
        Self {
            x_power: true,
            y_power: true,
            pol_power: true,
            ..Self::default()
        }
    }

    pub fn power_fail(&self) -> bool {
        !(self.x_power && self.y_power && self.pol_power)
    }

    pub fn in_motion(&self) -> bool {
        self.x_motion || self.y_motion || self.pol_motion
    }
}

/// Flags describing where a move lifecycle stands. All false means the move
/// is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveStatus {
    pub success: bool,
    pub power_fail: bool,
    pub timed_out: bool,
    pub stop_signal: bool,
}

/// Collapsed terminal outcome of a [`MoveStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    Success,
    Stopped,
    PowerFail,
    TimedOut,
}

impl MoveOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveOutcome::Success => "success",
            MoveOutcome::Stopped => "stopped",
            MoveOutcome::PowerFail => "power_fail",
            MoveOutcome::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MoveStatus {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn stopped() -> Self {
        Self {
            stop_signal: true,
            ..Self::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    pub fn power_failed() -> Self {
        Self {
            power_fail: true,
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.power_fail || self.timed_out
    }

    pub fn should_stop(&self) -> bool {
        self.success || self.stop_signal || self.is_error()
    }

    /// Terminal outcome, or `None` while the move is in progress.
    /// A stop request wins over every other flag.
    pub fn outcome(&self) -> Option<MoveOutcome> {
        if self.stop_signal {
            Some(MoveOutcome::Stopped)
        } else if self.timed_out {
            Some(MoveOutcome::TimedOut)
        } else if self.power_fail {
            Some(MoveOutcome::PowerFail)
        } else if self.success {
            Some(MoveOutcome::Success)
        } else {
            None
        }
    }
}

/// Parameters of the move duration estimate:
/// `max(xy_time, pol_time) * safety_factor + fixed_margin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEstimate {
    pub safety_factor: f64,
    pub fixed_margin: Duration,
}

impl Default for MoveEstimate {
    fn default() -> Self {
        Self {
            safety_factor: 3.0,
            fixed_margin: Duration::from_secs(3),
        }
    }
}

impl MoveEstimate {
    /// Estimated wall time to travel from `from` to `to` at the given speeds.
    /// Non-positive speeds contribute no travel time; overflow saturates.
    pub fn estimate(&self, from: &Position, to: &Position, xy_speed: f64, pol_speed: f64) -> Duration {
        let leg = |dist: f64, speed: f64| if speed > 0.0 { dist / speed } else { 0.0 };
        let xy_time = leg(from.xy_distance(to), xy_speed);
        let pol_time = leg(from.pol_distance(to), pol_speed);
        let travel = Duration::try_from_secs_f64(xy_time.max(pol_time) * self.safety_factor)
            .unwrap_or(Duration::MAX);
        travel.saturating_add(self.fixed_margin)
    }
}
