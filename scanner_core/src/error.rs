use scanner_traits::Position;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    #[error("target {0} is outside the workspace bounds")]
    OutOfBounds(Position),
    #[error("unsupported axis '{0}' (expected x, y, pol or xy)")]
    UnsupportedAxis(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(&'static str),
    #[error("cannot {0} while the scanner is moving")]
    InMotion(&'static str),
    #[error("controller error: {0}")]
    Controller(String),
    #[error("controller fault: {0}")]
    ControllerFault(String),
    #[error("timeout waiting for controller")]
    Timeout,
}

impl MotionError {
    /// Caller supplied a bad value; retrying the same call cannot succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MotionError::OutOfBounds(_)
                | MotionError::UnsupportedAxis(_)
                | MotionError::InvalidSetting(_)
        )
    }

    /// A move is in flight; stop or wait before retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, MotionError::InMotion(_))
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing motion controller")]
    MissingController,
    #[error("missing workspace bounds")]
    MissingBounds,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
