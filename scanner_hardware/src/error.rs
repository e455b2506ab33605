use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("controller not connected")]
    NotConnected,
    #[error("controller timeout")]
    Timeout,
    #[error("controller rejected command '{0}'")]
    Rejected(String),
    #[error("unexpected reply to '{command}': '{reply}'")]
    BadReply { command: String, reply: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl HwError {
    /// Recover a typed error from a boxed transport failure.
    pub fn from_boxed(e: scanner_traits::BoxError) -> Self {
        match e.downcast::<HwError>() {
            Ok(hw) => *hw,
            Err(other) => match other.downcast::<std::io::Error>() {
                Ok(io) => HwError::from_io(*io),
                Err(other) => HwError::Transport(other.to_string()),
            },
        }
    }

    /// Socket read/write timeouts surface as `WouldBlock` on some platforms.
    pub fn from_io(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => HwError::Timeout,
            _ => HwError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
