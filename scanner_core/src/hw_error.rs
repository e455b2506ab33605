//! Maps `Box<dyn Error>` from the backend boundary to typed `MotionError`.
//!
//! `scanner_traits::MotionController` returns boxed errors so any backend can
//! plug in; this module converts them to our typed enum, with an optional
//! feature-gated path for `scanner_hardware::HwError` downcasting.

use crate::error::MotionError;

/// Map a backend error to a typed `MotionError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> MotionError {
    #[cfg(feature = "hardware-errors")]
    {
        use scanner_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => MotionError::Timeout,
                HwError::Rejected(_) | HwError::BadReply { .. } => {
                    MotionError::ControllerFault(hw.to_string())
                }
                other => MotionError::Controller(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        MotionError::Timeout
    } else {
        MotionError::Controller(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain(&'static str);

    impl std::fmt::Display for Plain {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Plain {}

    #[test]
    fn falls_back_to_message_heuristics() {
        assert_eq!(map_hw_error(&Plain("read timed out")), MotionError::Timeout);
        assert_eq!(
            map_hw_error(&Plain("link down")),
            MotionError::Controller("link down".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hardware_errors() {
        use scanner_hardware::error::HwError;
        assert_eq!(map_hw_error(&HwError::Timeout), MotionError::Timeout);
        match map_hw_error(&HwError::Rejected("BG ABC".into())) {
            MotionError::ControllerFault(msg) => assert!(msg.contains("BG ABC")),
            other => panic!("expected ControllerFault, got {other:?}"),
        }
    }
}
