use std::time::Duration;

/// Seconds to `Duration`; `None` for negative or non-finite input.
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}
