//! Human-readable error descriptions, exit codes and structured JSON errors.

use scanner_core::MoveOutcome;
use scanner_core::error::{BuildError, MotionError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_STOPPED: i32 = 2;
pub const EXIT_POWER_FAIL: i32 = 3;
pub const EXIT_TIMED_OUT: i32 = 4;
pub const EXIT_VALIDATION: i32 = 5;
pub const EXIT_CONFLICT: i32 = 6;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingController => {
                "What happened: No motion controller was provided to the engine.\nLikely causes: The backend failed to initialize or was not wired into the builder.\nHow to fix: Check [controller] in the config and that the backend was created successfully.".to_string()
            }
            BuildError::MissingBounds => {
                "What happened: Workspace bounds were not set.\nLikely causes: The builder was not given a [bounds] section.\nHow to fix: Add x/y/pol limits under [bounds] in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<MotionError>() {
        return match me {
            MotionError::OutOfBounds(p) => format!(
                "What happened: Target {p} is outside the workspace.\nLikely causes: A typo in the coordinates or waypoint file, or [bounds] set too tight.\nHow to fix: Pick a pose inside [bounds] or widen the limits if the hardware allows it."
            ),
            MotionError::UnsupportedAxis(name) => format!(
                "What happened: Unknown axis '{name}'.\nLikely causes: The axis name is misspelled.\nHow to fix: Use one of x, y, pol or xy."
            ),
            MotionError::InvalidSetting(msg) => format!(
                "What happened: Invalid setting ({msg}).\nLikely causes: A zero, negative or non-numeric value.\nHow to fix: Pass a positive finite value."
            ),
            MotionError::InMotion(op) => format!(
                "What happened: Cannot {op} while the scanner is moving.\nLikely causes: Another move is still in progress on this controller.\nHow to fix: Wait for the move to finish or stop it, then retry."
            ),
            MotionError::Timeout => "What happened: The controller did not answer in time.\nLikely causes: Network link down, wrong address, or controller busy.\nHow to fix: Check the cable and controller.address, and consider raising controller.io_timeout_ms.".to_string(),
            MotionError::ControllerFault(msg) => format!(
                "What happened: The controller rejected a command ({msg}).\nLikely causes: Drive fault, limit switch active, or unsupported command.\nHow to fix: Inspect the controller's error state, clear faults, then retry."
            ),
            MotionError::Controller(msg) => format!(
                "What happened: Controller communication failed ({msg}).\nLikely causes: Connection dropped or the backend is not responding.\nHow to fix: Re-run with --log-level=debug to see the exchanged commands."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let chain = format!("{err:#}");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("connect controller") {
        return "What happened: Could not connect to the motion controller.\nLikely causes: Wrong controller.address, controller powered off, or a firewall in the way.\nHow to fix: Check the address and that the controller accepts TCP connections.".to_string();
    }

    // Waypoint CSV header special-case
    if lower.contains("waypoint csv must have headers") {
        return "Invalid headers in waypoint CSV. Expected 'x,y,pol'.".to_string();
    }

    if lower.contains("invalid csv row") {
        return format!(
            "What happened: The waypoint file has a bad row ({msg}).\nLikely causes: Missing column, non-numeric or non-finite value.\nHow to fix: Fix the row in the CSV and rerun."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("config") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({chain}).\nLikely causes: Missing [bounds] or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for errors: validation 5, motion conflict 6, else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<MotionError>() {
        Some(me) if me.is_validation() => EXIT_VALIDATION,
        Some(me) if me.is_conflict() => EXIT_CONFLICT,
        _ => EXIT_ERROR,
    }
}

/// Exit code for a move that ran to a terminal outcome.
pub fn exit_code_for_outcome(outcome: MoveOutcome) -> i32 {
    match outcome {
        MoveOutcome::Success => EXIT_OK,
        MoveOutcome::Stopped => EXIT_STOPPED,
        MoveOutcome::PowerFail => EXIT_POWER_FAIL,
        MoveOutcome::TimedOut => EXIT_TIMED_OUT,
    }
}

fn error_kind(err: &eyre::Report) -> &'static str {
    if let Some(me) = err.downcast_ref::<MotionError>() {
        if me.is_validation() {
            return "Validation";
        }
        if me.is_conflict() {
            return "MotionConflict";
        }
        return "Controller";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": error_kind(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
