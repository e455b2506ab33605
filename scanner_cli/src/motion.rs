//! Backend assembly from config and the motion subcommands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use scanner_config::{Backend, Config};
use scanner_core::error::Result as CoreResult;
use scanner_core::util::duration_from_secs;
use scanner_core::{
    Axis, MotionError, MoveOutcome, MoveStatus, Position, Report, Scanner, parse_axis,
};
use scanner_hardware::{DmcController, DmcScale, SimulatedController, TcpTransport};
use scanner_traits::{Clock, MonotonicClock};
use serde_json::{Value, json};

/// Test hook: start the simulator with motor power off.
const SIM_POWER_OFF_ENV: &str = "SCANNER_TEST_SIM_POWER_OFF";

/// Build a scanner for the configured backend. `shutdown` is polled as the
/// engine stop hook.
pub fn build_scanner(cfg: &Config, shutdown: Arc<AtomicBool>) -> CoreResult<Scanner> {
    let bounds: scanner_core::Bounds = (&cfg.bounds).into();
    let motion: scanner_core::MotionCfg = (&cfg.motion).into();
    let wait: scanner_core::WaitCfg = (&cfg.wait).into();
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());

    let builder = Scanner::builder()
        .with_bounds(bounds)
        .with_motion(motion)
        .with_wait(wait)
        .with_clock(clock.clone())
        .with_stop_check(move || shutdown.load(Ordering::Relaxed))
        .with_stop_debounce(cfg.stop.debounce_n);

    match cfg.controller.backend {
        Backend::Sim => {
            let s = &cfg.simulator;
            let mut sim = SimulatedController::new(clock)
                .with_position(Position::new(s.x_init, s.y_init, s.pol_init))
                .with_estimate(motion.estimate);
            if std::env::var(SIM_POWER_OFF_ENV).is_ok_and(|v| v == "1") {
                sim.set_motor_enabled(false);
            }
            tracing::info!(backend = "sim", "using simulated controller");
            builder.with_controller(sim).build()
        }
        Backend::Dmc => {
            let c = &cfg.controller;
            let address = c.address.clone().unwrap_or_default();
            let transport =
                TcpTransport::new(address.as_str(), Duration::from_millis(c.io_timeout_ms));
            let scale = DmcScale {
                counts_per_mm: c.counts_per_mm,
                counts_per_deg: c.counts_per_deg,
            };
            let dmc = DmcController::connect(transport, scale)
                .wrap_err_with(|| format!("connect controller at {address}"))?;
            tracing::info!(backend = "dmc", %address, "controller connected");
            builder.with_controller(dmc).build()
        }
    }
}

fn timeout_arg(secs: Option<f64>) -> CoreResult<Option<Duration>> {
    match secs {
        None => Ok(None),
        Some(s) => duration_from_secs(s).map(Some).ok_or_else(|| {
            Report::new(MotionError::InvalidSetting(
                "timeout must be a non-negative number of seconds",
            ))
        }),
    }
}

/// One finished move, as printed to the operator.
#[derive(Debug, Clone, Copy)]
pub struct MoveReport {
    pub command: &'static str,
    pub target: Position,
    pub final_pose: Position,
    pub outcome: MoveOutcome,
    pub duration_ms: u64,
    pub torque_warnings: u32,
}

fn pose_json(p: &Position) -> Value {
    json!({ "x": p.x, "y": p.y, "pol": p.pol })
}

fn unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn outcome_label(o: MoveOutcome) -> &'static str {
    match o {
        MoveOutcome::Success => "complete",
        MoveOutcome::Stopped => "stopped",
        MoveOutcome::PowerFail => "failed: motor power lost",
        MoveOutcome::TimedOut => "failed: timed out",
    }
}

impl MoveReport {
    pub fn to_json(&self) -> Value {
        json!({
            "timestamp": unix_ms(),
            "command": self.command,
            "target": pose_json(&self.target),
            "final": pose_json(&self.final_pose),
            "outcome": self.outcome.as_str(),
            "duration_ms": self.duration_ms,
            "torque_warnings": self.torque_warnings,
        })
    }

    pub fn print(&self, json: bool) {
        if json {
            println!("{}", self.to_json());
        } else {
            println!(
                "{} {}: target {} final {} in {} ms",
                self.command,
                outcome_label(self.outcome),
                self.target,
                self.final_pose,
                self.duration_ms
            );
            if self.torque_warnings > 0 {
                println!("  torque warnings: {}", self.torque_warnings);
            }
        }
    }
}

fn report(
    scanner: &mut Scanner,
    command: &'static str,
    target: Position,
    status: MoveStatus,
    started: Instant,
    warnings_before: u32,
) -> MoveReport {
    let final_pose = scanner.get_position(true, 0);
    let outcome = status.outcome().unwrap_or(MoveOutcome::Stopped);
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let torque_warnings = scanner.torque_warnings().saturating_sub(warnings_before);
    match outcome {
        MoveOutcome::Success => tracing::info!(command, %final_pose, duration_ms, "move complete"),
        other => tracing::error!(command, outcome = other.as_str(), %final_pose, "move did not complete"),
    }
    MoveReport {
        command,
        target,
        final_pose,
        outcome,
        duration_ms,
        torque_warnings,
    }
}

/// Move to `target` and block until the move ends.
pub fn run_move(
    scanner: &mut Scanner,
    command: &'static str,
    target: Position,
    trigger: bool,
    timeout_s: Option<f64>,
) -> CoreResult<MoveReport> {
    let timeout = timeout_arg(timeout_s)?;
    let started = Instant::now();
    let warnings_before = scanner.torque_warnings();
    scanner.set_next_pos(target)?;
    scanner.start_move(trigger, timeout)?;
    let status = scanner.wait_for_move(timeout);
    Ok(report(scanner, command, target, status, started, warnings_before))
}

pub fn run_home(scanner: &mut Scanner, axis: &str, timeout_s: Option<f64>) -> CoreResult<MoveReport> {
    let axis = parse_axis(axis)?;
    let timeout = timeout_arg(timeout_s)?;
    let started = Instant::now();
    let warnings_before = scanner.torque_warnings();
    let status = scanner.home_axis(axis, timeout)?;
    let target = scanner.next_pos();
    Ok(report(scanner, "home", target, status, started, warnings_before))
}

pub fn run_zero(scanner: &mut Scanner, axis: &str, json: bool) -> CoreResult<Position> {
    let axis: Axis = parse_axis(axis)?;
    scanner.set_zero_axis(axis)?;
    let pose = scanner.get_position(true, 0);
    if json {
        println!(
            "{}",
            json!({
                "timestamp": unix_ms(),
                "command": "zero",
                "axis": axis.as_str(),
                "final": pose_json(&pose),
            })
        );
    } else {
        println!("zeroed {axis}: pose {pose}");
    }
    Ok(pose)
}

/// Visit each waypoint in order. Stops at the first move that does not
/// succeed and returns every report made so far.
pub fn run_scan(
    scanner: &mut Scanner,
    waypoints: &std::path::Path,
    trigger: bool,
    json: bool,
) -> CoreResult<Vec<MoveReport>> {
    let rows = scanner_config::load_waypoints_csv(waypoints)?;
    // Validate every row before the first move so a bad file fails fast.
    let poses: Vec<Position> = rows.iter().map(|r| Position::new(r.x, r.y, r.pol)).collect();
    for (idx, p) in poses.iter().enumerate() {
        if !scanner.position_in_bounds(p) {
            return Err(Report::new(MotionError::OutOfBounds(*p))
                .wrap_err(format!("waypoint {}", idx + 1)));
        }
    }
    tracing::info!(count = poses.len(), "scan start");

    let mut reports = Vec::with_capacity(poses.len());
    for target in poses {
        let r = run_move(scanner, "scan", target, trigger, None)?;
        r.print(json);
        let done = r.outcome != MoveOutcome::Success;
        reports.push(r);
        if done {
            break;
        }
    }
    Ok(reports)
}

pub fn print_status(scanner: &mut Scanner, json: bool) -> CoreResult<()> {
    let pose = scanner.get_position(false, scanner.wait_cfg().read_retries);
    let motor = scanner.get_motor_status()?;
    let torque = scanner.get_pol_torque()?;
    let in_bounds = scanner.position_in_bounds(&pose);
    if json {
        println!(
            "{}",
            json!({
                "timestamp": unix_ms(),
                "command": "status",
                "position": pose_json(&pose),
                "in_bounds": in_bounds,
                "power": [motor.x_power, motor.y_power, motor.pol_power],
                "motion": [motor.x_motion, motor.y_motion, motor.pol_motion],
                "power_fail": motor.power_fail(),
                "in_motion": motor.in_motion(),
                "pol_torque": torque,
            })
        );
    } else {
        println!("position: {pose}{}", if in_bounds { "" } else { " (out of bounds)" });
        println!(
            "power x/y/pol: {}/{}/{}  moving x/y/pol: {}/{}/{}",
            motor.x_power,
            motor.y_power,
            motor.pol_power,
            motor.x_motion,
            motor.y_motion,
            motor.pol_motion
        );
        println!("pol torque: {torque:.3}");
    }
    Ok(())
}

/// Config summary used by `health`.
pub fn health_json(cfg: &Config, scanner: &mut Scanner) -> Value {
    let backend = match cfg.controller.backend {
        Backend::Sim => "sim",
        Backend::Dmc => "dmc",
    };
    let connected = scanner.is_connected();
    let pose = scanner.get_position(true, 0);
    json!({
        "status": if connected { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "backend": backend,
        "connected": connected,
        "position": pose_json(&pose),
        "xy_speed": scanner.motion_cfg().xy_speed,
        "pol_speed": scanner.motion_cfg().pol_speed,
        "safety_factor": scanner.motion_cfg().estimate.safety_factor,
        "poll_ms": u64::try_from(scanner.wait_cfg().poll_interval.as_millis()).unwrap_or(u64::MAX),
    })
}
