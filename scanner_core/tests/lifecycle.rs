use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use scanner_core::{Axis, Bounds, MoveEngine, MoveOutcome, Position, build_engine};
use scanner_hardware::SimulatedController;
use scanner_hardware::sim::{MOVE_TIME_FACTOR, SIM_START};
use scanner_traits::Clock;
use scanner_traits::clock::test_clock::TestClock;

const TARGET: Position = Position::new(245.0, 245.0, -100.0);

fn rig() -> (TestClock, MoveEngine<SimulatedController>) {
    let clock = TestClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    let sim = SimulatedController::new(shared.clone());
    let engine = build_engine(sim, Bounds::default(), None, None, Some(shared), None, None)
        .expect("engine build");
    (clock, engine)
}

fn sim_move_time(engine: &MoveEngine<SimulatedController>, to: &Position) -> Duration {
    engine
        .estimate_move_time(&SIM_START, to)
        .mul_f64(MOVE_TIME_FACTOR)
}

fn assert_near(actual: Position, expected: Position, tol: f64) {
    assert!(
        (actual.x - expected.x).abs() <= tol
            && (actual.y - expected.y).abs() <= tol
            && (actual.pol - expected.pol).abs() <= tol,
        "expected {expected} within {tol}, got {actual}"
    );
}

#[rstest]
fn reference_estimate_is_about_thirteen_and_a_half_seconds() {
    let (_clock, engine) = rig();
    let est = engine.estimate_move_time(&SIM_START, &TARGET);
    assert!((est.as_secs_f64() - 13.6).abs() < 0.05, "{est:?}");
}

#[rstest]
fn halfway_through_a_move_the_pose_is_halfway() {
    let (clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    clock.advance(sim_move_time(&engine, &TARGET) / 2);

    let status = engine.get_move_status();
    assert!(!status.should_stop(), "{status:?}");
    assert!(engine.is_moving());
    assert_near(
        engine.get_position(false, 0),
        Position::new(195.0, 195.0, -100.0),
        0.1,
    );
}

#[rstest]
fn wait_for_move_reaches_target() {
    let (_clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    let status = engine.wait_for_move(None);
    assert_eq!(status.outcome(), Some(MoveOutcome::Success));
    assert!(!engine.is_moving());
    assert_eq!(engine.get_position(true, 0), TARGET);
    assert_eq!(engine.torque_warnings(), 0);
    // terminal status stays readable until the next move
    assert!(engine.get_move_status().success);
}

#[rstest]
fn waiting_with_no_move_returns_at_once() {
    let (clock, mut engine) = rig();
    let status = engine.wait_for_move(Some(Duration::from_secs(1)));
    assert_eq!(status, scanner_core::MoveStatus::default());
    assert_eq!(clock.offset(), Duration::ZERO);
}

#[rstest]
fn waiting_again_after_a_move_repeats_its_outcome() {
    let (clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    let first = engine.wait_for_move(None);
    let waited = clock.offset();

    let again = engine.wait_for_move(None);
    assert_eq!(again, first);
    assert_eq!(again.outcome(), Some(MoveOutcome::Success));
    assert_eq!(clock.offset(), waited);
}

#[rstest]
fn stop_at_a_quarter_captures_the_stop_pose() {
    let (clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    clock.advance(sim_move_time(&engine, &TARGET) / 4);

    engine.stop_move().expect("stop");
    let captured = engine.get_position(true, 0);
    assert_near(captured, Position::new(170.0, 170.0, -100.0), 0.1);

    clock.advance(Duration::from_secs(30));
    assert_eq!(engine.get_position(false, 0), captured);

    let status = engine.get_move_status();
    assert!(status.stop_signal);
    assert!(!status.success);
    assert_eq!(status.outcome(), Some(MoveOutcome::Stopped));
}

#[rstest]
fn short_timeout_ends_in_timed_out() {
    let (_clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine
        .start_move(false, Some(Duration::from_secs(2)))
        .expect("start");
    let status = engine.wait_for_move(None);
    assert!(status.timed_out);
    assert!(status.is_error());
    assert!(!engine.is_moving());

    // the best-effort halt leaves the sim parked short of the target
    let parked = engine.get_position(false, 0);
    assert!(parked.x > SIM_START.x && parked.x < TARGET.x, "{parked}");
}

#[rstest]
fn wait_timeout_overrides_start_timeout() {
    let (_clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    let status = engine.wait_for_move(Some(Duration::from_secs(1)));
    assert_eq!(status.outcome(), Some(MoveOutcome::TimedOut));
}

#[rstest]
fn moving_to_the_current_pose_succeeds_immediately() {
    let (_clock, mut engine) = rig();
    let here = engine.get_position(false, 2);
    engine.set_next_pos(here).expect("current pose in bounds");
    engine.start_move(false, None).expect("start");
    let status = engine.get_move_status();
    assert!(status.success, "{status:?}");
    assert_eq!(engine.get_position(false, 0), here);
}

#[rstest]
fn losing_motor_power_mid_move_is_power_fail() {
    let (clock, mut engine) = rig();
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(false, None).expect("start");
    clock.advance(Duration::from_secs(2));
    engine.controller_mut().set_motor_enabled(false);

    let status = engine.wait_for_move(None);
    assert_eq!(status.outcome(), Some(MoveOutcome::PowerFail));
    assert!(status.is_error());
}

#[rstest]
#[case(Axis::Pol, Position::new(145.0, 145.0, 0.0))]
#[case(Axis::Xy, Position::new(0.0, 0.0, -100.0))]
#[case(Axis::X, Position::new(0.0, 145.0, -100.0))]
fn homing_drives_named_axes_to_zero(#[case] axis: Axis, #[case] expected: Position) {
    let (_clock, mut engine) = rig();
    let status = engine.home_axis(axis, None).expect("home");
    assert!(status.success, "{status:?}");
    assert_eq!(engine.get_position(false, 0), expected);
    assert_eq!(engine.next_pos(), expected);
}

#[rstest]
fn zeroing_redefines_the_pose_without_motion() {
    let (_clock, mut engine) = rig();
    engine.set_zero_axis(Axis::Xy).expect("zero");
    assert_eq!(engine.get_position(true, 0), Position::new(0.0, 0.0, -100.0));
    assert!(!engine.is_moving());
}

#[rstest]
fn speed_changes_only_affect_later_estimates() {
    let (_clock, mut engine) = rig();
    let before = engine.estimate_move_time(&SIM_START, &TARGET);
    engine.set_xy_speed(80.0).expect("speed");
    let after = engine.estimate_move_time(&SIM_START, &TARGET);
    assert!(after < before);
    assert_eq!(engine.motion_cfg().xy_speed, 80.0);
}

#[rstest]
fn triggered_moves_forward_the_interval() {
    let (_clock, mut engine) = rig();
    engine.set_trigger_interval(0.25).expect("interval");
    engine.set_next_pos(TARGET).expect("target in bounds");
    engine.start_move(true, None).expect("start");
    assert!(engine.controller().trigger_armed());
    assert_eq!(engine.controller().trigger_interval_mm(), 0.25);
}
