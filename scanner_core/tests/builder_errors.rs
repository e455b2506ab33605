use std::time::Duration;

use rstest::rstest;
use scanner_core::error::BuildError;
use scanner_core::{Bounds, MotionCfg, Scanner, WaitCfg};
use scanner_hardware::SimulatedController;

#[rstest]
fn missing_controller_yields_typed_build_error() {
    let err = Scanner::builder()
        .with_bounds(Bounds::default())
        .try_build()
        .expect_err("should fail with MissingController");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingController) => {}
        other => panic!("expected MissingController, got: {other:?}"),
    }
}

#[rstest]
fn missing_bounds_yields_typed_build_error() {
    let err = Scanner::builder()
        .with_controller(SimulatedController::default())
        .try_build()
        .expect_err("should fail with MissingBounds");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingBounds) => {}
        other => panic!("expected MissingBounds, got: {other:?}"),
    }
}

#[rstest]
#[case(Bounds { x_min: 10.0, x_max: 0.0, ..Bounds::default() }, MotionCfg::default(), WaitCfg::default(), "bounds")]
#[case(Bounds { pol_max: f64::NAN, ..Bounds::default() }, MotionCfg::default(), WaitCfg::default(), "bounds")]
#[case(Bounds::default(), MotionCfg { xy_speed: 0.0, ..MotionCfg::default() }, WaitCfg::default(), "speeds")]
#[case(Bounds::default(), MotionCfg { pol_decel: -1.0, ..MotionCfg::default() }, WaitCfg::default(), "accelerations")]
#[case(Bounds::default(), MotionCfg { trigger_interval_mm: 0.0, ..MotionCfg::default() }, WaitCfg::default(), "trigger")]
#[case(Bounds::default(), MotionCfg::default(), WaitCfg { poll_interval: Duration::ZERO, ..WaitCfg::default() }, "poll interval")]
#[case(Bounds::default(), MotionCfg::default(), WaitCfg { torque_limit: 0.0, ..WaitCfg::default() }, "torque")]
fn invalid_settings_are_rejected(
    #[case] bounds: Bounds,
    #[case] motion: MotionCfg,
    #[case] wait: WaitCfg,
    #[case] needle: &str,
) {
    let err = Scanner::builder()
        .with_controller(SimulatedController::default())
        .with_bounds(bounds)
        .with_motion(motion)
        .with_wait(wait)
        .build()
        .expect_err("invalid config");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn builds_with_reference_defaults() {
    let mut scanner = Scanner::builder()
        .with_controller(SimulatedController::default())
        .with_bounds(Bounds::default())
        .with_stop_debounce(0)
        .build()
        .expect("build");
    assert!(!scanner.is_moving());
    assert_eq!(scanner.motion_cfg().xy_speed, 40.0);
    assert_eq!(scanner.position(), scanner_core::Position::new(145.0, 145.0, -100.0));
}
