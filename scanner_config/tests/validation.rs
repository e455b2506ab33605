use rstest::rstest;
use scanner_config::{Backend, load_toml};

const BOUNDS: &str = r#"
[bounds]
x_min = 0.0
x_max = 400.0
y_min = 0.0
y_max = 300.0
pol_min = -200.0
pol_max = 180.0
"#;

fn with_bounds(extra: &str) -> String {
    format!("{BOUNDS}\n{extra}")
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = load_toml(BOUNDS).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.motion.xy_speed, 40.0);
    assert_eq!(cfg.motion.pol_speed, 10.0);
    assert_eq!(cfg.wait.poll_ms, 250);
    assert_eq!(cfg.wait.read_retries, 2);
    assert_eq!(cfg.controller.backend, Backend::Sim);
    assert_eq!(cfg.simulator.pol_init, -100.0);
    assert_eq!(cfg.stop.debounce_n, 1);
}

#[test]
fn bounds_section_is_required() {
    assert!(load_toml("[motion]\nxy_speed = 10.0\n").is_err());
}

#[rstest]
#[case("[motion]\nxy_speed = 0.0", "motion.xy_speed must be > 0")]
#[case("[motion]\npol_speed = -1.0", "motion.pol_speed must be > 0")]
#[case("[motion]\ntrigger_interval_mm = 0.0", "trigger_interval_mm must be > 0")]
#[case("[motion]\nsafety_factor = 0.5", "safety_factor must be >= 1.0")]
#[case("[motion]\nfixed_margin_s = -1.0", "fixed_margin_s must be >= 0")]
#[case("[wait]\npoll_ms = 0", "poll_ms must be in 1..=60000")]
#[case("[wait]\ntorque_limit = 0.0", "torque_limit must be > 0")]
#[case("[controller]\nbackend = \"dmc\"", "address is required")]
#[case("[controller]\nio_timeout_ms = 0", "io_timeout_ms must be >= 1")]
#[case("[simulator]\nx_init = 500.0", "start pose must lie within bounds")]
#[case("[stop]\ndebounce_n = 0", "debounce_n must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "rotation must be one of")]
fn rejects_invalid_values(#[case] extra: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_bounds(extra)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "'{msg}' does not mention '{needle}'");
}

#[test]
fn rejects_inverted_bounds() {
    let toml = r#"
[bounds]
x_min = 10.0
x_max = 0.0
y_min = 0.0
y_max = 300.0
pol_min = -200.0
pol_max = 180.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("inverted x range");
    assert!(format!("{err}").contains("bounds.x_min must be <= bounds.x_max"));
}

#[test]
fn accepts_dmc_with_address() {
    let cfg = load_toml(&with_bounds(
        "[controller]\nbackend = \"dmc\"\naddress = \"192.168.1.2:23\"\ncounts_per_mm = 2000.0",
    ))
    .expect("parse TOML");
    cfg.validate().expect("valid dmc config");
    assert_eq!(cfg.controller.counts_per_mm, 2000.0);
}

#[test]
fn unknown_backend_fails_to_parse() {
    assert!(load_toml(&with_bounds("[controller]\nbackend = \"serial\"")).is_err());
}

#[rstest]
fn shipped_sample_config_validates() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/scanner_config.toml");
    let text = std::fs::read_to_string(path).expect("sample config present");
    let cfg = scanner_config::load_toml(&text).expect("sample parses");
    cfg.validate().expect("sample validates");
    assert_eq!(cfg.wait.poll_ms, 250);
}
