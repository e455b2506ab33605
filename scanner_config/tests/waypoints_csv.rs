use std::fs::File;
use std::io::Write;

use rstest::rstest;
use scanner_config::{WaypointRow, load_waypoints_csv};
use tempfile::tempdir;

fn write_csv(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("waypoints.csv");
    let mut f = File::create(&path).expect("create");
    f.write_all(body.as_bytes()).expect("write");
    (dir, path)
}

#[rstest]
fn loads_rows_in_order() {
    let (_dir, path) = write_csv("x,y,pol\n10.0,20.0,0.0\n 15.5 , 20.0 , -45.0\n");
    let rows = load_waypoints_csv(&path).expect("load");
    assert_eq!(
        rows,
        vec![
            WaypointRow {
                x: 10.0,
                y: 20.0,
                pol: 0.0
            },
            WaypointRow {
                x: 15.5,
                y: 20.0,
                pol: -45.0
            },
        ]
    );
}

#[rstest]
#[case("x,y\n1,2\n", "headers 'x,y,pol'")]
#[case("pol,x,y\n1,2,3\n", "headers 'x,y,pol'")]
#[case("x,y,pol\n1,2,3\n4,oops,6\n", "invalid CSV row 3")]
#[case("x,y,pol\n1,2,NaN\n", "invalid CSV row 2: values must be finite")]
#[case("x,y,pol\n", "has no rows")]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(body);
    let err = load_waypoints_csv(&path).expect_err("should fail");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "'{msg}' does not mention '{needle}'");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempdir().expect("tempdir");
    let err = load_waypoints_csv(&dir.path().join("nope.csv")).expect_err("missing");
    assert!(format!("{err}").contains("open waypoint CSV"));
}
