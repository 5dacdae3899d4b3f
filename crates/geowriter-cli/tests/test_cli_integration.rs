use assert_cmd::Command;
use predicates::prelude::*;

fn geowriter() -> Command {
    Command::cargo_bin("geowriter").unwrap()
}

#[test]
fn test_drivers_lists_catalog() {
    geowriter()
        .arg("drivers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Supported Formats"))
        .stdout(predicate::str::contains("ESRI Shapefile"))
        .stdout(predicate::str::contains("GeoJSON"))
        .stdout(predicate::str::contains("Yes"));
}

#[test]
fn test_options_for_prefix() {
    geowriter()
        .args(["options", "GeoJ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COORDINATE_PRECISION"))
        .stdout(predicate::str::contains("WRITE_BBOX"))
        .stdout(predicate::str::contains(
            "Default layer options: COORDINATE_PRECISION=15",
        ));
}

#[test]
fn test_options_unknown_format_fails() {
    geowriter()
        .args(["options", "NoSuchFormat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Format 'NoSuchFormat' not found."));
}

#[test]
fn test_filters_for_bundled_driver() {
    geowriter()
        .arg("filters")
        .assert()
        .success()
        .stdout(predicate::str::contains("GeoJSON [OGR] (*.geojson *.GEOJSON)"));
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    geowriter()
        .args(["--debug", "options", "CSV"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SEPARATOR"))
        .stderr(predicate::str::contains("Displaying options for CSV"));
}

#[test]
fn test_missing_subcommand() {
    geowriter().assert().failure();
}
