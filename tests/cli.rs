use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn crosscheck(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crosscheck").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("books");
    crosscheck(&home)
        .args(["init", "--data-dir", data.to_str().unwrap(), "--reviewer", "Site QS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized crosscheck"));
    crosscheck(&home)
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo data loaded!"));
    home
}

fn conflicts_json(home: &TempDir, extra: &[&str]) -> serde_json::Value {
    let mut args = vec!["conflicts", "--files", "1,2,3", "--json"];
    args.extend_from_slice(extra);
    let output = crosscheck(home).args(&args).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn missing_database_is_reported() {
    let home = tempfile::tempdir().unwrap();
    crosscheck(&home)
        .args(["conflicts", "--files", "1,2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `crosscheck init`"));
}

#[test]
fn conflicts_lists_demo_groups() {
    let home = setup();
    crosscheck(&home)
        .args(["conflicts", "--files", "1,2,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Conflict 1"))
        .stdout(predicate::str::contains("Conflict 4"))
        .stdout(predicate::str::contains("Conflict 5").not());

    let report = conflicts_json(&home, &[]);
    assert_eq!(report["total_groups"], 4);
    assert_eq!(report["groups"][1]["winner"]["source_location"], "Ledger!B12");
}

#[test]
fn single_file_is_not_enough() {
    let home = setup();
    crosscheck(&home)
        .args(["conflicts", "--files", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("at least two"));
}

#[test]
fn unknown_file_fails() {
    let home = setup();
    crosscheck(&home)
        .args(["conflicts", "--files", "1,missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.pdf"));
}

#[test]
fn select_persists_override_across_runs() {
    let home = setup();
    crosscheck(&home)
        .args(["select", "2", "2", "--files", "1,2,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page 2, line 3"));

    let report = conflicts_json(&home, &[]);
    assert_eq!(report["manual_overrides"], 1);
    assert_eq!(report["groups"][1]["resolution"], "manual");
    assert_eq!(report["groups"][1]["winner"]["source_location"], "page 2, line 3");

    let fresh = conflicts_json(&home, &["--fresh"]);
    assert_eq!(fresh["manual_overrides"], 0);
    assert_eq!(fresh["groups"][1]["winner"]["source_location"], "Ledger!B12");

    crosscheck(&home)
        .args(["select", "2", "--auto", "--files", "1,2,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("automatic"));
    let report = conflicts_json(&home, &[]);
    assert_eq!(report["manual_overrides"], 0);
}

#[test]
fn select_out_of_range_fails() {
    let home = setup();
    crosscheck(&home)
        .args(["select", "2", "9", "--files", "1,2,3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
    crosscheck(&home)
        .args(["select", "2", "-1", "--files", "1,2,3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    crosscheck(&home)
        .args(["select", "2", "-9223372036854775808", "--files", "1,2,3"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Selection -9223372036854775808 is out of range"));
    crosscheck(&home)
        .args(["select", "--files", "1,2,3", "--", "-9223372036854775808", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No conflict #-9223372036854775808"));

    let report = conflicts_json(&home, &[]);
    assert_eq!(report["manual_overrides"], 0);
}

#[test]
fn apply_then_report() {
    let home = setup();
    crosscheck(&home)
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("No resolutions applied yet."));

    crosscheck(&home)
        .args(["apply", "--files", "1,2,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 groups: 4 kept"));

    crosscheck(&home)
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("by Site QS"))
        .stdout(predicate::str::contains("4 kept, 5 discarded"));
}

#[test]
fn status_counts_demo_data() {
    let home = setup();
    crosscheck(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reviewer:   Site QS"))
        .stdout(predicate::str::contains("Source files:   3"));
}
