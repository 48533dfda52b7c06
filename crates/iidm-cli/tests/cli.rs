use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn iidm(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("iidm").unwrap();
    cmd.env("HOME", home);
    cmd
}

#[test]
fn versions_lists_every_version() {
    let home = tempdir().unwrap();
    iidm(home.path())
        .arg("versions")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0"))
        .stdout(predicate::str::contains("1.12 (current)"))
        .stdout(predicate::str::contains("http://www.powsybl.org/schema/iidm/equipment/1_7"));
}

#[test]
fn demo_convert_validate() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let xml = dir.path().join("grid.xiidm");
    let json = dir.path().join("grid_1_8.jiidm");

    iidm(home.path())
        .args(["demo", "--network", "tie-line-hvdc", xml.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(xml.exists());

    iidm(home.path())
        .args(["convert", xml.to_str().unwrap(), json.to_str().unwrap(), "--version", "1.8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IIDM 1.8"));
    let text = fs::read_to_string(&json).unwrap();
    assert!(text.contains("\"1.8\""));

    iidm(home.path())
        .args(["validate", xml.to_str().unwrap(), json.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn config_file_drives_export() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let config = dir.path().join("iidm.toml");
    fs::write(&config, "[export]\nversion = \"1.5\"\nanonymized = true\n").unwrap();
    let input = dir.path().join("in.xiidm");
    let output = dir.path().join("out.xiidm");

    iidm(home.path())
        .args(["demo", input.to_str().unwrap()])
        .assert()
        .success();
    iidm(home.path())
        .args(["--config", config.to_str().unwrap(), "convert"])
        .args([input.to_str().unwrap(), output.to_str().unwrap()])
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("http://www.powsybl.org/schema/iidm/1_5"));
    assert!(dir.path().join("out_mapping.csv").exists());
}

#[test]
fn invalid_document_fails() {
    let home = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken.xiidm");
    fs::write(
        &broken,
        r#"<iidm:network xmlns:iidm="http://www.powsybl.org/schema/iidm/1_12" id="n" caseDate="2024-01-15T10:30:00.000+01:00" sourceFormat="test"><iidm:substation/></iidm:network>"#,
    )
    .unwrap();
    iidm(home.path())
        .args(["validate", broken.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing attribute 'id'"));

    iidm(home.path())
        .args(["convert", "does-not-exist.xiidm", "out.xiidm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
