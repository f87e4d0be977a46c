#![allow(deprecated)]
use assert_cmd::Command;
use preingest_core::config::ServiceEndpoint;
use preingest_core::Settings;
use predicates::prelude::*;
use tempfile::TempDir;

const DIGEST: &str = "9e107d9d372bb6826bd81d3542a419d6";

fn preingest(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("preingest").unwrap();
    cmd.current_dir(dir.path())
        .env("PREINGEST_CONFIG", dir.path().join("preingest.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

/// Write settings with the data folder inside `dir` and the utilities service
/// at `utilities_port`, plus one collection `archief.tar`.
fn init(dir: &TempDir, utilities_port: u16) {
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("archief.tar"), b"container bytes").unwrap();

    let mut settings = Settings::new(&data);
    settings.services.utilities = ServiceEndpoint::new("127.0.0.1", utilities_port);
    settings.save(&dir.path().join("preingest.yaml")).unwrap();
}

fn fixity_service(digest: &str) -> (mockito::ServerGuard, mockito::Mock) {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", mockito::Matcher::Regex(r"^/fixity/md5/.+$".into()))
        .with_status(200)
        .with_body(digest)
        .create();
    (server, mock)
}

// ---------------------------------------------------------------------------
// preingest config
// ---------------------------------------------------------------------------

#[test]
fn config_shows_settings_and_validates() {
    let dir = TempDir::new().unwrap();
    init(&dir, 8004);

    preingest(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("data_folder"))
        .stdout(predicate::str::contains("preingest.db"));
}

#[test]
fn config_fails_on_missing_data_folder() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::new(dir.path().join("does-not-exist"));
    settings.save(&dir.path().join("preingest.yaml")).unwrap();

    preingest(&dir)
        .arg("config")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("settings validation found errors"));
}

#[test]
fn serve_refuses_invalid_settings() {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::new(dir.path().join("does-not-exist"));
    settings.services.utilities = ServiceEndpoint::new("127.0.0.1", 8004);
    settings.save(&dir.path().join("preingest.yaml")).unwrap();

    preingest(&dir)
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid settings"))
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn missing_settings_file_is_reported() {
    let dir = TempDir::new().unwrap();
    preingest(&dir)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings file not found"));
}

#[test]
fn config_flag_overrides_environment() {
    let dir = TempDir::new().unwrap();
    init(&dir, 8004);
    std::fs::rename(
        dir.path().join("preingest.yaml"),
        dir.path().join("other.yaml"),
    )
    .unwrap();

    preingest(&dir)
        .args(["--config", "other.yaml", "config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"warnings\""));
}

// ---------------------------------------------------------------------------
// preingest checksum
// ---------------------------------------------------------------------------

#[test]
fn checksum_reports_success_and_records_action() {
    let dir = TempDir::new().unwrap();
    let (server, mock) = fixity_service(DIGEST);
    init(&dir, server.socket_address().port());

    preingest(&dir)
        .args(["checksum", "archief.tar", "--algorithm", "md5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Started]"))
        .stdout(predicate::str::contains("[Completed]"))
        .stdout(predicate::str::contains("Result:   Success"))
        .stdout(predicate::str::contains(DIGEST));
    mock.assert();

    let output = preingest(&dir)
        .args(["actions", "archief.tar", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "ContainerChecksumHandler");
    assert_eq!(records[0]["action_status"], "Success");
}

#[test]
fn checksum_mismatch_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let (server, _mock) = fixity_service(DIGEST);
    init(&dir, server.socket_address().port());

    preingest(&dir)
        .args(["checksum", "archief.tar", "-a", "MD5", "--expected", "0000"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!("0000 ≠ {DIGEST}")))
        .stderr(predicate::str::contains("does not match"));
}

#[test]
fn checksum_json_prints_payload() {
    let dir = TempDir::new().unwrap();
    let (server, _mock) = fixity_service(DIGEST);
    init(&dir, server.socket_address().port());

    let output = preingest(&dir)
        .args(["checksum", "archief.tar", "-a", "md5", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["result"], "Success");
    assert_eq!(payload["action_data"][1], DIGEST);
    assert_eq!(
        payload["properties"]["result_files"][0],
        "ContainerChecksumHandler.json"
    );
}

#[test]
fn checksum_unknown_algorithm_fails_without_calling_service() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create();
    init(&dir, server.socket_address().port());

    preingest(&dir)
        .args(["checksum", "archief.tar", "--algorithm", "CRC32"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Checksum CRC32 not defined"))
        .stdout(predicate::str::contains("[Failed]"));
    mock.assert();
}

#[test]
fn checksum_missing_collection_is_an_error() {
    let dir = TempDir::new().unwrap();
    init(&dir, 8004);

    preingest(&dir)
        .args(["checksum", "missing.tar", "--algorithm", "md5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("collection not found: missing.tar"));
}

// ---------------------------------------------------------------------------
// preingest actions
// ---------------------------------------------------------------------------

#[test]
fn actions_for_unknown_session_is_empty() {
    let dir = TempDir::new().unwrap();
    init(&dir, 8004);

    preingest(&dir)
        .args(["actions", "never-triggered.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No actions recorded"));
}

#[test]
fn actions_table_lists_runs() {
    let dir = TempDir::new().unwrap();
    let (server, _mock) = fixity_service(DIGEST);
    init(&dir, server.socket_address().port());

    for _ in 0..2 {
        preingest(&dir)
            .args(["checksum", "archief.tar", "-a", "md5"])
            .assert()
            .success();
    }

    preingest(&dir)
        .args(["actions", "archief.tar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PROCESS ID"))
        .stdout(predicate::str::contains("ContainerChecksumHandler").count(2))
        .stdout(predicate::str::contains("1/1/0").count(2));
}
