//! End-to-end CLI tests for the room-export binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn room_export() -> Command {
    let mut cmd = Command::cargo_bin("room-export").unwrap();
    cmd.env_remove("WEBEX_APIKEY")
        .env_remove("WEBEX_API_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    room_export()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--only-rooms"))
        .stdout(predicate::str::contains("--page-size"));
}

#[test]
fn test_binary_version_displays_version() {
    room_export()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("room-export"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    room_export()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_token_fails() {
    let out = TempDir::new().unwrap();
    room_export()
        .arg("--output")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("WEBEX_APIKEY"));
    assert!(!out.path().join("rooms.json").exists());
}

#[test]
fn test_binary_bad_time_bound_fails_before_network() {
    room_export()
        .env("WEBEX_APIKEY", "t")
        .env("WEBEX_API_BASE_URL", "http://127.0.0.1:9")
        .args(["--after", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid time bound"));
}

#[tokio::test]
async fn test_binary_only_rooms_writes_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/rooms"))
        .and(query_param("max", "3"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "r1", "title": "CLI Room", "type": "group" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let out_path = out.path().to_path_buf();
    let base_url = server.uri();

    tokio::task::spawn_blocking(move || {
        room_export()
            .env("WEBEX_APIKEY", "cli-token")
            .env("WEBEX_API_BASE_URL", base_url)
            .args(["--rooms", "3", "--only-rooms", "-q", "--output"])
            .arg(&out_path)
            .assert()
            .success();
    })
    .await
    .unwrap();

    let raw = std::fs::read_to_string(out.path().join("rooms.json")).unwrap();
    let rooms: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(rooms[0]["title"], "CLI Room");
}
