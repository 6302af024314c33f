//! Integration tests for the `truckwatch` CLI binary.
//!
//! Argument parsing, help output, completions, and the preference-backed
//! commands run against a throwaway home directory. `list` runs against a
//! local mock feed.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `truckwatch` binary with env isolation.
///
/// Clears all `TRUCKWATCH_*` env vars and points config and data
/// directories at `home` so tests never touch real preferences.
fn tw_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("truckwatch");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("TRUCKWATCH_CONFIG")
        .env_remove("TRUCKWATCH_FEED_URL")
        .env_remove("TRUCKWATCH_OUTPUT")
        .env_remove("TRUCKWATCH_INSECURE")
        .env_remove("TRUCKWATCH_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("garbage-truck telemetry feed")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("settings")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("truckwatch"));
}

#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home).arg("nonexistent").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("truckwatch"));
}

#[test]
fn test_lat_requires_lng() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["list", "--lat", "22.6"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Settings ────────────────────────────────────────────────────────

#[test]
fn test_settings_show_defaults() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["settings", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["poll_interval_ms"], 30_000);
    assert_eq!(json["search_radius_m"], 500);
    assert_eq!(json["alert_radius_m"], 500);
    assert_eq!(json["muted"], false);
}

#[test]
fn test_settings_set_persists() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home)
        .args(["settings", "set", "search-radius", "2000"])
        .assert()
        .success();

    let output = tw_cmd(&home)
        .args(["settings", "show", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["search_radius_m"], 2000);
}

#[test]
fn test_settings_illegal_value_rejected() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["settings", "set", "poll-interval", "7"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("poll-interval"));

    let output = tw_cmd(&home)
        .args(["settings", "show", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["poll_interval_ms"], 30_000);
}

#[test]
fn test_settings_unknown_name() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["settings", "set", "volume", "11"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown setting"));
}

#[test]
fn test_settings_options_plain() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home)
        .args(["settings", "options", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("poll-interval")
                .and(predicate::str::contains("alert-radius"))
                .and(predicate::str::contains("muted")),
        );
}

// ── Watch list ──────────────────────────────────────────────────────

#[test]
fn test_watch_add_list_remove() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home)
        .args(["watch", "add", " kea-1234 "])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Truck KEA-1234 manually added to watch list!",
        ));

    let output = tw_cmd(&home)
        .args(["watch", "list", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output), serde_json::json!(["KEA-1234"]));

    tw_cmd(&home)
        .args(["watch", "remove", "KEA-1234"])
        .assert()
        .success()
        .stderr(predicate::str::contains("removed from watch list"));

    let output = tw_cmd(&home)
        .args(["watch", "list", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}

#[test]
fn test_watch_add_duplicate_conflicts() {
    let home = TempDir::new().unwrap();
    tw_cmd(&home).args(["watch", "add", "ABC-1"]).assert().success();

    let output = tw_cmd(&home)
        .args(["watch", "add", "abc-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn test_watch_remove_unknown_not_found() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["watch", "remove", "NOPE-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_json() {
    let home = TempDir::new().unwrap();
    let output = tw_cmd(&home)
        .args(["config", "path", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["config_exists"], false);
    assert!(json["preferences"].as_str().unwrap().ends_with(".json"));
}

#[test]
fn test_config_flag_is_honored() {
    let home = TempDir::new().unwrap();
    let cfg = home.path().join("custom.toml");
    std::fs::write(&cfg, "[feed]\nurl = \"http://feed.invalid/trucks\"\n").unwrap();

    tw_cmd(&home)
        .args(["config", "show", "-o", "plain", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("http://feed.invalid/trucks"));
}

// ── Listing against a mock feed ─────────────────────────────────────

async fn mock_feed() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trucks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": [
                { "car": "kea-12", "x": 120.3016, "y": 22.6274, "location": "Zhongshan Rd" },
                { "car": "far-7", "x": 121.5, "y": 25.0 },
                { "x": 120.3, "y": 22.6 }
            ]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_filters_by_radius() {
    let server = mock_feed().await;
    let home = TempDir::new().unwrap();

    let output = tw_cmd(&home)
        .args(["list", "-o", "json", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--feed-url", &format!("{}/trucks", server.uri())])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json = stdout_json(&output);
    let plates: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["plateNumber"].as_str().unwrap())
        .collect();
    assert_eq!(plates, vec!["KEA-12"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("KEA-12"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_includes_watched_offline_truck() {
    let server = mock_feed().await;
    let home = TempDir::new().unwrap();
    tw_cmd(&home).args(["watch", "add", "GONE-1"]).assert().success();

    let output = tw_cmd(&home)
        .args(["list", "-o", "json", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--feed-url", &format!("{}/trucks", server.uri())])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json = stdout_json(&output);
    let trucks = json.as_array().unwrap();
    assert_eq!(trucks.len(), 2);
    assert_eq!(trucks[0]["plateNumber"], "GONE-1");
    assert_eq!(trucks[0]["status"], "Offline");
    assert_eq!(trucks[0]["isWatched"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_feed_error_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let output = tw_cmd(&home)
        .args(["list", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--feed-url", &server.uri()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_select_offline_truck_notice() {
    let server = mock_feed().await;
    let home = TempDir::new().unwrap();
    tw_cmd(&home).args(["watch", "add", "GONE-1"]).assert().success();

    let output = tw_cmd(&home)
        .args(["list", "-o", "json", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--select", "gone-1"])
        .args(["--feed-url", &format!("{}/trucks", server.uri())])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("Truck GONE-1 is offline and cannot be selected on map.")
    );
    let json = stdout_json(&output);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["status"], "Offline");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_select_online_and_missing() {
    let server = mock_feed().await;
    let home = TempDir::new().unwrap();
    let feed_url = format!("{}/trucks", server.uri());

    let output = tw_cmd(&home)
        .args(["list", "-o", "plain", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--select", "kea-12", "--feed-url", &feed_url])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "KEA-12");

    // Out of range trucks are not in the list, so they cannot be selected.
    let output = tw_cmd(&home)
        .args(["list", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--select", "FAR-7", "--feed-url", &feed_url])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_reads_commands_from_stdin() {
    let server = mock_feed().await;
    let home = TempDir::new().unwrap();

    let output = tw_cmd(&home)
        .args(["run", "--lat", "22.6273", "--lng", "120.3014"])
        .args(["--feed-url", &format!("{}/trucks", server.uri())])
        .write_stdin("help\nadd abc-9\nquit\n")
        .timeout(std::time::Duration::from_secs(20))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("select <plate>"));
    assert!(stderr.contains("Truck ABC-9 manually added to watch list!"));

    let output = tw_cmd(&home)
        .args(["watch", "list", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output), serde_json::json!(["ABC-9"]));
}
