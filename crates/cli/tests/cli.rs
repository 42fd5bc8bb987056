// ABOUTME: Integration tests for the vlr-cli binary against a mock site.
// ABOUTME: Tests listing crawls, match scraping to files, the events sink, and failure exits.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const MATCH_PATH: &str = "/4021/sentinels-vs-fnatic-champions-tour-2026-upper-final";

fn vlr_cmd() -> Command {
    let mut cmd = Command::cargo_bin("vlr-cli").unwrap();
    cmd.env_remove("TB_API_TOKEN").env("RUST_LOG", "warn");
    cmd
}

fn fixture(name: &str) -> String {
    let path = format!(
        "{}/../scrape/tests/fixtures/html/{}.html",
        env!("CARGO_MANIFEST_DIR"),
        name
    );
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {}", path, e))
}

fn mock_listing(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/matches/results/")
            .query_param("page", "1");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(fixture("results_page"));
    })
}

#[test]
fn results_prints_window_summaries() {
    let server = MockServer::start();
    let listing = mock_listing(&server);

    let output = vlr_cmd()
        .args(["results", "--end", "2026-10-18", "--utc-offset", "+00:00"])
        .arg("--base-url")
        .arg(server.base_url())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    listing.assert();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2, "got {}", stdout);
    assert_eq!(lines[0]["link"], MATCH_PATH);
    assert_eq!(lines[0]["start_timestamp"], "2026-10-17T10:00:00+00:00");
    assert_eq!(lines[1]["player_stats"], false);
}

#[test]
fn matches_writes_datasource_files() {
    let server = MockServer::start();
    let listing = mock_listing(&server);
    let detail = server.mock(|when, then| {
        when.method(GET).path(MATCH_PATH);
        then.status(200).body(fixture("match_4021"));
    });
    let temp_dir = TempDir::new().unwrap();

    vlr_cmd()
        .args(["matches", "--end", "2026-10-18", "--utc-offset", "+00:00"])
        .arg("--base-url")
        .arg(server.base_url())
        .arg("--output-dir")
        .arg(temp_dir.path())
        .assert()
        .success();

    listing.assert();
    // 4020 has no player stats and is never fetched
    detail.assert_hits(1);

    let teams = fs::read_to_string(temp_dir.path().join("valorant_match_team_results.ndjson")).unwrap();
    let players =
        fs::read_to_string(temp_dir.path().join("valorant_match_player_results.ndjson")).unwrap();
    assert_eq!(teams.lines().count(), 2);
    assert_eq!(players.lines().count(), 4);
    assert!(teams.contains("\"team_name\":\"Sentinels\""));
    assert!(!temp_dir.path().join("valorant_results.ndjson").exists());
}

#[test]
fn match_posts_to_events_api() {
    let server = MockServer::start();
    let detail = server.mock(|when, then| {
        when.method(GET).path(MATCH_PATH);
        then.status(200).body(fixture("match_4021"));
    });
    let teams = server.mock(|when, then| {
        when.method(POST)
            .path("/v0/events")
            .query_param("name", "valorant_match_team_results")
            .query_param("wait", "true")
            .header("authorization", "Bearer s3cret");
        then.status(202).body("{}");
    });
    let players = server.mock(|when, then| {
        when.method(POST)
            .path("/v0/events")
            .query_param("name", "valorant_match_player_results")
            .header("authorization", "Bearer s3cret");
        then.status(202).body("{}");
    });

    vlr_cmd()
        .args(["match", "4021", "sentinels-vs-fnatic-champions-tour-2026-upper-final"])
        .arg("--base-url")
        .arg(server.base_url())
        .arg("--events-url")
        .arg(server.url("/v0/events"))
        .env("TB_API_TOKEN", "s3cret")
        .assert()
        .success();

    detail.assert();
    teams.assert();
    players.assert();
}

#[test]
fn events_url_without_token_fails() {
    vlr_cmd()
        .args(["match", "1", "a-vs-b", "--events-url", "http://127.0.0.1:9/v0/events"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TB_API_TOKEN"));
}

#[test]
fn listing_server_error_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/matches/results/");
        then.status(503);
    });

    vlr_cmd()
        .args(["results", "--end", "2026-10-18"])
        .arg("--base-url")
        .arg(server.base_url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("listing page 1"));
}

#[test]
fn bad_offset_is_rejected() {
    vlr_cmd()
        .args(["results", "--utc-offset", "later"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid UTC offset"));
}
