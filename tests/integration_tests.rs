//! Integration tests using mock HTTP server
//!
//! Drives the public API end to end: catalog selection → HTTP requests →
//! Singer messages on a writer → state persisted to disk.

use awin_advertiser_tap::cli::{Cli, Runner, USAGE_HINT};
use awin_advertiser_tap::{
    builtin_streams, discover, Error, FileStateSink, HttpClient, MemoryWriter, SingerWriter,
    StateManager, SyncContext, TapConfig,
};
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write target shared between the writer and the test
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn lines(&self) -> Vec<Value> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap()
}

fn config_json(base_url: &str) -> Value {
    json!({
        "oauth2_token": "secret-token",
        "start_date": "2024-01-01T00:00:00Z",
        "attribution_window": 30,
        "base_url": base_url,
        "requests_per_minute": 0,
        "max_retries": 0
    })
}

fn tap_config(base_url: &str) -> TapConfig {
    TapConfig::from_json(&config_json(base_url).to_string()).unwrap()
}

async fn mount_accounts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": 7,
            "accounts": [
                {"accountId": 1, "accountName": "Shop One", "accountType": "advertiser"},
                {"accountId": 2, "accountName": "Shop Two", "accountType": "advertiser"}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_transactions(server: &MockServer, advertiser: u64, start: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/advertisers/{advertiser}/transactions/")))
        .and(query_param("startDate", start))
        .and(query_param("endDate", "2024-02-15T23:59:59"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn run(
    server: &MockServer,
    selected: &[&str],
    state: StateManager,
    out: SharedBuf,
) -> StateManager {
    let streams = builtin_streams().unwrap();
    let catalog = discover(&streams).unwrap().with_selected(selected);
    let config = tap_config(&server.uri());
    let client = HttpClient::with_config(config.http_config()).unwrap();
    let state = state.with_sink(SingerWriter::new(out.clone()));

    let mut context = SyncContext::new(client, config, catalog, state, SingerWriter::new(out))
        .with_now(now());
    context.sync(&streams).await.unwrap();
    context.into_state()
}

fn write_cli_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, config_json(base_url).to_string()).unwrap();
    path
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_sync_emits_singer_messages_and_bookmarks() {
    let server = MockServer::start().await;
    mount_accounts(&server).await;
    mount_transactions(
        &server,
        1,
        "2024-01-16T00:00:00",
        json!([
            {"id": 11, "transactionDate": "2024-01-20T10:00:00", "commissionStatus": "approved"},
            {"id": 12, "transactionDate": "2024-02-01T08:30:00", "commissionStatus": "approved"}
        ]),
    )
    .await;
    mount_transactions(
        &server,
        2,
        "2024-01-16T00:00:00",
        json!([{"id": 21, "transactionDate": "2024-01-25T00:00:00"}]),
    )
    .await;

    let out = SharedBuf::default();
    let state = run(
        &server,
        &["accounts", "transactions"],
        StateManager::in_memory(),
        out.clone(),
    )
    .await;

    let lines = out.lines();
    let kinds: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(kinds[0], "STATE");
    assert_eq!(kinds[1], "SCHEMA");
    assert_eq!(lines[1]["stream"], "accounts");

    let records: Vec<&Value> = lines.iter().filter(|l| l["type"] == "RECORD").collect();
    let streams: Vec<&str> = records
        .iter()
        .map(|r| r["stream"].as_str().unwrap())
        .collect();
    assert_eq!(
        streams,
        vec!["accounts", "accounts", "transactions", "transactions", "transactions"]
    );
    assert_eq!(records[0]["record"]["account_id"], 1);
    assert_eq!(records[2]["record"]["advertiser_id"], 1);
    assert_eq!(records[2]["record"]["commission_status"], "approved");
    assert_eq!(records[4]["record"]["advertiser_id"], 2);

    let transaction_schemas = lines
        .iter()
        .filter(|l| l["type"] == "SCHEMA" && l["stream"] == "transactions")
        .count();
    assert_eq!(transaction_schemas, 1);

    assert_eq!(
        state.state().get_bookmark("transactions", "transaction_date(parent_advertiser_id:1)"),
        Some(&json!("2024-02-01T08:30:00.000000Z"))
    );
    assert_eq!(
        state.state().get_bookmark("transactions", "transaction_date(parent_advertiser_id:2)"),
        Some(&json!("2024-01-25T00:00:00.000000Z"))
    );
    assert_eq!(state.currently_syncing(), None);

    let last = lines.last().unwrap();
    assert_eq!(last["type"], "STATE");
    assert_eq!(last["value"]["currently_syncing"], Value::Null);
}

#[tokio::test]
async fn test_state_file_resumes_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let first = MockServer::start().await;
    mount_accounts(&first).await;
    mount_transactions(
        &first,
        1,
        "2024-01-16T00:00:00",
        json!([{"id": 11, "transactionDate": "2024-02-10T00:00:00"}]),
    )
    .await;
    mount_transactions(&first, 2, "2024-01-16T00:00:00", json!([])).await;

    run(
        &first,
        &["transactions"],
        StateManager::in_memory().with_sink(FileStateSink::new(&state_path)),
        SharedBuf::default(),
    )
    .await;

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(
        saved["bookmarks"]["transactions"]["transaction_date(parent_advertiser_id:1)"],
        "2024-02-10T00:00:00.000000Z"
    );
    assert_eq!(
        saved["bookmarks"]["transactions"]["transaction_date(parent_advertiser_id:2)"],
        "2024-01-01T00:00:00.000000Z"
    );

    // Advertiser 1 resumes from its bookmark; advertiser 2 never had data,
    // so the attribution cutoff applies.
    let second = MockServer::start().await;
    mount_accounts(&second).await;
    mount_transactions(&second, 1, "2024-02-10T00:00:00", json!([])).await;
    mount_transactions(&second, 2, "2024-01-16T00:00:00", json!([])).await;

    let out = SharedBuf::default();
    run(
        &second,
        &["transactions"],
        StateManager::from_file(&state_path).unwrap(),
        out.clone(),
    )
    .await;

    assert!(out.lines().iter().all(|l| l["type"] != "RECORD"));
}

// ============================================================================
// Runner
// ============================================================================

#[tokio::test]
async fn test_runner_requires_a_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_cli_config(dir.path(), "https://api.awin.com");
    let cli = Cli::try_parse_from(["awin-advertiser-tap", "-c", config.to_str().unwrap()]).unwrap();

    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains(USAGE_HINT));
}

#[tokio::test]
async fn test_runner_rejects_config_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"start_date": "2024-01-01"}"#).unwrap();
    let cli = Cli::try_parse_from(["awin-advertiser-tap", "-c", path.to_str().unwrap(), "-d"])
        .unwrap();

    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(err.to_string().contains("oauth2_token"));
}

#[test]
fn test_runner_prefers_inline_state() {
    let cli = Cli::try_parse_from([
        "awin-advertiser-tap",
        "-c",
        "config.json",
        "--state-json",
        r#"{"bookmarks": {}, "currently_syncing": "accounts"}"#,
    ])
    .unwrap();

    let state = Runner::new(cli).load_state().unwrap();
    assert_eq!(state.currently_syncing(), Some("accounts"));
}

#[test]
fn test_runner_reports_unreadable_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();
    let cli = Cli::try_parse_from([
        "awin-advertiser-tap",
        "-c",
        "config.json",
        "-s",
        path.to_str().unwrap(),
    ])
    .unwrap();

    let err = Runner::new(cli).load_state().unwrap_err();
    assert!(err.to_string().starts_with("Failed to load state"));
}

#[tokio::test]
async fn test_runner_sync_writes_state_output() {
    let server = MockServer::start().await;
    mount_accounts(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_cli_config(dir.path(), &server.uri());
    let state_output = dir.path().join("out").join("state.json");
    let cli = Cli::try_parse_from([
        "awin-advertiser-tap",
        "-c",
        config.to_str().unwrap(),
        "--state-output",
        state_output.to_str().unwrap(),
    ])
    .unwrap();
    let runner = Runner::new(cli);

    let streams = builtin_streams().unwrap();
    let catalog = discover(&streams).unwrap().with_selected(&["accounts"]);
    let writer = MemoryWriter::new();
    let stats = runner
        .sync_with(
            tap_config(&server.uri()),
            &streams,
            catalog,
            runner.load_state().unwrap(),
            writer.clone(),
        )
        .await
        .unwrap();

    assert_eq!(stats.records_for("accounts"), 2);
    assert_eq!(stats.requests, 1);
    assert_eq!(writer.records("accounts").len(), 2);

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(&state_output).unwrap()).unwrap();
    assert_eq!(saved, json!({"bookmarks": {}}));
}
