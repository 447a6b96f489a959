use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sqlrun_console::{Console, EditorState, Reply, SubmitRejected};
use sqlrun_core::Settings;
use tempfile::TempDir;

fn settings(server: &MockServer, dir: &TempDir) -> Settings {
    Settings {
        base_url: server.base_url(),
        timeout: Duration::from_secs(5),
        storage_dir: dir.path().to_path_buf(),
        environment: "test".to_string(),
        min_level: "DEBUG".to_string(),
        user_agent: "sqlrun-tests".to_string(),
    }
}

async fn mock_tables(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tables");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "tables": ["users", "orders"]}));
        })
        .await;
}

fn output(reply: Reply) -> String {
    match reply {
        Reply::Output(text) => text,
        other => panic!("expected output, got {other:?}"),
    }
}

#[tokio::test]
async fn startup_aborts_when_tables_cannot_be_listed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tables");
            then.status(500).body("database is locked");
        })
        .await;
    let dir = TempDir::new().unwrap();

    let err = Console::start(&settings(&server, &dir)).await.unwrap_err();
    assert!(format!("{err:#}").contains("loading tables"), "{err:#}");
}

#[tokio::test]
async fn successful_queries_enter_history_and_failures_do_not() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/query")
                .json_body(json!({"query": "SELECT * FROM users"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "rowcount": 1, "data": [{"id": 1, "name": "Ada"}]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/query")
                .json_body(json!({"query": "SELECT * FROM nope"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "error": "no such table: nope"}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let mut console = Console::start(&settings(&server, &dir)).await.unwrap();
    assert_eq!(console.tables(), ["users", "orders"]);

    let ok = output(console.handle("SELECT * FROM users").await);
    assert!(ok.contains("Ada"), "{ok}");
    assert_eq!(console.editor().state(), EditorState::Idle);

    let failed = output(console.handle("SELECT * FROM nope").await);
    assert_eq!(failed, "Error: no such table: nope");

    let history = console.history().get_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query, "SELECT * FROM users");

    let listed = output(console.handle("\\history").await);
    assert!(listed.starts_with(" 1. ["), "{listed}");

    let rerun = output(console.handle("\\rerun 1").await);
    assert!(rerun.starts_with("SELECT * FROM users\n"), "{rerun}");
    assert!(output(console.handle("\\rerun 5").await).starts_with("Error: no history entry 5"));

    assert_eq!(output(console.handle("\\history clear").await), "History cleared");
    assert!(console.history().get_history().is_empty());
}

#[tokio::test]
async fn history_survives_a_restart() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/query");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "rowcount": 1}));
        })
        .await;
    let dir = TempDir::new().unwrap();

    {
        let mut console = Console::start(&settings(&server, &dir)).await.unwrap();
        for n in 1..=8 {
            let out = output(console.handle(&format!("INSERT INTO t VALUES ({n})")).await);
            assert!(out.contains("Row inserted successfully"), "{out}");
        }
    }

    let console = Console::start(&settings(&server, &dir)).await.unwrap();
    let history = console.history().get_history();
    assert_eq!(history.len(), 7);
    assert_eq!(history[0].query, "INSERT INTO t VALUES (8)");
    assert!(history.iter().all(|e| e.query != "INSERT INTO t VALUES (1)"));
}

#[tokio::test]
async fn second_submit_while_running_is_rejected() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    let query_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/query");
            then.status(200)
                .delay(Duration::from_millis(300))
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "data": [], "rowcount": 0}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let console = Console::start(&settings(&server, &dir)).await.unwrap();
    let editor = console.editor();

    let (first, second) = tokio::join!(editor.submit("SELECT 1"), editor.submit("SELECT 2"));
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), SubmitRejected::Busy);
    query_mock.assert_hits_async(1).await;
    assert!(matches!(editor.state(), EditorState::Succeeded { .. }));
    assert_eq!(console.history().get_history().len(), 1);
}

#[tokio::test]
async fn abandoned_submit_does_not_lock_the_editor() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/query")
                .json_body(json!({"query": "SELECT 1"}));
            then.status(200)
                .delay(Duration::from_millis(300))
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "data": [], "rowcount": 0}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/query")
                .json_body(json!({"query": "SELECT 2"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "data": [], "rowcount": 0}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let console = Console::start(&settings(&server, &dir)).await.unwrap();
    let editor = console.editor();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), editor.submit("SELECT 1")).await;
    assert!(abandoned.is_err());
    assert_eq!(editor.state(), EditorState::Idle);

    let run = editor.submit("SELECT 2").await.unwrap();
    assert!(run.response.success);
    assert!(matches!(editor.state(), EditorState::Succeeded { .. }));
    let history: Vec<_> = console
        .history()
        .get_history()
        .into_iter()
        .map(|e| e.query)
        .collect();
    assert_eq!(history, ["SELECT 2"]);
}

#[tokio::test]
async fn blank_submission_stays_idle_and_skips_the_network() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    let query_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/query");
            then.status(200);
        })
        .await;
    let dir = TempDir::new().unwrap();
    let console = Console::start(&settings(&server, &dir)).await.unwrap();

    let run = console.editor().submit("   ").await.unwrap();
    assert!(!run.response.success);
    assert_eq!(console.editor().state(), EditorState::Idle);
    assert_eq!(query_mock.hits_async().await, 0);
}

#[tokio::test]
async fn describe_health_and_log_commands() {
    let server = MockServer::start_async().await;
    mock_tables(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tables/users");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "columns": [{"name": "id", "type": "INTEGER"}],
                    "sample_data": [{"id": 7}]
                }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"message": "SQL Runner API", "status": "healthy"}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let mut console = Console::start(&settings(&server, &dir)).await.unwrap();

    let described = output(console.handle("\\describe users").await);
    assert!(described.starts_with("Table users"), "{described}");
    assert!(described.contains("INTEGER"));

    assert_eq!(
        output(console.handle("\\health").await),
        "healthy (SQL Runner API)"
    );

    let log = output(console.handle("\\log").await);
    assert!(log.contains("API Success"), "{log}");
    assert!(log.contains("[USER_INTERACTION]"), "{log}");

    assert_eq!(console.handle("   ").await, Reply::Silent);
    assert_eq!(console.handle("\\q").await, Reply::Quit);
}
