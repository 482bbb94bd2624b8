//! Integration tests for the SQL bridge.

#![allow(clippy::expect_used)]

use futures_util::future::join_all;
use serde_json::{Value, json};
use sql_bridge::{BackendConfig, INIT_ACK, SqlBridge};
use tempfile::TempDir;

/// Helper to create an initialized bridge over transient storage.
async fn transient_bridge() -> SqlBridge {
    let bridge = SqlBridge::connect(BackendConfig::transient()).expect("connect failed");
    bridge.init().await.expect("init failed");
    bridge
}

#[tokio::test]
async fn test_init_acknowledgement() {
    let bridge = SqlBridge::connect(BackendConfig::transient()).expect("connect failed");
    let ack = bridge.init().await.expect("init failed");
    assert_eq!(ack, INIT_ACK);
}

#[tokio::test]
async fn test_round_trip_returns_exactly_one_row() {
    let bridge = transient_bridge().await;

    bridge
        .execute_sql("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)")
        .await
        .expect("create failed");
    bridge
        .execute_sql("INSERT INTO t(v) VALUES ('x')")
        .await
        .expect("insert failed");

    let rows = bridge
        .execute_sql("SELECT * FROM t")
        .await
        .expect("select failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(Value::Object(rows[0].clone()), json!({"id": 1, "v": "x"}));

    // Every reply settled its pending entry.
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_non_query_statements_yield_zero_rows() {
    let bridge = transient_bridge().await;
    let rows = bridge
        .execute_sql("CREATE TABLE t(id INTEGER)")
        .await
        .expect("create failed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_exec_before_init_is_rejected() {
    let bridge = SqlBridge::connect(BackendConfig::transient()).expect("connect failed");
    let err = bridge
        .execute_sql("SELECT 1")
        .await
        .expect_err("exec without init should fail");
    assert_eq!(err.to_string(), "SQLite not initialized");
}

#[tokio::test]
async fn test_double_init_is_rejected_without_breaking_the_bridge() {
    let bridge = transient_bridge().await;

    let err = bridge.init().await.expect_err("second init should fail");
    assert_eq!(err.to_string(), "already initialized");

    // The executor is still ready.
    bridge
        .execute_sql("SELECT 1")
        .await
        .expect("exec after rejected init failed");
}

#[tokio::test]
async fn test_statement_error_rejects_only_its_own_call() {
    let bridge = transient_bridge().await;

    let err = bridge
        .execute_sql("SELEC * FROM t")
        .await
        .expect_err("malformed SQL should fail");
    assert!(!err.to_string().is_empty());

    // A subsequent valid statement on the same executor still succeeds.
    let rows = bridge
        .execute_sql("SELECT 1 AS one")
        .await
        .expect("valid exec after error failed");
    assert_eq!(rows[0].get("one"), Some(&json!(1)));
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_settle_by_id() {
    let bridge = transient_bridge().await;

    // Issue a batch of independent requests at once; completions carry no
    // ordering guarantee, but each reply must settle its own caller.
    let calls = (0..16).map(|i| {
        let bridge = &bridge;
        async move {
            let sql = format!("SELECT {i} AS n");
            bridge.execute_sql(&sql).await
        }
    });

    let results = join_all(calls).await;
    for (i, result) in results.into_iter().enumerate() {
        let rows = result.expect("concurrent exec failed");
        assert_eq!(rows[0].get("n"), Some(&json!(i)));
    }
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_fallback_law() {
    let temp = TempDir::new().expect("tempdir failed");
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"x").expect("write blocker failed");

    // The durable mount fails (a file occupies the parent path), yet init
    // succeeds and statements run against transient storage.
    let config = BackendConfig::durable(blocker.join("store"));
    let bridge = SqlBridge::connect(config).expect("connect failed");
    bridge.init().await.expect("init should fall back, not fail");

    bridge
        .execute_sql("CREATE TABLE t(v TEXT)")
        .await
        .expect("create on transient fallback failed");
    bridge
        .execute_sql("INSERT INTO t(v) VALUES ('y')")
        .await
        .expect("insert on transient fallback failed");
    let rows = bridge
        .execute_sql("SELECT v FROM t")
        .await
        .expect("select on transient fallback failed");
    assert_eq!(rows[0].get("v"), Some(&json!("y")));
}

#[tokio::test]
async fn test_durable_storage_survives_shutdown() {
    let temp = TempDir::new().expect("tempdir failed");
    let config = BackendConfig::durable(temp.path());

    let bridge = SqlBridge::connect(config.clone()).expect("connect failed");
    bridge.init().await.expect("init failed");
    bridge
        .execute_sql("CREATE TABLE t(v TEXT)")
        .await
        .expect("create failed");
    bridge
        .execute_sql("INSERT INTO t(v) VALUES ('kept')")
        .await
        .expect("insert failed");
    // Joins the executor thread, so the handle is closed before reopening.
    bridge.shutdown();

    let bridge = SqlBridge::connect(config).expect("reconnect failed");
    bridge.init().await.expect("re-init failed");
    let rows = bridge
        .execute_sql("SELECT v FROM t")
        .await
        .expect("select after reopen failed");
    assert_eq!(rows[0].get("v"), Some(&json!("kept")));
}

#[tokio::test]
async fn test_transient_storage_does_not_survive_shutdown() {
    let bridge = transient_bridge().await;
    bridge
        .execute_sql("CREATE TABLE t(v TEXT)")
        .await
        .expect("create failed");
    bridge.shutdown();

    let bridge = transient_bridge().await;
    let err = bridge
        .execute_sql("SELECT v FROM t")
        .await
        .expect_err("table should not survive a transient executor");
    assert!(err.to_string().contains("no such table"));
}
