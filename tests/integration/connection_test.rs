// tests/integration/connection_test.rs

//! Integration tests for `Connection`: dialing, round trips, framing and
//! transport failures.

use super::fixtures::{TEST_TABLE, bulk_inserts, create_grades, grade_row};
use super::mock_server::{Behavior, MockServer};
use super::test_helpers::{TestContext, exec_all};
use oshinodb_client::config::{ConnectionConfig, FramingMode};
use oshinodb_client::core::protocol::{Predicate, Statement};
use oshinodb_client::{ClientError, Connection};
use std::time::Duration;
use tokio::net::TcpListener;

// ===== Dial =====

#[tokio::test]
async fn test_dial_refused_is_connect_failed() {
    // Grab a free port, then release it so nothing listens there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = Connection::dial(&addr, &ConnectionConfig::default())
        .await
        .unwrap_err();
    match err {
        ClientError::ConnectFailed { addr: failed, .. } => assert_eq!(failed, addr),
        other => panic!("Expected ConnectFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dial_reports_peer_addr() {
    let ctx = TestContext::new().await;
    let conn = ctx.connect().await;
    assert_eq!(conn.peer_addr(), ctx.server.addr());
    assert!(conn.is_open());
}

// ===== Round trips =====

#[tokio::test]
async fn test_insert_then_select_round_trip() {
    let ctx = TestContext::new().await;
    let mut conn = ctx.connect().await;

    exec_all(&mut conn, &create_grades(TEST_TABLE)).await;
    exec_all(
        &mut conn,
        &[
            Statement::insert(TEST_TABLE, &grade_row(1, "alice", 71.5)).unwrap(),
            Statement::insert(TEST_TABLE, &grade_row(2, "bob", 64.0)).unwrap(),
        ],
    )
    .await;

    let response = conn
        .exec(&Statement::select_where(
            TEST_TABLE,
            &[Predicate::equals("id", 2)],
        ).unwrap())
        .await
        .unwrap();
    assert!(!response.is_truncated());

    let rs = response.result_set().expect("select should return a table");
    assert_eq!(rs.columns(), ["id", "name", "score"]);
    assert_eq!(rs.len(), 1);
    assert_eq!(rs.lookup("id", "2", "name"), Some("bob"));
    assert_eq!(rs.lookup_f64("id", "2", "score"), Some(64.0));
}

#[tokio::test]
async fn test_server_error_is_an_ordinary_response() {
    let ctx = TestContext::new().await;
    let mut conn = ctx.connect().await;

    let response = conn
        .exec(&Statement::select_where("no_such_table", &[]).unwrap())
        .await
        .unwrap();
    assert_eq!(response.text(), "failure\n");
    assert!(response.result_set().is_none());
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_statements_arrive_in_send_order() {
    let ctx = TestContext::new().await;
    let mut conn = ctx.connect().await;

    let statements = create_grades(TEST_TABLE);
    exec_all(&mut conn, &statements).await;

    let expected: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
    assert_eq!(ctx.statements(), expected);
}

// ===== Framing =====

#[tokio::test]
async fn test_unframed_response_is_truncated_at_buffer_size() {
    let ctx = TestContext::new().await;
    let mut conn = ctx.connect().await;

    exec_all(&mut conn, &create_grades(TEST_TABLE)).await;
    exec_all(&mut conn, &bulk_inserts(TEST_TABLE, 200)).await;

    let response = conn
        .exec(&Statement::select_where(TEST_TABLE, &[]).unwrap())
        .await
        .unwrap();
    assert_eq!(response.len(), 2048);
    assert!(response.is_truncated());
    let rs = response.result_set().unwrap();
    assert!(rs.len() < 200);
}

#[tokio::test]
async fn test_nul_terminated_response_is_complete() {
    let ctx = TestContext::with_options(Behavior::Isolated, FramingMode::NulTerminated).await;
    let mut conn = ctx.connect().await;

    exec_all(&mut conn, &create_grades(TEST_TABLE)).await;
    exec_all(&mut conn, &bulk_inserts(TEST_TABLE, 200)).await;

    let response = conn
        .exec(&Statement::select_where(TEST_TABLE, &[]).unwrap())
        .await
        .unwrap();
    assert!(response.len() > 2048);
    assert!(!response.is_truncated());
    let rs = response.result_set().unwrap();
    assert_eq!(rs.len(), 200);
    assert!(response.text().ends_with("Total record(s): 200\n"));

    // The connection is still aligned on response boundaries.
    let next = conn
        .exec(&Statement::select_where(
            TEST_TABLE,
            &[Predicate::equals("id", 7)],
        ).unwrap())
        .await
        .unwrap();
    assert_eq!(next.result_set().unwrap().len(), 1);
}

#[tokio::test]
async fn test_nul_terminated_response_over_limit_fails() {
    let ctx = TestContext::with_options(Behavior::Isolated, FramingMode::NulTerminated).await;
    let mut config = ctx.config.connection.clone();
    config.read_buffer_size = 256;
    config.max_response_size = 1024;
    let mut conn = Connection::dial(&ctx.addr(), &config).await.unwrap();

    exec_all(&mut conn, &create_grades(TEST_TABLE)).await;
    exec_all(&mut conn, &bulk_inserts(TEST_TABLE, 100)).await;

    let err = conn
        .exec(&Statement::select_where(TEST_TABLE, &[]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::ResponseTooLarge { limit: 1024 });
}

#[tokio::test]
async fn test_oversized_response_closes_connection() {
    let ctx = TestContext::with_options(Behavior::Isolated, FramingMode::NulTerminated).await;
    let mut config = ctx.config.connection.clone();
    config.read_buffer_size = 256;
    config.max_response_size = 1024;
    let mut conn = Connection::dial(&ctx.addr(), &config).await.unwrap();

    exec_all(&mut conn, &create_grades(TEST_TABLE)).await;
    exec_all(&mut conn, &bulk_inserts(TEST_TABLE, 100)).await;

    let err = conn
        .exec(&Statement::select_where(TEST_TABLE, &[]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::ResponseTooLarge { limit: 1024 });
    assert!(!conn.is_open());

    // Later statements are refused locally and never reach the server.
    let sent_before = ctx.statements().len();
    let small = Statement::select_where(TEST_TABLE, &[Predicate::equals("id", 1)]).unwrap();
    let err = conn.exec(&small).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidState(_)));
    let err = conn.exec(&Statement::begin()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidState(_)));
    assert_eq!(ctx.statements().len(), sent_before);
}

// ===== Transport failures =====

#[tokio::test]
async fn test_peer_close_is_reported_and_closes_connection() {
    for framing in [FramingMode::Unframed, FramingMode::NulTerminated] {
        let ctx = TestContext::with_options(Behavior::Isolated, framing).await;
        let mut conn = ctx.connect().await;

        let err = conn.exec(&Statement::raw("exit;")).await.unwrap_err();
        assert_eq!(err, ClientError::ConnectionClosed);
        assert!(!conn.is_open());

        let err = conn.exec(&Statement::begin()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
    }
}

#[tokio::test]
async fn test_io_timeout_on_silent_server() {
    let server = MockServer::start(Behavior::Isolated).await;
    let config = ConnectionConfig {
        io_timeout: Some(Duration::from_millis(100)),
        ..ConnectionConfig::default()
    };
    let mut conn = Connection::dial(&server.addr().to_string(), &config)
        .await
        .unwrap();

    let err = conn.exec(&Statement::raw("stall;")).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.is_transport());
    assert!(!conn.is_open());
}

#[tokio::test]
async fn test_close_is_clean() {
    let ctx = TestContext::new().await;
    let mut conn = ctx.connect().await;
    conn.exec(&Statement::begin()).await.unwrap();
    conn.close().await.unwrap();
}
