// tests/integration/session_test.rs

//! Integration tests for inferred transaction state on `Session`.

use super::test_helpers::TestContext;
use oshinodb_client::core::protocol::Statement;
use oshinodb_client::{ClientError, TxnState};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_new_session_has_no_transaction() {
    let ctx = TestContext::new().await;
    let session = ctx.session("A").await;
    assert_eq!(session.name(), "A");
    assert_eq!(session.state(), TxnState::NoTransaction);
}

#[tokio::test]
async fn test_begin_commit_transitions() {
    let ctx = TestContext::new().await;
    let mut session = ctx.session("A").await;

    assert_ok!(session.begin().await);
    assert_eq!(session.state(), TxnState::InTransaction);

    assert_ok!(session.commit().await);
    assert_eq!(session.state(), TxnState::Committed);

    session.begin().await.unwrap();
    session.abort().await.unwrap();
    assert_eq!(session.state(), TxnState::Aborted);
}

#[tokio::test]
async fn test_raw_statements_are_classified() {
    let ctx = TestContext::new().await;
    let mut session = ctx.session("A").await;

    session.exec(&Statement::raw("  BEGIN ;")).await.unwrap();
    assert_eq!(session.state(), TxnState::InTransaction);

    session.exec(&Statement::raw("rollback;")).await.unwrap();
    assert_eq!(session.state(), TxnState::Aborted);
}

#[tokio::test]
async fn test_nested_begin_is_rejected_locally() {
    let ctx = TestContext::new().await;
    let mut session = ctx.session("A").await;

    session.begin().await.unwrap();
    let sent_before = ctx.statements().len();

    let err = assert_err!(session.begin().await);
    assert!(matches!(err, ClientError::InvalidState(_)));
    assert_eq!(session.state(), TxnState::InTransaction);
    // Nothing reached the server.
    assert_eq!(ctx.statements().len(), sent_before);
}

#[tokio::test]
async fn test_commit_without_transaction_is_sent_but_state_unchanged() {
    let ctx = TestContext::new().await;
    let mut session = ctx.session("A").await;

    session.commit().await.unwrap();
    assert_eq!(session.state(), TxnState::NoTransaction);
    assert_eq!(ctx.statements(), vec!["commit;".to_string()]);
}

#[tokio::test]
async fn test_other_statements_keep_state() {
    let ctx = TestContext::new().await;
    let mut session = ctx.session("A").await;

    session.begin().await.unwrap();
    session
        .exec(&Statement::select_where("missing", &[]).unwrap())
        .await
        .unwrap();
    assert_eq!(session.state(), TxnState::InTransaction);
    session.close().await.unwrap();
}
