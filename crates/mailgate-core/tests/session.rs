//! Session registry: login, lookup, logout, disconnect cleanup and
//! per-connection serialization.

#![allow(clippy::unwrap_used)]

mod common;

use common::{PASSWORD, USER, eventually, init_tracing, manager};
use mailgate_core::{Error, ErrorKind, Token, mailbox};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::test]
async fn test_login_returns_distinct_tokens_for_same_user() {
    init_tracing();
    let (manager, state) = manager(3, 20);

    let mut tokens = HashSet::new();
    for _ in 0..3 {
        tokens.insert(manager.login(USER, PASSWORD).await.unwrap());
    }

    assert_eq!(tokens.len(), 3);
    assert_eq!(manager.len(), 3);
    assert_eq!(state.connections.load(Ordering::SeqCst), 3);
    for token in &tokens {
        assert_eq!(manager.resolve(token).unwrap().username(), USER);
    }
}

#[tokio::test]
async fn test_token_shape() {
    let (manager, _state) = manager(0, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();

    assert_eq!(token.as_str().len(), 43);
    assert!(
        token
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    );
    assert!(!format!("{token:?}").contains(token.as_str()));
}

#[tokio::test]
async fn test_wrong_password_is_auth_failure() {
    let (manager, _state) = manager(0, 20);

    let err = manager.login(USER, "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailure);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_failed_login_logs_out() {
    let (manager, state) = manager(0, 20);

    manager.login(USER, "wrong").await.unwrap_err();

    assert_eq!(state.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(state.commands(), vec![format!("LOGIN {USER}"), "LOGOUT".to_string()]);
}

#[tokio::test]
async fn test_colliding_token_is_regenerated() {
    init_tracing();
    let (manager, _state) = manager(0, 20);
    let first = manager.login(USER, PASSWORD).await.unwrap();
    let original = manager.resolve(&first).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let manager = manager.clone().with_token_source({
        let calls = Arc::clone(&calls);
        let taken = first.clone();
        move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(taken.clone())
            } else {
                Token::generate()
            }
        }
    });
    let second = manager.login(USER, PASSWORD).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_ne!(second, first);
    assert_eq!(manager.len(), 2);
    assert!(Arc::ptr_eq(&manager.resolve(&first).unwrap(), &original));
    assert!(!Arc::ptr_eq(&manager.resolve(&second).unwrap(), &original));
}

#[tokio::test]
async fn test_token_failure_logs_out_and_registers_nothing() {
    let (manager, state) = manager(0, 20);
    let manager = manager.with_token_source(|| {
        Err(Error::RandomSource(rand::Error::new("entropy exhausted")))
    });

    let err = manager.login(USER, PASSWORD).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RandomSourceFailure);
    assert!(manager.is_empty());
    assert_eq!(state.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_login_does_not_block_lookups() {
    let (manager, state) = manager(3, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();

    let gate = Arc::new(Notify::new());
    state.hold_logins(Arc::clone(&gate));
    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.login(USER, PASSWORD).await }
    });
    eventually(|| state.count_commands("LOGIN") == 2).await;

    let session = manager.resolve(&token).unwrap();
    let page = tokio::time::timeout(Duration::from_secs(1), session.list_messages("INBOX", 0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.messages.len(), 3);
    assert!(!pending.is_finished());
    assert_eq!(manager.len(), 1);

    gate.notify_one();
    let second = pending.await.unwrap().unwrap();
    assert_ne!(second, token);
    assert_eq!(manager.len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_failure() {
    let (manager, state) = manager(0, 20);
    state.unreachable.store(true, Ordering::SeqCst);

    let err = manager.login(USER, PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_unknown_token_is_expired() {
    let (manager, _state) = manager(0, 20);
    manager.login(USER, PASSWORD).await.unwrap();

    let err = manager.resolve(&Token::from("not-a-real-token")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionExpired);
}

#[tokio::test]
async fn test_logout_removes_session_and_sends_logout() {
    let (manager, state) = manager(0, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();
    let other = manager.login(USER, PASSWORD).await.unwrap();

    manager.logout(&token).await.unwrap();

    assert_eq!(state.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(
        manager.resolve(&token).unwrap_err().kind(),
        ErrorKind::SessionExpired
    );
    assert_eq!(
        manager.logout(&token).await.unwrap_err().kind(),
        ErrorKind::SessionExpired
    );
    assert!(manager.resolve(&other).is_ok());
}

#[tokio::test]
async fn test_logout_succeeds_when_server_logout_fails() {
    let (manager, state) = manager(0, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();
    state.fail_logout.store(true, Ordering::SeqCst);

    manager.logout(&token).await.unwrap();
    assert!(!manager.contains(&token));
}

#[tokio::test]
async fn test_dropped_connection_removes_session() {
    init_tracing();
    let (manager, state) = manager(0, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();
    let held = manager.resolve(&token).unwrap();

    state.drop_connections();
    eventually(|| !manager.contains(&token)).await;

    assert_eq!(
        manager.resolve(&token).unwrap_err().kind(),
        ErrorKind::SessionExpired
    );
    // A caller still holding the session sees the closed connection.
    let err = held.list_mailboxes().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
}

#[tokio::test]
async fn test_clones_share_registry() {
    let (manager, _state) = manager(0, 20);
    let clone = manager.clone();
    let token = clone.login(USER, PASSWORD).await.unwrap();

    assert!(manager.contains(&token));
    manager.logout(&token).await.unwrap();
    assert!(clone.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_work_is_serialized() {
    const CALLERS: usize = 16;

    let (manager, state) = manager(5, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();
    let session = manager.resolve(&token).unwrap();
    let active = Arc::new(AtomicUsize::new(0));
    let interleaved = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..CALLERS)
        .map(|_| {
            let session = Arc::clone(&session);
            let active = Arc::clone(&active);
            let interleaved = Arc::clone(&interleaved);
            tokio::spawn(async move {
                session
                    .with_connection(move |conn| {
                        Box::pin(async move {
                            if active.fetch_add(1, Ordering::SeqCst) != 0 {
                                interleaved.fetch_add(1, Ordering::SeqCst);
                            }
                            let first = mailbox::list_mailboxes(conn).await;
                            let second = mailbox::list_mailboxes(conn).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            first.and(second)
                        })
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().len(), 1);
    }

    assert_eq!(interleaved.load(Ordering::SeqCst), 0);
    assert_eq!(state.overlaps.load(Ordering::SeqCst), 0);
    // LOGIN plus two LISTs per caller.
    assert_eq!(state.operations.load(Ordering::SeqCst), 1 + 2 * CALLERS);
    assert_eq!(state.count_commands("LIST"), 2 * CALLERS);
}

#[tokio::test]
async fn test_work_error_releases_connection() {
    let (manager, _state) = manager(2, 20);
    let token = manager.login(USER, PASSWORD).await.unwrap();
    let session = manager.resolve(&token).unwrap();

    let err = session.list_messages("Nonexistent", 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let page = session.list_messages("INBOX", 0).await.unwrap();
    assert_eq!(page.messages.len(), 2);
}
