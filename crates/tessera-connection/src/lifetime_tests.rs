//! Unit tests for lifetime tokens

use super::*;
use std::time::Duration;
use tessera_core::TesseraError;

#[tokio::test]
async fn test_guard_passes_result_through() {
    let token = LifetimeToken::new();
    assert_eq!(token.guard(async { Ok(5) }).await.unwrap(), 5);
}

#[tokio::test]
async fn test_cancelled_token_short_circuits() {
    let token = LifetimeToken::new();
    token.cancel();
    let err = token.guard(async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, TesseraError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_pending_work() {
    let token = LifetimeToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = token
        .guard(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::Cancelled));
}

#[test]
fn test_parent_cancels_children_only_downward() {
    let root = LifetimeToken::new();
    let a = root.child();
    let b = root.child();

    a.cancel();
    assert!(a.is_cancelled());
    assert!(!b.is_cancelled());
    assert!(!root.is_cancelled());

    root.cancel();
    assert!(b.is_cancelled());
}
