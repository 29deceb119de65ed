//! integration tests for cross-sign scheduling

mod common;

use chrono::{Duration, Utc};
use chronicle::LedgerContext;
use chronicle_chain::SigningKey;
use chronicle_db::Database;
use chronicle_types::{CrossSignPolicy, CrossSignTarget, LastRun, TargetId};
use common::FakePeer;
use std::sync::Arc;

async fn add_target(ctx: &LedgerContext, name: &str, policy: CrossSignPolicy) -> TargetId {
    ctx.db
        .create_cross_sign_target(&CrossSignTarget::new(
            name.to_string(),
            format!("http://{}.invalid/chronicle", name),
            SigningKey::generate().public_key().to_base64(),
            policy,
        ))
        .await
        .unwrap()
        .id
}

async fn context_with_entries(peer: Arc<FakePeer>, n: usize) -> LedgerContext {
    let ctx = common::context().await.with_peer(peer);
    let key = SigningKey::generate();
    for i in 0..n {
        ctx.ledger()
            .append_signed(&format!("entry {}", i), &key)
            .await
            .unwrap();
    }
    ctx
}

#[tokio::test]
async fn push_after_is_idempotent() {
    let peer = Arc::new(FakePeer::default());
    let ctx = context_with_entries(peer.clone(), 1).await;
    let id = add_target(
        &ctx,
        "peer",
        CrossSignPolicy {
            push_after: Some(5),
            push_days: None,
        },
    )
    .await;

    let scheduler = ctx.cross_signer();
    assert!(scheduler.run(id).await.unwrap());
    assert!(!scheduler.run(id).await.unwrap());
    assert_eq!(peer.pushes.lock().await.len(), 1);

    // five more entries make it due again
    let key = SigningKey::generate();
    for i in 0..5 {
        ctx.ledger()
            .append_signed(&format!("more {}", i), &key)
            .await
            .unwrap();
    }
    assert!(scheduler.run(id).await.unwrap());
    assert_eq!(peer.pushes.lock().await.len(), 2);
}

#[tokio::test]
async fn push_days_waits_for_the_interval() {
    let peer = Arc::new(FakePeer::default());
    let ctx = context_with_entries(peer.clone(), 1).await;
    let id = add_target(
        &ctx,
        "peer",
        CrossSignPolicy {
            push_after: None,
            push_days: Some(1),
        },
    )
    .await;
    let head = ctx.ledger().head().await.unwrap().unwrap();
    let scheduler = ctx.cross_signer();

    let last_run = |time| LastRun {
        sequence: head.sequence,
        time,
        response: serde_json::Value::Null,
    };

    ctx.db
        .set_cross_sign_last_run(id, &last_run(Utc::now() - Duration::hours(1)))
        .await
        .unwrap();
    assert!(!scheduler.run(id).await.unwrap());

    ctx.db
        .set_cross_sign_last_run(id, &last_run(Utc::now() - Duration::days(2)))
        .await
        .unwrap();
    assert!(scheduler.run(id).await.unwrap());
    assert_eq!(peer.pushes.lock().await.len(), 1);
}

#[tokio::test]
async fn transport_failure_leaves_last_run_unchanged() {
    let ctx = context_with_entries(FakePeer::failing(), 1).await;
    let id = add_target(
        &ctx,
        "down",
        CrossSignPolicy {
            push_after: Some(1),
            push_days: None,
        },
    )
    .await;

    let err = ctx.cross_signer().run(id).await.unwrap_err();
    assert!(err.is_transient());

    let target = ctx.db.get_cross_sign_target(id).await.unwrap().unwrap();
    assert!(target.last_run.is_none());
}

#[tokio::test]
async fn misconfigured_target_does_not_block_others() {
    let peer = Arc::new(FakePeer::default());
    let ctx = context_with_entries(peer.clone(), 1).await;

    let broken = add_target(&ctx, "broken", CrossSignPolicy::default()).await;
    let good = add_target(
        &ctx,
        "good",
        CrossSignPolicy {
            push_after: Some(1),
            push_days: None,
        },
    )
    .await;

    // a policy without fields is only an error once there is a last run
    let head = ctx.ledger().head().await.unwrap().unwrap();
    ctx.db
        .set_cross_sign_last_run(
            broken,
            &LastRun {
                sequence: head.sequence,
                time: Utc::now(),
                response: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();

    let report = ctx.cross_signer().run_due().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.pushed, 1);

    let good = ctx.db.get_cross_sign_target(good).await.unwrap().unwrap();
    assert!(good.last_run.is_some());

    let err = ctx.cross_signer().run(broken).await.unwrap_err();
    assert!(matches!(err, chronicle::Error::Configuration(_)));
}

#[tokio::test]
async fn pushed_hashes_are_the_chain_head() {
    let peer = Arc::new(FakePeer::default());
    let ctx = context_with_entries(peer.clone(), 3).await;
    let id = add_target(
        &ctx,
        "peer",
        CrossSignPolicy {
            push_after: Some(1),
            push_days: None,
        },
    )
    .await;

    ctx.cross_signer().force(id).await.unwrap();

    let head = ctx.ledger().head().await.unwrap().unwrap();
    let pushes = peer.pushes.lock().await;
    assert_eq!(pushes[0].currhash, head.curr_hash);
    assert_eq!(pushes[0].summaryhash, head.summary_hash);

    let target = ctx.db.get_cross_sign_target(id).await.unwrap().unwrap();
    assert_eq!(target.last_run.unwrap().sequence, head.sequence);
}
