// tests/integration/scenario_test.rs

//! End-to-end scenarios spanning both tasks.

use super::test_helpers::{TestContext, group, member, now};
use std::time::Duration;
use tokio::sync::broadcast;

#[tokio::test]
async fn test_revoked_member_is_zeroed_then_swept() {
    let ctx = TestContext::new();
    let expire = now() + 3600;
    ctx.source
        .set_group(group("g", &[]), vec![member("alice", expire)]);
    ctx.reconcile.run_cycle().await.unwrap();
    assert_eq!(ctx.cached("alice"), Some(expire));

    // alice leaves the group.
    ctx.source.set_members("g", vec![]);
    ctx.reconcile.run_cycle().await.unwrap();

    assert_eq!(ctx.record("%", "alice").unwrap().expire_time, 0);
    assert_eq!(ctx.cached("alice"), Some(expire));

    let report = ctx.sweep.run_cycle().await.unwrap();

    assert_eq!(report.dropped, 1);
    assert!(ctx.record("%", "alice").is_none());
    assert_eq!(ctx.cached("alice"), None);
}

#[tokio::test]
async fn test_member_rejoining_after_sweep_is_recreated_with_new_expiry() {
    let ctx = TestContext::new();
    let first = now() + 60;
    ctx.source
        .set_group(group("g", &[]), vec![member("alice", first)]);
    ctx.reconcile.run_cycle().await.unwrap();

    ctx.source.clear();
    ctx.reconcile.run_cycle().await.unwrap();
    ctx.sweep.run_cycle().await.unwrap();

    let second = now() + 7200;
    ctx.source
        .set_group(group("g", &[]), vec![member("alice", second)]);
    let report = ctx.reconcile.run_cycle().await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(ctx.record("%", "alice").unwrap().expire_time, second);
    assert_eq!(ctx.cached("alice"), Some(second));
}

#[tokio::test]
async fn test_expired_membership_is_swept_even_while_still_reported() {
    let ctx = TestContext::new();
    let t = now();
    ctx.source
        .set_group(group("g", &[]), vec![member("bob", t + 30)]);
    ctx.reconcile.run_cycle().await.unwrap();

    let report = ctx.sweep.sweep_at(t + 31).await.unwrap();

    assert_eq!(report.dropped, 1);
    assert_eq!(ctx.cached("bob"), None);
}

#[tokio::test]
async fn test_cold_cache_after_restart_converges_without_errors() {
    let ctx = TestContext::new();
    let expire = now() + 3600;
    ctx.source
        .set_group(group("g", &[]), vec![member("alice", expire)]);
    ctx.reconcile.run_cycle().await.unwrap();

    // A restarted process shares the store but starts with an empty cache.
    ctx.state.cache.delete("alice");
    let report = ctx.reconcile.run_cycle().await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(ctx.store.inner.records().len(), 1);
    assert_eq!(ctx.record("%", "alice").unwrap().expire_time, expire);
}

#[tokio::test]
async fn test_both_loops_converge_and_stop_on_shutdown() {
    let ctx = TestContext::with_intervals(Duration::from_millis(20), Duration::from_millis(30));
    let expire = now() + 3600;
    ctx.source
        .set_group(group("g", &[]), vec![member("alice", expire)]);
    ctx.store.inner.insert_record("%", "stale", now() + 3600);

    let (shutdown_tx, _) = broadcast::channel(1);
    let reconcile = ctx.reconcile;
    let sweep = ctx.sweep;
    let reconcile_handle = tokio::spawn(reconcile.run(shutdown_tx.subscribe()));
    let sweep_handle = tokio::spawn(sweep.run(shutdown_tx.subscribe()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        reconcile_handle.await.unwrap();
        sweep_handle.await.unwrap();
    })
    .await
    .expect("tasks did not stop after shutdown");

    assert_eq!(
        ctx.store.inner.record("%", "alice").unwrap().expire_time,
        expire
    );
    assert!(ctx.store.inner.record("%", "stale").is_none());
    assert_eq!(ctx.state.cache.get("alice"), Some(expire));
}
