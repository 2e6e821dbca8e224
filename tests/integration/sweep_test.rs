// tests/integration/sweep_test.rs

use super::test_helpers::{TestContext, now};
use otu_sqlsync::core::OtuError;
use otu_sqlsync::core::store::CredentialStore;

#[tokio::test]
async fn test_sweep_drops_elapsed_and_zeroed_records_only() {
    let ctx = TestContext::new();
    let t = now();
    ctx.store.inner.insert_record("%", "elapsed", t - 10);
    ctx.store.inner.insert_record("%", "zeroed", 0);
    ctx.store.inner.insert_record("%", "future", t + 100);
    for user in ["elapsed", "zeroed", "future"] {
        ctx.state.cache.set(user, t);
    }

    let report = ctx.sweep.sweep_at(t).await.unwrap();

    assert_eq!(report.expired, 2);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.failed, 0);
    assert!(ctx.record("%", "elapsed").is_none());
    assert!(ctx.record("%", "zeroed").is_none());
    assert_eq!(ctx.record("%", "future").unwrap().expire_time, t + 100);
    assert_eq!(ctx.cached("elapsed"), None);
    assert_eq!(ctx.cached("zeroed"), None);
    assert_eq!(ctx.cached("future"), Some(t));
}

#[tokio::test]
async fn test_record_expiring_exactly_now_is_swept() {
    let ctx = TestContext::new();
    let t = now();
    ctx.store.inner.insert_record("%", "edge", t);

    let report = ctx.sweep.sweep_at(t).await.unwrap();

    assert_eq!(report.dropped, 1);
    assert!(ctx.store.inner.records().is_empty());
}

#[tokio::test]
async fn test_drop_failure_does_not_block_other_records() {
    let ctx = TestContext::new();
    let t = now();
    ctx.store.inner.insert_record("%", "alice", 0);
    ctx.store.inner.insert_record("%", "bob", 0);
    ctx.store.inner.insert_record("%", "carol", 0);
    ctx.state.cache.set("alice", 1);
    ctx.state.cache.set("bob", 1);
    ctx.store.fail_drop_for("bob");

    let report = ctx.sweep.sweep_at(t).await.unwrap();

    assert_eq!(report.dropped, 2);
    assert_eq!(report.failed, 1);
    assert!(ctx.record("%", "bob").is_some());
    assert_eq!(ctx.cached("bob"), Some(1));
    assert_eq!(ctx.cached("alice"), None);
    assert!(ctx.record("%", "carol").is_none());

    ctx.store.heal();
    let retry = ctx.sweep.sweep_at(t).await.unwrap();
    assert_eq!(retry.dropped, 1);
    assert!(ctx.store.inner.records().is_empty());
}

#[tokio::test]
async fn test_listing_failure_touches_nothing() {
    let ctx = TestContext::new();
    ctx.store.inner.insert_record("%", "alice", 0);
    ctx.state.cache.set("alice", 0);
    ctx.store
        .fail_list(Some(OtuError::StoreUnavailable("server has gone away".into())));

    let err = ctx.sweep.sweep_at(now()).await.unwrap_err();

    assert!(err.is_transient());
    assert!(ctx.store.mutations().is_empty());
    assert!(ctx.record("%", "alice").is_some());
    assert_eq!(ctx.cached("alice"), Some(0));
}

#[tokio::test]
async fn test_sweep_pings_the_store_first() {
    let ctx = TestContext::new();

    ctx.sweep.run_cycle().await.unwrap();

    assert_eq!(ctx.store.calls(), vec!["ping", "list_expired"]);
}

#[tokio::test]
async fn test_dropping_removes_the_account_as_well_as_the_record() {
    let ctx = TestContext::new();
    ctx.store
        .create_account("%", "gina", "pw", now() - 1)
        .await
        .unwrap();
    assert!(ctx.store.inner.account("%", "gina").is_some());

    ctx.sweep.run_cycle().await.unwrap();

    assert!(ctx.store.inner.account("%", "gina").is_none());
    assert!(ctx.record("%", "gina").is_none());
}
