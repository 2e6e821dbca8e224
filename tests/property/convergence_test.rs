// tests/property/convergence_test.rs

//! After one reconcile cycle the store agrees with the identity source, and a sweep
//! removes exactly the records that are due.

use crate::test_helpers::{TestContext, group, member};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const NOW: i64 = 1_700_000_000;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_reconcile_converges_on_desired_users(
        desired in prop::collection::btree_map("[a-z][a-z0-9_]{0,12}", 1i64..100_000, 0..20),
        existing in prop::collection::btree_map("[a-z][a-z0-9_]{0,12}", 1i64..100_000, 0..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new();
            for (user, offset) in &existing {
                ctx.store.inner.insert_record("%", user, NOW + offset);
            }
            let members = desired
                .iter()
                .map(|(user, offset)| member(user, NOW + offset))
                .collect();
            ctx.source.set_group(group("g", &[]), members);

            let report = ctx.reconcile.run_cycle().await.unwrap();

            assert_eq!(report.failed, 0);
            assert_eq!(report.created, desired.len());
            for record in ctx.store.inner.records() {
                if desired.contains_key(&record.user) {
                    assert_ne!(record.expire_time, 0, "{record} was zeroed");
                } else {
                    assert_eq!(record.expire_time, 0, "{record} was kept");
                }
            }
            for (user, offset) in &desired {
                assert!(ctx.record("%", user).is_some(), "{user} has no record");
                assert_eq!(ctx.cached(user), Some(NOW + offset));
            }
            let cached: BTreeSet<String> = ctx.state.cache.snapshot().into_keys().collect();
            let wanted: BTreeSet<String> = desired.keys().cloned().collect();
            assert_eq!(cached, wanted);
        });
    }

    #[test]
    fn test_sweep_removes_exactly_the_due_records(
        records in prop::collection::btree_map("[a-z][a-z0-9_]{0,12}", -1_000i64..1_000, 0..30),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new();
            let expiry: BTreeMap<String, i64> = records
                .iter()
                .map(|(user, offset)| (user.clone(), if *offset < -900 { 0 } else { NOW + offset }))
                .collect();
            for (user, expire_time) in &expiry {
                ctx.store.inner.insert_record("%", user, *expire_time);
                ctx.state.cache.set(user, *expire_time);
            }

            let report = ctx.sweep.sweep_at(NOW).await.unwrap();

            let due = expiry.values().filter(|e| **e <= NOW).count();
            assert_eq!(report.dropped, due);
            for (user, expire_time) in &expiry {
                let present = ctx.record("%", user).is_some();
                assert_eq!(present, *expire_time > NOW, "{user} expiring at {expire_time}");
                assert_eq!(ctx.cached(user).is_some(), present);
            }
        });
    }
}
