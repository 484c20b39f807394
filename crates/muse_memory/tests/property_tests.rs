//! Property-based tests for the memory tiers.
//!
//! Capacity bounds and tier exclusivity must hold for any mix of record ages
//! and importances.

use chrono::{Duration, Utc};
use muse_core::config::MemoryConfig;
use muse_core::{EmotionalState, Memory, MemoryKind};
use muse_memory::MemoryStore;
use proptest::prelude::*;
use std::collections::HashSet;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_record() -> impl Strategy<Value = (i64, f32)> {
    (0i64..72, 0.0f32..=1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stm_never_exceeds_limit(stm_limit in 1usize..20, adds in 0usize..60) {
        let rt = runtime();
        rt.block_on(async {
            let store = MemoryStore::new(MemoryConfig { stm_limit, ..Default::default() });
            for i in 0..adds {
                store
                    .add(&format!("note {}", i), MemoryKind::Interaction, EmotionalState::Neutral, None)
                    .await
                    .unwrap();
                assert!(store.stats().await.stm_len <= stm_limit);
            }
        });
    }

    #[test]
    fn consolidation_respects_bounds_and_exclusivity(
        records in prop::collection::vec(arb_record(), 0..60),
        ltm_limit in 1usize..20,
    ) {
        let rt = runtime();
        let (stm_ids, ltm_ids, ltm_len, total) = rt.block_on(async {
            let store = MemoryStore::new(MemoryConfig { ltm_limit, ..Default::default() });
            for (i, (hours, importance)) in records.iter().enumerate() {
                let memory = Memory::new(&format!("record {}", i), MemoryKind::Experience, EmotionalState::Neutral, None)
                    .unwrap()
                    .with_timestamp(Utc::now() - Duration::hours(*hours))
                    .with_importance(*importance);
                store.insert(memory).await;
            }
            store.consolidate().await.unwrap();
            let stm: HashSet<_> = store.short_term().await.into_iter().map(|m| m.id).collect();
            let ltm: Vec<_> = store.long_term().await.into_iter().map(|m| m.id).collect();
            (stm, ltm.iter().copied().collect::<HashSet<_>>(), ltm.len(), records.len())
        });

        prop_assert!(ltm_len <= ltm_limit);
        prop_assert_eq!(ltm_ids.len(), ltm_len);
        prop_assert!(stm_ids.is_disjoint(&ltm_ids));
        prop_assert!(stm_ids.len() + ltm_len <= total);
    }
}
