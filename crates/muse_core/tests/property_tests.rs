//! Property-based tests for muse_core.
//!
//! Trait arithmetic and importance scoring must stay inside [0, 1] for any
//! input, including non-finite deltas and arbitrary text.

use muse_core::trait_vector::{CHAOS_THRESHOLD, UNKNOWN_TRAIT_VALUE};
use muse_core::{EmotionalState, Memory, MemoryKind, TraitVector};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_delta() -> impl Strategy<Value = f32> {
    prop_oneof![
        -5.0f32..=5.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

fn arb_trait_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(CHAOS_THRESHOLD.to_string()),
        "[a-z_]{1,16}",
    ]
}

// ============================================================================
// Trait vector
// ============================================================================

proptest! {
    #[test]
    fn modify_trait_stays_in_unit_interval(
        name in arb_trait_name(),
        deltas in prop::collection::vec(arb_delta(), 1..20),
    ) {
        let mut traits = TraitVector::defaults();
        for delta in deltas {
            let v = traits.modify(&name, delta);
            prop_assert!((0.0..=1.0).contains(&v), "{} escaped [0,1]: {}", name, v);
            prop_assert_eq!(traits.get(&name), v);
        }
    }

    #[test]
    fn unknown_trait_modify_starts_from_half(delta in -0.4f32..=0.4) {
        let mut traits = TraitVector::new();
        let v = traits.modify("never_seen", delta);
        prop_assert!((v - (UNKNOWN_TRAIT_VALUE + delta)).abs() < 1e-5);
    }

    #[test]
    fn set_is_clamped(value in -10.0f32..=10.0) {
        let mut traits = TraitVector::new();
        let v = traits.set("x", value);
        prop_assert!((0.0..=1.0).contains(&v));
    }
}

// ============================================================================
// Memory importance
// ============================================================================

proptest! {
    #[test]
    fn importance_in_unit_interval(content in ".{1,2000}") {
        prop_assume!(!content.trim().is_empty());
        let memory = Memory::new(&content, MemoryKind::Experience, EmotionalState::Neutral, None)
            .unwrap();
        prop_assert!((0.0..=1.0).contains(&memory.importance));
        prop_assert!(memory.importance >= 0.5);
    }

    #[test]
    fn associations_are_long_alphabetic_lowercase(content in "[A-Za-z0-9 .,!?]{1,200}") {
        prop_assume!(!content.trim().is_empty());
        let memory = Memory::new(&content, MemoryKind::Fact, EmotionalState::Neutral, None)
            .unwrap();
        for token in &memory.associations {
            prop_assert!(token.chars().count() > 3);
            prop_assert!(token.chars().all(|c| c.is_alphabetic() && !c.is_uppercase()));
        }
    }

    #[test]
    fn blank_content_is_rejected(content in "[ \t\n]{0,10}") {
        prop_assert!(
            Memory::new(&content, MemoryKind::Fact, EmotionalState::Neutral, None).is_err()
        );
    }
}
