//! Property-based tests for the emotional state machine.
//!
//! Whatever the stimulus, volatility or caller-supplied base, the response
//! must stay inside its documented bounds.

use muse_core::rng::component_rng;
use muse_core::{EmotionalProfile, EmotionalState};
use muse_limbic::EmotionalStateMachine;
use proptest::prelude::*;

fn arb_state() -> impl Strategy<Value = EmotionalState> {
    prop::sample::select(EmotionalState::ALL.to_vec())
}

fn arb_base() -> impl Strategy<Value = Option<f32>> {
    prop_oneof![
        Just(None),
        (-2.0f32..=2.0).prop_map(Some),
        Just(Some(f32::NAN)),
    ]
}

proptest! {
    #[test]
    fn response_stays_in_bounds(
        text in ".{0,120}",
        memories in prop::collection::vec("[a-z ]{0,30}", 0..8),
        base_state in arb_state(),
        volatility in 0.0f32..=1.0,
        base in arb_base(),
        seed in any::<u64>(),
    ) {
        let mut machine = EmotionalStateMachine::new(10, 0.5, component_rng(Some(seed), 1));
        let profile = EmotionalProfile::new(base_state, volatility);

        let r = machine.classify(&text, &memories, &profile, base);

        prop_assert!(r.state.is_some());
        prop_assert!((0.0..=1.0).contains(&r.intensity), "intensity {}", r.intensity);
        prop_assert!((1000..=6000).contains(&r.duration_ms));
        prop_assert!(r.associated_memories.len() <= 3);
        for m in &r.associated_memories {
            prop_assert!(memories.contains(m));
        }
    }

    #[test]
    fn history_never_exceeds_limit(
        inputs in prop::collection::vec("[a-z ]{0,20}", 1..40),
        limit in 1usize..15,
    ) {
        let mut machine = EmotionalStateMachine::new(limit, 0.5, component_rng(Some(3), 1));
        let profile = EmotionalProfile::default();
        for input in &inputs {
            machine.classify(input, &[], &profile, None);
            prop_assert!(machine.history_len() <= limit);
        }
    }
}
