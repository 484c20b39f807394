//! Property-based tests for output shaping.
//!
//! Generator output is untrusted text; cleaning it must never panic and
//! must leave nothing that would be cleaned again.

use muse_core::config::PersonalityConfig;
use muse_core::{EmotionalProfile, EmotionalState};
use muse_reasoning::personality::{sanitize_output, state_marker};
use muse_reasoning::{DirectiveShape, PersonalityCore};
use proptest::prelude::*;
use regex::Regex;

/// Text dense with the markup the cleaner targets.
fn markup() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 ]{1,8}",
            Just("*".to_string()),
            Just("**".to_string()),
            Just("# ".to_string()),
            Just("\n".to_string()),
            Just("[state: chaotic]".to_string()),
            Just("[st".to_string()),
            Just("ate: x]".to_string()),
            Just("_~`|".to_string()),
            Just("🚀".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_state() -> impl Strategy<Value = EmotionalState> {
    prop::sample::select(EmotionalState::ALL.to_vec())
}

proptest! {
    #[test]
    fn sanitize_never_panics(raw in "\\PC{0,200}") {
        let _ = sanitize_output(&raw);
    }

    #[test]
    fn sanitize_is_idempotent(raw in markup()) {
        let once = sanitize_output(&raw);
        prop_assert_eq!(sanitize_output(&once), once.clone());
    }

    #[test]
    fn sanitized_text_has_no_markup(raw in markup()) {
        let marker = Regex::new(r"(?i)\[\s*state\s*:[^\]]*\]").unwrap();
        let cleaned = sanitize_output(&raw);
        prop_assert!(!cleaned.contains('*'), "{:?}", cleaned);
        prop_assert!(!cleaned.contains('#'), "{:?}", cleaned);
        prop_assert!(!marker.is_match(&cleaned), "{:?}", cleaned);
        prop_assert_eq!(cleaned.trim(), cleaned.as_str());
    }

    #[test]
    fn contextual_text_carries_one_marker(raw in markup(), state in arb_state()) {
        let core = PersonalityCore::new(PersonalityConfig::default(), EmotionalProfile::default(), Some(1));
        let shaped = core.post_process(&raw, state, DirectiveShape::Contextual);
        let marker = state_marker(state);
        prop_assert!(shaped.text.ends_with(&marker));
        prop_assert_eq!(shaped.text.matches("[state:").count(), 1);

        let batch = core.post_process(&raw, state, DirectiveShape::Batch);
        prop_assert_eq!(batch.text, shaped.body);
    }
}
