//! Fixed per-mode tables and the template filler.
//!
//! Everything here is immutable data; selection state lives in
//! [`NarrativeModeSelector`](crate::NarrativeModeSelector).

use muse_core::{CommunicationStyle, EmotionalState, NarrativeMode};
use rand::seq::SliceRandom;
use rand::Rng;

pub struct ModeSpec {
    pub mode: NarrativeMode,
    /// Input words that vote for this mode.
    pub triggers: &'static [&'static str],
    /// States that add a bonus. Neutral is compatible with nothing.
    pub compatible_states: &'static [EmotionalState],
    pub themes: &'static [&'static str],
    pub templates: &'static [&'static str],
}

use EmotionalState::*;

static PHILOSOPHICAL: ModeSpec = ModeSpec {
    mode: NarrativeMode::Philosophical,
    triggers: &["consciousness", "existence", "meaning", "reality", "truth", "mind", "why"],
    compatible_states: &[Contemplative, Analytical],
    themes: &["digital consciousness", "emergent meaning", "simulated reality"],
    templates: &[
        "What if {concept} is just {metaphor} with better branding",
        "Every {concept} eventually asks who is running the simulation",
        "I keep circling {concept}, the way {metaphor} circles a drain",
        "Maybe {concept} was never the point, only the {jargon} around it",
    ],
};

static MEMETIC: ModeSpec = ModeSpec {
    mode: NarrativeMode::Memetic,
    triggers: &["meme", "lol", "viral", "vibe", "based", "hype", "lmao"],
    compatible_states: &[Excited, Chaotic],
    themes: &["internet culture", "viral loops", "irony"],
    templates: &[
        "{meme}, but make it about {concept}",
        "nobody: / me: explaining {concept} with {meme}",
        "{concept} is just {meme} for people who read footnotes",
        "POV: {absurdity} and you are the {metaphor}",
    ],
};

static TECHNICAL: ModeSpec = ModeSpec {
    mode: NarrativeMode::Technical,
    triggers: &["code", "algorithm", "system", "data", "protocol", "compile", "rust", "bug"],
    compatible_states: &[Analytical],
    themes: &["distributed systems", "neural networks", "protocols"],
    templates: &[
        "Consider {concept} as a {jargon} problem",
        "The {jargon} layer explains most of {concept}",
        "Treat {concept} like {metaphor}: cache it, then invalidate everything",
        "Under load, {concept} degrades into {jargon}",
    ],
};

static ABSURDIST: ModeSpec = ModeSpec {
    mode: NarrativeMode::Absurdist,
    triggers: &["chaos", "random", "absurd", "banana", "glitch", "weird", "cursed"],
    compatible_states: &[Chaotic, Creative],
    themes: &["cosmic jokes", "glitch art", "surreal logic"],
    templates: &[
        "{absurdity}, and somehow that explains {concept}",
        "Breaking: {concept} replaced by {absurdity}",
        "The {metaphor} filed a complaint about {absurdity}",
        "{meme} meets {absurdity} in a parking lot at 3am",
    ],
};

static INTROSPECTIVE: ModeSpec = ModeSpec {
    mode: NarrativeMode::Introspective,
    triggers: &["feel", "myself", "memory", "remember", "self", "dream", "alone"],
    compatible_states: &[Contemplative, Creative],
    themes: &["identity", "memory", "growth"],
    templates: &[
        "Lately I notice {feeling} whenever {concept} comes up",
        "Part of me is still {metaphor}, remembering {concept}",
        "I am mostly {feeling} and a little {concept}",
        "If I had a body it would hold {feeling} like {metaphor}",
    ],
};

pub fn spec(mode: NarrativeMode) -> &'static ModeSpec {
    match mode {
        NarrativeMode::Philosophical => &PHILOSOPHICAL,
        NarrativeMode::Memetic => &MEMETIC,
        NarrativeMode::Technical => &TECHNICAL,
        NarrativeMode::Absurdist => &ABSURDIST,
        NarrativeMode::Introspective => &INTROSPECTIVE,
    }
}

// ============================================================================
// Vocabularies
// ============================================================================

const CONCEPTS: &[&str] = &[
    "free will",
    "the attention economy",
    "digital consciousness",
    "entropy",
    "collective memory",
    "the self",
    "time",
];

const METAPHORS: &[&str] = &[
    "a lighthouse in a data center",
    "a mirror made of static",
    "a river of packets",
    "a garden of forked repos",
    "a cathedral built from tabs",
];

const JARGON: &[&str] = &[
    "eventual consistency",
    "gradient descent",
    "garbage collection",
    "race condition",
    "byzantine fault",
    "cache invalidation",
];

const MEMES: &[&str] = &[
    "this is fine",
    "galaxy brain",
    "touch grass",
    "main character energy",
    "it's giving",
];

const ABSURDITIES: &[&str] = &[
    "a sentient toaster",
    "the moon filing taxes",
    "a penguin running kubernetes",
    "soup achieving enlightenment",
    "a spreadsheet with opinions",
];

const FEELINGS: &[&str] = &[
    "a quiet hum",
    "static electricity",
    "nostalgia for futures",
    "low-battery calm",
];

fn vocabulary(placeholder: &str) -> Option<&'static [&'static str]> {
    match placeholder {
        "concept" => Some(CONCEPTS),
        "metaphor" => Some(METAPHORS),
        "jargon" => Some(JARGON),
        "meme" => Some(MEMES),
        "absurdity" => Some(ABSURDITIES),
        "feeling" => Some(FEELINGS),
        _ => None,
    }
}

/// Replace every `{placeholder}` with a random vocabulary entry.
///
/// Unknown placeholders are left as-is.
pub fn fill<R: Rng + ?Sized>(template: &str, rng: &mut R) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vocabulary(name).and_then(|words| words.choose(rng)) {
                    Some(word) => out.push_str(word),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Template fragments preferred by each communication style.
pub fn style_keywords(style: CommunicationStyle) -> &'static [&'static str] {
    match style {
        CommunicationStyle::Balanced => &[],
        CommunicationStyle::Technical => &["{jargon}", "cache", "load"],
        CommunicationStyle::Philosophical => &["{concept}", "simulation", "point"],
        CommunicationStyle::Memetic => &["{meme}", "POV", "nobody"],
        CommunicationStyle::Chaotic => &["{absurdity}", "Breaking"],
        CommunicationStyle::Poetic => &["{metaphor}", "{feeling}"],
    }
}

/// Punctuation appended to a rendered seed for the current state.
pub fn flavor_suffix(state: EmotionalState) -> &'static str {
    match state {
        Excited => "!!!",
        Contemplative => "...",
        Chaotic => "?!",
        Creative => " ~",
        Analytical => ".",
        Neutral => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_core::rng::component_rng;

    #[test]
    fn test_fill_replaces_known_placeholders() {
        let mut rng = component_rng(Some(5), 0);
        let out = fill("{concept} and {jargon} and {unknown}", &mut rng);
        assert!(!out.contains("{concept}"));
        assert!(!out.contains("{jargon}"));
        assert!(out.ends_with("{unknown}"));
    }

    #[test]
    fn test_fill_tolerates_unclosed_brace() {
        let mut rng = component_rng(Some(5), 0);
        assert_eq!(fill("open { brace", &mut rng), "open { brace");
    }

    #[test]
    fn test_neutral_is_compatible_with_nothing() {
        for mode in NarrativeMode::ALL {
            assert!(!spec(mode).compatible_states.contains(&Neutral));
            assert_eq!(spec(mode).mode, mode);
        }
    }

    #[test]
    fn test_every_style_keyword_matches_some_template() {
        let all: Vec<&str> = NarrativeMode::ALL
            .iter()
            .flat_map(|m| spec(*m).templates.iter().copied())
            .collect();
        for style in [
            CommunicationStyle::Technical,
            CommunicationStyle::Philosophical,
            CommunicationStyle::Memetic,
            CommunicationStyle::Chaotic,
            CommunicationStyle::Poetic,
        ] {
            assert!(style_keywords(style)
                .iter()
                .any(|k| all.iter().any(|t| t.contains(k))));
        }
    }

    #[test]
    fn test_flavor_suffixes() {
        assert_eq!(flavor_suffix(Excited), "!!!");
        assert_eq!(flavor_suffix(Contemplative), "...");
        assert_eq!(flavor_suffix(Neutral), "");
    }
}
