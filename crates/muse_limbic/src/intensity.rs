//! Intensity and decay curves.

use muse_core::EmotionalState;
use rand::Rng;

/// Lowest intensity a response to empty input may carry.
pub const EMPTY_INPUT_FLOOR: f32 = 0.05;

/// High-arousal states amplify the base intensity, reflective ones damp it.
pub fn multiplier(state: EmotionalState) -> f32 {
    match state {
        EmotionalState::Excited | EmotionalState::Chaotic => 1.2,
        EmotionalState::Contemplative | EmotionalState::Analytical => 0.8,
        EmotionalState::Neutral | EmotionalState::Creative => 1.0,
    }
}

/// Uniform jitter in [-volatility/2, +volatility/2].
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, volatility: f32) -> f32 {
    let half = volatility.abs() / 2.0;
    if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

/// base × multiplier + jitter, clamped to [0, 1].
pub fn compute<R: Rng + ?Sized>(
    rng: &mut R,
    state: EmotionalState,
    base: f32,
    volatility: f32,
) -> f32 {
    let raw = base * multiplier(state) + jitter(rng, volatility);
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// How long a response lingers: 1s, plus up to 5s more at full intensity.
pub fn duration_ms(intensity: f32) -> u64 {
    (1000.0 * (1.0 + intensity.clamp(0.0, 1.0) * 5.0)).round() as u64
}
