use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seeded generator for one component.
///
/// Each component draws from its own stream so that adding randomness to one
/// subsystem does not shift the outcomes of another under a fixed seed.
pub fn component_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ stream),
        None => StdRng::from_entropy(),
    }
}
