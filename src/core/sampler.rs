use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One draw from N(0, 1) via the Box-Muller transform.
///
/// `u` is redrawn while it is exactly zero so the logarithm stays finite.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = rng.r#gen();
    while u == 0.0 {
        u = rng.r#gen();
    }
    let v: f64 = rng.r#gen();
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Generator for a run: seeded when `seed` is set, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Independent stream for sub-run `stream` of a seeded batch.
pub fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    splitmix64(base_seed ^ stream.rotate_left(32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
