use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{SantaError, Token};

/// Seed used outside internal mode so the draw can be audited and replayed.
pub const DEFAULT_SEED: u64 = 7_967_946_373_046_491_984;

/// Tokens are shown to browsers, which cannot hold integers past 2^53.
pub const TOKEN_DIVISOR: u64 = 10_000;

/// Picks the seed for this run: fixed for production, fresh for internal runs.
pub fn run_seed(internal: bool) -> u64 {
    if internal {
        rand::random::<u64>()
    } else {
        DEFAULT_SEED
    }
}

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draws a permutation of `0..participant_count` with no fixed point.
///
/// Uniform permutations are drawn and rejected until one qualifies; about
/// `1/e` of them do, so a handful of draws is the norm.
pub fn generate<R: Rng + ?Sized>(
    participant_count: usize,
    rng: &mut R,
) -> Result<Vec<usize>, SantaError> {
    if participant_count < 2 {
        return Err(SantaError::InvalidConfiguration(format!(
            "a draw needs at least 2 participants, got {participant_count}"
        )));
    }

    let mut permutation: Vec<usize> = (0..participant_count).collect();
    let mut attempts = 1u32;
    loop {
        permutation.shuffle(rng);
        if permutation.iter().enumerate().all(|(i, &p)| i != p) {
            debug!(attempts, "drew derangement");
            return Ok(permutation);
        }
        debug!(attempts, "fixed point in draw, reshuffling");
        attempts += 1;
    }
}

pub fn is_derangement(permutation: &[usize]) -> bool {
    let n = permutation.len();
    let mut seen = vec![false; n];
    for (i, &p) in permutation.iter().enumerate() {
        if p >= n || p == i || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}

pub fn issue_token<R: Rng + ?Sized>(rng: &mut R) -> Token {
    issue_access_key(rng) / TOKEN_DIVISOR
}

/// A non-negative 63-bit integer.
pub fn issue_access_key<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen::<u64>() >> 1
}
