//! Uniform winner selection.
//!
//! Selection is a pure function of the candidate list and the supplied
//! RNG — it holds no state and performs no transition. An empty candidate
//! list yields `None`, which callers must treat as "skip this rotation"
//! rather than an error.

use rand::Rng;
use scepter_types::Participant;

/// Pick a winner uniformly at random from a candidate list.
///
/// Returns `None` if and only if `candidates` is empty.
pub fn pick_winner<'a, R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &'a [Participant],
) -> Option<&'a Participant> {
    if candidates.is_empty() {
        return None;
    }
    let index = rng.random_range(0..candidates.len());
    candidates.get(index)
}
