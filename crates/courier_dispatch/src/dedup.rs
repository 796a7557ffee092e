use fxhash::FxHashMap;

use crate::problem::route_candidate::{CanonicalKey, RouteCandidate};

/// Keeps the cheapest candidate per courier and order set.
///
/// Candidates keep the position of the first one seen with their key, a later
/// candidate replaces it only when strictly cheaper. Running it on its own output
/// changes nothing.
pub fn deduplicate(candidates: Vec<RouteCandidate>) -> Vec<RouteCandidate> {
    let mut positions: FxHashMap<CanonicalKey, usize> = FxHashMap::default();
    let mut unique: Vec<RouteCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = candidate.canonical_key();

        match positions.get(&key) {
            Some(&position) => {
                if candidate.cost() < unique[position].cost() {
                    unique[position] = candidate;
                }
            }
            None => {
                positions.insert(key, unique.len());
                unique.push(candidate);
            }
        }
    }

    unique
}
