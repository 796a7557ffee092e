use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::problem::route_candidate::{MAX_ROUTE_STOPS, RouteCandidate};

use super::{
    route_costing::{CostingError, CostingRequest, RouteCosting, StopOrdering},
    route_profile::{RouteProfile, check_request, evaluate_sequence},
};

/// Prices a route by its distance and duration.
///
/// In [`StopOrdering::Free`] mode every permutation of the stops is evaluated and
/// the cheapest feasible one is kept, ties going to the first permutation in
/// lexicographic order of the matrix indices.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DistanceCosting {
    pub cost_per_km: f64,
    pub cost_per_hour: f64,
}

impl Default for DistanceCosting {
    fn default() -> Self {
        DistanceCosting {
            cost_per_km: 1.0,
            cost_per_hour: 0.0,
        }
    }
}

impl DistanceCosting {
    pub fn cost(&self, profile: &RouteProfile) -> f64 {
        profile.total_distance / 1000.0 * self.cost_per_km
            + profile.total_duration.as_secs_f64() / 3600.0 * self.cost_per_hour
    }

    fn candidate(&self, request: &CostingRequest<'_>, profile: RouteProfile) -> RouteCandidate {
        let cost = self.cost(&profile);

        RouteCandidate::new(
            request.courier.vehicle_id(),
            profile.stops,
            cost,
            profile.delivery_interval,
            profile.total_weight,
            profile.total_distance,
            request.courier.returns_to_shop(),
        )
    }
}

impl RouteCosting for DistanceCosting {
    fn cost_candidate(
        &self,
        request: &CostingRequest<'_>,
    ) -> Result<Option<RouteCandidate>, CostingError> {
        check_request(request)?;

        match request.ordering {
            StopOrdering::Fixed => Ok(evaluate_sequence(request, request.stops)
                .map(|profile| self.candidate(request, profile))),
            StopOrdering::Free => {
                let mut sequence: SmallVec<[usize; MAX_ROUTE_STOPS]> =
                    SmallVec::from_slice(request.stops);
                sequence.sort_unstable();

                let mut best: Option<(f64, RouteProfile)> = None;

                loop {
                    if let Some(profile) = evaluate_sequence(request, &sequence) {
                        let cost = self.cost(&profile);
                        if best.as_ref().is_none_or(|(best_cost, _)| cost < *best_cost) {
                            best = Some((cost, profile));
                        }
                    }

                    if !next_permutation(&mut sequence) {
                        break;
                    }
                }

                Ok(best.map(|(_, profile)| self.candidate(request, profile)))
            }
        }
    }
}

/// Rearranges `values` into the next lexicographic permutation, returns `false`
/// once the last one was reached.
fn next_permutation(values: &mut [usize]) -> bool {
    if values.len() < 2 {
        return false;
    }

    let mut i = values.len() - 1;
    while i > 0 && values[i - 1] >= values[i] {
        i -= 1;
    }

    if i == 0 {
        return false;
    }

    let mut j = values.len() - 1;
    while values[j] <= values[i - 1] {
        j -= 1;
    }

    values.swap(i - 1, j);
    values[i..].reverse();

    true
}
