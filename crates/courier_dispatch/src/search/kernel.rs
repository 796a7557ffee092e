use crate::{
    costing::route_costing::{CostingRequest, StopOrdering},
    error::DispatchError,
    problem::route_candidate::RouteCandidate,
};

use super::dispatcher::SearchTask;

const CANCELLATION_CHECK_INTERVAL: usize = 1024;

/// Costs every subset yielded by `subsets` with the courier's costing in free
/// ordering mode and keeps the feasible ones.
pub(crate) fn search_subsets<I, F>(
    task: &SearchTask<'_>,
    subsets: I,
    is_cancelled: F,
) -> Result<Vec<RouteCandidate>, DispatchError>
where
    I: IntoIterator,
    I::Item: AsRef<[usize]>,
    F: Fn() -> bool,
{
    let courier = task.courier;
    let mut candidates = Vec::new();

    for (visited, subset) in subsets.into_iter().enumerate() {
        if visited % CANCELLATION_CHECK_INTERVAL == 0 && is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let subset = subset.as_ref();

        let weight: f64 = subset.iter().map(|&index| task.orders[index].weight()).sum();
        if weight > courier.max_weight() {
            continue;
        }

        let request = CostingRequest {
            courier,
            orders: task.orders,
            matrix: task.matrix,
            stops: subset,
            ordering: StopOrdering::Free,
            not_before: task.not_before,
        };

        if let Some(candidate) = courier.costing().cost_candidate(&request)? {
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}
