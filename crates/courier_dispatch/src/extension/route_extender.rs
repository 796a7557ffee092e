use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::{
    costing::route_costing::{CostingRequest, StopOrdering},
    error::DispatchError,
    params::ExtensionParams,
    problem::{
        courier::Courier,
        geo_matrix::GeoMatrix,
        order::Order,
        route_candidate::{MAX_ROUTE_STOPS, RouteCandidate},
        time_window::TimeWindow,
    },
    search::subset_space::worker_count,
    timer_debug,
    utils::fork_join::fork_join,
};

use super::time_reserve::TimeReserve;

type Sequence = SmallVec<[usize; MAX_ROUTE_STOPS]>;

/// Growing routes of `from_level` stops up to `to_level` stops.
pub struct ExtensionTask<'a> {
    pub routes: &'a [RouteCandidate],
    pub from_level: usize,
    pub to_level: usize,
    /// Orders of the unit, sorted ascending by id and aligned with the matrix.
    pub orders: &'a [Arc<Order>],
    /// Matrix indices of the orders a route may be extended with.
    pub pool: &'a [usize],
    pub courier: &'a Courier,
    pub matrix: &'a GeoMatrix,
    pub not_before: Timestamp,
}

impl ExtensionTask<'_> {
    fn validate(&self) -> Result<(), DispatchError> {
        if self.to_level > self.courier.max_stops() {
            return Err(DispatchError::validation(format!(
                "cannot extend routes to {} stops, courier {} takes at most {}",
                self.to_level,
                self.courier.vehicle_id(),
                self.courier.max_stops()
            )));
        }

        if self.orders.len() != self.matrix.num_orders() {
            return Err(DispatchError::validation(format!(
                "{} orders extended with a geo matrix of {} orders",
                self.orders.len(),
                self.matrix.num_orders()
            )));
        }

        if let Some(&index) = self.pool.iter().find(|&&index| index >= self.orders.len()) {
            return Err(DispatchError::validation(format!(
                "pool index {index} is outside the {} orders",
                self.orders.len()
            )));
        }

        Ok(())
    }

    fn sequence_of(&self, route: &RouteCandidate) -> Result<Sequence, DispatchError> {
        route
            .order_ids()
            .map(|order_id| {
                self.orders
                    .binary_search_by_key(&order_id, |order| order.id())
                    .map_err(|_| {
                        DispatchError::validation(format!(
                            "route order {order_id} is not part of the extended orders"
                        ))
                    })
            })
            .collect()
    }
}

pub struct RouteExtender {
    params: ExtensionParams,
}

impl RouteExtender {
    pub fn new(params: ExtensionParams) -> Self {
        RouteExtender { params }
    }

    /// Grows every route of `from_level` stops one stop per level, keeping the
    /// cheapest extension of each route at each level. Returns the extended routes
    /// of all levels, the input routes excluded.
    #[instrument(skip_all, level = "debug", fields(routes = task.routes.len(), from = task.from_level, to = task.to_level))]
    pub fn extend(&self, task: &ExtensionTask<'_>) -> Result<Vec<RouteCandidate>, DispatchError> {
        if task.from_level >= task.to_level || task.routes.is_empty() {
            return Ok(Vec::new());
        }

        task.validate()?;

        let routes = task
            .routes
            .iter()
            .filter(|route| route.len() == task.from_level)
            .collect::<Vec<_>>();

        if routes.len() < task.routes.len() {
            debug!(
                skipped = task.routes.len() - routes.len(),
                "Skipping routes of another length"
            );
        }

        let workers = worker_count(
            routes.len() as u128,
            self.params.routes_per_worker as u128,
            self.params.max_workers,
        );

        let outputs = if workers <= 1 {
            vec![timer_debug!(
                "Inline extension",
                grow_routes(task, routes.iter().copied(), || false)
            )?]
        } else {
            timer_debug!(
                "Parallel extension",
                fork_join("extend", workers, self.params.timeout, |context| {
                    grow_routes(
                        task,
                        routes
                            .iter()
                            .copied()
                            .skip(context.index)
                            .step_by(context.count),
                        || context.is_cancelled(),
                    )
                })
            )?
        };

        let total = outputs.iter().map(Vec::len).sum();
        let mut extended = Vec::with_capacity(total);
        for output in outputs {
            extended.extend(output);
        }

        debug!(extended = extended.len(), "Extension done");

        Ok(extended)
    }
}

fn grow_routes<'r, I, F>(
    task: &ExtensionTask<'_>,
    routes: I,
    is_cancelled: F,
) -> Result<Vec<RouteCandidate>, DispatchError>
where
    I: Iterator<Item = &'r RouteCandidate>,
    F: Fn() -> bool,
{
    let mut extended = Vec::new();

    for route in routes {
        if is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let mut current = route.clone();
        for _ in task.from_level..task.to_level {
            match best_extension(task, &current)? {
                Some(next) => {
                    extended.push(next.clone());
                    current = next;
                }
                None => break,
            }
        }
    }

    Ok(extended)
}

/// Cheapest route with one more stop than `route`, first found wins on ties.
fn best_extension(
    task: &ExtensionTask<'_>,
    route: &RouteCandidate,
) -> Result<Option<RouteCandidate>, DispatchError> {
    let courier = task.courier;
    let matrix = task.matrix;
    let shop = matrix.shop_index();

    let sequence = task.sequence_of(route)?;
    let len = sequence.len();
    if len == 0 || len >= courier.max_stops() {
        return Ok(None);
    }

    let arrivals = route
        .stops()
        .iter()
        .map(|stop| stop.arrival_offset)
        .collect::<SmallVec<[SignedDuration; MAX_ROUTE_STOPS]>>();

    let departures = sequence
        .iter()
        .zip(&arrivals)
        .map(|(&index, &arrival)| task.orders[index].window().departures_for(arrival))
        .collect::<SmallVec<[TimeWindow; MAX_ROUTE_STOPS]>>();

    let reserve = TimeReserve::new(TimeWindow::not_before(task.not_before), &departures);

    let last = sequence[len - 1];
    let hand_in = courier.hand_in_duration();

    let mut best: Option<RouteCandidate> = None;

    for &candidate in task.pool {
        if sequence.contains(&candidate) {
            continue;
        }

        let order = &task.orders[candidate];
        if !courier.can_carry(order.weight())
            || route.total_weight() + order.weight() > courier.max_weight()
        {
            continue;
        }

        for position in 0..=len {
            let previous = if position == 0 {
                shop
            } else {
                sequence[position - 1]
            };
            let next = sequence.get(position).copied();

            if !matrix.is_reachable(previous, candidate)
                || next.is_some_and(|next| !matrix.is_reachable(candidate, next))
            {
                continue;
            }

            let Some(arrival) = (if position == 0 {
                Some(matrix.travel_time(shop, candidate))
            } else {
                arrivals[position - 1]
                    .checked_add(hand_in)
                    .and_then(|offset| offset.checked_add(matrix.travel_time(previous, candidate)))
            }) else {
                continue;
            };

            let inserted = order.window().departures_for(arrival);

            let delay = match next {
                None => Some(SignedDuration::ZERO),
                Some(next) => arrival
                    .checked_add(hand_in)
                    .and_then(|offset| offset.checked_add(matrix.travel_time(candidate, next)))
                    .and_then(|offset| offset.checked_sub(arrivals[position])),
            };

            let Some(delay) = delay else {
                continue;
            };

            if reserve.insertion_interval(position, &inserted, delay).is_none() {
                continue;
            }

            let distance = match next {
                Some(next) => {
                    route.total_distance() - matrix.distance(previous, next)
                        + matrix.distance(previous, candidate)
                        + matrix.distance(candidate, next)
                }
                None if route.is_loop() => {
                    if !matrix.is_reachable(candidate, shop) {
                        continue;
                    }
                    route.total_distance() - matrix.distance(last, shop)
                        + matrix.distance(last, candidate)
                        + matrix.distance(candidate, shop)
                }
                None => route.total_distance() + matrix.distance(last, candidate),
            };

            if distance > courier.max_distance() {
                continue;
            }

            let mut stops = sequence.clone();
            stops.insert(position, candidate);

            let request = CostingRequest {
                courier,
                orders: task.orders,
                matrix,
                stops: &stops,
                ordering: StopOrdering::Fixed,
                not_before: task.not_before,
            };

            if let Some(extended) = courier.costing().cost_candidate(&request)?
                && best
                    .as_ref()
                    .is_none_or(|best| extended.cost() < best.cost())
            {
                best = Some(extended);
            }
        }
    }

    Ok(best)
}
