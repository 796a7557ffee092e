use std::sync::Arc;

use fxhash::FxHashSet;
use tracing::{debug, error, info, instrument};

use crate::{
    dedup::deduplicate,
    error::{DispatchError, Stage, catch_panic},
    extension::route_extender::{ExtensionTask, RouteExtender},
    params::DispatchParams,
    problem::{geo_matrix::GeoMatrix, ids::OrderId, order::Order, route_candidate::RouteCandidate},
    providers::{depth_policy::DepthPolicy, geo_provider::GeoProvider},
    search::dispatcher::{ParallelSearchDispatcher, SearchTask},
    timer_debug,
};

use super::{cloud::select_cloud, start_params::StartParams, unit::ComputationUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every order at the courier's capacity in one search.
    FullSearch,
    /// Bounded searches over shrinking parts of the orders, followed by extension.
    ClusterIterate,
}

/// Orders searched in one iteration and the depth they are searched at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Unit order indices, ascending.
    pub indices: Vec<usize>,
    pub depth: usize,
}

pub struct IterativeRouteOrchestrator<'a> {
    params: &'a DispatchParams,
    policy: &'a dyn DepthPolicy,
    geo: &'a dyn GeoProvider,
    dispatcher: ParallelSearchDispatcher,
    extender: RouteExtender,
}

impl<'a> IterativeRouteOrchestrator<'a> {
    pub fn new(
        params: &'a DispatchParams,
        policy: &'a dyn DepthPolicy,
        geo: &'a dyn GeoProvider,
    ) -> Self {
        IterativeRouteOrchestrator {
            params,
            policy,
            geo,
            dispatcher: ParallelSearchDispatcher::new(params.search.clone()),
            extender: RouteExtender::new(params.extension.clone()),
        }
    }

    pub fn strategy_for(&self, unit: &ComputationUnit) -> Strategy {
        if self.policy.max_depth_for(unit.orders().len()) >= unit.courier().max_stops() {
            Strategy::FullSearch
        } else {
            Strategy::ClusterIterate
        }
    }

    /// Builds the candidates of `unit` and records them with its status. A failure,
    /// panics included, only affects this unit.
    #[instrument(skip_all, fields(shop = %unit.shop_id(), vehicle_type = %unit.vehicle_type()))]
    pub fn run(&self, unit: &mut ComputationUnit) {
        let mut iterations = 0;
        let result = catch_panic(|| self.build_routes(unit, &mut iterations)).map_err(|err| {
            match err.stage() {
                Some(_) => err,
                None => err.at_stage(Stage::Clustering, iterations),
            }
        });

        match &result {
            Ok(candidates) => info!(candidates = candidates.len(), iterations, "Unit done"),
            Err(err) => error!(%err, stage = ?err.stage(), iterations, "Unit failed"),
        }

        unit.complete(result, iterations);
    }

    /// `iterations` counts the searches started so far, also when one fails.
    fn build_routes(
        &self,
        unit: &ComputationUnit,
        iterations: &mut usize,
    ) -> Result<Vec<RouteCandidate>, DispatchError> {
        let strategy = catch_panic(|| Ok(self.strategy_for(unit)))
            .map_err(|err| err.at_stage(Stage::Clustering, 0))?;
        debug!(?strategy, orders = unit.orders().len(), "Building routes");

        let candidates = match strategy {
            Strategy::FullSearch => {
                *iterations = 1;
                self.full_search(unit)?
            }
            Strategy::ClusterIterate => self.cluster_iterate(unit, iterations)?,
        };

        let found = candidates.len();
        let unique = catch_panic(|| Ok(timer_debug!("Deduplication", deduplicate(candidates))))
            .map_err(|err| err.at_stage(Stage::Dedup, *iterations))?;
        debug!(found, unique = unique.len(), "Deduplicated candidates");

        Ok(unique)
    }

    fn full_search(&self, unit: &ComputationUnit) -> Result<Vec<RouteCandidate>, DispatchError> {
        let courier = unit.courier();

        catch_panic(|| {
            self.dispatcher.dispatch(&SearchTask {
                orders: unit.orders(),
                depth: courier.max_stops(),
                courier,
                matrix: unit.matrix(),
                not_before: unit.as_of(),
            })
        })
        .map_err(|err| err.at_stage(Stage::Search, 1))
    }

    /// Every iteration removes at least one order from the remaining ones, so the
    /// loop ends after at most as many iterations as the unit has orders.
    fn cluster_iterate(
        &self,
        unit: &ComputationUnit,
        iteration: &mut usize,
    ) -> Result<Vec<RouteCandidate>, DispatchError> {
        let courier = unit.courier();
        let max_stops = courier.max_stops();
        let start = StartParams::for_courier(max_stops, self.policy, &self.params.cloud.bands);

        let mut remaining = (0..unit.orders().len()).collect::<Vec<_>>();
        let mut candidates = Vec::new();

        debug!(?start, "Clustered search");

        while !remaining.is_empty() {
            *iteration += 1;
            let iteration = *iteration;

            let Selection { indices, depth } =
                catch_panic(|| Ok(self.select(unit, &remaining, start)))
                    .map_err(|err| err.at_stage(Stage::Clustering, iteration))?;
            let orders = indices
                .iter()
                .map(|&index| Arc::clone(&unit.orders()[index]))
                .collect::<Vec<_>>();

            let matrix = catch_panic(|| self.subset_matrix(unit, &orders))
                .map_err(|err| err.at_stage(Stage::GeoLookup, iteration))?;

            let found = catch_panic(|| {
                self.dispatcher.dispatch(&SearchTask {
                    orders: &orders,
                    depth,
                    courier,
                    matrix: &matrix,
                    not_before: unit.as_of(),
                })
            })
            .map_err(|err| err.at_stage(Stage::Search, iteration))?;

            let extended = if depth < max_stops {
                catch_panic(|| {
                    self.extender.extend(&ExtensionTask {
                        routes: &found,
                        from_level: depth,
                        to_level: max_stops,
                        orders: unit.orders(),
                        pool: &remaining,
                        courier,
                        matrix: unit.matrix(),
                        not_before: unit.as_of(),
                    })
                })
                .map_err(|err| err.at_stage(Stage::Extension, iteration))?
            } else {
                Vec::new()
            };

            let used = orders
                .iter()
                .map(|order| order.id())
                .chain(found.iter().flat_map(RouteCandidate::order_ids))
                .chain(extended.iter().flat_map(RouteCandidate::order_ids))
                .collect::<FxHashSet<OrderId>>();

            debug!(
                iteration,
                selected = indices.len(),
                depth,
                found = found.len(),
                extended = extended.len(),
                "Iteration done"
            );

            candidates.reserve(found.len() + extended.len());
            candidates.extend(found);
            candidates.extend(extended);

            let before = remaining.len();
            remaining.retain(|&index| !used.contains(&unit.orders()[index].id()));

            if remaining.len() >= before {
                return Err(DispatchError::validation(format!(
                    "{before} remaining orders did not shrink"
                ))
                .at_stage(Stage::Clustering, iteration));
            }
        }

        debug!(iterations = *iteration, "Clustered search done");

        Ok(candidates)
    }

    /// Orders to search next among `remaining`, which is never empty.
    pub fn select(&self, unit: &ComputationUnit, remaining: &[usize], start: StartParams) -> Selection {
        let max_stops = unit.courier().max_stops();
        let natural = self.policy.max_depth_for(remaining.len());

        if natural >= max_stops {
            return Selection {
                indices: remaining.to_vec(),
                depth: max_stops,
            };
        }

        if remaining.len() > start.start_order_count {
            let cloud = &self.params.cloud;
            let indices = select_cloud(
                unit.matrix(),
                remaining,
                start.start_order_count,
                cloud.radius,
                cloud.density,
            )
            .unwrap_or_else(|| {
                debug!("No usable cloud, taking the first remaining orders");
                remaining[..start.start_order_count].to_vec()
            });

            return Selection {
                indices,
                depth: start.start_level,
            };
        }

        if natural > start.start_level {
            return Selection {
                indices: remaining.to_vec(),
                depth: natural.min(max_stops),
            };
        }

        Selection {
            indices: remaining.to_vec(),
            depth: start.start_level,
        }
    }

    fn subset_matrix(
        &self,
        unit: &ComputationUnit,
        orders: &[Arc<Order>],
    ) -> Result<GeoMatrix, DispatchError> {
        if orders.len() == unit.orders().len() {
            return Ok(unit.matrix().clone());
        }

        let matrix = self.geo.select(unit.vehicle_type(), unit.shop(), orders)?;

        if matrix.num_orders() != orders.len() {
            return Err(DispatchError::validation(format!(
                "geo provider returned a matrix of {} orders for {} orders",
                matrix.num_orders(),
                orders.len()
            )));
        }

        Ok(matrix)
    }
}
