use std::{sync::Arc, time::Instant};

use jiff::{SignedDuration, Timestamp};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::{
    context_factory::ContextFactory,
    error::DispatchError,
    orchestrator::{orchestrator::IterativeRouteOrchestrator, unit::ComputationUnit},
    params::DispatchParams,
    problem::{route_candidate::RouteCandidate, shop::Shop},
    providers::{
        depth_policy::DepthPolicy,
        geo_provider::GeoProvider,
        stores::{CourierStore, OrderStore},
    },
};

pub struct DispatchReport {
    units: Vec<ComputationUnit>,
    duration: SignedDuration,
}

impl DispatchReport {
    pub fn units(&self) -> &[ComputationUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<ComputationUnit> {
        self.units
    }

    pub fn duration(&self) -> SignedDuration {
        self.duration
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &ComputationUnit> {
        self.units.iter().filter(|unit| unit.status().is_failed())
    }

    pub fn candidates(&self) -> impl Iterator<Item = &RouteCandidate> {
        self.units.iter().flat_map(|unit| unit.candidates())
    }

    pub fn total_candidates(&self) -> usize {
        self.units.iter().map(|unit| unit.candidates().len()).sum()
    }
}

/// Builds the computation units of a batch of shops and runs every unit to
/// completion.
pub struct DispatchEngine<'a> {
    params: DispatchParams,
    orders: &'a dyn OrderStore,
    couriers: &'a dyn CourierStore,
    geo: &'a dyn GeoProvider,
    policy: &'a dyn DepthPolicy,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(
        params: DispatchParams,
        orders: &'a dyn OrderStore,
        couriers: &'a dyn CourierStore,
        geo: &'a dyn GeoProvider,
        policy: &'a dyn DepthPolicy,
    ) -> Result<Self, DispatchError> {
        params.validate()?;

        Ok(DispatchEngine {
            params,
            orders,
            couriers,
            geo,
            policy,
        })
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    #[instrument(skip_all, fields(shops = shops.len(), %as_of))]
    pub fn dispatch(
        &self,
        shops: &[Arc<Shop>],
        as_of: Timestamp,
    ) -> Result<DispatchReport, DispatchError> {
        let start = Instant::now();

        let mut units =
            ContextFactory::new(self.orders, self.couriers, self.geo).build_units(shops, as_of)?;

        let orchestrator = IterativeRouteOrchestrator::new(&self.params, self.policy, self.geo);
        let num_threads = self.params.unit_threads.number_of_threads();

        if num_threads <= 1 || units.len() <= 1 {
            units.iter_mut().for_each(|unit| orchestrator.run(unit));
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|index| format!("dispatch-unit-{index}"))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    units.par_iter_mut().for_each(|unit| orchestrator.run(unit));
                }),
                Err(err) => {
                    warn!(%err, "Cannot build the unit thread pool, running sequentially");
                    units.iter_mut().for_each(|unit| orchestrator.run(unit));
                }
            }
        }

        let duration = SignedDuration::try_from(start.elapsed()).unwrap_or(SignedDuration::MAX);
        let report = DispatchReport { units, duration };

        info!(
            units = report.units().len(),
            failed = report.failed_units().count(),
            candidates = report.total_candidates(),
            %duration,
            "Dispatch done"
        );

        Ok(report)
    }
}
