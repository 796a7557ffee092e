use jiff::SignedDuration;
use serde::Serialize;
use smallvec::SmallVec;

use super::{
    ids::{CourierId, OrderId},
    time_window::TimeWindow,
};

/// Upper bound on the stops of a route, matching the deepest search.
pub const MAX_ROUTE_STOPS: usize = 8;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub order_id: OrderId,
    /// Time from the departure at the shop until the courier reaches this stop.
    pub arrival_offset: SignedDuration,
    /// Distance of the leg leading to this stop, in meters.
    pub leg_distance: f64,
}

pub type Stops = SmallVec<[Stop; MAX_ROUTE_STOPS]>;

/// Courier id plus the ascending order ids of a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    pub vehicle_id: CourierId,
    pub order_ids: SmallVec<[OrderId; MAX_ROUTE_STOPS]>,
}

/// A costed, feasible delivery route starting at the shop.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    vehicle_id: CourierId,
    stops: Stops,
    cost: f64,
    delivery_interval: TimeWindow,
    total_weight: f64,
    total_distance: f64,
    is_loop: bool,
}

impl RouteCandidate {
    pub fn new(
        vehicle_id: CourierId,
        stops: Stops,
        cost: f64,
        delivery_interval: TimeWindow,
        total_weight: f64,
        total_distance: f64,
        is_loop: bool,
    ) -> Self {
        RouteCandidate {
            vehicle_id,
            stops,
            cost,
            delivery_interval,
            total_weight,
            total_distance,
            is_loop,
        }
    }

    pub fn vehicle_id(&self) -> CourierId {
        self.vehicle_id
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn order_ids(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.stops.iter().map(|stop| stop.order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.stops.iter().any(|stop| stop.order_id == order_id)
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Window of departure times from the shop for which every stop is on time.
    pub fn delivery_interval(&self) -> &TimeWindow {
        &self.delivery_interval
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        let mut order_ids: SmallVec<[OrderId; MAX_ROUTE_STOPS]> = self.order_ids().collect();
        order_ids.sort_unstable();

        CanonicalKey {
            vehicle_id: self.vehicle_id,
            order_ids,
        }
    }
}
