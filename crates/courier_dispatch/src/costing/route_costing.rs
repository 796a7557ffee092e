use std::sync::Arc;

use jiff::Timestamp;
use thiserror::Error;

use crate::problem::{
    courier::Courier, geo_matrix::GeoMatrix, order::Order, route_candidate::RouteCandidate,
};

#[derive(Debug, Error)]
pub enum CostingError {
    #[error("cannot cost an empty route")]
    EmptyRoute,

    #[error("stop {index} is outside the geo matrix of {num_orders} orders")]
    StopOutOfRange { index: usize, num_orders: usize },

    #[error("{stops} stops exceed the supported maximum of {max}")]
    TooManyStops { stops: usize, max: usize },

    #[error("{orders} orders do not match a geo matrix of {num_orders} orders")]
    MatrixMismatch { orders: usize, num_orders: usize },

    #[error("costing failed: {0}")]
    Other(String),
}

/// Whether the costing may reorder the stops of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOrdering {
    /// The stops form a set, the costing returns its best ordering.
    Free,
    /// The stops must be visited in the given order.
    Fixed,
}

pub struct CostingRequest<'a> {
    pub courier: &'a Courier,
    /// Orders aligned with the matrix indices, the shop excluded.
    pub orders: &'a [Arc<Order>],
    pub matrix: &'a GeoMatrix,
    /// Matrix indices of the stops.
    pub stops: &'a [usize],
    pub ordering: StopOrdering,
    /// Earliest departure from the shop.
    pub not_before: Timestamp,
}

/// Costing capability of a courier.
///
/// Returns `Ok(None)` when no feasible route exists for the requested stops, errors
/// are reserved for requests the costing cannot evaluate at all.
pub trait RouteCosting: Send + Sync {
    fn cost_candidate(
        &self,
        request: &CostingRequest<'_>,
    ) -> Result<Option<RouteCandidate>, CostingError>;
}
