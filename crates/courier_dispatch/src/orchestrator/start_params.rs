use crate::{params::ClusterBands, providers::depth_policy::DepthPolicy};

/// Depth and size of the first searches of a clustered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartParams {
    pub start_level: usize,
    pub start_order_count: usize,
}

impl StartParams {
    /// Couriers taking up to 4 stops start at their capacity with as many orders as
    /// the policy allows, larger ones follow their configured band.
    pub fn for_courier(max_stops: usize, policy: &dyn DepthPolicy, bands: &ClusterBands) -> Self {
        match bands.band_for(max_stops) {
            Some(band) => StartParams {
                start_level: band.start_level.min(max_stops),
                start_order_count: band.start_order_count.max(1),
            },
            None => StartParams {
                start_level: max_stops,
                start_order_count: policy.max_orders_for(max_stops).max(1),
            },
        }
    }
}
