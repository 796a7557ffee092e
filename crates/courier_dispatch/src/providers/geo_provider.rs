use std::sync::Arc;

use courier_geo::{
    cache::{MatricesCache, NoopMatricesCache},
    travel_matrices::MatrixError,
    travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::TravelMatrixProvider,
};
use fxhash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::problem::{geo_matrix::GeoMatrix, ids::VehicleTypeId, order::Order, shop::Shop};

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("no travel matrix provider for vehicle type {0}")]
    UnsupportedVehicleType(VehicleTypeId),

    #[error("travel matrix lookup failed: {0}")]
    Lookup(String),

    #[error(transparent)]
    InvalidMatrix(#[from] MatrixError),
}

/// Source of distance and time matrices.
pub trait GeoProvider: Send + Sync {
    /// Matrix over `orders` followed by the shop, so the shop is at index
    /// `orders.len()`.
    fn select(
        &self,
        vehicle_type: VehicleTypeId,
        shop: &Shop,
        orders: &[Arc<Order>],
    ) -> Result<GeoMatrix, GeoError>;
}

struct MatrixPoint(geo::Point);

impl From<&MatrixPoint> for geo_types::Point {
    fn from(point: &MatrixPoint) -> Self {
        point.0
    }
}

/// Resolves matrices through a [`TravelMatrixClient`], one provider per vehicle type.
pub struct MatrixClientGeoProvider<C = NoopMatricesCache> {
    client: TravelMatrixClient<C>,
    providers: FxHashMap<VehicleTypeId, TravelMatrixProvider>,
    fallback: Option<TravelMatrixProvider>,
}

impl<C> MatrixClientGeoProvider<C>
where
    C: MatricesCache,
{
    pub fn new(client: TravelMatrixClient<C>) -> Self {
        MatrixClientGeoProvider {
            client,
            providers: FxHashMap::default(),
            fallback: None,
        }
    }

    pub fn with_provider(
        mut self,
        vehicle_type: VehicleTypeId,
        provider: TravelMatrixProvider,
    ) -> Self {
        self.providers.insert(vehicle_type, provider);
        self
    }

    /// Provider used for vehicle types without a dedicated one.
    pub fn with_fallback(mut self, provider: TravelMatrixProvider) -> Self {
        self.fallback = Some(provider);
        self
    }
}

impl<C> GeoProvider for MatrixClientGeoProvider<C>
where
    C: MatricesCache + Send + Sync,
{
    fn select(
        &self,
        vehicle_type: VehicleTypeId,
        shop: &Shop,
        orders: &[Arc<Order>],
    ) -> Result<GeoMatrix, GeoError> {
        let provider = self
            .providers
            .get(&vehicle_type)
            .or(self.fallback.as_ref())
            .ok_or(GeoError::UnsupportedVehicleType(vehicle_type))?;

        let points = orders
            .iter()
            .map(|order| MatrixPoint(order.location()))
            .chain(std::iter::once(MatrixPoint(shop.location())))
            .collect::<Vec<_>>();

        debug!(
            %vehicle_type,
            shop = %shop.id(),
            points = points.len(),
            "Fetching travel matrices"
        );

        let matrices = self
            .client
            .fetch_matrix(&points, provider)
            .map_err(|err| GeoError::Lookup(err.to_string()))?;

        Ok(GeoMatrix::from_travel_matrices(matrices)?)
    }
}
