use std::sync::Arc;

use jiff::Timestamp;

use crate::{
    error::DispatchError,
    problem::{
        courier::Courier,
        geo_matrix::GeoMatrix,
        ids::{ShopId, VehicleTypeId},
        order::Order,
        route_candidate::RouteCandidate,
        shop::Shop,
    },
};

#[derive(Debug)]
pub enum UnitStatus {
    Pending,
    Done,
    Failed(DispatchError),
}

impl UnitStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, UnitStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            UnitStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Orders of one shop accepting one vehicle type, with the courier resolved for them.
#[derive(Debug)]
pub struct ComputationUnit {
    shop: Arc<Shop>,
    vehicle_type: VehicleTypeId,
    courier: Arc<Courier>,
    orders: Vec<Arc<Order>>,
    matrix: GeoMatrix,
    as_of: Timestamp,
    candidates: Vec<RouteCandidate>,
    status: UnitStatus,
    iterations: usize,
}

impl ComputationUnit {
    /// `orders` must be sorted by id and aligned with the matrix.
    pub fn new(
        shop: Arc<Shop>,
        vehicle_type: VehicleTypeId,
        courier: Arc<Courier>,
        orders: Vec<Arc<Order>>,
        matrix: GeoMatrix,
        as_of: Timestamp,
    ) -> Result<Self, DispatchError> {
        if orders.is_empty() {
            return Err(DispatchError::validation(format!(
                "unit of shop {} for vehicle type {vehicle_type} has no orders",
                shop.id()
            )));
        }

        if !orders.is_sorted_by_key(|order| order.id()) {
            return Err(DispatchError::validation(format!(
                "orders of the unit of shop {} are not sorted by id",
                shop.id()
            )));
        }

        if matrix.num_orders() != orders.len() {
            return Err(DispatchError::validation(format!(
                "unit of shop {} has {} orders but a geo matrix of {} orders",
                shop.id(),
                orders.len(),
                matrix.num_orders()
            )));
        }

        Ok(ComputationUnit {
            shop,
            vehicle_type,
            courier,
            orders,
            matrix,
            as_of,
            candidates: Vec::new(),
            status: UnitStatus::Pending,
            iterations: 0,
        })
    }

    pub fn shop(&self) -> &Shop {
        &self.shop
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop.id()
    }

    pub fn vehicle_type(&self) -> VehicleTypeId {
        self.vehicle_type
    }

    pub fn courier(&self) -> &Courier {
        &self.courier
    }

    pub fn orders(&self) -> &[Arc<Order>] {
        &self.orders
    }

    pub fn matrix(&self) -> &GeoMatrix {
        &self.matrix
    }

    pub fn as_of(&self) -> Timestamp {
        self.as_of
    }

    pub fn candidates(&self) -> &[RouteCandidate] {
        &self.candidates
    }

    pub fn status(&self) -> &UnitStatus {
        &self.status
    }

    /// Searches run for this unit, one for a full search.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn complete(
        &mut self,
        result: Result<Vec<RouteCandidate>, DispatchError>,
        iterations: usize,
    ) {
        self.iterations = iterations;
        match result {
            Ok(candidates) => {
                self.candidates = candidates;
                self.status = UnitStatus::Done;
            }
            Err(error) => {
                self.candidates = Vec::new();
                self.status = UnitStatus::Failed(error);
            }
        }
    }
}
