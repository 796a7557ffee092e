use std::{fmt, sync::Arc};

use jiff::SignedDuration;

use crate::{costing::route_costing::RouteCosting, error::DispatchError, search::subset_space::MAX_DEPTH};

use super::ids::{CourierId, ShopId, VehicleTypeId};

/// A courier (vehicle) able to take orders of a shop.
#[derive(Clone)]
pub struct Courier {
    vehicle_id: CourierId,
    shop_id: ShopId,
    vehicle_type: VehicleTypeId,
    max_stops: usize,
    max_order_weight: f64,
    max_weight: f64,
    max_distance: f64,
    hand_in_duration: SignedDuration,
    returns_to_shop: bool,
    active: bool,
    costing: Arc<dyn RouteCosting>,
}

impl Courier {
    pub fn vehicle_id(&self) -> CourierId {
        self.vehicle_id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn vehicle_type(&self) -> VehicleTypeId {
        self.vehicle_type
    }

    /// Maximum number of orders in one route, between 1 and 8.
    pub fn max_stops(&self) -> usize {
        self.max_stops
    }

    pub fn max_order_weight(&self) -> f64 {
        self.max_order_weight
    }

    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Maximum route distance in meters.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn hand_in_duration(&self) -> SignedDuration {
        self.hand_in_duration
    }

    pub fn returns_to_shop(&self) -> bool {
        self.returns_to_shop
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn costing(&self) -> &dyn RouteCosting {
        self.costing.as_ref()
    }

    pub fn can_carry(&self, weight: f64) -> bool {
        weight <= self.max_order_weight
    }
}

impl fmt::Debug for Courier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Courier")
            .field("vehicle_id", &self.vehicle_id)
            .field("shop_id", &self.shop_id)
            .field("vehicle_type", &self.vehicle_type)
            .field("max_stops", &self.max_stops)
            .field("max_order_weight", &self.max_order_weight)
            .field("max_weight", &self.max_weight)
            .field("max_distance", &self.max_distance)
            .field("hand_in_duration", &self.hand_in_duration)
            .field("returns_to_shop", &self.returns_to_shop)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

pub struct CourierBuilder {
    vehicle_id: Option<CourierId>,
    shop_id: Option<ShopId>,
    vehicle_type: Option<VehicleTypeId>,
    max_stops: usize,
    max_order_weight: f64,
    max_weight: f64,
    max_distance: f64,
    hand_in_duration: SignedDuration,
    returns_to_shop: bool,
    active: bool,
    costing: Option<Arc<dyn RouteCosting>>,
}

impl Default for CourierBuilder {
    fn default() -> Self {
        CourierBuilder {
            vehicle_id: None,
            shop_id: None,
            vehicle_type: None,
            max_stops: 1,
            max_order_weight: f64::INFINITY,
            max_weight: f64::INFINITY,
            max_distance: f64::INFINITY,
            hand_in_duration: SignedDuration::ZERO,
            returns_to_shop: false,
            active: true,
            costing: None,
        }
    }
}

impl CourierBuilder {
    pub fn set_vehicle_id(&mut self, vehicle_id: u64) -> &mut CourierBuilder {
        self.vehicle_id = Some(CourierId::new(vehicle_id));
        self
    }

    pub fn set_shop_id(&mut self, shop_id: u64) -> &mut CourierBuilder {
        self.shop_id = Some(ShopId::new(shop_id));
        self
    }

    pub fn set_vehicle_type(&mut self, vehicle_type: u32) -> &mut CourierBuilder {
        self.vehicle_type = Some(VehicleTypeId::new(vehicle_type));
        self
    }

    pub fn set_max_stops(&mut self, max_stops: usize) -> &mut CourierBuilder {
        self.max_stops = max_stops;
        self
    }

    pub fn set_max_order_weight(&mut self, max_order_weight: f64) -> &mut CourierBuilder {
        self.max_order_weight = max_order_weight;
        self
    }

    pub fn set_max_weight(&mut self, max_weight: f64) -> &mut CourierBuilder {
        self.max_weight = max_weight;
        self
    }

    pub fn set_max_distance(&mut self, max_distance: f64) -> &mut CourierBuilder {
        self.max_distance = max_distance;
        self
    }

    pub fn set_hand_in_duration(&mut self, duration: SignedDuration) -> &mut CourierBuilder {
        self.hand_in_duration = duration;
        self
    }

    pub fn set_returns_to_shop(&mut self, returns_to_shop: bool) -> &mut CourierBuilder {
        self.returns_to_shop = returns_to_shop;
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut CourierBuilder {
        self.active = active;
        self
    }

    pub fn set_costing(&mut self, costing: Arc<dyn RouteCosting>) -> &mut CourierBuilder {
        self.costing = Some(costing);
        self
    }

    pub fn build(self) -> Result<Courier, DispatchError> {
        let vehicle_id = self
            .vehicle_id
            .ok_or_else(|| DispatchError::validation("courier vehicle id is required"))?;

        if !(1..=MAX_DEPTH).contains(&self.max_stops) {
            return Err(DispatchError::validation(format!(
                "courier {vehicle_id} max stops {} is outside 1..={MAX_DEPTH}",
                self.max_stops
            )));
        }

        if self.hand_in_duration.is_negative() {
            return Err(DispatchError::validation(format!(
                "courier {vehicle_id} has a negative hand-in duration"
            )));
        }

        for (name, value) in [
            ("max order weight", self.max_order_weight),
            ("max weight", self.max_weight),
            ("max distance", self.max_distance),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(DispatchError::validation(format!(
                    "courier {vehicle_id} has an invalid {name}: {value}"
                )));
            }
        }

        Ok(Courier {
            vehicle_id,
            shop_id: self
                .shop_id
                .ok_or_else(|| DispatchError::validation(format!("courier {vehicle_id} has no shop")))?,
            vehicle_type: self.vehicle_type.ok_or_else(|| {
                DispatchError::validation(format!("courier {vehicle_id} has no vehicle type"))
            })?,
            max_stops: self.max_stops,
            max_order_weight: self.max_order_weight,
            max_weight: self.max_weight,
            max_distance: self.max_distance,
            hand_in_duration: self.hand_in_duration,
            returns_to_shop: self.returns_to_shop,
            active: self.active,
            costing: self.costing.ok_or_else(|| {
                DispatchError::validation(format!("courier {vehicle_id} has no costing"))
            })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::distance_costing::DistanceCosting;

    fn builder() -> CourierBuilder {
        let mut builder = CourierBuilder::default();
        builder
            .set_vehicle_id(1)
            .set_shop_id(1)
            .set_vehicle_type(2)
            .set_max_stops(3)
            .set_costing(Arc::new(DistanceCosting::default()));
        builder
    }

    #[test]
    fn test_build_courier() {
        let courier = builder().build().unwrap();

        assert_eq!(courier.vehicle_id(), CourierId::new(1));
        assert_eq!(courier.max_stops(), 3);
        assert!(courier.is_active());
        assert!(courier.can_carry(1000.0));
    }

    #[test]
    fn test_max_stops_out_of_range() {
        let mut zero = builder();
        zero.set_max_stops(0);
        assert!(zero.build().is_err());

        let mut nine = builder();
        nine.set_max_stops(9);
        assert!(nine.build().is_err());
    }

    #[test]
    fn test_requires_costing() {
        let mut builder = CourierBuilder::default();
        builder.set_vehicle_id(1).set_shop_id(1).set_vehicle_type(2);

        assert!(matches!(builder.build(), Err(DispatchError::Validation(_))));
    }
}
