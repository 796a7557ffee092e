use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::DispatchError;

use super::{
    ids::{OrderId, ShopId, VehicleTypeId},
    time_window::TimeWindow,
};

pub type VehicleTypes = SmallVec<[VehicleTypeId; 4]>;

/// A delivery order waiting at a shop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    shop_id: ShopId,
    weight: f64,
    vehicle_types: VehicleTypes,
    window: TimeWindow,
    location: geo::Point,
}

impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn vehicle_types(&self) -> &[VehicleTypeId] {
        &self.vehicle_types
    }

    pub fn accepts(&self, vehicle_type: VehicleTypeId) -> bool {
        self.vehicle_types.contains(&vehicle_type)
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn location(&self) -> geo::Point {
        self.location
    }
}

impl From<&Order> for geo::Point {
    fn from(order: &Order) -> Self {
        order.location
    }
}

#[derive(Default)]
pub struct OrderBuilder {
    id: Option<OrderId>,
    shop_id: Option<ShopId>,
    weight: Option<f64>,
    vehicle_types: VehicleTypes,
    window: Option<TimeWindow>,
    location: Option<geo::Point>,
}

impl OrderBuilder {
    pub fn set_id(&mut self, id: u64) -> &mut OrderBuilder {
        self.id = Some(OrderId::new(id));
        self
    }

    pub fn set_shop_id(&mut self, shop_id: u64) -> &mut OrderBuilder {
        self.shop_id = Some(ShopId::new(shop_id));
        self
    }

    pub fn set_weight(&mut self, weight: f64) -> &mut OrderBuilder {
        self.weight = Some(weight);
        self
    }

    pub fn add_vehicle_type(&mut self, vehicle_type: u32) -> &mut OrderBuilder {
        let vehicle_type = VehicleTypeId::new(vehicle_type);
        if !self.vehicle_types.contains(&vehicle_type) {
            self.vehicle_types.push(vehicle_type);
        }
        self
    }

    pub fn set_window(&mut self, window: TimeWindow) -> &mut OrderBuilder {
        self.window = Some(window);
        self
    }

    pub fn set_location(&mut self, lon: f64, lat: f64) -> &mut OrderBuilder {
        self.location = Some(geo::Point::new(lon, lat));
        self
    }

    pub fn build(self) -> Result<Order, DispatchError> {
        let id = self
            .id
            .ok_or_else(|| DispatchError::validation("order id is required"))?;

        let weight = self.weight.unwrap_or(0.0);
        if !weight.is_finite() || weight < 0.0 {
            return Err(DispatchError::validation(format!(
                "order {id} has an invalid weight {weight}"
            )));
        }

        if self.vehicle_types.is_empty() {
            return Err(DispatchError::validation(format!(
                "order {id} accepts no vehicle type"
            )));
        }

        Ok(Order {
            id,
            shop_id: self
                .shop_id
                .ok_or_else(|| DispatchError::validation(format!("order {id} has no shop")))?,
            weight,
            vehicle_types: self.vehicle_types,
            window: self.window.unwrap_or_else(TimeWindow::unbounded),
            location: self.location.unwrap_or_else(|| geo::Point::new(0.0, 0.0)),
        })
    }
}
