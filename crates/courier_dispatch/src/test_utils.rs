use std::sync::Arc;

use jiff::Timestamp;

use crate::{
    costing::distance_costing::DistanceCosting,
    problem::{
        courier::{Courier, CourierBuilder},
        geo_matrix::GeoMatrix,
        ids::VehicleTypeId,
        order::{Order, OrderBuilder},
        shop::Shop,
        time_window::TimeWindow,
    },
    providers::geo_provider::{GeoError, GeoProvider},
};

pub const SHOP_ID: u64 = 1;
pub const VEHICLE_TYPE: u32 = 1;

pub fn vehicle_type() -> VehicleTypeId {
    VehicleTypeId::new(VEHICLE_TYPE)
}

pub fn as_of() -> Timestamp {
    "2025-06-10T09:00:00Z".parse().unwrap()
}

pub fn shop() -> Shop {
    Shop::new(SHOP_ID, 4.35, 50.85)
}

pub fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::from_iso(start, end).unwrap().unwrap()
}

pub fn build_order(id: u64, weight: f64, start: &str, end: &str) -> Order {
    let mut builder = OrderBuilder::default();
    builder
        .set_id(id)
        .set_shop_id(SHOP_ID)
        .set_weight(weight)
        .add_vehicle_type(VEHICLE_TYPE)
        .set_window(window(start, end))
        .set_location(4.35 + id as f64 * 0.01, 50.85);
    builder.build().unwrap()
}

pub fn order_with_window(id: u64, weight: f64, start: &str, end: &str) -> Arc<Order> {
    Arc::new(build_order(id, weight, start, end))
}

pub fn order(id: u64, weight: f64) -> Arc<Order> {
    order_with_window(id, weight, "2025-06-10T10:00:00Z", "2025-06-10T12:00:00Z")
}

pub fn courier_builder(max_stops: usize) -> CourierBuilder {
    let mut builder = CourierBuilder::default();
    builder
        .set_vehicle_id(1)
        .set_shop_id(SHOP_ID)
        .set_vehicle_type(VEHICLE_TYPE)
        .set_max_stops(max_stops)
        .set_costing(Arc::new(DistanceCosting::default()));
    builder
}

pub fn courier_with(max_stops: usize, configure: impl FnOnce(&mut CourierBuilder)) -> Courier {
    let mut builder = courier_builder(max_stops);
    configure(&mut builder);
    builder.build().unwrap()
}

pub fn courier(max_stops: usize) -> Courier {
    courier_with(max_stops, |_| {})
}

/// Points on a line, one kilometer apart, driven at 36 km/h.
fn line(positions: &[f64]) -> GeoMatrix {
    let distances = positions
        .iter()
        .map(|a| positions.iter().map(|b| (a - b).abs() * 1000.0).collect())
        .collect::<Vec<Vec<f64>>>();
    let times = distances
        .iter()
        .map(|row| row.iter().map(|distance| distance / 10.0).collect())
        .collect();

    GeoMatrix::new(distances, times).unwrap()
}

/// Order index `i` sits at `i + 1` km from the shop.
pub fn line_matrix(num_orders: usize) -> GeoMatrix {
    let mut positions = (1..=num_orders).map(|km| km as f64).collect::<Vec<_>>();
    positions.push(0.0);
    line(&positions)
}

/// Places order `k` at `k` km from the shop, so orders `1..=n` match [`line_matrix`].
pub struct LineGeoProvider;

impl GeoProvider for LineGeoProvider {
    fn select(
        &self,
        _vehicle_type: VehicleTypeId,
        _shop: &Shop,
        orders: &[Arc<Order>],
    ) -> Result<GeoMatrix, GeoError> {
        let mut positions = orders
            .iter()
            .map(|order| order.id().get() as f64)
            .collect::<Vec<_>>();
        positions.push(0.0);
        Ok(line(&positions))
    }
}

pub struct FailingGeoProvider;

impl GeoProvider for FailingGeoProvider {
    fn select(
        &self,
        vehicle_type: VehicleTypeId,
        _shop: &Shop,
        _orders: &[Arc<Order>],
    ) -> Result<GeoMatrix, GeoError> {
        Err(GeoError::Lookup(format!(
            "no route service for vehicle type {vehicle_type}"
        )))
    }
}
