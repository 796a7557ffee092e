use std::sync::Arc;

use courier_dispatch::{
    costing::distance_costing::DistanceCosting,
    problem::{
        courier::{Courier, CourierBuilder},
        order::{Order, OrderBuilder},
        shop::Shop,
        time_window::TimeWindow,
    },
    providers::geo_provider::MatrixClientGeoProvider,
};
use courier_geo::{
    travel_matrix_client::TravelMatrixClient, travel_matrix_provider::TravelMatrixProvider,
};
use jiff::Timestamp;

pub const SHOP_ID: u64 = 1;
pub const VEHICLE_TYPE: u32 = 1;

pub fn as_of() -> Timestamp {
    "2025-06-10T09:00:00Z".parse().unwrap()
}

pub fn shop() -> Arc<Shop> {
    Arc::new(Shop::new(SHOP_ID, 4.3517, 50.8503))
}

pub fn crow_flies_provider() -> MatrixClientGeoProvider {
    MatrixClientGeoProvider::new(TravelMatrixClient::default())
        .with_fallback(TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 15.0 })
}

pub fn create_order(id: u64, weight: f64, (lon, lat): (f64, f64)) -> Order {
    let mut builder = OrderBuilder::default();
    builder
        .set_id(id)
        .set_shop_id(SHOP_ID)
        .set_weight(weight)
        .add_vehicle_type(VEHICLE_TYPE)
        .set_window(
            TimeWindow::from_iso("2025-06-10T10:00:00Z", "2025-06-10T13:00:00Z")
                .unwrap()
                .unwrap(),
        )
        .set_location(lon, lat);
    builder.build().unwrap()
}

/// Orders on a grid east of the shop, ids starting at 1, row by row.
pub fn create_order_grid(columns: usize, rows: usize) -> Vec<Order> {
    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| (row, column)))
        .enumerate()
        .map(|(index, (row, column))| {
            create_order(
                index as u64 + 1,
                1.0,
                (4.355 + column as f64 * 0.004, 50.848 + row as f64 * 0.003),
            )
        })
        .collect()
}

pub fn create_courier(max_stops: usize, configure: impl FnOnce(&mut CourierBuilder)) -> Courier {
    let mut builder = CourierBuilder::default();
    builder
        .set_vehicle_id(100)
        .set_shop_id(SHOP_ID)
        .set_vehicle_type(VEHICLE_TYPE)
        .set_max_stops(max_stops)
        .set_hand_in_duration(jiff::SignedDuration::from_mins(2))
        .set_costing(Arc::new(DistanceCosting::default()));
    configure(&mut builder);
    builder.build().unwrap()
}

pub fn order_window(orders: &[Order], id: u64) -> TimeWindow {
    *orders
        .iter()
        .find(|order| order.id().get() == id)
        .unwrap()
        .window()
}
