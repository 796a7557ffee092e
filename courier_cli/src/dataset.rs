use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use anyhow::Context;
use courier_dispatch::{
    costing::distance_costing::DistanceCosting,
    problem::{
        courier::{Courier, CourierBuilder},
        ids::VehicleTypeId,
        order::{Order, OrderBuilder},
        shop::Shop,
        time_window::TimeWindow,
    },
    providers::{
        geo_provider::MatrixClientGeoProvider,
        stores::{InMemoryCourierStore, InMemoryOrderStore},
    },
};
use courier_geo::{
    cache::MatricesCache, travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::TravelMatrixProvider,
};
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;

const DEFAULT_SPEED_KMH: f64 = 15.0;

#[derive(Deserialize, Debug)]
pub struct ShopRecord {
    pub id: u64,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Deserialize, Debug)]
pub struct VehicleTypeRecord {
    pub id: u32,
    pub speed_kmh: f64,
}

#[derive(Deserialize, Debug)]
pub struct OrderRecord {
    pub id: u64,
    pub shop_id: u64,
    pub weight: f64,
    pub vehicle_types: Vec<u32>,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Deserialize, Debug)]
pub struct CourierRecord {
    pub vehicle_id: u64,
    pub shop_id: u64,
    pub vehicle_type: u32,
    pub max_stops: usize,
    pub max_order_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub max_distance: Option<f64>,
    pub hand_in_duration: Option<SignedDuration>,
    #[serde(default)]
    pub returns_to_shop: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub costing: DistanceCosting,
}

fn default_active() -> bool {
    true
}

/// Shops, orders and couriers of one dispatch run.
#[derive(Deserialize, Debug)]
pub struct Dataset {
    pub as_of: Timestamp,
    pub shops: Vec<ShopRecord>,
    #[serde(default)]
    pub vehicle_types: Vec<VehicleTypeRecord>,
    pub orders: Vec<OrderRecord>,
    pub couriers: Vec<CourierRecord>,
}

impl Dataset {
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let file =
            File::open(path).with_context(|| format!("Cannot open dataset {}", path.display()))?;
        let dataset = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid dataset {}", path.display()))?;
        Ok(dataset)
    }

    pub fn shops(&self) -> Vec<Arc<Shop>> {
        self.shops
            .iter()
            .map(|shop| Arc::new(Shop::new(shop.id, shop.lon, shop.lat)))
            .collect()
    }

    pub fn order_store(&self) -> Result<InMemoryOrderStore, anyhow::Error> {
        self.orders
            .iter()
            .map(build_order)
            .collect::<Result<InMemoryOrderStore, _>>()
    }

    pub fn courier_store(&self) -> Result<InMemoryCourierStore, anyhow::Error> {
        self.couriers
            .iter()
            .map(build_courier)
            .collect::<Result<InMemoryCourierStore, _>>()
    }

    /// Straight-line matrices at each vehicle type's speed.
    pub fn geo_provider<C>(&self, client: TravelMatrixClient<C>) -> MatrixClientGeoProvider<C>
    where
        C: MatricesCache,
    {
        self.vehicle_types.iter().fold(
            MatrixClientGeoProvider::new(client).with_fallback(TravelMatrixProvider::AsTheCrowFlies {
                speed_kmh: DEFAULT_SPEED_KMH,
            }),
            |provider, vehicle_type| {
                provider.with_provider(
                    VehicleTypeId::new(vehicle_type.id),
                    TravelMatrixProvider::AsTheCrowFlies {
                        speed_kmh: vehicle_type.speed_kmh,
                    },
                )
            },
        )
    }
}

fn build_order(record: &OrderRecord) -> Result<Order, anyhow::Error> {
    let window = TimeWindow::new(record.window_start, record.window_end)
        .with_context(|| format!("Order {} has an empty delivery window", record.id))?;

    let mut builder = OrderBuilder::default();
    builder
        .set_id(record.id)
        .set_shop_id(record.shop_id)
        .set_weight(record.weight)
        .set_window(window)
        .set_location(record.lon, record.lat);
    for &vehicle_type in &record.vehicle_types {
        builder.add_vehicle_type(vehicle_type);
    }

    Ok(builder.build()?)
}

fn build_courier(record: &CourierRecord) -> Result<Courier, anyhow::Error> {
    let mut builder = CourierBuilder::default();
    builder
        .set_vehicle_id(record.vehicle_id)
        .set_shop_id(record.shop_id)
        .set_vehicle_type(record.vehicle_type)
        .set_max_stops(record.max_stops)
        .set_returns_to_shop(record.returns_to_shop)
        .set_active(record.active)
        .set_costing(Arc::new(record.costing));

    if let Some(max_order_weight) = record.max_order_weight {
        builder.set_max_order_weight(max_order_weight);
    }
    if let Some(max_weight) = record.max_weight {
        builder.set_max_weight(max_weight);
    }
    if let Some(max_distance) = record.max_distance {
        builder.set_max_distance(max_distance);
    }
    if let Some(hand_in_duration) = record.hand_in_duration {
        builder.set_hand_in_duration(hand_in_duration);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use std::env;

    use courier_dispatch::providers::stores::{CourierStore, OrderStore};

    use super::*;

    fn fixture() -> Dataset {
        let path = env::current_dir()
            .unwrap()
            .join("tests/fixtures/datasets/small.json");
        Dataset::from_file(&path).unwrap()
    }

    #[test]
    fn test_load_dataset() {
        let dataset = fixture();

        assert_eq!(dataset.shops().len(), 1);
        assert_eq!(dataset.order_store().unwrap().len(), 4);

        let couriers = dataset
            .courier_store()
            .unwrap()
            .couriers_for_shop(dataset.shops()[0].id(), false)
            .unwrap();
        assert_eq!(couriers.len(), 2);
        assert_eq!(couriers[0].max_stops(), 3);
        assert_eq!(couriers[0].max_order_weight(), 10.0);
        assert_eq!(couriers[0].hand_in_duration(), SignedDuration::from_mins(2));
        assert!(!couriers[1].is_active());
    }

    #[test]
    fn test_orders_keep_their_window() {
        let dataset = fixture();
        let store = dataset.order_store().unwrap();

        let orders = store
            .orders_for_shop(dataset.shops()[0].id(), dataset.as_of)
            .unwrap();

        let order = orders.iter().find(|order| order.id().get() == 1).unwrap();
        assert_eq!(
            order.window().start(),
            "2025-06-10T10:00:00Z".parse::<Timestamp>().unwrap()
        );
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let record = OrderRecord {
            id: 1,
            shop_id: 1,
            weight: 1.0,
            vehicle_types: vec![1],
            window_start: "2025-06-10T12:00:00Z".parse().unwrap(),
            window_end: "2025-06-10T10:00:00Z".parse().unwrap(),
            lon: 4.35,
            lat: 50.85,
        };

        assert!(build_order(&record).is_err());
    }
}
