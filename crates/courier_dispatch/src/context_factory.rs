use std::sync::Arc;

use jiff::Timestamp;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{DispatchError, Stage},
    orchestrator::unit::ComputationUnit,
    problem::{courier::Courier, ids::VehicleTypeId, order::Order, shop::Shop},
    providers::{
        geo_provider::GeoProvider,
        stores::{CourierStore, OrderStore},
    },
};

/// Builds one [`ComputationUnit`] per shop and vehicle type that has orders and a
/// courier to take them.
pub struct ContextFactory<'a> {
    orders: &'a dyn OrderStore,
    couriers: &'a dyn CourierStore,
    geo: &'a dyn GeoProvider,
}

impl<'a> ContextFactory<'a> {
    pub fn new(
        orders: &'a dyn OrderStore,
        couriers: &'a dyn CourierStore,
        geo: &'a dyn GeoProvider,
    ) -> Self {
        ContextFactory {
            orders,
            couriers,
            geo,
        }
    }

    /// Fails only when no shop is given; shops and vehicle types that cannot be
    /// served are logged and skipped, so an empty result is valid.
    #[instrument(skip_all, fields(shops = shops.len(), %as_of))]
    pub fn build_units(
        &self,
        shops: &[Arc<Shop>],
        as_of: Timestamp,
    ) -> Result<Vec<ComputationUnit>, DispatchError> {
        if shops.is_empty() {
            return Err(
                DispatchError::validation("no shop to dispatch").at_stage(Stage::ContextFactory, 0)
            );
        }

        let mut units = Vec::new();

        for shop in shops {
            match self.units_for_shop(shop, as_of) {
                Ok(shop_units) => units.extend(shop_units),
                Err(err) => warn!(shop = %shop.id(), %err, "Skipping shop"),
            }
        }

        info!(units = units.len(), "Computation units built");

        Ok(units)
    }

    fn units_for_shop(
        &self,
        shop: &Arc<Shop>,
        as_of: Timestamp,
    ) -> Result<Vec<ComputationUnit>, DispatchError> {
        let mut orders = self.orders.orders_for_shop(shop.id(), as_of)?;
        let couriers = self.couriers.couriers_for_shop(shop.id(), true)?;

        if orders.is_empty() || couriers.is_empty() {
            debug!(
                shop = %shop.id(),
                orders = orders.len(),
                couriers = couriers.len(),
                "Nothing to dispatch for shop"
            );
            return Ok(Vec::new());
        }

        orders.sort_by_key(|order| order.id());

        let vehicle_types = shared_vehicle_types(&orders, &couriers);
        if vehicle_types.is_empty() {
            debug!(shop = %shop.id(), "No vehicle type shared by orders and couriers");
            return Ok(Vec::new());
        }

        let mut units = Vec::with_capacity(vehicle_types.len());

        for vehicle_type in vehicle_types {
            let bucket = orders
                .iter()
                .filter(|order| order.accepts(vehicle_type))
                .cloned()
                .collect::<Vec<_>>();

            if bucket.is_empty() {
                continue;
            }

            // First active courier wins, the choice is not cost based
            let Some(courier) = couriers
                .iter()
                .find(|courier| courier.is_active() && courier.vehicle_type() == vehicle_type)
            else {
                warn!(shop = %shop.id(), %vehicle_type, "No active courier for vehicle type");
                continue;
            };

            let (bucket, too_heavy): (Vec<_>, Vec<_>) = bucket
                .into_iter()
                .partition(|order| courier.can_carry(order.weight()));

            if !too_heavy.is_empty() {
                debug!(
                    shop = %shop.id(),
                    %vehicle_type,
                    courier = %courier.vehicle_id(),
                    excluded = too_heavy.len(),
                    "Orders too heavy for the courier"
                );
            }

            if bucket.is_empty() {
                continue;
            }

            let matrix = match self.geo.select(vehicle_type, shop, &bucket) {
                Ok(matrix) => matrix,
                Err(err) => {
                    warn!(shop = %shop.id(), %vehicle_type, %err, "Geo lookup failed, skipping");
                    continue;
                }
            };

            match ComputationUnit::new(
                Arc::clone(shop),
                vehicle_type,
                Arc::clone(courier),
                bucket,
                matrix,
                as_of,
            ) {
                Ok(unit) => units.push(unit),
                Err(err) => warn!(shop = %shop.id(), %vehicle_type, %err, "Invalid unit, skipping"),
            }
        }

        Ok(units)
    }
}

/// Vehicle types offered by a courier and accepted by an order, ascending.
pub fn shared_vehicle_types(orders: &[Arc<Order>], couriers: &[Arc<Courier>]) -> Vec<VehicleTypeId> {
    let mut offered = couriers
        .iter()
        .map(|courier| courier.vehicle_type())
        .collect::<Vec<_>>();
    offered.sort_unstable();
    offered.dedup();

    let mut accepted = orders
        .iter()
        .flat_map(|order| order.vehicle_types().iter().copied())
        .collect::<Vec<_>>();
    accepted.sort_unstable();
    accepted.dedup();

    offered
        .into_iter()
        .filter(|vehicle_type| accepted.binary_search(vehicle_type).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::{ids::ShopId, order::OrderBuilder},
        providers::stores::{InMemoryCourierStore, InMemoryOrderStore, StoreError},
        test_utils::{self, FailingGeoProvider, LineGeoProvider, as_of},
    };

    fn order(id: u64, weight: f64, vehicle_types: &[u32]) -> Order {
        let mut builder = OrderBuilder::default();
        builder
            .set_id(id)
            .set_shop_id(test_utils::SHOP_ID)
            .set_weight(weight)
            .set_window(test_utils::window("2025-06-10T10:00:00Z", "2025-06-10T12:00:00Z"));
        for &vehicle_type in vehicle_types {
            builder.add_vehicle_type(vehicle_type);
        }
        builder.build().unwrap()
    }

    fn courier(vehicle_id: u64, vehicle_type: u32, max_order_weight: f64) -> Courier {
        test_utils::courier_with(3, |builder| {
            builder
                .set_vehicle_id(vehicle_id)
                .set_vehicle_type(vehicle_type)
                .set_max_order_weight(max_order_weight);
        })
    }

    fn shops() -> Vec<Arc<Shop>> {
        vec![Arc::new(test_utils::shop())]
    }

    #[test]
    fn test_one_unit_per_vehicle_type() {
        let orders: InMemoryOrderStore = [
            order(3, 1.0, &[1, 2]),
            order(1, 1.0, &[1]),
            order(2, 1.0, &[2, 3]),
        ]
        .into_iter()
        .collect();
        let couriers: InMemoryCourierStore = [
            courier(10, 2, 10.0),
            courier(11, 1, 10.0),
            courier(12, 2, 10.0),
            courier(13, 4, 10.0),
        ]
        .into_iter()
        .collect();

        let units = ContextFactory::new(&orders, &couriers, &LineGeoProvider)
            .build_units(&shops(), as_of())
            .unwrap();

        assert_eq!(units.len(), 2);

        assert_eq!(units[0].vehicle_type(), VehicleTypeId::new(1));
        assert_eq!(units[0].courier().vehicle_id().get(), 11);
        assert_eq!(
            units[0].orders().iter().map(|o| o.id().get()).collect::<Vec<_>>(),
            vec![1, 3]
        );

        // First registered courier of the type
        assert_eq!(units[1].vehicle_type(), VehicleTypeId::new(2));
        assert_eq!(units[1].courier().vehicle_id().get(), 10);
        assert_eq!(
            units[1].orders().iter().map(|o| o.id().get()).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_too_heavy_orders_are_excluded() {
        let orders: InMemoryOrderStore = [order(1, 12.0, &[1]), order(2, 3.0, &[1])]
            .into_iter()
            .collect();
        let couriers: InMemoryCourierStore = [courier(10, 1, 10.0)].into_iter().collect();

        let units = ContextFactory::new(&orders, &couriers, &LineGeoProvider)
            .build_units(&shops(), as_of())
            .unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].orders().iter().map(|o| o.id().get()).collect::<Vec<_>>(),
            vec![2]
        );
        assert_eq!(units[0].matrix().num_orders(), 1);
    }

    #[test]
    fn test_only_heavy_orders_yield_no_unit() {
        let orders: InMemoryOrderStore = [order(1, 12.0, &[1])].into_iter().collect();
        let couriers: InMemoryCourierStore = [courier(10, 1, 10.0)].into_iter().collect();

        let units = ContextFactory::new(&orders, &couriers, &LineGeoProvider)
            .build_units(&shops(), as_of())
            .unwrap();

        assert!(units.is_empty());
    }

    #[test]
    fn test_no_shops_is_an_error() {
        let orders = InMemoryOrderStore::default();
        let couriers = InMemoryCourierStore::default();

        let result = ContextFactory::new(&orders, &couriers, &LineGeoProvider).build_units(&[], as_of());

        assert!(matches!(
            result.unwrap_err().root_cause(),
            DispatchError::Validation(_)
        ));
    }

    #[test]
    fn test_geo_failure_skips_unit() {
        let orders: InMemoryOrderStore = [order(1, 1.0, &[1])].into_iter().collect();
        let couriers: InMemoryCourierStore = [courier(10, 1, 10.0)].into_iter().collect();

        let units = ContextFactory::new(&orders, &couriers, &FailingGeoProvider)
            .build_units(&shops(), as_of())
            .unwrap();

        assert!(units.is_empty());
    }

    struct BrokenOrderStore;

    impl OrderStore for BrokenOrderStore {
        fn orders_for_shop(
            &self,
            shop_id: ShopId,
            _as_of: Timestamp,
        ) -> Result<Vec<Arc<Order>>, StoreError> {
            Err(StoreError::Unavailable(format!("shop {shop_id}")))
        }
    }

    #[test]
    fn test_store_failure_skips_shop() {
        let couriers: InMemoryCourierStore = [courier(10, 1, 10.0)].into_iter().collect();

        let units = ContextFactory::new(&BrokenOrderStore, &couriers, &LineGeoProvider)
            .build_units(&shops(), as_of())
            .unwrap();

        assert!(units.is_empty());
    }

    #[test]
    fn test_shared_vehicle_types() {
        let orders = vec![
            Arc::new(order(1, 1.0, &[3, 1])),
            Arc::new(order(2, 1.0, &[5])),
        ];
        let couriers = vec![
            Arc::new(courier(1, 5, 10.0)),
            Arc::new(courier(2, 2, 10.0)),
            Arc::new(courier(3, 1, 10.0)),
            Arc::new(courier(4, 5, 10.0)),
        ];

        assert_eq!(
            shared_vehicle_types(&orders, &couriers),
            vec![VehicleTypeId::new(1), VehicleTypeId::new(5)]
        );
    }
}
