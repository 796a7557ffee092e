use std::sync::Arc;

use fxhash::FxHashMap;
use jiff::Timestamp;
use thiserror::Error;

use crate::problem::{courier::Courier, ids::ShopId, order::Order};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait OrderStore: Send + Sync {
    /// Orders of the shop still deliverable at `as_of`.
    fn orders_for_shop(&self, shop_id: ShopId, as_of: Timestamp)
    -> Result<Vec<Arc<Order>>, StoreError>;
}

pub trait CourierStore: Send + Sync {
    /// Couriers of the shop, in the order they were registered.
    fn couriers_for_shop(
        &self,
        shop_id: ShopId,
        active_only: bool,
    ) -> Result<Vec<Arc<Courier>>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: FxHashMap<ShopId, Vec<Arc<Order>>>,
}

impl InMemoryOrderStore {
    pub fn add_order(&mut self, order: Order) -> &mut InMemoryOrderStore {
        self.orders
            .entry(order.shop_id())
            .or_default()
            .push(Arc::new(order));
        self
    }

    pub fn len(&self) -> usize {
        self.orders.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Order> for InMemoryOrderStore {
    fn from_iter<T: IntoIterator<Item = Order>>(iter: T) -> Self {
        let mut store = InMemoryOrderStore::default();
        for order in iter {
            store.add_order(order);
        }
        store
    }
}

impl OrderStore for InMemoryOrderStore {
    fn orders_for_shop(
        &self,
        shop_id: ShopId,
        as_of: Timestamp,
    ) -> Result<Vec<Arc<Order>>, StoreError> {
        Ok(self
            .orders
            .get(&shop_id)
            .map(|orders| {
                orders
                    .iter()
                    .filter(|order| order.window().end() >= as_of)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryCourierStore {
    couriers: FxHashMap<ShopId, Vec<Arc<Courier>>>,
}

impl InMemoryCourierStore {
    pub fn add_courier(&mut self, courier: Courier) -> &mut InMemoryCourierStore {
        self.couriers
            .entry(courier.shop_id())
            .or_default()
            .push(Arc::new(courier));
        self
    }
}

impl FromIterator<Courier> for InMemoryCourierStore {
    fn from_iter<T: IntoIterator<Item = Courier>>(iter: T) -> Self {
        let mut store = InMemoryCourierStore::default();
        for courier in iter {
            store.add_courier(courier);
        }
        store
    }
}

impl CourierStore for InMemoryCourierStore {
    fn couriers_for_shop(
        &self,
        shop_id: ShopId,
        active_only: bool,
    ) -> Result<Vec<Arc<Courier>>, StoreError> {
        Ok(self
            .couriers
            .get(&shop_id)
            .map(|couriers| {
                couriers
                    .iter()
                    .filter(|courier| !active_only || courier.is_active())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
