use serde::{Deserialize, Serialize};

use super::ids::ShopId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Shop {
    id: ShopId,
    location: geo::Point,
}

impl Shop {
    pub fn new(id: u64, lon: f64, lat: f64) -> Self {
        Shop {
            id: ShopId::new(id),
            location: geo::Point::new(lon, lat),
        }
    }

    pub fn id(&self) -> ShopId {
        self.id
    }

    pub fn location(&self) -> geo::Point {
        self.location
    }
}

impl From<&Shop> for geo::Point {
    fn from(shop: &Shop) -> Self {
        shop.location
    }
}
