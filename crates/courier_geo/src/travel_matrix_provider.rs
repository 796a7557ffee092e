use serde::{Deserialize, Serialize};

use crate::travel_matrices::TravelMatrices;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TravelMatrixProvider {
    AsTheCrowFlies {
        speed_kmh: f64,
    },

    /// Precomputed matrices, the points must be passed in the same order they were computed for.
    Custom {
        matrices: TravelMatrices,
    },
}

impl std::hash::Hash for TravelMatrixProvider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                state.write_u8(0);
                state.write_u64(speed_kmh.to_bits());
            }
            TravelMatrixProvider::Custom { matrices } => {
                state.write_u8(1);
                matrices.hash(state);
            }
        }
    }
}

impl TravelMatrixProvider {
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, TravelMatrixProvider::Custom { .. })
    }
}
