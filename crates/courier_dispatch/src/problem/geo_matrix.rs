use std::sync::Arc;

use courier_geo::travel_matrices::{MatrixError, TravelMatrices};
use jiff::SignedDuration;

use crate::error::DispatchError;

pub type Distance = f64;
pub type Time = f64;

/// Distance (meters) and travel time (seconds) between the orders of a search
/// and their shop.
///
/// Indices `0..num_orders` are the orders sorted ascending by id, the shop is the
/// last index. Values are stored flat, `index = from * num_points + to`.
#[derive(Debug, Clone)]
pub struct GeoMatrix {
    distances: Arc<Vec<Distance>>,
    times: Arc<Vec<Time>>,
    num_points: usize,
}

impl GeoMatrix {
    pub fn new(distances: Vec<Vec<Distance>>, times: Vec<Vec<Time>>) -> Result<Self, DispatchError> {
        let num_points = distances.len();
        if num_points == 0 {
            return Err(DispatchError::validation("geo matrix needs at least the shop"));
        }

        let is_square = |matrix: &[Vec<f64>]| {
            matrix.len() == num_points && matrix.iter().all(|row| row.len() == num_points)
        };

        if !is_square(&distances) || !is_square(&times) {
            return Err(DispatchError::validation(format!(
                "geo matrix must be {num_points}x{num_points}"
            )));
        }

        Ok(GeoMatrix {
            distances: Arc::new(distances.into_iter().flatten().collect()),
            times: Arc::new(times.into_iter().flatten().collect()),
            num_points,
        })
    }

    /// Wraps provider matrices, the shop being the last point.
    pub fn from_travel_matrices(matrices: TravelMatrices) -> Result<Self, MatrixError> {
        let num_points = matrices.num_points();
        if num_points == 0 {
            return Err(MatrixError::InvalidSize {
                num_points: 1,
                expected: 1,
                actual: matrices.distances.len(),
            });
        }

        matrices.validate(num_points)?;

        Ok(GeoMatrix {
            distances: Arc::new(matrices.distances),
            times: Arc::new(matrices.times),
            num_points,
        })
    }

    #[cfg(test)]
    pub fn from_constant(num_orders: usize, distance: Distance, time: Time) -> Self {
        let num_points = num_orders + 1;
        let mut distances = vec![distance; num_points * num_points];
        let mut times = vec![time; num_points * num_points];
        for i in 0..num_points {
            distances[i * num_points + i] = 0.0;
            times[i * num_points + i] = 0.0;
        }

        GeoMatrix {
            distances: Arc::new(distances),
            times: Arc::new(times),
            num_points,
        }
    }

    #[inline(always)]
    fn index(&self, from: usize, to: usize) -> usize {
        from * self.num_points + to
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_orders(&self) -> usize {
        self.num_points - 1
    }

    pub fn shop_index(&self) -> usize {
        self.num_points - 1
    }

    #[inline(always)]
    pub fn distance(&self, from: usize, to: usize) -> Distance {
        if from == to {
            return 0.0;
        }

        self.distances[self.index(from, to)]
    }

    /// Travel time, [`SignedDuration::MAX`] when the pair is unreachable.
    #[inline(always)]
    pub fn travel_time(&self, from: usize, to: usize) -> SignedDuration {
        if from == to {
            return SignedDuration::ZERO;
        }

        SignedDuration::try_from_secs_f64(self.times[self.index(from, to)])
            .unwrap_or(SignedDuration::MAX)
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        let index = self.index(from, to);
        self.distances[index].is_finite() && self.times[index].is_finite()
    }

    /// Average of both directions, used as the pairwise geo distance when clustering.
    pub fn symmetric_distance(&self, a: usize, b: usize) -> Distance {
        (self.distance(a, b) + self.distance(b, a)) / 2.0
    }
}
