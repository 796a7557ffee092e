use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("matrix has {actual} cells, expected {expected} for {num_points} points")]
    InvalidSize {
        num_points: usize,
        expected: usize,
        actual: usize,
    },

    #[error("matrix contains a negative or NaN value at ({from}, {to})")]
    InvalidValue { from: usize, to: usize },
}

/// TravelMatrices holds the travel distance (meters) and time (seconds) matrices.
/// Stored as flat vectors, `index = from * num_points + to`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    pub distances: Vec<f64>,
    pub times: Vec<f64>,
}

impl TravelMatrices {
    pub fn num_points(&self) -> usize {
        self.distances.len().isqrt()
    }

    /// Checks the matrices are square, of the same size, and hold no negative values.
    /// `f64::INFINITY` is allowed and means the pair is unreachable.
    pub fn validate(&self, num_points: usize) -> Result<(), MatrixError> {
        let expected = num_points * num_points;
        for actual in [self.distances.len(), self.times.len()] {
            if actual != expected {
                return Err(MatrixError::InvalidSize {
                    num_points,
                    expected,
                    actual,
                });
            }
        }

        for (index, (&distance, &time)) in self.distances.iter().zip(&self.times).enumerate() {
            if distance.is_nan() || time.is_nan() || distance < 0.0 || time < 0.0 {
                return Err(MatrixError::InvalidValue {
                    from: index / num_points,
                    to: index % num_points,
                });
            }
        }

        Ok(())
    }
}

impl std::hash::Hash for TravelMatrices {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for d in &self.distances {
            state.write_u64(d.to_bits());
        }
        for t in &self.times {
            state.write_u64(t.to_bits());
        }
    }
}
