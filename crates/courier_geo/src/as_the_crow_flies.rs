use geo::{Distance, Haversine};

use crate::travel_matrices::TravelMatrices;

/// Builds straight-line matrices, distances in meters and times in seconds
/// at a constant `speed_kmh`.
pub fn as_the_crow_flies_matrices<P>(points: &[P], speed_kmh: f64) -> TravelMatrices
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let num_points = points.len();
    let mut distances: Vec<f64> = vec![0.0; num_points * num_points];
    let mut times: Vec<f64> = vec![0.0; num_points * num_points];

    let speed = speed_kmh / 3.6;

    for (i, from) in points.iter().enumerate() {
        let from: geo_types::Point = from.into();
        for (j, to) in points.iter().enumerate() {
            if i == j {
                continue;
            }

            let to: geo_types::Point = to.into();
            let distance = Haversine.distance(from, to);
            distances[i * num_points + j] = distance;
            times[i * num_points + j] = if speed > 0.0 {
                distance / speed
            } else {
                f64::INFINITY
            };
        }
    }

    TravelMatrices { distances, times }
}
