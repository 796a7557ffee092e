use std::cmp::Ordering;

use crate::problem::geo_matrix::GeoMatrix;

/// Picks up to `target` orders around the order with the most neighbours within
/// `radius` meters, closest first.
///
/// Returns the matrix indices sorted ascending, or `None` when the densest cloud
/// holds fewer than `density * target` orders.
pub fn select_cloud(
    matrix: &GeoMatrix,
    remaining: &[usize],
    target: usize,
    radius: f64,
    density: f64,
) -> Option<Vec<usize>> {
    if target == 0 || remaining.is_empty() {
        return None;
    }

    if remaining.len() <= target {
        return Some(remaining.to_vec());
    }

    let within_radius =
        |center: usize, other: usize| matrix.symmetric_distance(center, other) <= radius;

    let mut best_center = None;
    let mut best_count = 0;

    for &center in remaining {
        let count = remaining
            .iter()
            .filter(|&&other| within_radius(center, other))
            .count();

        if count > best_count {
            best_count = count;
            best_center = Some(center);
        }
    }

    let center = best_center?;

    let mut members = remaining
        .iter()
        .copied()
        .filter(|&other| within_radius(center, other))
        .map(|other| (matrix.symmetric_distance(center, other), other))
        .collect::<Vec<_>>();

    members.sort_by(|(a_distance, a), (b_distance, b)| {
        a_distance
            .partial_cmp(b_distance)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(b))
    });
    members.truncate(target);

    let required = (density * target as f64).ceil() as usize;
    if members.len() < required {
        return None;
    }

    let mut cloud = members.into_iter().map(|(_, index)| index).collect::<Vec<_>>();
    cloud.sort_unstable();

    Some(cloud)
}
