use jiff::SignedDuration;

use crate::problem::{
    route_candidate::{MAX_ROUTE_STOPS, Stop, Stops},
    time_window::TimeWindow,
};

use super::route_costing::{CostingError, CostingRequest};

/// Timing, load and distance of a stop sequence visited in order.
#[derive(Debug, Clone)]
pub struct RouteProfile {
    pub stops: Stops,
    pub delivery_interval: TimeWindow,
    pub total_weight: f64,
    pub total_distance: f64,
    /// From the departure until the last hand-in, or the return for round trips.
    pub total_duration: SignedDuration,
}

/// Validates the indices of a request against its matrix.
pub fn check_request(request: &CostingRequest<'_>) -> Result<(), CostingError> {
    let num_orders = request.matrix.num_orders();

    if request.orders.len() != num_orders {
        return Err(CostingError::MatrixMismatch {
            orders: request.orders.len(),
            num_orders,
        });
    }

    if request.stops.is_empty() {
        return Err(CostingError::EmptyRoute);
    }

    if request.stops.len() > MAX_ROUTE_STOPS {
        return Err(CostingError::TooManyStops {
            stops: request.stops.len(),
            max: MAX_ROUTE_STOPS,
        });
    }

    if let Some(&index) = request.stops.iter().find(|&&index| index >= num_orders) {
        return Err(CostingError::StopOutOfRange { index, num_orders });
    }

    Ok(())
}

/// Walks `sequence` from the shop and returns its profile, `None` when the courier
/// cannot serve it (weight, distance, reachability or time windows).
///
/// Indices must have been validated with [`check_request`].
pub fn evaluate_sequence(request: &CostingRequest<'_>, sequence: &[usize]) -> Option<RouteProfile> {
    let courier = request.courier;
    let matrix = request.matrix;
    let shop = matrix.shop_index();

    let mut total_weight = 0.0;
    for &index in sequence {
        let weight = request.orders[index].weight();
        if !courier.can_carry(weight) {
            return None;
        }
        total_weight += weight;
    }

    if total_weight > courier.max_weight() {
        return None;
    }

    let mut stops = Stops::new();
    let mut interval = TimeWindow::not_before(request.not_before);
    let mut arrival_offset = SignedDuration::ZERO;
    let mut total_distance = 0.0;
    let mut previous = shop;

    for (position, &index) in sequence.iter().enumerate() {
        if !matrix.is_reachable(previous, index) {
            return None;
        }

        let leg_distance = matrix.distance(previous, index);
        let leg_time = matrix.travel_time(previous, index);

        arrival_offset = if position == 0 {
            leg_time
        } else {
            arrival_offset
                .checked_add(courier.hand_in_duration())?
                .checked_add(leg_time)?
        };

        interval = interval.intersect(&request.orders[index].window().departures_for(arrival_offset))?;
        total_distance += leg_distance;

        stops.push(Stop {
            order_id: request.orders[index].id(),
            arrival_offset,
            leg_distance,
        });

        previous = index;
    }

    let mut total_duration = arrival_offset.checked_add(courier.hand_in_duration())?;

    if courier.returns_to_shop() {
        if !matrix.is_reachable(previous, shop) {
            return None;
        }
        total_distance += matrix.distance(previous, shop);
        total_duration = total_duration.checked_add(matrix.travel_time(previous, shop))?;
    }

    if total_distance > courier.max_distance() {
        return None;
    }

    Some(RouteProfile {
        stops,
        delivery_interval: interval,
        total_weight,
        total_distance,
        total_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        costing::route_costing::StopOrdering,
        test_utils::{self, as_of, line_matrix},
    };

    #[test]
    fn test_profile_of_sequence() {
        let orders = vec![test_utils::order(1, 2.0), test_utils::order(2, 3.0)];
        let matrix = line_matrix(2);
        let courier = test_utils::courier_with(2, |builder| {
            builder.set_hand_in_duration(SignedDuration::from_mins(2));
        });

        let request = CostingRequest {
            courier: &courier,
            orders: &orders,
            matrix: &matrix,
            stops: &[0, 1],
            ordering: StopOrdering::Fixed,
            not_before: as_of(),
        };
        check_request(&request).unwrap();

        let profile = evaluate_sequence(&request, &[0, 1]).unwrap();

        assert_eq!(profile.total_weight, 5.0);
        assert_eq!(profile.total_distance, 2000.0);
        assert_eq!(profile.stops[0].arrival_offset, SignedDuration::from_secs(100));
        // 100s to the first stop, 2min hand-in, 100s to the second stop
        assert_eq!(profile.stops[1].arrival_offset, SignedDuration::from_secs(320));
        assert_eq!(profile.total_duration, SignedDuration::from_secs(440));
    }

    #[test]
    fn test_profile_rejects_overweight() {
        let orders = vec![test_utils::order(1, 6.0), test_utils::order(2, 6.0)];
        let matrix = line_matrix(2);
        let courier = test_utils::courier_with(2, |builder| {
            builder.set_max_weight(10.0);
        });

        let request = CostingRequest {
            courier: &courier,
            orders: &orders,
            matrix: &matrix,
            stops: &[0, 1],
            ordering: StopOrdering::Fixed,
            not_before: as_of(),
        };

        assert!(evaluate_sequence(&request, &[0]).is_some());
        assert!(evaluate_sequence(&request, &[0, 1]).is_none());
    }

    #[test]
    fn test_profile_rejects_disjoint_windows() {
        let orders = vec![
            test_utils::order_with_window(1, 1.0, "2025-06-10T10:00:00Z", "2025-06-10T10:30:00Z"),
            test_utils::order_with_window(2, 1.0, "2025-06-10T14:00:00Z", "2025-06-10T15:00:00Z"),
        ];
        let matrix = line_matrix(2);
        let courier = test_utils::courier(2);

        let request = CostingRequest {
            courier: &courier,
            orders: &orders,
            matrix: &matrix,
            stops: &[0, 1],
            ordering: StopOrdering::Fixed,
            not_before: as_of(),
        };

        assert!(evaluate_sequence(&request, &[0, 1]).is_none());
    }

    #[test]
    fn test_round_trip_counts_return_leg() {
        let orders = vec![test_utils::order(1, 1.0)];
        let matrix = line_matrix(1);
        let courier = test_utils::courier_with(1, |builder| {
            builder.set_returns_to_shop(true).set_max_distance(1500.0);
        });

        let request = CostingRequest {
            courier: &courier,
            orders: &orders,
            matrix: &matrix,
            stops: &[0],
            ordering: StopOrdering::Fixed,
            not_before: as_of(),
        };

        // 1km out and 1km back
        assert!(evaluate_sequence(&request, &[0]).is_none());
    }

    #[test]
    fn test_check_request_out_of_range() {
        let orders = vec![test_utils::order(1, 1.0)];
        let matrix = line_matrix(1);
        let courier = test_utils::courier(1);

        let request = CostingRequest {
            courier: &courier,
            orders: &orders,
            matrix: &matrix,
            stops: &[1],
            ordering: StopOrdering::Fixed,
            not_before: as_of(),
        };

        assert!(matches!(
            check_request(&request),
            Err(CostingError::StopOutOfRange { index: 1, .. })
        ));
    }
}
