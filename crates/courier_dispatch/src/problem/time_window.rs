use std::cmp;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]`.
///
/// Used both for the delivery window of an order and for the window of
/// departure times a route is feasible for.
#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

/// Adds `duration` to `timestamp`, clamping to the representable range.
pub fn offset_timestamp(timestamp: Timestamp, duration: SignedDuration) -> Timestamp {
    timestamp.checked_add(duration).unwrap_or(if duration.is_negative() {
        Timestamp::MIN
    } else {
        Timestamp::MAX
    })
}

impl TimeWindow {
    /// Returns `None` when `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Option<Self> {
        if start > end {
            None
        } else {
            Some(TimeWindow { start, end })
        }
    }

    pub fn unbounded() -> Self {
        TimeWindow {
            start: Timestamp::MIN,
            end: Timestamp::MAX,
        }
    }

    pub fn not_before(start: Timestamp) -> Self {
        TimeWindow {
            start,
            end: Timestamp::MAX,
        }
    }

    pub fn from_iso(start: &str, end: &str) -> Result<Option<Self>, jiff::Error> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    pub fn intersect(&self, other: &TimeWindow) -> Option<TimeWindow> {
        TimeWindow::new(
            cmp::max(self.start, other.start),
            cmp::min(self.end, other.end),
        )
    }

    /// Moves both bounds by `duration`.
    pub fn shift(&self, duration: SignedDuration) -> TimeWindow {
        TimeWindow {
            start: offset_timestamp(self.start, duration),
            end: offset_timestamp(self.end, duration),
        }
    }

    /// Departure times for which a stop reached `arrival_offset` after departure
    /// lands inside this window.
    pub fn departures_for(&self, arrival_offset: SignedDuration) -> TimeWindow {
        self.shift(-arrival_offset)
    }
}

#[derive(Default)]
pub struct TimeWindowBuilder {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindowBuilder {
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_iso_start(mut self, start: &str) -> Self {
        self.start = start.parse().ok();
        self
    }

    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_iso_end(mut self, end: &str) -> Self {
        self.end = end.parse().ok();
        self
    }

    /// Missing bounds are open, `None` when the bounds are reversed.
    pub fn build(self) -> Option<TimeWindow> {
        TimeWindow::new(
            self.start.unwrap_or(Timestamp::MIN),
            self.end.unwrap_or(Timestamp::MAX),
        )
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::from_iso(start, end).unwrap().unwrap()
    }

    #[test]
    fn test_builder() {
        let start: Timestamp = "2025-06-10T08:00:00+02:00".parse().unwrap();
        let end: Timestamp = "2025-06-10T10:00:00+02:00".parse().unwrap();
        let time_window = TimeWindowBuilder::default()
            .with_start(start)
            .with_end(end)
            .build()
            .unwrap();

        assert_eq!(time_window.start(), start);
        assert_eq!(time_window.end(), end);
    }

    #[test]
    fn test_iso_builder() {
        let time_window = TimeWindowBuilder::default()
            .with_iso_start("2025-06-10T08:00:00+02:00")
            .with_iso_end("2025-06-10T10:00:00+02:00")
            .build()
            .unwrap();

        let start: Timestamp = "2025-06-10T08:00:00+02:00".parse().unwrap();
        let end: Timestamp = "2025-06-10T10:00:00+02:00".parse().unwrap();

        assert_eq!(time_window.start(), start);
        assert_eq!(time_window.end(), end);
    }

    #[test]
    fn test_reversed_bounds() {
        assert!(
            TimeWindow::from_iso("2025-06-10T10:00:00Z", "2025-06-10T08:00:00Z")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_intersect() {
        let a = window("2025-06-10T08:00:00Z", "2025-06-10T10:00:00Z");
        let b = window("2025-06-10T09:00:00Z", "2025-06-10T11:00:00Z");
        let c = window("2025-06-10T10:30:00Z", "2025-06-10T11:00:00Z");

        assert_eq!(
            a.intersect(&b),
            Some(window("2025-06-10T09:00:00Z", "2025-06-10T10:00:00Z"))
        );
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_departures_for() {
        let delivery = window("2025-06-10T10:00:00Z", "2025-06-10T12:00:00Z");

        let departures = delivery.departures_for(SignedDuration::from_mins(30));

        assert_eq!(
            departures,
            window("2025-06-10T09:30:00Z", "2025-06-10T11:30:00Z")
        );
    }

    #[test]
    fn test_unbounded_shift_saturates() {
        let unbounded = TimeWindow::unbounded();
        let shifted = unbounded.shift(SignedDuration::from_hours(1));

        assert_eq!(shifted.end(), Timestamp::MAX);
        assert!(shifted.contains("2025-06-10T10:00:00Z".parse().unwrap()));
    }
}
