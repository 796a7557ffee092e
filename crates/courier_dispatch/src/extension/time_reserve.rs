use jiff::SignedDuration;
use smallvec::SmallVec;

use crate::problem::{route_candidate::MAX_ROUTE_STOPS, time_window::TimeWindow};

type Windows = SmallVec<[Option<TimeWindow>; MAX_ROUTE_STOPS + 1]>;

/// Departure windows of a route split at every position, so that inserting a
/// stop can be checked without walking the route again.
///
/// `before[m]` intersects the departure windows of the stops `0..m` with the
/// earliest departure, `after[m]` those of the stops `m..`. Delaying the stops
/// `m..` by `delay` moves `after[m]` earlier by the same amount.
#[derive(Debug, Clone)]
pub struct TimeReserve {
    before: Windows,
    after: Windows,
}

impl TimeReserve {
    /// `departures[k]` is the window of departures for which stop `k` is on time.
    pub fn new(not_before: TimeWindow, departures: &[TimeWindow]) -> Self {
        let len = departures.len();

        let mut before = Windows::with_capacity(len + 1);
        before.push(Some(not_before));
        for departure in departures {
            let previous = before.last().copied().flatten();
            before.push(previous.and_then(|window| window.intersect(departure)));
        }

        let mut after: Windows = SmallVec::from_elem(None, len + 1);
        after[len] = Some(TimeWindow::unbounded());
        // Backward scan
        for k in (0..len).rev() {
            after[k] = after[k + 1].and_then(|window| window.intersect(&departures[k]));
        }

        TimeReserve { before, after }
    }

    pub fn len(&self) -> usize {
        self.before.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Departure window of the whole route.
    pub fn route_interval(&self) -> Option<TimeWindow> {
        self.before[self.len()]
    }

    /// Departure window after inserting a stop before position `position`, the
    /// inserted stop being on time for `inserted` and the stops from `position`
    /// on being reached `delay` later than before.
    pub fn insertion_interval(
        &self,
        position: usize,
        inserted: &TimeWindow,
        delay: SignedDuration,
    ) -> Option<TimeWindow> {
        let before = self.before[position]?;
        let after = self.after[position]?.shift(-delay);

        before.intersect(inserted)?.intersect(&after)
    }
}
