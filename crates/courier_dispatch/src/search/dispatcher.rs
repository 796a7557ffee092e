use std::sync::Arc;

use jiff::Timestamp;
use tracing::{debug, instrument};

use crate::{
    error::DispatchError,
    params::SearchParams,
    problem::{courier::Courier, geo_matrix::GeoMatrix, order::Order, route_candidate::RouteCandidate},
    timer_debug,
    utils::fork_join::fork_join,
};

use super::{
    kernel::search_subsets,
    subset_space::{MAX_DEPTH, SubsetSpace, worker_count},
    subset_table::SubsetTable,
};

/// One exhaustive search over `orders` at `depth`.
pub struct SearchTask<'a> {
    /// Sorted ascending by id and aligned with the matrix.
    pub orders: &'a [Arc<Order>],
    pub depth: usize,
    pub courier: &'a Courier,
    pub matrix: &'a GeoMatrix,
    pub not_before: Timestamp,
}

impl SearchTask<'_> {
    fn validate(&self) -> Result<(), DispatchError> {
        if !(1..=MAX_DEPTH).contains(&self.depth) {
            return Err(DispatchError::validation(format!(
                "search depth {} is outside 1..={MAX_DEPTH}",
                self.depth
            )));
        }

        if self.orders.len() != self.matrix.num_orders() {
            return Err(DispatchError::validation(format!(
                "{} orders searched with a geo matrix of {} orders",
                self.orders.len(),
                self.matrix.num_orders()
            )));
        }

        if !self.orders.is_sorted_by_key(|order| order.id()) {
            return Err(DispatchError::validation("search orders must be sorted by id"));
        }

        Ok(())
    }
}

/// How the subsets of a multi worker search are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPlan {
    Inline,
    /// Written out up front, worker `w` takes rows `w, w + T, w + 2T, ...`.
    StridedTable { workers: usize },
    /// Contiguous ranges located by unranking their first subset.
    AnalyticRanges { workers: usize },
}

pub struct ParallelSearchDispatcher {
    params: SearchParams,
}

impl ParallelSearchDispatcher {
    pub fn new(params: SearchParams) -> Self {
        ParallelSearchDispatcher { params }
    }

    pub fn plan(&self, space: &SubsetSpace) -> SearchPlan {
        let size = space.size();
        let workers = worker_count(
            size,
            self.params.subsets_per_worker as u128,
            self.params.max_workers,
        );

        if workers <= 1 {
            SearchPlan::Inline
        } else if size <= self.params.materialize_threshold as u128 {
            SearchPlan::StridedTable { workers }
        } else {
            SearchPlan::AnalyticRanges { workers }
        }
    }

    /// Runs the search and returns the feasible candidates, merged by worker index.
    #[instrument(skip_all, level = "debug", fields(orders = task.orders.len(), depth = task.depth))]
    pub fn dispatch(&self, task: &SearchTask<'_>) -> Result<Vec<RouteCandidate>, DispatchError> {
        task.validate()?;

        if task.orders.is_empty() {
            debug!("Nothing to search");
            return Ok(Vec::new());
        }

        let space = SubsetSpace::new(task.orders.len(), task.depth);
        let plan = self.plan(&space);

        debug!(size = %space.size(), ?plan, "Searching subset space");

        let outputs = match plan {
            SearchPlan::Inline => {
                return timer_debug!("Inline search", search_subsets(task, space.iter(), || false));
            }
            SearchPlan::StridedTable { workers } => {
                let table = timer_debug!("Subset table", SubsetTable::generate(&space));

                timer_debug!(
                    "Strided search",
                    fork_join("search", workers, self.params.timeout, |context| {
                        search_subsets(task, table.strided(context.index, context.count), || {
                            context.is_cancelled()
                        })
                    })
                )?
            }
            SearchPlan::AnalyticRanges { workers } => {
                let ranges = space.partition(workers);

                timer_debug!(
                    "Range search",
                    fork_join("search", ranges.len(), self.params.timeout, |context| {
                        search_subsets(task, space.iter_range(&ranges[context.index]), || {
                            context.is_cancelled()
                        })
                    })
                )?
            }
        };

        let total = outputs.iter().map(Vec::len).sum();
        let mut merged = Vec::with_capacity(total);
        for output in outputs {
            merged.extend(output);
        }

        debug!(candidates = merged.len(), "Search done");

        Ok(merged)
    }
}
