use serde::{Deserialize, Serialize};

use crate::search::subset_space::{MAX_DEPTH, subset_space_size};

/// Route-length policy: how deep an exhaustive search may go for a number of orders.
pub trait DepthPolicy: Send + Sync {
    /// Deepest search, in `1..=8`, affordable over `order_count` orders.
    fn max_depth_for(&self, order_count: usize) -> usize;

    /// Largest number of orders that can be searched at `depth`.
    fn max_orders_for(&self, depth: usize) -> usize;
}

/// Allows a search as long as its subset space stays within `budget` subsets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetBudgetPolicy {
    budget: u64,
}

impl Default for SubsetBudgetPolicy {
    fn default() -> Self {
        // Full use of the search workers at their default budget
        SubsetBudgetPolicy {
            budget: 1_600_000,
        }
    }
}

impl SubsetBudgetPolicy {
    pub fn new(budget: u64) -> Self {
        SubsetBudgetPolicy {
            budget: budget.max(1),
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    fn fits(&self, order_count: usize, depth: usize) -> bool {
        subset_space_size(order_count, depth) <= self.budget as u128
    }
}

impl DepthPolicy for SubsetBudgetPolicy {
    fn max_depth_for(&self, order_count: usize) -> usize {
        (1..=MAX_DEPTH)
            .rev()
            .find(|&depth| self.fits(order_count, depth))
            .unwrap_or(1)
    }

    fn max_orders_for(&self, depth: usize) -> usize {
        let depth = depth.clamp(1, MAX_DEPTH);

        // S(n, depth) >= n, so the answer is at most the budget
        let mut low = 0usize;
        let mut high = usize::try_from(self.budget).unwrap_or(usize::MAX);

        while low < high {
            let mid = low + (high - low).div_ceil(2);
            if self.fits(mid, depth) {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        low
    }
}
