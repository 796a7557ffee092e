use smallvec::SmallVec;

/// Deepest exhaustive search, and longest route.
pub const MAX_DEPTH: usize = 8;

/// Ascending indices of a subset of orders.
pub type Subset = SmallVec<[usize; MAX_DEPTH]>;

/// `C(n, k)`, saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }

    let k = k.min(n - k);
    let mut result: u128 = 1;

    for i in 0..k {
        // result * (n - i) is divisible by (i + 1)
        result = match result.checked_mul((n - i) as u128) {
            Some(value) => value / (i as u128 + 1),
            None => return u128::MAX,
        };
    }

    result
}

/// Number of nonempty subsets of at most `depth` elements out of `n`.
pub fn subset_space_size(n: usize, depth: usize) -> u128 {
    (1..=depth.min(n)).fold(0u128, |acc, k| acc.saturating_add(binomial(n, k)))
}

/// `min(max_workers, ceil(size / per_worker_budget))`, at least one.
pub fn worker_count(size: u128, per_worker_budget: u128, max_workers: usize) -> usize {
    let needed = size.div_ceil(per_worker_budget.max(1));
    needed.clamp(1, max_workers.max(1) as u128) as usize
}

/// A run of consecutive subsets in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetRange {
    pub first: Subset,
    /// Rank of `first`.
    pub start: u128,
    pub count: u128,
}

/// All nonempty subsets of at most `depth` indices out of `0..n`, in canonical
/// nested-lexicographic order: every subset of size 1 in index order, then every
/// subset of size 2 ordered by `(i1, i2)`, and so on up to size `depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetSpace {
    n: usize,
    depth: usize,
}

impl SubsetSpace {
    pub fn new(n: usize, depth: usize) -> Self {
        SubsetSpace {
            n,
            depth: depth.min(MAX_DEPTH),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn size(&self) -> u128 {
        subset_space_size(self.n, self.depth)
    }

    pub fn first(&self) -> Option<Subset> {
        if self.n == 0 || self.depth == 0 {
            None
        } else {
            Some(smallvec::smallvec![0])
        }
    }

    /// Subset at position `rank`, `None` past the end.
    pub fn unrank(&self, rank: u128) -> Option<Subset> {
        let mut rank = rank;

        for size in 1..=self.depth.min(self.n) {
            let count = binomial(self.n, size);
            if rank < count {
                return Some(self.unrank_combination(size, rank));
            }
            rank -= count;
        }

        None
    }

    /// Lexicographic unranking among the subsets of exactly `size` elements.
    fn unrank_combination(&self, size: usize, mut rank: u128) -> Subset {
        let mut subset = Subset::new();
        let mut candidate = 0;

        for position in 0..size {
            loop {
                let remaining = size - position - 1;
                let with_candidate = binomial(self.n - candidate - 1, remaining);
                if rank < with_candidate {
                    break;
                }
                rank -= with_candidate;
                candidate += 1;
            }

            subset.push(candidate);
            candidate += 1;
        }

        subset
    }

    /// Position of `subset`, `None` when it does not belong to this space.
    pub fn rank(&self, subset: &[usize]) -> Option<u128> {
        let size = subset.len();
        if size == 0 || size > self.depth || size > self.n {
            return None;
        }

        if !subset.windows(2).all(|pair| pair[0] < pair[1]) || subset[size - 1] >= self.n {
            return None;
        }

        let mut rank = (1..size).map(|k| binomial(self.n, k)).sum::<u128>();
        let mut candidate = 0;

        for (position, &index) in subset.iter().enumerate() {
            let remaining = size - position - 1;
            while candidate < index {
                rank += binomial(self.n - candidate - 1, remaining);
                candidate += 1;
            }
            candidate += 1;
        }

        Some(rank)
    }

    /// Advances `subset` to the next one in canonical order, returns `false` when it
    /// was the last.
    pub fn successor(&self, subset: &mut Subset) -> bool {
        let size = subset.len();
        if size == 0 {
            return false;
        }

        // Rightmost position that can still be incremented
        let mut position = size;
        while position > 0 && subset[position - 1] == self.n - size + position - 1 {
            position -= 1;
        }

        if position > 0 {
            subset[position - 1] += 1;
            for next in position..size {
                subset[next] = subset[next - 1] + 1;
            }
            return true;
        }

        if size < self.depth && size < self.n {
            subset.clear();
            subset.extend(0..=size);
            return true;
        }

        false
    }

    pub fn iter(&self) -> SubsetIter {
        SubsetIter {
            space: *self,
            next: self.first(),
            remaining: self.size(),
        }
    }

    /// Iterates the `count` subsets of `range`.
    pub fn iter_range(&self, range: &SubsetRange) -> SubsetIter {
        SubsetIter {
            space: *self,
            next: Some(range.first.clone()),
            remaining: range.count,
        }
    }

    /// Splits the space into at most `workers` contiguous ranges of
    /// `ceil(size / workers)` subsets, the last one holding the remainder. Empty
    /// ranges are dropped.
    pub fn partition(&self, workers: usize) -> Vec<SubsetRange> {
        let size = self.size();
        if size == 0 {
            return Vec::new();
        }

        let workers = workers.max(1) as u128;
        let len = size.div_ceil(workers);

        let mut ranges = Vec::with_capacity(workers as usize);
        let mut start = 0;

        while start < size {
            let Some(first) = self.unrank(start) else {
                break;
            };
            let count = len.min(size - start);

            ranges.push(SubsetRange {
                first,
                start,
                count,
            });
            start += count;
        }

        ranges
    }
}

pub struct SubsetIter {
    space: SubsetSpace,
    next: Option<Subset>,
    remaining: u128,
}

impl Iterator for SubsetIter {
    type Item = Subset;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let current = self.next.take()?;
        self.remaining -= 1;

        if self.remaining > 0 {
            let mut successor = current.clone();
            if self.space.successor(&mut successor) {
                self.next = Some(successor);
            }
        }

        Some(current)
    }
}
