use super::subset_space::SubsetSpace;

const PADDING: usize = usize::MAX;

/// Every subset of a [`SubsetSpace`] written out, one row of `depth` indices per
/// subset, shorter subsets padded.
///
/// Only worth it for small spaces, workers then read interleaved rows.
pub struct SubsetTable {
    width: usize,
    rows: Vec<usize>,
}

impl SubsetTable {
    pub fn generate(space: &SubsetSpace) -> Self {
        let width = space.depth();
        let mut rows = Vec::with_capacity(space.size() as usize * width);

        for subset in space.iter() {
            rows.extend_from_slice(&subset);
            rows.extend(std::iter::repeat_n(PADDING, width - subset.len()));
        }

        SubsetTable { width, rows }
    }

    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.rows.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, index: usize) -> &[usize] {
        let row = &self.rows[index * self.width..(index + 1) * self.width];
        let len = row.iter().position(|&value| value == PADDING).unwrap_or(row.len());
        &row[..len]
    }

    /// Rows `worker, worker + workers, worker + 2 * workers, ...`.
    pub fn strided(&self, worker: usize, workers: usize) -> impl Iterator<Item = &[usize]> + '_ {
        (worker..self.len())
            .step_by(workers.max(1))
            .map(|index| self.row(index))
    }
}
