use serde::{Deserialize, Serialize};

/// Default chunk size: 10 MiB.
///
/// Small enough to stay well under strict proxy request limits, large
/// enough to keep per-chunk request overhead negligible.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// One byte range `[start, end)` of the source, with its ordinal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ChunkSpec {
    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits a total size into sequential fixed-size byte ranges.
///
/// A plan is a pure function of `(total, chunk_size)`: it owns no file
/// handle and can be rebuilt or indexed into at any time, which is what
/// makes caller-level retry cheap — no prior chunk ever needs re-reading
/// to know the ranges.
///
/// The ranges are `[i*C, min((i+1)*C, total))` for `i` in
/// `0..ceil(total/C)`; they are contiguous, non-overlapping, and cover
/// exactly `[0, total)`. An empty source yields an empty plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Creates a plan for `total` bytes in `chunk_size` steps.
    ///
    /// A `chunk_size` of 0 falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn new(total: u64, chunk_size: u64) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self { total, chunk_size }
    }

    /// Total size covered by the plan.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Configured chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks in the plan: `ceil(total / chunk_size)`.
    pub fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size) as usize
    }

    /// Returns the chunk at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<ChunkSpec> {
        if index >= self.chunk_count() {
            return None;
        }
        let start = index as u64 * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total);
        Some(ChunkSpec { index, start, end })
    }

    /// Iterates the chunks in index order.
    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            plan: *self,
            next: 0,
        }
    }
}

impl IntoIterator for ChunkPlan {
    type Item = ChunkSpec;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> ChunkIter {
        self.iter()
    }
}

/// Iterator over a [`ChunkPlan`] in strictly increasing index order.
#[derive(Debug, Clone)]
pub struct ChunkIter {
    plan: ChunkPlan,
    next: usize,
}

impl Iterator for ChunkIter {
    type Item = ChunkSpec;

    fn next(&mut self) -> Option<ChunkSpec> {
        let spec = self.plan.get(self.next)?;
        self.next += 1;
        Some(spec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.chunk_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}
