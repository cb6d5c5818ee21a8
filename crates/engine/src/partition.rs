//! Adaptive range partitioning under an opaque per-query row cap.
//!
//! The portal returns at most `cap` rows per export and gives no other hint
//! that a result was truncated. A page shorter than `cap` is complete; a page
//! that reaches `cap` is discarded and its date range is halved until every
//! leaf query comes back short.
//!
//! The split tree is walked with an explicit stack, depth-first, left half
//! before right half, so the concatenated output is always
//! left-subrange-then-right-subrange regardless of how deep either side went.
//!
//! A leaf that still reaches the cap but cannot be split further (one day,
//! or the depth bound) is kept as returned and reported as a [`CappedLeaf`]:
//! those rows may be incomplete.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::RangeFetcher;
use crate::model::{RangeQuery, Record};

/// Rows the portal reliably exports per query.
pub const DEFAULT_CAP: usize = 499;

/// Bound on split depth. A year halves down to single days in ~9 levels.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapReason {
    /// One-day range still at the cap.
    SinglePoint,
    /// Midpoint does not strictly precede the end of the range.
    Unsplittable,
    /// Split depth reached the configured bound.
    DepthLimit,
}

impl std::fmt::Display for CapReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinglePoint => write!(f, "single_point"),
            Self::Unsplittable => write!(f, "unsplittable"),
            Self::DepthLimit => write!(f, "depth_limit"),
        }
    }
}

/// A leaf accepted while its page was still at the cap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedLeaf {
    pub query: RangeQuery,
    pub returned: usize,
    pub reason: CapReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    /// Fetch calls issued, including pages discarded for splitting.
    pub calls: usize,
    /// Pages kept in the output.
    pub leaves: usize,
    pub max_depth_reached: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Partitioned {
    pub records: Vec<Record>,
    pub stats: PartitionStats,
    pub capped: Vec<CappedLeaf>,
}

impl Partitioned {
    /// False when some leaf may have been truncated by the source.
    pub fn is_complete(&self) -> bool {
        self.capped.is_empty()
    }

    /// Append another partitioned result (used when chaining windows).
    pub fn extend(&mut self, other: Partitioned) {
        self.records.extend(other.records);
        self.stats.calls += other.stats.calls;
        self.stats.leaves += other.stats.leaves;
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(other.stats.max_depth_reached);
        self.capped.extend(other.capped);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdaptivePartitioner {
    cap: usize,
    max_depth: usize,
}

impl Default for AdaptivePartitioner {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl AdaptivePartitioner {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Fetch `query`, splitting until every kept page is below the cap.
    ///
    /// The first fetch error aborts the whole partition.
    pub fn fetch<F: RangeFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
        query: &RangeQuery,
    ) -> Result<Partitioned, FetchError> {
        let mut out = Partitioned::default();
        let mut stack: Vec<(RangeQuery, usize)> = vec![(query.clone(), 0)];

        while let Some((current, depth)) = stack.pop() {
            let page = fetcher.fetch(&current)?;
            out.stats.calls += 1;
            out.stats.max_depth_reached = out.stats.max_depth_reached.max(depth);

            debug!(query = %current, rows = page.len(), depth, "fetched page");

            if page.len() < self.cap {
                out.stats.leaves += 1;
                out.records.extend(page.records);
                continue;
            }

            let capped_reason = if current.is_single_day() {
                Some(CapReason::SinglePoint)
            } else if depth >= self.max_depth {
                Some(CapReason::DepthLimit)
            } else {
                match current.split() {
                    Some((left, right)) => {
                        // Right is pushed first so the left half is walked first.
                        stack.push((right, depth + 1));
                        stack.push((left, depth + 1));
                        None
                    }
                    None => Some(CapReason::Unsplittable),
                }
            };

            if let Some(reason) = capped_reason {
                warn!(
                    query = %current,
                    rows = page.len(),
                    cap = self.cap,
                    %reason,
                    "page at cap cannot be split further; rows may be incomplete"
                );
                out.stats.leaves += 1;
                out.capped.push(CappedLeaf {
                    query: current,
                    returned: page.len(),
                    reason,
                });
                out.records.extend(page.records);
            }
        }

        Ok(out)
    }
}
