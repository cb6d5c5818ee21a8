//! `licita-engine`: record model and adaptive range retrieval.
//!
//! Pure crate: the portal itself sits behind [`RangeFetcher`]; no IO here.

pub mod error;
pub mod fetch;
pub mod model;
pub mod partition;
pub mod plan;

pub use error::{EngineError, FetchError};
pub use fetch::RangeFetcher;
pub use model::{Bucket, BucketSet, DateWindow, RangeQuery, Record, RecordClass, ResultPage};
pub use partition::{AdaptivePartitioner, CapReason, CappedLeaf, PartitionStats, Partitioned};
pub use plan::{plan_keyword_windows, plan_works_windows, WindowPolicy};
