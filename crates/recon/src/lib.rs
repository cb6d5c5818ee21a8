//! `licita-recon`: classification and incremental merge of notices.
//!
//! Pure crate: receives fetched records and prior buckets, returns buckets.
//! No CLI or IO dependencies.

pub mod classify;
pub mod merge;

pub use classify::{
    classify, parse_estimated_value, Classified, ClassifierRules, ClassifyStats, KeywordBucket,
    ROLLUP_BUCKET,
};
pub use merge::{merge, merge_all, MergeStats, Merged, MergedSet};
