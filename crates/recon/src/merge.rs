use std::collections::HashSet;

use licita_engine::{Bucket, BucketSet};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Rows carried over from the prior report.
    pub prior: usize,
    /// Rows in the fresh bucket.
    pub fresh: usize,
    /// Fresh rows whose key was not in the prior report.
    pub added: usize,
}

#[derive(Debug, Clone)]
pub struct Merged {
    pub bucket: Bucket,
    pub stats: MergeStats,
}

/// Append fresh records unknown to `prior`, keeping prior rows as they are.
///
/// Without a prior bucket the fresh one is returned unchanged. Records that
/// vanished from the source stay in the report. Each new key is appended once,
/// at its first occurrence in `fresh`.
pub fn merge(fresh: Bucket, prior: Option<&Bucket>) -> Merged {
    let fresh_len = fresh.len();

    let Some(prior) = prior else {
        return Merged {
            stats: MergeStats {
                prior: 0,
                fresh: fresh_len,
                added: fresh_len,
            },
            bucket: fresh,
        };
    };

    let mut known: HashSet<String> = prior.keys().map(str::to_string).collect();
    let mut records = prior.records.clone();
    let mut added = 0;

    for record in fresh.records {
        if known.insert(record.key.clone()) {
            records.push(record);
            added += 1;
        }
    }

    debug!(bucket = %fresh.name, prior = prior.len(), fresh = fresh_len, added, "merged bucket");

    Merged {
        bucket: Bucket::new(fresh.name, records),
        stats: MergeStats {
            prior: prior.len(),
            fresh: fresh_len,
            added,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergedSet {
    pub buckets: BucketSet,
    /// Per-bucket stats, in bucket order.
    pub stats: Vec<(String, MergeStats)>,
}

impl MergedSet {
    /// New rows across every bucket.
    pub fn added(&self) -> usize {
        self.stats.iter().map(|(_, s)| s.added).sum()
    }

    /// New rows in the named bucket.
    pub fn added_to(&self, name: &str) -> usize {
        self.stats
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0, |(_, s)| s.added)
    }
}

/// Merge every fresh bucket with the prior bucket of the same name.
///
/// Bucket order follows `fresh`. Prior buckets with no fresh counterpart are
/// not carried over.
pub fn merge_all(fresh: BucketSet, prior: Option<&BucketSet>) -> MergedSet {
    let mut out = MergedSet::default();
    for bucket in fresh {
        let name = bucket.name.clone();
        let merged = merge(bucket, prior.and_then(|p| p.get(&name)));
        out.stats.push((name, merged.stats));
        out.buckets.push(merged.bucket);
    }
    out
}
