use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Record class
// ---------------------------------------------------------------------------

/// The two families of notices retrieved from the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClass {
    /// Every "Obra" notice of a convocation year, partitioned by date only.
    Works,
    /// Notices matched by a description keyword on the portal side.
    Glazing,
}

impl RecordClass {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Works => "works",
            Self::Glazing => "glazing",
        }
    }

    /// File name prefix of the persisted report for this class.
    pub fn report_prefix(&self) -> &'static str {
        match self {
            Self::Works => "SEACE_OBRAS",
            Self::Glazing => "SEACE_VIDRIOS",
        }
    }

    pub fn report_file_name(&self, year: i32) -> String {
        format!("{}_{year}.xlsx", self.report_prefix())
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "works" | "obras" => Some(Self::Works),
            "glazing" | "vidrios" => Some(Self::Glazing),
            _ => None,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One announcement as exported by the portal (record-number column dropped).
///
/// `key` is the nomenclature string and is the only identity: two fetches of
/// the same announcement are the same record even if other fields drift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub key: String,
    pub published_at: NaiveDateTime,
    pub entity_name: String,
    pub object_category: String,
    pub description: String,
    /// Locale-formatted decimal ("4,000,001.00"); may be blank or malformed.
    pub estimated_value: String,
    pub currency: String,
    pub restarted_from: Option<String>,
    pub portal_version: String,
}

impl Record {
    pub fn same_announcement(&self, other: &Record) -> bool {
        self.key == other.key
    }
}

// ---------------------------------------------------------------------------
// Range query
// ---------------------------------------------------------------------------

/// One bounded query against the portal. `start <= end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeQuery {
    pub class: RecordClass,
    /// Convocation year selected in the portal form.
    pub year: i32,
    /// Description filter; present only for keyword-partitioned classes.
    pub keyword: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RangeQuery {
    pub fn new(
        class: RecordClass,
        year: i32,
        keyword: Option<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, EngineError> {
        if end < start {
            return Err(EngineError::RangeInvariant { start, end });
        }
        Ok(Self {
            class,
            year,
            keyword,
            start,
            end,
        })
    }

    /// Same class/year/keyword over another window.
    pub fn with_window(&self, window: DateWindow) -> Self {
        Self {
            class: self.class,
            year: self.year,
            keyword: self.keyword.clone(),
            start: window.start,
            end: window.end,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start,
            end: self.end,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Split into `[start, mid]` and `[mid + 1, end]`.
    ///
    /// Returns `None` for a single day, and when the midpoint does not
    /// strictly precede `end`.
    pub fn split(&self) -> Option<(RangeQuery, RangeQuery)> {
        let (left, right) = self.window().split()?;
        Some((self.with_window(left), self.with_window(right)))
    }
}

impl fmt::Display for RangeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{} .. {}]", self.class, self.year, self.start, self.end)?;
        if let Some(ref kw) = self.keyword {
            write!(f, " keyword={kw:?}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Date window
// ---------------------------------------------------------------------------

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EngineError> {
        if end < start {
            return Err(EngineError::RangeInvariant { start, end });
        }
        Ok(Self { start, end })
    }

    /// Full calendar year.
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    /// Number of days covered, both ends included.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn midpoint(&self) -> NaiveDate {
        self.start + Duration::days((self.end - self.start).num_days() / 2)
    }

    pub fn split(&self) -> Option<(DateWindow, DateWindow)> {
        if self.start == self.end {
            return None;
        }
        let mid = self.midpoint();
        if mid >= self.end {
            return None;
        }
        Some((
            DateWindow {
                start: self.start,
                end: mid,
            },
            DateWindow {
                start: mid + Duration::days(1),
                end: self.end,
            },
        ))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn calendar_year(&self) -> i32 {
        self.start.year()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Result page + buckets
// ---------------------------------------------------------------------------

/// Rows returned by one fetch call. Its size is the only truncation signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub records: Vec<Record>,
}

impl ResultPage {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A named classification of records; rendered as one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub records: Vec<Record>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Buckets in insertion order. Names are unique; pushing an existing name
/// replaces that bucket in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSet {
    buckets: Vec<Bucket>,
}

impl BucketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: Bucket) {
        match self.buckets.iter_mut().find(|b| b.name == bucket.name) {
            Some(slot) => *slot = bucket,
            None => self.buckets.push(bucket),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl IntoIterator for BucketSet {
    type Item = Bucket;
    type IntoIter = std::vec::IntoIter<Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

impl FromIterator<Bucket> for BucketSet {
    fn from_iter<T: IntoIterator<Item = Bucket>>(iter: T) -> Self {
        let mut set = BucketSet::new();
        for bucket in iter {
            set.push(bucket);
        }
        set
    }
}
