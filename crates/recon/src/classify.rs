use std::cmp::Ordering;
use std::collections::HashSet;

use licita_engine::{Bucket, BucketSet, Record};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Name of the roll-up sheet in every report.
pub const ROLLUP_BUCKET: &str = "Data filtrada";

/// A bucket holding every roll-up record whose description contains `keyword`
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordBucket {
    pub name: String,
    pub keyword: String,
}

impl KeywordBucket {
    /// Bucket named after its keyword.
    pub fn named(keyword: &str) -> Self {
        Self {
            name: keyword.to_string(),
            keyword: keyword.to_string(),
        }
    }

    fn matches(&self, description_lower: &str) -> bool {
        description_lower.contains(&self.keyword.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    pub rollup: String,
    /// Keep records strictly above this value (minor units). Unknown values
    /// are always kept.
    pub min_value_minor: Option<i64>,
    /// Order the roll-up by value (unknown first, then descending) instead of
    /// keeping fetch order.
    pub sort_by_value: bool,
    pub keyword_buckets: Vec<KeywordBucket>,
}

impl ClassifierRules {
    pub fn works() -> Self {
        Self {
            rollup: ROLLUP_BUCKET.to_string(),
            min_value_minor: Some(4_000_000 * 100),
            sort_by_value: true,
            keyword_buckets: ["UNIVERSIDAD", "HOSPITAL", "COLEGIO"]
                .iter()
                .map(|kw| KeywordBucket::named(kw))
                .collect(),
        }
    }

    pub fn glazing() -> Self {
        Self {
            rollup: ROLLUP_BUCKET.to_string(),
            min_value_minor: None,
            sort_by_value: false,
            keyword_buckets: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Estimated value parsing
// ---------------------------------------------------------------------------

/// Parse a locale-formatted estimated value ("4,000,001.50") into minor units.
///
/// Thousands separators are stripped. Blank or malformed input is `None`,
/// meaning "unknown", never zero. Digits past the second decimal round
/// half-up.
pub fn parse_estimated_value(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let negative = cleaned.starts_with('-');
    let body = cleaned.trim_start_matches(|c: char| c == '-' || c == '+');
    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let units: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut digits = frac.bytes().map(|b| (b - b'0') as i64);
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().is_some_and(|d| d >= 5);

    let minor = units
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;
    Some(if negative { -minor } else { minor })
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifyStats {
    pub input: usize,
    pub duplicates: usize,
    pub below_threshold: usize,
    pub unknown_value: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct Classified {
    pub buckets: BucketSet,
    pub stats: ClassifyStats,
}

/// Unknown values sort ahead of every known value; known values descend.
fn value_order(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    }
}

/// Assign records to the roll-up bucket and every matching keyword bucket.
///
/// The roll-up holds each key once (first occurrence wins), filtered by the
/// value threshold and, when the rules ask for it, sorted by value. Keyword buckets are subsets of the
/// roll-up in the same order; a record may sit in several of them.
pub fn classify(records: Vec<Record>, rules: &ClassifierRules) -> Classified {
    let mut stats = ClassifyStats {
        input: records.len(),
        ..Default::default()
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<(Option<i64>, Record)> = Vec::new();

    for record in records {
        if !seen.insert(record.key.clone()) {
            stats.duplicates += 1;
            continue;
        }
        let value = parse_estimated_value(&record.estimated_value);
        if value.is_none() {
            stats.unknown_value += 1;
        }
        if let (Some(min), Some(v)) = (rules.min_value_minor, value) {
            if v <= min {
                stats.below_threshold += 1;
                continue;
            }
        }
        kept.push((value, record));
    }

    if rules.sort_by_value {
        kept.sort_by(|(a, _), (b, _)| value_order(*a, *b));
    }
    stats.kept = kept.len();

    let rollup: Vec<Record> = kept.into_iter().map(|(_, r)| r).collect();
    let lowered: Vec<String> = rollup.iter().map(|r| r.description.to_lowercase()).collect();

    let mut buckets = BucketSet::new();
    let keyword_buckets: Vec<Bucket> = rules
        .keyword_buckets
        .iter()
        .map(|rule| {
            let members = rollup
                .iter()
                .zip(&lowered)
                .filter(|(_, desc)| rule.matches(desc))
                .map(|(r, _)| r.clone())
                .collect();
            Bucket::new(rule.name.clone(), members)
        })
        .collect();

    buckets.push(Bucket::new(rules.rollup.clone(), rollup));
    for bucket in keyword_buckets {
        buckets.push(bucket);
    }

    Classified { buckets, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(key: &str, value: &str, description: &str) -> Record {
        Record {
            key: key.into(),
            published_at: NaiveDate::from_ymd_opt(2026, 3, 4)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            entity_name: "GOBIERNO REGIONAL".into(),
            object_category: "Obra".into(),
            description: description.into(),
            estimated_value: value.into(),
            currency: "Soles".into(),
            restarted_from: None,
            portal_version: "3".into(),
        }
    }

    fn keys(bucket: &Bucket) -> Vec<&str> {
        bucket.keys().collect()
    }

    #[test]
    fn parses_locale_values() {
        assert_eq!(parse_estimated_value("4,000,001"), Some(400_000_100));
        assert_eq!(parse_estimated_value("4,000,001.50"), Some(400_000_150));
        assert_eq!(parse_estimated_value(" 12.5 "), Some(1250));
        assert_eq!(parse_estimated_value("0.125"), Some(13));
        assert_eq!(parse_estimated_value(""), None);
        assert_eq!(parse_estimated_value("---"), None);
        assert_eq!(parse_estimated_value("S/ 100"), None);
        assert_eq!(parse_estimated_value("."), None);
    }

    #[test]
    fn unknown_value_is_kept_and_sorted_first() {
        let out = classify(
            vec![rec("A", "4,000,001", "OBRA"), rec("B", "", "OBRA")],
            &ClassifierRules::works(),
        );
        let rollup = out.buckets.get(ROLLUP_BUCKET).unwrap();
        assert_eq!(keys(rollup), vec!["B", "A"]);
        assert_eq!(out.stats.unknown_value, 1);
    }

    #[test]
    fn threshold_is_strict() {
        let out = classify(
            vec![
                rec("EQ", "4,000,000.00", "X"),
                rec("LOW", "10", "X"),
                rec("HIGH", "9,000,000", "X"),
                rec("MID", "5,000,000", "X"),
            ],
            &ClassifierRules::works(),
        );
        let rollup = out.buckets.get(ROLLUP_BUCKET).unwrap();
        assert_eq!(keys(rollup), vec!["HIGH", "MID"]);
        assert_eq!(out.stats.below_threshold, 2);
    }

    #[test]
    fn keyword_membership_is_case_insensitive_and_non_exclusive() {
        let out = classify(
            vec![
                rec("A", "9,000,000", "Construccion de hospital en la Universidad"),
                rec("B", "8,000,000", "COLEGIO EMBLEMATICO"),
                rec("C", "7,000,000", "PISTAS Y VEREDAS"),
            ],
            &ClassifierRules::works(),
        );
        assert_eq!(out.buckets.names(), vec![ROLLUP_BUCKET, "UNIVERSIDAD", "HOSPITAL", "COLEGIO"]);
        assert_eq!(keys(out.buckets.get("UNIVERSIDAD").unwrap()), vec!["A"]);
        assert_eq!(keys(out.buckets.get("HOSPITAL").unwrap()), vec!["A"]);
        assert_eq!(keys(out.buckets.get("COLEGIO").unwrap()), vec!["B"]);
        assert_eq!(keys(out.buckets.get(ROLLUP_BUCKET).unwrap()), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_keys_collapse_to_first_occurrence() {
        let out = classify(
            vec![rec("A", "", "VIDRIO TEMPLADO"), rec("A", "", "VIDRIO"), rec("B", "", "MAMPARA")],
            &ClassifierRules::glazing(),
        );
        let rollup = out.buckets.get(ROLLUP_BUCKET).unwrap();
        assert_eq!(keys(rollup), vec!["A", "B"]);
        assert_eq!(rollup.records[0].description, "VIDRIO TEMPLADO");
        assert_eq!(out.stats.duplicates, 1);
    }

    #[test]
    fn glazing_rules_keep_fetch_order() {
        let out = classify(
            vec![rec("Z", "1", "VENTANA"), rec("Y", "999", "VENTANA")],
            &ClassifierRules::glazing(),
        );
        assert_eq!(keys(out.buckets.get(ROLLUP_BUCKET).unwrap()), vec!["Z", "Y"]);
        assert_eq!(out.buckets.len(), 1);
    }

    #[test]
    fn works_order_holds_without_a_threshold() {
        let rules = ClassifierRules { min_value_minor: None, ..ClassifierRules::works() };
        let out = classify(
            vec![rec("LOW", "10", "X"), rec("NONE", "", "X"), rec("HIGH", "9,000,000", "X")],
            &rules,
        );
        assert_eq!(keys(out.buckets.get(ROLLUP_BUCKET).unwrap()), vec!["NONE", "HIGH", "LOW"]);
        assert_eq!(out.stats.below_threshold, 0);
    }
}
