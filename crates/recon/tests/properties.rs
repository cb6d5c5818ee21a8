// Property-based tests for classification and incremental merge.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;

use licita_engine::{Bucket, Record};
use licita_recon::{classify, merge, ClassifierRules, KeywordBucket, ROLLUP_BUCKET};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn rec(key: &str, value: &str, description: &str) -> Record {
    Record {
        key: key.to_string(),
        published_at: NaiveDate::from_ymd_opt(2026, 2, 14)
            .unwrap()
            .and_hms_opt(17, 45, 0)
            .unwrap(),
        entity_name: "UNIVERSIDAD NACIONAL".into(),
        object_category: "Obra".into(),
        description: description.to_string(),
        estimated_value: value.to_string(),
        currency: "Soles".into(),
        restarted_from: None,
        portal_version: "3".into(),
    }
}

/// Keys drawn from a small alphabet so fresh and prior overlap often.
fn arb_bucket() -> impl Strategy<Value = Bucket> {
    prop::collection::vec(0u8..12, 0..20).prop_map(|ids| {
        Bucket::new(
            "Data filtrada",
            ids.iter().map(|i| rec(&format!("LP-{i}"), "", "OBRA")).collect(),
        )
    })
}

fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("N/A".to_string()),
        (0u64..20_000_000).prop_map(|v| v.to_string()),
        (0u64..20_000_000, 0u8..100).prop_map(|(v, c)| format!("{v}.{c:02}")),
    ]
}

fn key_set(bucket: &Bucket) -> HashSet<&str> {
    bucket.keys().collect()
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn merge_is_idempotent(fresh in arb_bucket(), prior in arb_bucket()) {
        let once = merge(fresh.clone(), Some(&prior)).bucket;
        let twice = merge(fresh, Some(&once)).bucket;
        prop_assert_eq!(key_set(&twice), key_set(&once));
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn merge_keeps_prior_as_prefix(fresh in arb_bucket(), prior in arb_bucket()) {
        let merged = merge(fresh.clone(), Some(&prior)).bucket;
        prop_assert_eq!(&merged.records[..prior.len()], &prior.records[..]);
        for key in fresh.keys() {
            prop_assert!(merged.keys().any(|k| k == key));
        }
    }

    #[test]
    fn unknown_values_survive_every_threshold(min in 0i64..2_000_000_000, values in prop::collection::vec(arb_value(), 1..30)) {
        let records: Vec<Record> = values
            .iter()
            .enumerate()
            .map(|(i, v)| rec(&format!("K{i}"), v, "OBRA"))
            .collect();
        let unknown: Vec<String> = records
            .iter()
            .filter(|r| licita_recon::parse_estimated_value(&r.estimated_value).is_none())
            .map(|r| r.key.clone())
            .collect();

        let rules = ClassifierRules { min_value_minor: Some(min), ..ClassifierRules::works() };
        let out = classify(records, &rules);
        let rollup = out.buckets.get(ROLLUP_BUCKET).unwrap();

        for key in &unknown {
            prop_assert!(rollup.keys().any(|k| k == key));
        }
        // Unknown values lead the roll-up.
        let head: Vec<&str> = rollup.keys().take(unknown.len()).collect();
        prop_assert_eq!(head.len(), unknown.len());
        for key in head {
            prop_assert!(unknown.iter().any(|u| u == key));
        }
    }

    #[test]
    fn keyword_buckets_overlap_without_duplicating(n in 1usize..15) {
        let records: Vec<Record> = (0..n)
            .map(|i| rec(&format!("K{i}"), "", "Mampara y ventana de vidrio templado"))
            .collect();
        let rules = ClassifierRules {
            min_value_minor: None,
            keyword_buckets: vec![KeywordBucket::named("VENTANA"), KeywordBucket::named("MAMPARA")],
            ..ClassifierRules::glazing()
        };
        let out = classify(records, &rules);

        for name in [ROLLUP_BUCKET, "VENTANA", "MAMPARA"] {
            let bucket = out.buckets.get(name).unwrap();
            prop_assert_eq!(bucket.len(), n);
            prop_assert_eq!(key_set(bucket).len(), n);
        }
    }
}
