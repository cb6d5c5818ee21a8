// Property-based tests for the fetch retry contract.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::time::Duration;

use chrono::NaiveDate;
use proptest::prelude::*;

use licita_cli::fetch::{RetryPolicy, RetryingFetcher};
use licita_engine::{FetchError, RangeFetcher, RangeQuery, RecordClass, ResultPage};

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

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    Transient,
    Fatal,
    Schema,
}

impl Failure {
    fn error(self, n: usize) -> FetchError {
        match self {
            Failure::Transient => FetchError::transient(format!("driver crash #{n}")),
            Failure::Fatal => FetchError::fatal(format!("bad row #{n}")),
            Failure::Schema => FetchError::schema(format!("unknown header #{n}")),
        }
    }
}

fn failure() -> impl Strategy<Value = Failure> {
    prop_oneof![
        4 => Just(Failure::Transient),
        1 => Just(Failure::Fatal),
        1 => Just(Failure::Schema),
    ]
}

/// Fails with the scripted failures in order, then succeeds.
struct Scripted {
    script: Vec<Failure>,
    calls: usize,
}

impl RangeFetcher for Scripted {
    fn fetch(&mut self, _query: &RangeQuery) -> Result<ResultPage, FetchError> {
        let n = self.calls;
        self.calls += 1;
        match self.script.get(n) {
            Some(f) => Err(f.error(n)),
            None => Ok(ResultPage::default()),
        }
    }
}

fn query() -> RangeQuery {
    let from = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
    RangeQuery::new(RecordClass::Works, 2026, None, from, to).unwrap()
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn outcome_follows_leading_transient_failures(
        script in prop::collection::vec(failure(), 0..8),
        retries in 0u32..5,
    ) {
        let policy = RetryPolicy { retries, backoff: Duration::ZERO };
        let mut fetcher = RetryingFetcher::new(Scripted { script: script.clone(), calls: 0 }, policy);
        let result = fetcher.fetch(&query());

        let transient = script.iter().take_while(|f| **f == Failure::Transient).count();
        let budget = retries as usize;
        prop_assert_eq!(fetcher.retried(), transient.min(budget));
        let calls = fetcher.into_inner().calls;

        if transient > budget {
            let err = result.unwrap_err();
            prop_assert!(!err.retryable);
            prop_assert!(!err.schema);
            prop_assert!(err.message.contains("gave up"), "{}", err.message);
            prop_assert_eq!(calls, budget + 1);
        } else if transient == script.len() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(calls, transient + 1);
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.schema, script[transient] == Failure::Schema);
            prop_assert!(!err.retryable);
            prop_assert!(err.message.ends_with(&format!("#{transient}")), "{}", err.message);
            prop_assert_eq!(calls, transient + 1);
        }
    }
}
