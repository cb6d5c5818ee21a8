//! Portal fetcher backed by an external driver executable.
//!
//! The driver runs the portal search for one query and saves the export
//! workbook where it is told. Browser automation stays out of this crate.
//!
//! ```text
//! <driver> --class works --year 2026 --from 01/01/2026 --to 15/01/2026 \
//!          [--keyword VENTANA] --out <tmp>/<uuid>.xlsx [--headed]
//! ```
//!
//! Exit status 0 with the workbook written is success; an empty search still
//! writes a header-only workbook. The file may hold the portal's native .xls
//! download unchanged; its format is detected from the content.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use licita_engine::{FetchError, RangeFetcher, RangeQuery, ResultPage};
use licita_io::{read_export, IoError, RenameMap};
use tracing::debug;
use uuid::Uuid;

/// Date format the portal search form expects.
pub const DRIVER_DATE_FORMAT: &str = "%d/%m/%Y";

pub struct DriverFetcher {
    program: PathBuf,
    tmp_dir: PathBuf,
    renames: RenameMap,
    headed: bool,
}

impl DriverFetcher {
    pub fn new(program: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>, renames: RenameMap) -> Self {
        Self {
            program: program.into(),
            tmp_dir: tmp_dir.into(),
            renames,
            headed: false,
        }
    }

    /// Ask the driver to show its browser window.
    pub fn headed(mut self, headed: bool) -> Self {
        self.headed = headed;
        self
    }

    pub fn args(&self, query: &RangeQuery, out: &Path) -> Vec<String> {
        let mut args = vec![
            "--class".to_string(),
            query.class.slug().to_string(),
            "--year".to_string(),
            query.year.to_string(),
            "--from".to_string(),
            query.start.format(DRIVER_DATE_FORMAT).to_string(),
            "--to".to_string(),
            query.end.format(DRIVER_DATE_FORMAT).to_string(),
        ];
        if let Some(ref keyword) = query.keyword {
            args.push("--keyword".to_string());
            args.push(keyword.clone());
        }
        args.push("--out".to_string());
        args.push(out.display().to_string());
        if self.headed {
            args.push("--headed".to_string());
        }
        args
    }
}

/// Last non-empty line of the driver's stderr, for error messages.
fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

impl RangeFetcher for DriverFetcher {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError> {
        let out = self.tmp_dir.join(format!("{}.xlsx", Uuid::new_v4()));
        let args = self.args(query, &out);
        debug!(driver = %self.program.display(), ?args, "running driver");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            FetchError::fatal(format!("cannot run driver {}: {e}", self.program.display()))
        })?;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(FetchError::transient(format!(
                "{query}: driver exited with {code}: {}",
                stderr_tail(&output.stderr)
            )));
        }

        if !out.exists() {
            return Err(FetchError::transient(format!("{query}: driver saved no export")));
        }

        let records = read_export(&out, &self.renames).map_err(|e| match e {
            IoError::SchemaMismatch { .. } => FetchError::schema(format!("{query}: {e}")),
            // A half-written download reads as a broken workbook.
            IoError::Open { .. } => FetchError::transient(format!("{query}: {e}")),
            _ => FetchError::fatal(format!("{query}: {e}")),
        })?;

        // The export is scratch; the query cache is written from merged records.
        let _ = fs::remove_file(&out);
        Ok(ResultPage::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use licita_engine::RecordClass;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn works_query_args() {
        let fetcher = DriverFetcher::new("licita-driver", "/tmp", RenameMap::default());
        let q = RangeQuery::new(RecordClass::Works, 2026, None, day(1, 1), day(1, 15)).unwrap();
        let args = fetcher.args(&q, Path::new("/tmp/x.xlsx"));
        assert_eq!(
            args,
            vec![
                "--class", "works", "--year", "2026", "--from", "01/01/2026", "--to", "15/01/2026",
                "--out", "/tmp/x.xlsx",
            ]
        );
    }

    #[test]
    fn keyword_and_headed_args() {
        let fetcher = DriverFetcher::new("licita-driver", "/tmp", RenameMap::default()).headed(true);
        let q = RangeQuery::new(
            RecordClass::Glazing,
            2026,
            Some("MURO CORTINA".into()),
            day(2, 1),
            day(10, 28),
        )
        .unwrap();
        let args = fetcher.args(&q, Path::new("/tmp/y.xlsx"));
        let kw = args.iter().position(|a| a == "--keyword").unwrap();
        assert_eq!(args[kw + 1], "MURO CORTINA");
        assert_eq!(args[1], "glazing");
        assert_eq!(args.last().map(String::as_str), Some("--headed"));
    }

    #[test]
    fn missing_driver_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut fetcher = DriverFetcher::new(
            dir.path().join("no-such-driver"),
            dir.path(),
            RenameMap::default(),
        );
        let q = RangeQuery::new(RecordClass::Works, 2026, None, day(1, 1), day(1, 1)).unwrap();
        let err = fetcher.fetch(&q).unwrap_err();
        assert!(!err.retryable);
        assert!(err.message.contains("cannot run driver"));
    }

    #[test]
    fn stderr_tail_picks_last_line() {
        assert_eq!(stderr_tail(b"starting\ntimeout waiting for table\n\n"), "timeout waiting for table");
        assert_eq!(stderr_tail(b""), "");
    }
}
