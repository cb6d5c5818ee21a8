//! The pipeline: fetch, classify, merge with the prior report, render.
//!
//! A run is a sequence of units, each one report file:
//!
//! 1. glazing notices of the running year (`SEACE_VIDRIOS_<year>.xlsx`);
//! 2. works notices of each configured year, newest first
//!    (`SEACE_OBRAS_<year>.xlsx`).
//!
//! A unit finishes (report written) before the next one starts. The first
//! fatal error stops the run; reports already written stay.

use std::path::PathBuf;

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use licita_config::Settings;
use licita_engine::{
    plan_keyword_windows, plan_works_windows, AdaptivePartitioner, Partitioned, RangeFetcher,
    RangeQuery, Record, RecordClass, WindowPolicy,
};
use licita_io::{plan, read_export, read_report, write, write_raw_export, RenameMap};
use licita_recon::{classify, merge_all, ClassifierRules, KeywordBucket, ROLLUP_BUCKET};
use serde::Serialize;
use tracing::{info, warn};

use crate::layout::DataLayout;
use crate::CliError;

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GlazingOptions {
    pub rules: ClassifierRules,
    /// Portal-side description searches, in query order.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub today: NaiveDate,
    pub cap: usize,
    pub max_depth: usize,
    pub policy: WindowPolicy,
    pub works: ClassifierRules,
    /// Works years to process, counting back from the running year.
    pub works_years: u32,
    pub glazing: Option<GlazingOptions>,
    pub renames: RenameMap,
    pub strict_cap: bool,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings, today: NaiveDate) -> Self {
        let works = ClassifierRules {
            rollup: ROLLUP_BUCKET.to_string(),
            min_value_minor: settings.works_min_value_minor(),
            sort_by_value: true,
            keyword_buckets: settings.works.keywords.iter().map(|k| KeywordBucket::named(k)).collect(),
        };
        let glazing = settings.glazing.enabled.then(|| GlazingOptions {
            rules: ClassifierRules::glazing(),
            keywords: settings.glazing.keywords.clone(),
        });
        Self {
            today,
            cap: settings.fetch.cap,
            max_depth: settings.fetch.max_depth,
            policy: WindowPolicy {
                current_window_days: settings.windows.current_window_days,
                keyword_window_days: settings.windows.keyword_window_days,
                split_over_days: settings.windows.split_over_days,
            },
            works,
            works_years: settings.works.years,
            glazing,
            renames: RenameMap::new(settings.renames.clone()),
            strict_cap: settings.fetch.strict_cap,
        }
    }

    fn partitioner(&self) -> AdaptivePartitioner {
        AdaptivePartitioner::new(self.cap).with_max_depth(self.max_depth)
    }
}

/// Today's date at a fixed UTC offset. The portal works on Lima time (-05:00).
pub fn local_today(utc_offset_hours: i32) -> Result<NaiveDate, CliError> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .ok_or_else(|| CliError::args(format!("invalid UTC offset: {utc_offset_hours}h")))?;
    Ok(Utc::now().with_timezone(&offset).date_naive())
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub class: RecordClass,
    pub year: i32,
    /// Records obtained before classification (portal or cache).
    pub fetched: usize,
    pub from_cache: bool,
    /// Portal calls, including pages discarded for splitting.
    pub calls: usize,
    /// Records new to the report.
    pub added: usize,
    /// Rows written across all sheets.
    pub rows: usize,
    /// Rows that kept a manual highlight.
    pub highlighted: usize,
    /// Pages still at the cap after splitting.
    pub capped: usize,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub today: NaiveDate,
    pub units: Vec<UnitReport>,
}

impl RunSummary {
    pub fn added(&self) -> usize {
        self.units.iter().map(|u| u.added).sum()
    }

    pub fn capped(&self) -> usize {
        self.units.iter().map(|u| u.capped).sum()
    }
}

/// Records gathered for a unit, with the retrieval bookkeeping.
struct Gathered {
    records: Vec<Record>,
    from_cache: bool,
    calls: usize,
    capped: usize,
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct Orchestrator<'a, F> {
    fetcher: F,
    layout: &'a DataLayout,
    options: &'a RunOptions,
}

impl<'a, F: RangeFetcher> Orchestrator<'a, F> {
    pub fn new(fetcher: F, layout: &'a DataLayout, options: &'a RunOptions) -> Self {
        Self { fetcher, layout, options }
    }

    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Every unit of a run, in order.
    pub fn run(&mut self) -> Result<RunSummary, CliError> {
        let today = self.options.today;
        let mut units = Vec::new();

        if self.options.glazing.is_some() {
            units.push(self.unit(RecordClass::Glazing, today.year())?);
        }
        for back in 0..self.options.works_years {
            units.push(self.unit(RecordClass::Works, today.year() - back as i32)?);
        }

        Ok(RunSummary { today, units })
    }

    /// Fetch and publish one report.
    pub fn unit(&mut self, class: RecordClass, year: i32) -> Result<UnitReport, CliError> {
        info!(%class, year, "starting unit");
        let gathered = match class {
            RecordClass::Works => self.gather_works(year)?,
            RecordClass::Glazing => self.gather_glazing(year)?,
        };
        self.publish(class, year, gathered)
    }

    /// Re-render one report without touching the portal.
    ///
    /// Works reports are rebuilt from the raw export cache. Glazing has no
    /// cache, so its existing report is re-sorted in place.
    pub fn rerender(&self, class: RecordClass, year: i32) -> Result<UnitReport, CliError> {
        let records = match class {
            RecordClass::Works => {
                let cache = self.layout.raw_cache(year);
                if !cache.exists() {
                    return Err(CliError::io(format!("no cached export at {}", cache.display()))
                        .with_hint("run `licita run` (or `licita render` without --from-cache) first"));
                }
                read_export(&cache, &self.options.renames)?
            }
            RecordClass::Glazing => {
                let report = self.layout.report_path(class, year);
                if !report.exists() {
                    return Err(CliError::io(format!("no report at {}", report.display())));
                }
                Vec::new()
            }
        };
        let gathered = Gathered {
            records,
            from_cache: true,
            calls: 0,
            capped: 0,
        };
        self.publish(class, year, gathered)
    }

    fn gather_works(&mut self, year: i32) -> Result<Gathered, CliError> {
        let cache = self.layout.raw_cache(year);

        // A past year's export never changes once cached.
        if year != self.options.today.year() && cache.exists() {
            info!(year, path = %cache.display(), "using cached export");
            let records = read_export(&cache, &self.options.renames)?;
            return Ok(Gathered {
                records,
                from_cache: true,
                calls: 0,
                capped: 0,
            });
        }

        let partitioner = self.options.partitioner();
        let mut all = Partitioned::default();
        for window in plan_works_windows(year, self.options.today, &self.options.policy) {
            let query = RangeQuery::new(RecordClass::Works, year, None, window.start, window.end)?;
            let part = partitioner.fetch(&mut self.fetcher, &query)?;
            info!(%window, rows = part.records.len(), calls = part.stats.calls, "window fetched");
            all.extend(part);
        }
        self.check_capped(RecordClass::Works, year, &all)?;

        if all.is_complete() {
            write_raw_export(&cache, &all.records)?;
        } else {
            warn!(year, capped = all.capped.len(), "export incomplete; not caching it");
        }

        Ok(Gathered {
            calls: all.stats.calls,
            capped: all.capped.len(),
            records: all.records,
            from_cache: false,
        })
    }

    fn gather_glazing(&mut self, year: i32) -> Result<Gathered, CliError> {
        let keywords = match self.options.glazing {
            Some(ref glazing) => glazing.keywords.clone(),
            None => Vec::new(),
        };
        let windows = plan_keyword_windows(year, self.options.today, &self.options.policy);
        let partitioner = self.options.partitioner();

        let mut records = Vec::new();
        let mut totals = Partitioned::default();
        for keyword in &keywords {
            let mut found = Vec::new();
            for window in &windows {
                let query = RangeQuery::new(
                    RecordClass::Glazing,
                    year,
                    Some(keyword.clone()),
                    window.start,
                    window.end,
                )?;
                let mut part = partitioner.fetch(&mut self.fetcher, &query)?;
                // Search results list oldest first.
                let mut page = std::mem::take(&mut part.records);
                page.reverse();
                found.append(&mut page);
                totals.extend(part);
            }
            found.reverse();
            info!(keyword = %keyword, rows = found.len(), "keyword fetched");
            records.extend(found);
        }
        self.check_capped(RecordClass::Glazing, year, &totals)?;

        Ok(Gathered {
            records,
            from_cache: false,
            calls: totals.stats.calls,
            capped: totals.capped.len(),
        })
    }

    fn check_capped(&self, class: RecordClass, year: i32, part: &Partitioned) -> Result<(), CliError> {
        if !self.options.strict_cap {
            return Ok(());
        }
        match part.capped.first() {
            Some(first) => Err(CliError::capped(format!(
                "{class} {year}: {} page(s) stayed at the cap of {} rows, first {} ({})",
                part.capped.len(),
                self.options.cap,
                first.query,
                first.reason,
            ))
            .with_hint("rows may be missing; rerun without --strict-cap to keep them anyway")),
            None => Ok(()),
        }
    }

    fn rules(&self, class: RecordClass) -> ClassifierRules {
        match class {
            RecordClass::Works => self.options.works.clone(),
            RecordClass::Glazing => match self.options.glazing {
                Some(ref glazing) => glazing.rules.clone(),
                None => ClassifierRules::glazing(),
            },
        }
    }

    fn publish(&self, class: RecordClass, year: i32, gathered: Gathered) -> Result<UnitReport, CliError> {
        let fetched = gathered.records.len();
        let classified = classify(gathered.records, &self.rules(class));

        let path = self.layout.report_path(class, year);
        let prior = if path.exists() {
            let names: Vec<String> = classified.buckets.names().into_iter().map(String::from).collect();
            Some(read_report(&path, &names, &self.options.renames)?)
        } else {
            None
        };

        let merged = merge_all(classified.buckets, prior.as_ref().map(|p| &p.buckets));
        let render_plan = plan(&merged.buckets, prior.as_ref());
        let stats = write(&render_plan, &path)?;

        let report = UnitReport {
            class,
            year,
            fetched,
            from_cache: gathered.from_cache,
            calls: gathered.calls,
            added: merged.added(),
            rows: stats.rows,
            highlighted: render_plan.highlighted_rows(),
            capped: gathered.capped,
            artifact: path,
        };
        info!(
            %class,
            year,
            fetched = report.fetched,
            added = report.added,
            rows = report.rows,
            capped = report.capped,
            "unit complete"
        );
        Ok(report)
    }
}
