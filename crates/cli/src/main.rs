// licita - procurement notice collector
// Fetches notices through the portal driver and keeps the xlsx reports current.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use licita_cli::exit_codes::EXIT_SUCCESS;
use licita_cli::fetch::{DriverFetcher, RetryPolicy, RetryingFetcher, DRIVER_DATE_FORMAT};
use licita_cli::sync::{SyncClient, SyncDirection};
use licita_cli::{local_today, CliError, DataLayout, Orchestrator, RunOptions, RunSummary, UnitReport};
use licita_config::Settings;
use licita_engine::{
    plan_keyword_windows, plan_works_windows, FetchError, RangeFetcher, RangeQuery, RecordClass,
    ResultPage,
};
use licita_io::{read_export, RenameMap};

#[derive(Parser)]
#[command(name = "licita")]
#[command(about = "Collect public procurement notices into incremental xlsx reports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/licita/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root holding tmp/, query/ and the synced report folder
    #[arg(long, global = true, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Report folder inside the synced drive folder
    #[arg(long, global = true, env = "EXPORT_DIR")]
    export_dir: Option<String>,

    /// Portal driver executable
    #[arg(long, global = true, env = "LICITA_DRIVER")]
    driver: Option<String>,

    /// Date to treat as today (YYYY-MM-DD); default is today on portal time
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline: sync down, fetch, render every report, sync up
    #[command(after_help = "\
Examples:
  licita run
  DATA_DIR=/srv/licita INCREMENTAL=no licita run
  licita run --no-sync --strict-cap --json")]
    Run {
        /// `no` skips downloading prior reports, so synced reports are rebuilt from scratch
        #[arg(long, env = "INCREMENTAL")]
        incremental: Option<String>,

        /// Skip the report folder sync entirely
        #[arg(long)]
        no_sync: bool,

        /// Fail when a page stays at the cap after splitting
        #[arg(long)]
        strict_cap: bool,

        /// Show the driver's browser window
        #[arg(long)]
        headed: bool,
    },

    /// Print the query windows for a year without fetching
    Plan {
        /// Convocation year (default: the running year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Validate a portal export and report its rows
    CheckExport {
        /// Export workbook (.xlsx)
        file: PathBuf,
    },

    /// Render a single report, without syncing
    #[command(after_help = "\
Examples:
  licita render --class works --year 2025 --from-cache
  licita render --class glazing --year 2026")]
    Render {
        /// works | glazing
        #[arg(long, value_parser = parse_class)]
        class: RecordClass,

        #[arg(long)]
        year: i32,

        /// Rebuild from the raw export cache instead of querying the portal
        #[arg(long)]
        from_cache: bool,

        /// Fail when a page stays at the cap after splitting
        #[arg(long)]
        strict_cap: bool,

        /// Show the driver's browser window
        #[arg(long)]
        headed: bool,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_class(s: &str) -> Result<RecordClass, String> {
    RecordClass::parse(s).ok_or_else(|| format!("unknown class '{s}' (expected works or glazing)"))
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  licita-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = match cli.command {
        Commands::Run {
            ref incremental,
            no_sync,
            strict_cap,
            headed,
        } => cmd_run(&cli, incremental.as_deref(), no_sync, strict_cap, headed),
        Commands::Plan { year } => cmd_plan(&cli, year),
        Commands::CheckExport { ref file } => cmd_check_export(&cli, file),
        Commands::Render {
            class,
            year,
            from_cache,
            strict_cap,
            headed,
        } => cmd_render(&cli, class, year, from_cache, strict_cap, headed),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Shared setup
// ============================================================================

/// Config file, then flag / environment overrides.
fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(ref dir) = cli.data_dir {
        settings.paths.data_dir = dir.clone();
    }
    if let Some(ref dir) = cli.export_dir {
        settings.paths.export_dir = dir.clone();
    }
    if let Some(ref driver) = cli.driver {
        settings.fetch.driver = driver.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn resolve_today(cli: &Cli, settings: &Settings) -> Result<NaiveDate, CliError> {
    match cli.today {
        Some(today) => Ok(today),
        None => local_today(settings.fetch.utc_offset_hours),
    }
}

fn driver_fetcher(
    settings: &Settings,
    layout: &DataLayout,
    renames: RenameMap,
    headed: bool,
) -> Result<RetryingFetcher<DriverFetcher>, CliError> {
    let driver = which::which(&settings.fetch.driver).map_err(|e| {
        CliError::fetch(format!("portal driver '{}' not found: {e}", settings.fetch.driver))
            .with_hint("set fetch.driver in the config, --driver or LICITA_DRIVER")
    })?;
    let policy = RetryPolicy {
        retries: settings.fetch.retries,
        backoff: Duration::from_millis(settings.fetch.backoff_ms),
    };
    Ok(RetryingFetcher::new(
        DriverFetcher::new(driver, &layout.tmp, renames).headed(headed),
        policy,
    ))
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(summary)
            .map_err(|e| CliError::general(format!("cannot serialize summary: {e}")))?;
        println!("{out}");
        return Ok(());
    }
    for unit in &summary.units {
        print_unit(unit);
    }
    Ok(())
}

fn print_unit(unit: &UnitReport) {
    let source = if unit.from_cache { "cache" } else { "portal" };
    println!(
        "{:<8} {}  fetched {:>5} ({source})  new {:>4}  rows {:>5}  highlighted {:>3}  capped {}  {}",
        unit.class,
        unit.year,
        unit.fetched,
        unit.added,
        unit.rows,
        unit.highlighted,
        unit.capped,
        unit.artifact.display(),
    );
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    cli: &Cli,
    incremental: Option<&str>,
    no_sync: bool,
    strict_cap: bool,
    headed: bool,
) -> Result<(), CliError> {
    let settings = load_settings(cli)?;
    let today = resolve_today(cli, &settings)?;
    let mut options = RunOptions::from_settings(&settings, today);
    options.strict_cap |= strict_cap;

    let layout = DataLayout::new(&settings.paths.data_dir, settings.paths.export_dir.as_str());
    let sync = settings.sync.enabled && !no_sync;
    let incremental = incremental.map(|v| v != "no").unwrap_or(settings.sync.incremental);
    let download = sync && incremental;

    let client = if sync {
        Some(SyncClient::resolve(&settings.sync.command, &layout)?)
    } else {
        None
    };
    // A synced drive folder is rebuilt every run; without sync it holds the
    // only copy of the reports.
    layout.prepare(sync)?;
    if download {
        if let Some(ref client) = client {
            client.run(SyncDirection::Download)?;
        }
    }

    let fetcher = driver_fetcher(&settings, &layout, options.renames.clone(), headed)?;
    let mut orchestrator = Orchestrator::new(fetcher, &layout, &options);
    let summary = orchestrator.run()?;

    if let Some(ref client) = client {
        client.run(SyncDirection::Upload)?;
    }
    print_summary(&summary, cli.json)
}

// ============================================================================
// plan
// ============================================================================

fn cmd_plan(cli: &Cli, year: Option<i32>) -> Result<(), CliError> {
    use chrono::Datelike;

    let settings = load_settings(cli)?;
    let today = resolve_today(cli, &settings)?;
    let year = year.unwrap_or(today.year());
    let options = RunOptions::from_settings(&settings, today);

    let works = plan_works_windows(year, today, &options.policy);
    let keywords = options.glazing.as_ref().map(|g| g.keywords.clone()).unwrap_or_default();
    let glazing = if year == today.year() {
        plan_keyword_windows(year, today, &options.policy)
    } else {
        Vec::new()
    };

    if cli.json {
        let out = serde_json::json!({
            "year": year,
            "today": today,
            "works": works,
            "glazing": { "keywords": keywords, "windows": glazing },
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::general(e.to_string()))?);
        return Ok(());
    }

    let fmt = |d: NaiveDate| d.format(DRIVER_DATE_FORMAT).to_string();
    for w in &works {
        println!("works    {year}  {} .. {}  ({} days)", fmt(w.start), fmt(w.end), w.span_days());
    }
    for keyword in &keywords {
        for w in &glazing {
            println!("glazing  {year}  {} .. {}  {keyword}", fmt(w.start), fmt(w.end));
        }
    }
    Ok(())
}

// ============================================================================
// check-export
// ============================================================================

fn cmd_check_export(cli: &Cli, file: &Path) -> Result<(), CliError> {
    let settings = load_settings(cli)?;
    let records = read_export(file, &RenameMap::new(settings.renames.clone()))?;
    let first = records.iter().map(|r| r.published_at).min();
    let last = records.iter().map(|r| r.published_at).max();

    if cli.json {
        let out = serde_json::json!({
            "file": file.display().to_string(),
            "records": records.len(),
            "first_published": first,
            "last_published": last,
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::general(e.to_string()))?);
        return Ok(());
    }

    match (first, last) {
        (Some(first), Some(last)) => println!(
            "ok: {} records, published {} .. {}",
            records.len(),
            first.format("%d/%m/%Y %H:%M"),
            last.format("%d/%m/%Y %H:%M")
        ),
        _ => println!("ok: no records"),
    }
    Ok(())
}

// ============================================================================
// render
// ============================================================================

fn cmd_render(
    cli: &Cli,
    class: RecordClass,
    year: i32,
    from_cache: bool,
    strict_cap: bool,
    headed: bool,
) -> Result<(), CliError> {
    let settings = load_settings(cli)?;
    let today = resolve_today(cli, &settings)?;
    let mut options = RunOptions::from_settings(&settings, today);
    options.strict_cap |= strict_cap;
    let layout = DataLayout::new(&settings.paths.data_dir, settings.paths.export_dir.as_str());

    let unit = if from_cache {
        layout.ensure()?;
        let orchestrator = Orchestrator::new(NoPortal, &layout, &options);
        orchestrator.rerender(class, year)?
    } else {
        layout.prepare(false)?;
        let fetcher = driver_fetcher(&settings, &layout, options.renames.clone(), headed)?;
        let mut orchestrator = Orchestrator::new(fetcher, &layout, &options);
        orchestrator.unit(class, year)?
    };

    print_summary(&RunSummary { today, units: vec![unit] }, cli.json)
}

/// Stand-in fetcher for cache-only commands.
struct NoPortal;

impl RangeFetcher for NoPortal {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError> {
        Err(FetchError::fatal(format!("{query}: portal access disabled")))
    }
}
