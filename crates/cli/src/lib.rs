// licita CLI library: orchestration, portal driver, sync and data layout.
// The binary in main.rs is argument parsing and output only.

pub mod error;
pub mod exit_codes;
pub mod fetch;
pub mod layout;
pub mod run;
pub mod sync;

pub use error::CliError;
pub use layout::DataLayout;
pub use run::{local_today, Orchestrator, RunOptions, RunSummary, UnitReport};
