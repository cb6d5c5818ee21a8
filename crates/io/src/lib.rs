// Spreadsheet I/O: portal exports, the raw query cache and rendered reports.

pub mod error;
pub mod render;
pub mod schema;
pub mod xlsx;
pub mod xlsx_styles;

pub use error::IoError;
pub use render::{plan, write, PlannedRow, PlannedSheet, RenderPlan, RenderStats};
pub use schema::{validate_header, RenameMap, RAW_HEADER, REPORT_HEADER};
pub use xlsx::{read_export, read_report, write_raw_export, PriorReport};
pub use xlsx_styles::Fill;
