//! Report rendering: one Excel table per bucket.
//!
//! Rendering is split in two. [`plan`] decides row order and which manual
//! fills carry over from the prior report; [`write`] lays the plan out as a
//! workbook. Fills follow the record key, so a highlighted row keeps its
//! highlight wherever the re-sort moves it.

use std::path::Path;

use licita_engine::{BucketSet, Record};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, Table, TableColumn, TableStyle, Workbook as XlsxWorkbook,
};
use serde::Serialize;
use tracing::info;

use crate::error::IoError;
use crate::schema::{COL_DESCRIPTION, COL_ENTITY, COL_VALUE, REPORT_HEADER};
use crate::xlsx::{report_cells, save_replacing, PriorReport};
use crate::xlsx_styles::Fill;

pub const FONT_NAME: &str = "Aptos Narrow";
pub const FONT_SIZE: f64 = 10.0;
pub const ROW_HEIGHT: f64 = 90.0;
const DEFAULT_COLUMN_WIDTH: f64 = 25.0;

/// Sheet name of a bucket: first letter upper-cased, the rest lower-cased.
pub fn sheet_name(bucket: &str) -> String {
    let mut chars = bucket.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Table display name of a bucket: the sheet name without spaces.
pub fn table_name(bucket: &str) -> String {
    sheet_name(&bucket.replace(' ', ""))
}

fn column_width(column: &str) -> f64 {
    match column {
        COL_DESCRIPTION => 60.0,
        COL_ENTITY => 40.0,
        COL_VALUE => 30.0,
        _ => DEFAULT_COLUMN_WIDTH,
    }
}

// =============================================================================
// Plan
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRow {
    /// Position in the merged bucket, before the presentation sort.
    pub source_position: usize,
    pub record: Record,
    /// Per-column fill carried over from the prior report.
    #[serde(skip)]
    pub fills: Vec<Option<Fill>>,
}

impl PlannedRow {
    pub fn is_highlighted(&self) -> bool {
        self.fills.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSheet {
    pub bucket: String,
    pub sheet_name: String,
    pub table_name: String,
    pub rows: Vec<PlannedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderPlan {
    pub sheets: Vec<PlannedSheet>,
}

impl RenderPlan {
    pub fn rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows.len()).sum()
    }

    pub fn highlighted_rows(&self) -> usize {
        self.sheets
            .iter()
            .flat_map(|s| &s.rows)
            .filter(|r| r.is_highlighted())
            .count()
    }
}

/// Order every bucket by publication time, newest first, and attach the
/// prior fills of each record.
///
/// The sort is stable: rows published in the same minute keep merge order.
pub fn plan(buckets: &BucketSet, prior: Option<&PriorReport>) -> RenderPlan {
    let width = REPORT_HEADER.len();
    let sheets = buckets
        .iter()
        .map(|bucket| {
            let mut rows: Vec<PlannedRow> = bucket
                .records
                .iter()
                .enumerate()
                .map(|(source_position, record)| PlannedRow {
                    source_position,
                    fills: prior
                        .and_then(|p| p.fills(&bucket.name, &record.key))
                        .map(|f| f.to_vec())
                        .unwrap_or_else(|| vec![None; width]),
                    record: record.clone(),
                })
                .collect();
            rows.sort_by(|a, b| b.record.published_at.cmp(&a.record.published_at));

            PlannedSheet {
                bucket: bucket.name.clone(),
                sheet_name: sheet_name(&bucket.name),
                table_name: table_name(&bucket.name),
                rows,
            }
        })
        .collect();
    RenderPlan { sheets }
}

// =============================================================================
// Write
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub sheets: usize,
    pub rows: usize,
    pub filled_cells: usize,
}

fn base_format() -> Format {
    Format::new()
        .set_font_name(FONT_NAME)
        .set_font_size(FONT_SIZE)
        .set_text_wrap()
        .set_align(FormatAlign::Top)
}

fn cell_format(column: &str, fill: Option<Fill>) -> Format {
    let align = if column == COL_VALUE {
        FormatAlign::Right
    } else {
        FormatAlign::Left
    };
    let format = base_format().set_align(align);
    match fill {
        Some(fill) => format.set_background_color(Color::RGB(fill.rgb)),
        None => format,
    }
}

/// Write `plan` to `path`, replacing any existing file only once the new
/// workbook is complete.
pub fn write(plan: &RenderPlan, path: &Path) -> Result<RenderStats, IoError> {
    if plan.sheets.is_empty() {
        return Err(IoError::write(path, "report has no sheets"));
    }

    let mut workbook = XlsxWorkbook::new();
    let mut stats = RenderStats::default();
    let werr = |e: rust_xlsxwriter::XlsxError| IoError::write(path, e);

    let header_format = base_format().set_align(FormatAlign::Left);
    let plain: Vec<Format> = REPORT_HEADER.iter().map(|c| cell_format(c, None)).collect();

    for sheet in &plan.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.sheet_name).map_err(werr)?;

        for (col, column) in REPORT_HEADER.iter().enumerate() {
            worksheet.set_column_width(col as u16, column_width(column)).map_err(werr)?;
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let excel_row = idx as u32 + 1;
            for (col, value) in report_cells(&row.record).iter().enumerate() {
                let fill = row.fills.get(col).copied().flatten();
                match fill {
                    Some(_) => {
                        let format = cell_format(REPORT_HEADER[col], fill);
                        worksheet
                            .write_string_with_format(excel_row, col as u16, value, &format)
                            .map_err(werr)?;
                        stats.filled_cells += 1;
                    }
                    None => {
                        worksheet
                            .write_string_with_format(excel_row, col as u16, value, &plain[col])
                            .map_err(werr)?;
                    }
                }
            }
            worksheet.set_row_height(excel_row, ROW_HEIGHT).map_err(werr)?;
        }

        let columns: Vec<TableColumn> = REPORT_HEADER
            .iter()
            .map(|name| TableColumn::new().set_header(*name).set_header_format(header_format.clone()))
            .collect();
        let table = Table::new()
            .set_name(&sheet.table_name)
            .set_style(TableStyle::Medium9)
            .set_banded_rows(true)
            .set_columns(&columns);
        // A table needs at least one data row.
        let last_row = sheet.rows.len().max(1) as u32;
        worksheet
            .add_table(0, 0, last_row, REPORT_HEADER.len() as u16 - 1, &table)
            .map_err(werr)?;

        stats.sheets += 1;
        stats.rows += sheet.rows.len();
    }

    save_replacing(&mut workbook, path)?;
    info!(
        path = %path.display(),
        sheets = stats.sheets,
        rows = stats.rows,
        filled_cells = stats.filled_cells,
        "wrote report"
    );
    Ok(stats)
}
