// Excel import (portal exports, prior reports) and raw export cache writing.
//
// Values go through calamine; prior-report fills come from xlsx_styles since
// calamine does not expose cell formatting.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use licita_engine::{Bucket, BucketSet, Record};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use tracing::{debug, info};

use crate::error::IoError;
use crate::render::sheet_name;
use crate::schema::{
    self, format_published, RenameMap, COL_KEY, COL_PUBLISHED, RAW_HEADER, REPORT_HEADER,
};
use crate::xlsx_styles::{self, Fill};

// =============================================================================
// Cell conversion
// =============================================================================

/// Render a calamine cell as the text the portal showed.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Integers without decimals
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => format!("{n}"),
        Data::Int(n) => format!("{n}"),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
            Some(ts) => format_published(&ts),
            None => format!("{}", dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Excel 1900-system serial to a timestamp, rounded to the minute.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let minutes = (serial * 24.0 * 60.0).round() as i64;
    epoch.checked_add_signed(Duration::minutes(minutes))
}

fn published_at(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64()),
        Data::Float(n) => serial_to_datetime(*n),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok(),
        Data::String(s) => schema::parse_published(s),
        _ => None,
    }
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).is_empty())
}

/// Build a record from one data row laid out as `REPORT_HEADER`.
///
/// `row_number` is the 1-based worksheet row, for error messages.
fn record_from_row(cells: &[Data], row_number: usize) -> Result<Record, IoError> {
    let text = |i: usize| cells.get(i).map(cell_text).unwrap_or_default();
    let bad = |column: &str, value: String| IoError::BadRow {
        row: row_number,
        column: column.to_string(),
        value,
    };

    let published_at = cells
        .get(1)
        .and_then(published_at)
        .ok_or_else(|| bad(COL_PUBLISHED, text(1)))?;

    let key = text(2);
    if key.is_empty() {
        return Err(bad(COL_KEY, key));
    }

    let restarted = text(3);
    Ok(Record {
        key,
        published_at,
        entity_name: text(0),
        restarted_from: (!restarted.is_empty()).then_some(restarted),
        object_category: text(4),
        description: text(5),
        estimated_value: text(6),
        currency: text(7),
        portal_version: text(8),
    })
}

fn header_of(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default()
}

/// Records of a sheet whose header was validated against `expected`.
///
/// `skip` leading columns are dropped (the raw record number).
fn sheet_records(
    range: &Range<Data>,
    expected: &[&str],
    skip: usize,
    renames: &RenameMap,
) -> Result<Vec<Record>, IoError> {
    let mut header = header_of(range);
    // Trailing empty header cells come from formatting past the last column.
    while header.last().is_some_and(|h| h.is_empty()) {
        header.pop();
    }
    schema::validate_header(&header, expected, renames)?;

    let first_row = range.start().map_or(0, |(r, _)| r as usize);
    let mut records = Vec::new();
    for (idx, row) in range.rows().enumerate().skip(1) {
        if is_blank_row(row) {
            continue;
        }
        let cells = row.get(skip..).unwrap_or(&[]);
        records.push(record_from_row(cells, first_row + idx + 1)?);
    }
    Ok(records)
}

// =============================================================================
// Raw exports
// =============================================================================

/// Read a raw portal export (first sheet), validating its header.
pub fn read_export(path: &Path, renames: &RenameMap) -> Result<Vec<Record>, IoError> {
    // The portal serves legacy .xls as well as .xlsx; detect from content.
    let bytes = std::fs::read(path).map_err(|e| IoError::open(path, e))?;
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| IoError::open(path, e))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IoError::open(path, "workbook contains no sheets"))?;
    let range = workbook.worksheet_range(&first).map_err(|e| IoError::Sheet {
        sheet: first.clone(),
        message: e.to_string(),
    })?;

    let records = sheet_records(&range, &RAW_HEADER, 1, renames)?;
    debug!(path = %path.display(), rows = records.len(), "read export");
    Ok(records)
}

/// Write records as a raw export, numbering rows from 1.
///
/// The file reads back through [`read_export`]; it serves as the per-year
/// query cache.
pub fn write_raw_export(path: &Path, records: &[Record]) -> Result<(), IoError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();
    let werr = |e: rust_xlsxwriter::XlsxError| IoError::write(path, e);

    for (col, name) in RAW_HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name).map_err(werr)?;
    }
    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_number(row, 0, (idx + 1) as f64).map_err(werr)?;
        for (col, value) in report_cells(record).iter().enumerate() {
            worksheet.write_string(row, col as u16 + 1, value).map_err(werr)?;
        }
    }

    save_replacing(&mut workbook, path)?;
    info!(path = %path.display(), rows = records.len(), "wrote raw export");
    Ok(())
}

/// Cell text of a record in `REPORT_HEADER` order.
pub fn report_cells(record: &Record) -> [String; 9] {
    [
        record.entity_name.clone(),
        format_published(&record.published_at),
        record.key.clone(),
        record.restarted_from.clone().unwrap_or_default(),
        record.object_category.clone(),
        record.description.clone(),
        record.estimated_value.clone(),
        record.currency.clone(),
        record.portal_version.clone(),
    ]
}

/// Save to a sibling temp file, then rename over `path`.
pub(crate) fn save_replacing(workbook: &mut XlsxWorkbook, path: &Path) -> Result<(), IoError> {
    let tmp = temp_sibling(path);
    workbook.save(&tmp).map_err(|e| IoError::write(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        IoError::write(path, e)
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.xlsx".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

// =============================================================================
// Prior reports
// =============================================================================

/// A previously rendered report: its buckets plus the manual fills found
/// on each row, keyed by record key.
#[derive(Debug, Clone, Default)]
pub struct PriorReport {
    pub buckets: BucketSet,
    fills: HashMap<String, HashMap<String, Vec<Option<Fill>>>>,
}

impl PriorReport {
    /// Per-column fills of the row holding `key` in `bucket`, if any cell of
    /// that row was filled.
    pub fn fills(&self, bucket: &str, key: &str) -> Option<&[Option<Fill>]> {
        self.fills.get(bucket)?.get(key).map(Vec::as_slice)
    }

    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    /// Rows carrying at least one fill, across all buckets.
    pub fn highlighted_rows(&self) -> usize {
        self.fills.values().map(HashMap::len).sum()
    }
}

/// Read the sheets of a prior report that correspond to `bucket_names`.
///
/// Each bucket is looked up under its rendered sheet name; buckets without
/// a sheet are absent from the result.
pub fn read_report(
    path: &Path,
    bucket_names: &[String],
    renames: &RenameMap,
) -> Result<PriorReport, IoError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;
    let present: Vec<String> = workbook.sheet_names().to_vec();

    let wanted: Vec<(String, String)> = bucket_names
        .iter()
        .map(|b| (b.clone(), sheet_name(b)))
        .filter(|(_, sheet)| present.contains(sheet))
        .collect();
    let sheets: Vec<String> = wanted.iter().map(|(_, s)| s.clone()).collect();
    let sheet_fills = xlsx_styles::read_sheet_fills(path, &sheets)?;

    let mut report = PriorReport::default();
    for ((bucket, sheet), fills) in wanted.into_iter().zip(sheet_fills) {
        let range = workbook.worksheet_range(&sheet).map_err(|e| IoError::Sheet {
            sheet: sheet.clone(),
            message: e.to_string(),
        })?;
        let records = sheet_records(&range, &REPORT_HEADER, 0, renames)?;

        let mut by_key: HashMap<String, Vec<Option<Fill>>> = HashMap::new();
        if !fills.is_empty() {
            let (first_row, first_col) = range.start().map_or((0, 0), |(r, c)| (r as usize, c as usize));
            let mut record_iter = records.iter();
            for (idx, row) in range.rows().enumerate().skip(1) {
                if is_blank_row(row) {
                    continue;
                }
                let Some(record) = record_iter.next() else { break };
                let row_fills: Vec<Option<Fill>> = (0..REPORT_HEADER.len())
                    .map(|col| fills.get(first_row + idx, first_col + col))
                    .collect();
                if row_fills.iter().any(Option::is_some) {
                    by_key.entry(record.key.clone()).or_insert(row_fills);
                }
            }
        }

        debug!(sheet = %sheet, rows = records.len(), highlighted = by_key.len(), "read prior sheet");
        report.fills.insert(bucket.clone(), by_key);
        report.buckets.push(Bucket::new(bucket, records));
    }

    info!(
        path = %path.display(),
        sheets = report.buckets.len(),
        highlighted = report.highlighted_rows(),
        "read prior report"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("  AS-SM-4-2026  ".into())), "AS-SM-4-2026");
    }

    #[test]
    fn serial_dates_round_to_the_minute() {
        // 2026-03-05 16:20
        let serial = 46086.0 + (16.0 * 60.0 + 20.0) / 1440.0 + 1e-9;
        let ts = serial_to_datetime(serial).unwrap();
        assert_eq!(format_published(&ts), "05/03/2026 16:20");
        assert!(serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn row_with_portal_timestamp_becomes_record() {
        let cells: Vec<Data> = [
            "GOBIERNO REGIONAL DE PIURA",
            "05/03/2026 16:20",
            "LP-ABR-1-2026-GRP-1",
            "",
            "Obra",
            "MEJORAMIENTO DEL HOSPITAL",
            "12,500,000.00",
            "Soles",
            "3",
        ]
        .iter()
        .map(|s| Data::String(s.to_string()))
        .collect();
        let record = record_from_row(&cells, 2).unwrap();
        assert_eq!(record.key, "LP-ABR-1-2026-GRP-1");
        assert_eq!(record.restarted_from, None);
        assert_eq!(record.estimated_value, "12,500,000.00");
    }

    #[test]
    fn bad_timestamp_is_reported_with_row() {
        let cells = vec![Data::String("X".into()), Data::String("ayer".into()), Data::String("K".into())];
        match record_from_row(&cells, 7).unwrap_err() {
            IoError::BadRow { row, column, value } => {
                assert_eq!(row, 7);
                assert_eq!(column, COL_PUBLISHED);
                assert_eq!(value, "ayer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn temp_file_sits_next_to_target() {
        let tmp = temp_sibling(Path::new("/data/EXPORT/SEACE_OBRAS_2026.xlsx"));
        assert_eq!(tmp, PathBuf::from("/data/EXPORT/.SEACE_OBRAS_2026.xlsx.tmp"));
    }
}
