//! Cell fill extraction from XLSX (ZIP) archives.
//!
//! calamine exposes values only, so manual highlighting in a prior report is
//! read straight from `xl/styles.xml` (fills and cellXfs) and the per-cell
//! `s="N"` style references of each worksheet. Theme colors resolve against
//! the workbook's own `xl/theme/theme1.xml` with their tint applied, so a
//! fill written back as RGB looks the same as the one that was read.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::error::IoError;

// =============================================================================
// Public types
// =============================================================================

/// Solid background fill of one cell, as 0xRRGGBB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fill {
    pub rgb: u32,
}

impl Fill {
    pub fn new(rgb: u32) -> Self {
        Self { rgb: rgb & 0x00FF_FFFF }
    }

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }
}

/// Filled cells of one worksheet, keyed by 0-based (row, col).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetFills {
    cells: HashMap<(usize, usize), Fill>,
}

impl SheetFills {
    pub fn get(&self, row: usize, col: usize) -> Option<Fill> {
        self.cells.get(&(row, col)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// =============================================================================
// Color palettes
// =============================================================================

/// Legacy indexed palette (indices 0-63).
const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993333, 0x333399, 0x333333, //
];

fn indexed_color(idx: u8) -> Option<Fill> {
    match idx {
        // System foreground / background.
        64 => Some(Fill::new(0x000000)),
        65 => Some(Fill::new(0xFFFFFF)),
        _ => INDEXED_PALETTE.get(idx as usize).map(|&rgb| Fill::new(rgb)),
    }
}

/// Theme slots in `theme="N"` order: lt1, dk1, lt2, dk2, accent1-6, hlink,
/// folHlink. Defaults to the Office 2007 scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette([u32; 12]);

impl Default for ThemePalette {
    fn default() -> Self {
        Self([
            0xFFFFFF, 0x000000, 0xEEECE1, 0x1F497D, 0x4F81BD, 0xC0504D, //
            0x9BBB59, 0x8064A2, 0x4BACC6, 0xF79646, 0x0000FF, 0x800080, //
        ])
    }
}

impl ThemePalette {
    fn color(&self, idx: u8) -> Option<Fill> {
        self.0.get(idx as usize).map(|&rgb| Fill::new(rgb))
    }
}

/// Slot position of a `<a:clrScheme>` child, by local name.
fn theme_slot(name: &[u8]) -> Option<usize> {
    Some(match name {
        b"lt1" => 0,
        b"dk1" => 1,
        b"lt2" => 2,
        b"dk2" => 3,
        b"accent1" => 4,
        b"accent2" => 5,
        b"accent3" => 6,
        b"accent4" => 7,
        b"accent5" => 8,
        b"accent6" => 9,
        b"hlink" => 10,
        b"folHlink" => 11,
        _ => return None,
    })
}

/// Color scheme of `xl/theme/theme1.xml`. Slots the document does not
/// define keep their default.
pub fn parse_theme(xml: &str) -> ThemePalette {
    let mut palette = ThemePalette::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_scheme = false;
    let mut slot: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"clrScheme" => in_scheme = true,
                    b"srgbClr" | b"sysClr" if in_scheme => {
                        let wanted: &[u8] = if name.as_ref() == b"srgbClr" { b"val" } else { b"lastClr" };
                        let color = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref() == wanted)
                            .and_then(|a| parse_argb_hex(&a.value));
                        if let (Some(i), Some(color)) = (slot, color) {
                            palette.0[i] = color.rgb;
                        }
                    }
                    other if in_scheme => {
                        if let Some(i) = theme_slot(other) {
                            slot = Some(i);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"clrScheme" => break,
                other if theme_slot(other).is_some() => slot = None,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    palette
}

/// Parse `AARRGGBB` or `RRGGBB`. Alpha is ignored; Excel renders fills opaque.
fn parse_argb_hex(hex: &[u8]) -> Option<Fill> {
    let s = std::str::from_utf8(hex).ok()?.trim_start_matches('#');
    let rgb = match s.len() {
        8 => &s[2..],
        6 => s,
        _ => return None,
    };
    if !rgb.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&rgb[i..i + 2], 16).ok();
    Some(Fill::from_bytes(byte(0)?, byte(2)?, byte(4)?))
}

// -----------------------------------------------------------------------------
// Tint (ECMA-376 18.8.19): luminance scaled toward black or white in HLS.
// -----------------------------------------------------------------------------

fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (min + max) / 2.0;
    if max == min {
        return (0.0, l, 0.0);
    }
    let delta = max - min;
    let s = if l <= 0.5 { delta / (max + min) } else { delta / (2.0 - max - min) };
    let (rc, gc, bc) = ((max - r) / delta, (max - g) / delta, (max - b) / delta);
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), l, s)
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    let channel = |hue: f64| {
        let hue = hue.rem_euclid(1.0);
        if hue < 1.0 / 6.0 {
            m1 + (m2 - m1) * hue * 6.0
        } else if hue < 0.5 {
            m2
        } else if hue < 2.0 / 3.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
        } else {
            m1
        }
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn apply_tint(fill: Fill, tint: f64) -> Fill {
    if tint == 0.0 || !tint.is_finite() {
        return fill;
    }
    let tint = tint.clamp(-1.0, 1.0);
    let unit = |shift: u32| f64::from((fill.rgb >> shift) & 0xFF) / 255.0;
    let (h, l, s) = rgb_to_hls(unit(16), unit(8), unit(0));
    let l = if tint < 0.0 { l * (1.0 + tint) } else { l * (1.0 - tint) + tint };
    let (r, g, b) = hls_to_rgb(h, l, s);
    let byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    Fill::from_bytes(byte(r), byte(g), byte(b))
}

/// Color from `rgb`, `indexed` or `theme` attributes, in that preference,
/// with any `tint` applied.
fn parse_color(e: &BytesStart, theme: &ThemePalette) -> Option<Fill> {
    let mut rgb = None;
    let mut indexed = None;
    let mut theme_idx = None;
    let mut tint = 0.0;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"rgb" => rgb = Some(attr.value.to_vec()),
            b"indexed" => indexed = attr_number::<u8>(&attr.value),
            b"theme" => theme_idx = attr_number::<u8>(&attr.value),
            b"tint" => tint = attr_number::<f64>(&attr.value).unwrap_or(0.0),
            _ => {}
        }
    }
    let base = match rgb {
        Some(hex) => parse_argb_hex(&hex),
        None => indexed
            .and_then(indexed_color)
            .or_else(|| theme_idx.and_then(|i| theme.color(i))),
    }?;
    Some(apply_tint(base, tint))
}

fn attr_number<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok()?.parse().ok()
}

// =============================================================================
// styles.xml
// =============================================================================

/// `<fills>` in order; `None` for empty and non-solid fills.
fn parse_fills(xml: &str, theme: &ThemePalette) -> Vec<Option<Fill>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_fills = false;
    let mut in_fill = false;
    let mut solid = false;
    let mut current: Option<Fill> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) if in_fills && e.name().as_ref() == b"fill" => fills.push(None),
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"fills" => in_fills = true,
                b"fill" if in_fills => {
                    in_fill = true;
                    solid = false;
                    current = None;
                }
                b"patternFill" if in_fill => {
                    solid = e.attributes().flatten().any(|a| {
                        a.key.as_ref() == b"patternType" && a.value.as_ref() == b"solid"
                    });
                }
                b"fgColor" if in_fill && solid => current = parse_color(e, theme),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"fill" if in_fill => {
                    fills.push(current.take());
                    in_fill = false;
                }
                b"fills" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

/// Fill of every `<cellXfs>` entry, indexed by style id.
fn parse_cell_xf_fills(xml: &str, fills: &[Option<Fill>]) -> Vec<Option<Fill>> {
    let mut styles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let fill_id = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"fillId")
                        .and_then(|a| attr_number::<usize>(&a.value));
                    styles.push(fill_id.and_then(|id| fills.get(id).copied().flatten()));
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    styles
}

/// Style id → fill for a whole styles.xml document.
pub fn parse_style_fills(xml: &str, theme: &ThemePalette) -> Vec<Option<Fill>> {
    let fills = parse_fills(xml, theme);
    parse_cell_xf_fills(xml, &fills)
}

// =============================================================================
// Worksheet XML
// =============================================================================

/// `(row, col, style_id)` for every cell carrying a non-default style.
pub fn parse_cell_styles(xml: &str) -> Vec<(usize, usize, usize)> {
    let mut cells = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"c" => {
                let mut style_id: Option<usize> = None;
                let mut cell_ref: Option<String> = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"s" => style_id = attr_number(&attr.value),
                        b"r" => cell_ref = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if let (Some(style_id), Some(cell_ref)) = (style_id, cell_ref) {
                    if style_id > 0 {
                        if let Some((row, col)) = parse_cell_ref(&cell_ref) {
                            cells.push((row, col, style_id));
                        }
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    cells
}

/// Parse a cell reference like "B5" into (row, col) = (4, 1).
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .fold(0usize, |acc, ch| acc * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1));
    let row: usize = digits.parse().ok()?;

    Some((row.checked_sub(1)?, col - 1))
}

// =============================================================================
// Entry point
// =============================================================================

/// Read the filled cells of each named sheet, in the order given.
///
/// A sheet name absent from the workbook yields empty fills. A workbook
/// without styles.xml has no fills at all.
pub fn read_sheet_fills(path: &Path, sheet_names: &[String]) -> Result<Vec<SheetFills>, IoError> {
    let file = std::fs::File::open(path).map_err(|e| IoError::open(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| IoError::open(path, e))?;

    let empty = || -> Vec<SheetFills> { sheet_names.iter().map(|_| SheetFills::default()).collect() };

    let theme = read_zip_file(&mut archive, "xl/theme/theme1.xml")
        .map(|xml| parse_theme(&xml))
        .unwrap_or_default();
    let style_fills = match read_zip_file(&mut archive, "xl/styles.xml") {
        Some(xml) => parse_style_fills(&xml, &theme),
        None => return Ok(empty()),
    };
    if style_fills.iter().all(Option::is_none) {
        return Ok(empty());
    }

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let paths = resolve_worksheet_paths(&workbook_xml, &rels_xml, sheet_names);

    let mut out = Vec::with_capacity(sheet_names.len());
    for ws_path in &paths {
        let mut sheet = SheetFills::default();
        if let Some(xml) = ws_path.as_deref().and_then(|p| read_zip_file(&mut archive, p)) {
            for (row, col, style_id) in parse_cell_styles(&xml) {
                if let Some(Some(fill)) = style_fills.get(style_id) {
                    sheet.cells.insert((row, col), *fill);
                }
            }
        }
        out.push(sheet);
    }
    Ok(out)
}

// =============================================================================
// Helpers
// =============================================================================

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<String> {
    let mut file = archive.by_name(path).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Worksheet part paths for `sheet_names`, via workbook.xml and its rels.
fn resolve_worksheet_paths(
    workbook_xml: &str,
    rels_xml: &str,
    sheet_names: &[String],
) -> Vec<Option<String>> {
    let name_to_rid = collect_pairs(workbook_xml, b"sheet", b"name", b"r:id");
    let rid_to_target: HashMap<String, String> =
        collect_pairs(rels_xml, b"Relationship", b"Id", b"Target").into_iter().collect();

    sheet_names
        .iter()
        .map(|name| {
            let (_, rid) = name_to_rid.iter().find(|(n, _)| n == name)?;
            let target = rid_to_target.get(rid)?;
            Some(match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{target}"),
            })
        })
        .collect()
}

/// `(a, b)` attribute pairs of every `element` in document order.
fn collect_pairs(xml: &str, element: &[u8], a: &[u8], b: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == element => {
                let mut first = None;
                let mut second = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    if attr.key.as_ref() == a {
                        first = Some(value);
                    } else if attr.key.as_ref() == b {
                        second = Some(value);
                    }
                }
                if let (Some(first), Some(second)) = (first, second) {
                    pairs.push((first, second));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fills count="5">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor indexed="10"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor theme="5" tint="0.39"/></patternFill></fill>
  </fills>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="5">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="1" borderId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn argb_and_rgb_hex() {
        assert_eq!(parse_argb_hex(b"FFFFFF00"), Some(Fill::new(0xFFFF00)));
        assert_eq!(parse_argb_hex(b"00C6EFCE"), Some(Fill::new(0xC6EFCE)));
        assert_eq!(parse_argb_hex(b"#92D050"), Some(Fill::new(0x92D050)));
        assert_eq!(parse_argb_hex(b"XYZ"), None);
    }

    #[test]
    fn indexed_palette_edges() {
        assert_eq!(indexed_color(2), Some(Fill::new(0xFF0000)));
        assert_eq!(indexed_color(63), Some(Fill::new(0x333333)));
        assert_eq!(indexed_color(65), Some(Fill::new(0xFFFFFF)));
        assert_eq!(indexed_color(99), None);
    }

    #[test]
    fn cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("I12"), Some((11, 8)));
        assert_eq!(parse_cell_ref("AA3"), Some((2, 26)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
    }

    #[test]
    fn style_ids_resolve_to_solid_fills_only() {
        let styles = parse_style_fills(STYLES, &ThemePalette::default());
        assert_eq!(
            styles,
            vec![
                None,
                Some(Fill::new(0xFFFF00)),
                Some(Fill::new(0xFF0000)),
                Some(Fill::new(0xD99492)),
                None,
            ]
        );
    }

    #[test]
    fn worksheet_cells_with_styles() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s" s="0"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s" s="1"><v>2</v></c><c r="C2" s="3"/></row>
        </sheetData></worksheet>"#;
        assert_eq!(parse_cell_styles(xml), vec![(1, 0, 1), (1, 2, 3)]);
    }

    #[test]
    fn worksheet_paths_follow_relationships() {
        let workbook = r#"<workbook><sheets>
            <sheet name="Data filtrada" sheetId="1" r:id="rId1"/>
            <sheet name="Hospital" sheetId="2" r:id="rId2"/>
        </sheets></workbook>"#;
        let rels = r#"<Relationships>
            <Relationship Id="rId1" Target="worksheets/sheet1.xml"/>
            <Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/>
        </Relationships>"#;
        let names = vec!["Hospital".to_string(), "Colegio".to_string(), "Data filtrada".to_string()];
        assert_eq!(
            resolve_worksheet_paths(workbook, rels, &names),
            vec![
                Some("xl/worksheets/sheet2.xml".to_string()),
                None,
                Some("xl/worksheets/sheet1.xml".to_string()),
            ]
        );
    }

    #[test]
    fn theme_scheme_maps_light_slots_first() {
        let xml = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
          <a:themeElements><a:clrScheme name="Custom">
            <a:dk1><a:sysClr val="windowText" lastClr="111111"/></a:dk1>
            <a:lt1><a:sysClr val="window" lastClr="FEFEFE"/></a:lt1>
            <a:dk2><a:srgbClr val="0E2841"/></a:dk2>
            <a:lt2><a:srgbClr val="E8E8E8"/></a:lt2>
            <a:accent1><a:srgbClr val="156082"/></a:accent1>
            <a:accent2><a:srgbClr val="E97132"/></a:accent2>
          </a:clrScheme></a:themeElements></a:theme>"#;
        let theme = parse_theme(xml);
        assert_eq!(theme.color(0), Some(Fill::new(0xFEFEFE)));
        assert_eq!(theme.color(1), Some(Fill::new(0x111111)));
        assert_eq!(theme.color(2), Some(Fill::new(0xE8E8E8)));
        assert_eq!(theme.color(3), Some(Fill::new(0x0E2841)));
        assert_eq!(theme.color(5), Some(Fill::new(0xE97132)));
        // Undefined slots keep the default scheme.
        assert_eq!(theme.color(9), Some(Fill::new(0xF79646)));
        assert_eq!(theme.color(12), None);
    }

    #[test]
    fn tints_lighten_and_darken() {
        let theme = ThemePalette::default();
        let accent = |idx: u8, tint: f64| apply_tint(theme.color(idx).unwrap(), tint);
        assert_eq!(accent(5, 0.79998168889431442), Fill::new(0xF2DCDB));
        assert_eq!(accent(4, 0.39997558519241921), Fill::new(0x95B3D7));
        assert_eq!(accent(0, -0.14999847407452621), Fill::new(0xD9D9D9));
        assert_eq!(accent(5, 0.0), Fill::new(0xC0504D));
    }

    #[test]
    fn workbook_theme_drives_theme_fills() {
        let styles = r#"<styleSheet>
          <fills count="3">
            <fill><patternFill patternType="none"/></fill>
            <fill><patternFill patternType="gray125"/></fill>
            <fill><patternFill patternType="solid"><fgColor theme="5"/></patternFill></fill>
          </fills>
          <cellXfs count="2"><xf fillId="0"/><xf fillId="2"/></cellXfs>
        </styleSheet>"#;
        let theme = parse_theme(
            r#"<a:theme><a:clrScheme><a:accent2><a:srgbClr val="E97132"/></a:accent2></a:clrScheme></a:theme>"#,
        );
        assert_eq!(parse_style_fills(styles, &theme), vec![None, Some(Fill::new(0xE97132))]);
    }
}
