//! Column schema of portal exports and persisted reports.
//!
//! Raw exports carry a leading record-number column; reports drop it. Any
//! other difference is a schema mismatch, unless a configured rename turns
//! the found header into the expected one.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::error::IoError;

pub const COL_NUMBER: &str = "N°";
pub const COL_ENTITY: &str = "Nombre o Sigla de la Entidad";
pub const COL_PUBLISHED: &str = "Fecha y Hora de Publicacion";
pub const COL_KEY: &str = "Nomenclatura";
pub const COL_RESTARTED_FROM: &str = "Reiniciado Desde";
pub const COL_CATEGORY: &str = "Objeto de Contratación";
pub const COL_DESCRIPTION: &str = "Descripción de Objeto";
pub const COL_VALUE: &str = "Valor Referencial / Valor Estimado";
pub const COL_CURRENCY: &str = "Moneda";
pub const COL_VERSION: &str = "Versión SEACE";

/// Header of a raw portal export.
pub const RAW_HEADER: [&str; 10] = [
    COL_NUMBER,
    COL_ENTITY,
    COL_PUBLISHED,
    COL_KEY,
    COL_RESTARTED_FROM,
    COL_CATEGORY,
    COL_DESCRIPTION,
    COL_VALUE,
    COL_CURRENCY,
    COL_VERSION,
];

/// Header of every report sheet: the raw header without the record number.
pub const REPORT_HEADER: [&str; 9] = [
    COL_ENTITY,
    COL_PUBLISHED,
    COL_KEY,
    COL_RESTARTED_FROM,
    COL_CATEGORY,
    COL_DESCRIPTION,
    COL_VALUE,
    COL_CURRENCY,
    COL_VERSION,
];

/// Publication timestamp as shown by the portal.
pub const PUBLISHED_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Column renames tried when a header does not match, `(found, expected)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    pairs: Vec<(String, String)>,
}

impl RenameMap {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// The portal renamed the value column at some point; old exports and
    /// caches still carry the short name.
    pub fn portal_default() -> Self {
        Self::new(vec![(
            "VR / VE / Cuantía de la contratación".to_string(),
            COL_VALUE.to_string(),
        )])
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn rename(&self, column: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(from, _)| from == column)
            .map(|(_, to)| to.as_str())
    }
}

/// Check `found` against `expected`, applying `renames` on a first mismatch.
///
/// Returns the header as it should be read (renamed when a rename applied).
pub fn validate_header(
    found: &[String],
    expected: &[&str],
    renames: &RenameMap,
) -> Result<Vec<String>, IoError> {
    if found.iter().map(String::as_str).eq(expected.iter().copied()) {
        return Ok(found.to_vec());
    }

    let mismatch = |found: Vec<String>| IoError::SchemaMismatch {
        expected: expected.iter().map(|s| s.to_string()).collect(),
        found,
    };

    if renames.is_empty() {
        return Err(mismatch(found.to_vec()));
    }

    let mut applied = 0;
    let renamed: Vec<String> = found
        .iter()
        .map(|col| match renames.rename(col) {
            Some(to) => {
                applied += 1;
                info!(from = %col, to, "renamed export column");
                to.to_string()
            }
            None => col.clone(),
        })
        .collect();

    if renamed.iter().map(String::as_str).eq(expected.iter().copied()) {
        return Ok(renamed);
    }

    if applied == 0 {
        warn!("no configured rename applies to the export header");
    }
    Err(mismatch(renamed))
}

/// Parse a publication timestamp in portal format.
pub fn parse_published(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), PUBLISHED_FORMAT).ok()
}

pub fn format_published(value: &NaiveDateTime) -> String {
    value.format(PUBLISHED_FORMAT).to_string()
}
