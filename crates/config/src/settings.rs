// Run settings
// Loaded from --config, else ~/.config/licita/config.toml, else defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Data directory layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Root holding tmp/, query/ and the synced drive folder. Must exist.
    pub data_dir: PathBuf,

    /// Report folder name inside the synced drive folder
    pub export_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            export_dir: "EXPORT".to_string(),
        }
    }
}

/// Portal retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Executable that drives the portal search and downloads one export
    pub driver: String,

    /// Rows the portal exports per query before truncating
    pub cap: usize,

    /// Split depth bound for the adaptive partitioner
    pub max_depth: usize,

    /// Retries per query after the first attempt
    pub retries: u32,

    /// First retry delay; doubles per attempt
    pub backoff_ms: u64,

    /// Treat a page still at the cap after splitting as a failure
    pub strict_cap: bool,

    /// Offset from UTC used to decide "today" (portal runs on Lima time)
    pub utc_offset_hours: i32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            driver: "licita-driver".to_string(),
            cap: 499,
            max_depth: 32,
            retries: 3,
            backoff_ms: 1000,
            strict_cap: false,
            utc_offset_hours: -5,
        }
    }
}

/// Query window sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub current_window_days: u32,
    pub keyword_window_days: u32,
    pub split_over_days: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            current_window_days: 15,
            keyword_window_days: 301,
            split_over_days: 300,
        }
    }
}

/// Works class: every "Obra" notice, filtered by value and split by keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksSettings {
    /// Convocation years to process, counting back from the current one
    pub years: u32,

    /// Keep notices strictly above this estimated value
    pub min_value: Option<f64>,

    /// One sheet per keyword, matched against the description
    pub keywords: Vec<String>,
}

impl Default for WorksSettings {
    fn default() -> Self {
        Self {
            years: 1,
            min_value: Some(4_000_000.0),
            keywords: vec!["UNIVERSIDAD".into(), "HOSPITAL".into(), "COLEGIO".into()],
        }
    }
}

/// Glazing class: notices found by portal-side description search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlazingSettings {
    pub enabled: bool,

    /// Search terms sent to the portal, queried one after another
    pub keywords: Vec<String>,
}

impl Default for GlazingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: vec![
                "VENTANA".into(),
                "MAMPARA".into(),
                "MURO CORTINA".into(),
                "VIDRIO".into(),
            ],
        }
    }
}

/// Report folder synchronisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub enabled: bool,

    /// Download prior reports before the run
    pub incremental: bool,

    /// Sync client executable
    pub command: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            incremental: true,
            command: "onedrive".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub fetch: FetchSettings,
    pub windows: WindowSettings,
    pub works: WorksSettings,
    pub glazing: GlazingSettings,
    pub sync: SyncSettings,

    /// Header renames applied to exports that fail the schema check,
    /// `found column = expected column`
    pub renames: Vec<(String, String)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            fetch: FetchSettings::default(),
            windows: WindowSettings::default(),
            works: WorksSettings::default(),
            glazing: GlazingSettings::default(),
            sync: SyncSettings::default(),
            // The portal once exported the value column under a shorter name.
            renames: vec![(
                "VR / VE / Cuantía de la contratación".to_string(),
                "Valor Referencial / Valor Estimado".to_string(),
            )],
        }
    }
}

impl Settings {
    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("licita")
            .join("config.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` when given, else from the default location when
    /// that file exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::config_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.cap < 2 {
            return Err(ConfigError::Validation(format!(
                "fetch.cap must be at least 2, got {}",
                self.fetch.cap
            )));
        }
        if self.fetch.driver.trim().is_empty() {
            return Err(ConfigError::Validation("fetch.driver is empty".into()));
        }
        if !(-12..=14).contains(&self.fetch.utc_offset_hours) {
            return Err(ConfigError::Validation(format!(
                "fetch.utc_offset_hours out of range: {}",
                self.fetch.utc_offset_hours
            )));
        }

        let w = &self.windows;
        for (name, days) in [
            ("windows.current_window_days", w.current_window_days),
            ("windows.keyword_window_days", w.keyword_window_days),
            ("windows.split_over_days", w.split_over_days),
        ] {
            if days == 0 {
                return Err(ConfigError::Validation(format!("{name} must be positive")));
            }
        }

        if let Some(min) = self.works.min_value {
            if !min.is_finite() || min < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "works.min_value must be a non-negative number, got {min}"
                )));
            }
        }
        check_keywords("works.keywords", &self.works.keywords, false)?;
        for kw in &self.works.keywords {
            check_report_sheet("works.keywords", kw)?;
        }
        check_keywords("glazing.keywords", &self.glazing.keywords, self.glazing.enabled)?;

        if self.paths.export_dir.trim().is_empty() {
            return Err(ConfigError::Validation("paths.export_dir is empty".into()));
        }
        Ok(())
    }

    /// Works threshold in minor currency units.
    pub fn works_min_value_minor(&self) -> Option<i64> {
        self.works.min_value.map(|v| (v * 100.0).round() as i64)
    }
}

/// Keywords must be non-empty and distinct regardless of case.
fn check_keywords(name: &str, keywords: &[String], required: bool) -> Result<(), ConfigError> {
    if required && keywords.is_empty() {
        return Err(ConfigError::Validation(format!("{name} is empty")));
    }
    let mut seen = HashSet::new();
    for kw in keywords {
        if kw.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{name} contains an empty keyword")));
        }
        if !seen.insert(kw.to_lowercase()) {
            return Err(ConfigError::Validation(format!("{name}: duplicate keyword '{kw}'")));
        }
        if kw.chars().any(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) || kw.chars().count() > 31 {
            return Err(ConfigError::Validation(format!(
                "{name}: '{kw}' cannot be used as a sheet name"
            )));
        }
    }
    Ok(())
}

/// Sheet name of the roll-up in every report.
pub const ROLLUP_SHEET: &str = "Data filtrada";

/// A works keyword names a report sheet and its table. It must not collide
/// with the roll-up sheet, and without spaces it must be a valid table name:
/// a letter or `_` first, then letters, digits, `_` or `.`, and nothing that
/// reads as a cell reference.
fn check_report_sheet(name: &str, kw: &str) -> Result<(), ConfigError> {
    let reject = |why: &str| Err(ConfigError::Validation(format!("{name}: '{kw}' {why}")));

    if kw.trim().to_lowercase() == ROLLUP_SHEET.to_lowercase() {
        return reject("collides with the roll-up sheet");
    }
    let table: String = kw.chars().filter(|c| *c != ' ').collect();
    let mut chars = table.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    if !first_ok || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return reject("cannot be used as a table name");
    }
    if looks_like_cell_ref(&table) {
        return reject("reads as a cell reference");
    }
    Ok(())
}

/// `A1`-style (up to three letters then digits) or `R1C1`-style references,
/// plus the bare `R` / `C` shorthands.
fn looks_like_cell_ref(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    if upper == "R" || upper == "C" {
        return true;
    }
    let letters = upper.chars().take_while(char::is_ascii_uppercase).count();
    let rest = &upper[letters..];
    if (1..=3).contains(&letters) && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    match upper.strip_prefix('R').and_then(|r| r.split_once('C')) {
        Some((row, col)) => {
            row.chars().all(|c| c.is_ascii_digit()) && col.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.fetch.cap, 499);
        assert_eq!(settings.works_min_value_minor(), Some(400_000_000));
        assert_eq!(settings.glazing.keywords.len(), 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml(
            r#"
renames = [["VR / VE / Cuantía de la contratación", "Valor Referencial / Valor Estimado"]]

[paths]
data_dir = "/srv/licita"

[works]
years = 3
keywords = ["HOSPITAL"]

[sync]
incremental = false
"#,
        )
        .unwrap();
        assert_eq!(settings.paths.data_dir, PathBuf::from("/srv/licita"));
        assert_eq!(settings.paths.export_dir, "EXPORT");
        assert_eq!(settings.works.years, 3);
        assert_eq!(settings.works.keywords, vec!["HOSPITAL"]);
        assert_eq!(settings.works.min_value, Some(4_000_000.0));
        assert!(!settings.sync.incremental);
        assert_eq!(settings.sync.command, "onedrive");
        assert_eq!(settings.renames.len(), 1);
    }

    #[test]
    fn rejects_tiny_cap() {
        let err = Settings::from_toml("[fetch]\ncap = 1\n").unwrap_err();
        assert!(err.to_string().contains("fetch.cap"));
    }

    #[test]
    fn rejects_zero_window() {
        let err = Settings::from_toml("[windows]\ncurrent_window_days = 0\n").unwrap_err();
        assert!(err.to_string().contains("current_window_days"));
    }

    #[test]
    fn rejects_empty_and_duplicate_keywords() {
        assert!(Settings::from_toml("[works]\nkeywords = [\"\"]\n").is_err());
        assert!(Settings::from_toml("[works]\nkeywords = [\"Hospital\", \"HOSPITAL\"]\n").is_err());
        assert!(Settings::from_toml("[glazing]\nkeywords = []\n").is_err());
        assert!(Settings::from_toml("[glazing]\nenabled = false\nkeywords = []\n").is_ok());
    }

    #[test]
    fn works_keywords_must_make_valid_report_sheets() {
        for bad in ["DATA FILTRADA", "data filtrada", "PUENTE-VIAL", "2DA ETAPA", "AB12", "R2C3", "C"] {
            let toml = format!("[works]\nkeywords = [\"{bad}\"]\n");
            let err = Settings::from_toml(&toml).unwrap_err();
            assert!(err.to_string().contains("works.keywords"), "{bad}: {err}");
        }
        let ok = Settings::from_toml("[works]\nkeywords = [\"CENTRO DE SALUD\", \"POSTA_2\", \"Educación\"]\n");
        assert!(ok.is_ok(), "{ok:?}");
        // Glazing keywords are search terms, not sheets.
        assert!(Settings::from_toml("[glazing]\nkeywords = [\"VIDRIO-TEMPLADO\"]\n").is_ok());
    }

    #[test]
    fn rejects_unknown_field_types() {
        let err = Settings::from_toml("[fetch]\ncap = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\nretries = 0\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.fetch.retries, 0);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Settings::load(Some(&missing)), Err(ConfigError::Read { .. })));
    }
}
