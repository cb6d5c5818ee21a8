//! Data directory layout.
//!
//! ```text
//! <data>/tmp/             driver downloads, recreated every run
//! <data>/query/<year>.xlsx raw export cache of the works class
//! <data>/Onedrive/         local side of the synced report folder
//! <data>/Onedrive/<export>/SEACE_OBRAS_<year>.xlsx, SEACE_VIDRIOS_<year>.xlsx
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use licita_engine::RecordClass;
use tracing::debug;

use crate::CliError;

pub const TMP_DIR: &str = "tmp";
pub const QUERY_DIR: &str = "query";
pub const DRIVE_DIR: &str = "Onedrive";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub root: PathBuf,
    pub tmp: PathBuf,
    pub query: PathBuf,
    pub drive: PathBuf,
    pub export_dir: String,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, export_dir: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            tmp: root.join(TMP_DIR),
            query: root.join(QUERY_DIR),
            drive: root.join(DRIVE_DIR),
            export_dir: export_dir.into(),
            root,
        }
    }

    /// Folder holding the rendered reports.
    pub fn export(&self) -> PathBuf {
        self.drive.join(&self.export_dir)
    }

    pub fn raw_cache(&self, year: i32) -> PathBuf {
        self.query.join(format!("{year}.xlsx"))
    }

    pub fn report_path(&self, class: RecordClass, year: i32) -> PathBuf {
        self.export().join(class.report_file_name(year))
    }

    /// Create the working directories under an existing data root.
    ///
    /// `tmp/` is always emptied. The drive folder is emptied only when
    /// `reset_drive` is set, i.e. when the reports are synced.
    pub fn prepare(&self, reset_drive: bool) -> Result<(), CliError> {
        if !self.root.is_dir() {
            return Err(CliError::io(format!(
                "data directory {} does not exist",
                self.root.display()
            ))
            .with_hint("create it or point --data-dir / DATA_DIR at an existing directory"));
        }

        recreate(&self.tmp)?;
        if reset_drive {
            recreate(&self.drive)?;
        }
        create(&self.query)?;
        create(&self.export())?;
        Ok(())
    }

    /// Like [`prepare`](Self::prepare) for commands that only read the cache
    /// and write reports.
    pub fn ensure(&self) -> Result<(), CliError> {
        if !self.root.is_dir() {
            return Err(CliError::io(format!(
                "data directory {} does not exist",
                self.root.display()
            )));
        }
        create(&self.export())
    }
}

fn create(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))
}

fn recreate(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        debug!(path = %path.display(), "clearing directory");
        fs::remove_dir_all(path)
            .map_err(|e| CliError::io(format!("cannot clear {}: {e}", path.display())))?;
    }
    create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_IO;

    #[test]
    fn paths() {
        let layout = DataLayout::new("/srv/data", "EXPORT");
        assert_eq!(layout.raw_cache(2025), PathBuf::from("/srv/data/query/2025.xlsx"));
        assert_eq!(
            layout.report_path(RecordClass::Works, 2026),
            PathBuf::from("/srv/data/Onedrive/EXPORT/SEACE_OBRAS_2026.xlsx")
        );
        assert_eq!(
            layout.report_path(RecordClass::Glazing, 2026),
            PathBuf::from("/srv/data/Onedrive/EXPORT/SEACE_VIDRIOS_2026.xlsx")
        );
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path().join("absent"), "EXPORT");
        let err = layout.prepare(true).unwrap_err();
        assert_eq!(err.code, EXIT_IO);
        assert!(err.hint.is_some());
    }

    #[test]
    fn prepare_resets_tmp_and_optionally_the_drive() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path(), "EXPORT");
        layout.prepare(true).unwrap();

        fs::write(layout.tmp.join("stale.xlsx"), b"x").unwrap();
        fs::write(layout.raw_cache(2024), b"x").unwrap();
        let report = layout.report_path(RecordClass::Works, 2026);
        fs::write(&report, b"x").unwrap();

        layout.prepare(false).unwrap();
        assert!(!layout.tmp.join("stale.xlsx").exists());
        assert!(report.exists());
        assert!(layout.raw_cache(2024).exists());

        layout.prepare(true).unwrap();
        assert!(!report.exists());
        assert!(layout.export().is_dir());
        assert!(layout.raw_cache(2024).exists());
    }
}
