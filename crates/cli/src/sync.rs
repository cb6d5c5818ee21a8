//! Report folder synchronisation through the `onedrive` client.
//!
//! Download before a run (prior reports, incremental mode only), upload
//! after it. Uploads never delete remote files.

use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::layout::DataLayout;
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Download,
    Upload,
}

impl SyncDirection {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncClient {
    program: PathBuf,
    drive: PathBuf,
    export_dir: String,
}

impl SyncClient {
    /// Resolve `command` on PATH.
    pub fn resolve(command: &str, layout: &DataLayout) -> Result<Self, CliError> {
        let program = which::which(command).map_err(|e| {
            CliError::sync(format!("sync client '{command}' not found: {e}"))
                .with_hint("install it, set sync.command in the config, or pass --no-sync")
        })?;
        Ok(Self {
            program,
            drive: layout.drive.clone(),
            export_dir: layout.export_dir.clone(),
        })
    }

    pub fn args(&self, direction: SyncDirection) -> Vec<String> {
        let mut args = vec![
            "--sync".to_string(),
            "--syncdir".to_string(),
            self.drive.display().to_string(),
            "--single-directory".to_string(),
            self.export_dir.clone(),
        ];
        match direction {
            SyncDirection::Download => {
                args.push("--download-only".to_string());
                args.push("--cleanup-local-files".to_string());
            }
            SyncDirection::Upload => {
                args.push("--upload-only".to_string());
                args.push("--no-remote-delete".to_string());
            }
        }
        args
    }

    pub fn run(&self, direction: SyncDirection) -> Result<(), CliError> {
        info!(direction = direction.as_str(), folder = %self.export_dir, "syncing reports");
        let status = Command::new(&self.program)
            .args(self.args(direction))
            .status()
            .map_err(|e| {
                CliError::sync(format!("cannot run {}: {e}", self.program.display()))
            })?;

        if !status.success() {
            let code = status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
            return Err(CliError::sync(format!(
                "report {} failed: {} exited with {code}",
                direction.as_str(),
                self.program.display()
            )));
        }
        Ok(())
    }
}
