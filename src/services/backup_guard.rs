use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::utils::file::copy_file;

/// Keeps a copy of the dataset outside the managed data directory so an
/// installer wiping that directory cannot take the user's data with it.
#[derive(Clone, Debug)]
pub struct BackupGuard {
    primary_file: PathBuf,
    backup_file: PathBuf,
}

impl BackupGuard {
    pub fn new(primary_file: PathBuf, backup_file: PathBuf) -> Self {
        Self {
            primary_file,
            backup_file,
        }
    }

    pub fn primary_file(&self) -> &Path {
        &self.primary_file
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }

    /// Snapshots the primary file. Returns `false` when there was nothing to copy.
    pub fn backup(&self) -> Result<bool> {
        if !self.primary_file.exists() {
            return Ok(false);
        }
        copy_file(&self.primary_file, &self.backup_file)?;
        tracing::info!("launcher data backed up -> {}", self.backup_file.display());
        Ok(true)
    }

    /// Must run before the store is opened. Returns whether a primary file
    /// is present afterwards.
    pub fn restore_if_missing(&self) -> bool {
        if self.primary_file.exists() {
            return true;
        }
        if !self.backup_file.exists() {
            return false;
        }
        match copy_file(&self.backup_file, &self.primary_file) {
            Ok(_) => {
                tracing::info!("launcher data restored -> {}", self.primary_file.display());
                true
            }
            Err(err) => {
                tracing::error!(
                    "failed to restore launcher data from {}: {}",
                    self.backup_file.display(),
                    err
                );
                false
            }
        }
    }
}
