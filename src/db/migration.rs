use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;

use crate::db::codec::{self, StoreFormat};
use crate::db::table::{Dataset, BOOTSTRAP_KEY};
use crate::db::StoreOptions;
use crate::errors::{LauncherError, Result};
use crate::utils::file::{copy_file, is_non_empty_file, timestamped_sibling, write_atomic};
use crate::utils::paths::{ensure_store_dir, StoreMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    Unopened,
    Locating,
    Migrating,
    Open,
}

/// What the startup pass did to the files on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub legacy_source: Option<PathBuf>,
    pub plaintext_backup: Option<PathBuf>,
    pub quarantined: Option<PathBuf>,
    pub bootstrapped: bool,
}

pub struct Migration {
    pub dataset: Dataset,
    pub report: MigrationReport,
}

struct Migrator<'a> {
    options: &'a StoreOptions,
    state: StoreState,
    report: MigrationReport,
}

/// Turns whatever sits at the canonical path into a readable encrypted
/// dataset. Step failures are logged and absorbed; this never errors.
pub fn run(options: &StoreOptions) -> Migration {
    let mut migrator = Migrator {
        options,
        state: StoreState::Unopened,
        report: MigrationReport::default(),
    };

    migrator.advance(StoreState::Locating);
    ensure_store_dir(&options.location);
    log_preflight(options);

    migrator.advance(StoreState::Migrating);
    if options.mode == StoreMode::Packaged && !options.location.primary_file.exists() {
        migrator.adopt_legacy_identity();
    }
    let migrated = migrator.migrate_plaintext();
    let mut dataset = match migrated {
        Some(dataset) => dataset,
        None => migrator.open_or_recover(),
    };
    migrator.ensure_bootstrap(&mut dataset);

    migrator.advance(StoreState::Open);
    Migration {
        dataset,
        report: migrator.report,
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn log_preflight(options: &StoreOptions) {
    let primary = &options.location.primary_file;
    match fs::metadata(primary) {
        Ok(meta) => tracing::info!(
            "store preflight: path={} exists=true size={}",
            primary.display(),
            meta.len()
        ),
        Err(_) => tracing::info!("store preflight: path={} exists=false", primary.display()),
    }
}

impl Migrator<'_> {
    fn advance(&mut self, next: StoreState) {
        tracing::debug!("store state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn adopt_legacy_identity(&mut self) {
        let primary = &self.options.location.primary_file;
        let Some(source) = self
            .options
            .legacy_candidates
            .iter()
            .find(|candidate| is_non_empty_file(candidate))
        else {
            return;
        };

        match copy_file(source, primary) {
            Ok(_) => {
                tracing::info!(
                    "migrated store from {} -> {}",
                    source.display(),
                    primary.display()
                );
                self.report.legacy_source = Some(source.clone());
            }
            Err(err) => {
                tracing::warn!("legacy store copy from {} failed: {}", source.display(), err);
            }
        }
    }

    fn migrate_plaintext(&mut self) -> Option<Dataset> {
        let primary = &self.options.location.primary_file;
        let contents = fs::read(primary).ok()?;
        if codec::sniff(&contents) != StoreFormat::Plaintext {
            return None;
        }

        match self.rewrite_plaintext(&contents) {
            Ok(dataset) => Some(dataset),
            Err(err) => {
                tracing::warn!("plaintext migration failed (will try encrypted open): {}", err);
                None
            }
        }
    }

    fn rewrite_plaintext(&mut self, contents: &[u8]) -> Result<Dataset> {
        let primary = &self.options.location.primary_file;
        let backup = timestamped_sibling(primary, "legacy", now_ms());
        copy_file(primary, &backup)?;
        self.report.plaintext_backup = Some(backup.clone());

        let legacy = codec::decode_plaintext(contents)?;
        let mut dataset = Dataset::new();
        for (key, value) in legacy.into_map() {
            dataset.set(&key, value);
        }
        write_atomic(primary, &codec::encode(&dataset, &self.options.key)?)?;

        tracing::info!(
            "migrated plaintext store -> encrypted (backup: {})",
            backup.display()
        );
        Ok(dataset)
    }

    fn open_or_recover(&mut self) -> Dataset {
        let primary = &self.options.location.primary_file;
        let failure = match fs::read(primary) {
            Ok(contents) => match codec::decode(&contents, &self.options.key) {
                Ok(dataset) => return dataset,
                Err(err) => err.to_string(),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => return Dataset::new(),
            Err(err) => err.to_string(),
        };

        let broken = timestamped_sibling(primary, "broken", now_ms());
        match fs::rename(primary, &broken) {
            Ok(()) => {
                tracing::warn!(
                    "store unreadable ({}), backed up to {}",
                    failure,
                    broken.display()
                );
                self.report.quarantined = Some(broken);
            }
            Err(err) => {
                tracing::warn!("store unreadable ({}); failed to back it up: {}", failure, err);
            }
        }
        Dataset::new()
    }

    fn ensure_bootstrap(&mut self, dataset: &mut Dataset) {
        let present = dataset
            .get(BOOTSTRAP_KEY)
            .map(|value| !value.is_null() && value != &Value::Bool(false))
            .unwrap_or(false);
        if present {
            return;
        }

        let mut next = dataset.clone();
        next.set(BOOTSTRAP_KEY, Value::from(now_ms()));
        let written = codec::encode(&next, &self.options.key)
            .and_then(|bytes| {
                write_atomic(&self.options.location.primary_file, &bytes).map_err(LauncherError::from)
            });
        match written {
            Ok(()) => {
                *dataset = next;
                self.report.bootstrapped = true;
            }
            Err(err) => tracing::warn!("failed to write bootstrap marker: {}", err),
        }
    }
}
