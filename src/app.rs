use std::sync::Arc;

use crate::commands::{EnvSystemTheme, HostChannel};
use crate::config::LauncherConfig;
use crate::db::{Database, StoreOptions, ACCOUNTS_TABLE, CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID};
use crate::errors::Result;
use crate::models::{redact_account, StoreDump};
use crate::services::{AccountService, BackupGuard, WindowStateStore};
use crate::utils::paths::{backup_location, legacy_candidates, resolve_store_location};

const DUMP_PREVIEW_ACCOUNTS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub config: LauncherConfig,
    pub db: Database,
    pub accounts: AccountService,
    pub backup: BackupGuard,
    pub window_state: WindowStateStore,
    pub host: HostChannel,
    /// Whether a primary file existed (or was restored) before the store opened.
    pub primary_present_at_start: bool,
}

pub fn store_options(config: &LauncherConfig) -> StoreOptions {
    let location = resolve_store_location(&config.user_data_dir, config.mode);
    let candidates = legacy_candidates(&config.config_root, &location);
    StoreOptions::new(location, config.mode)
        .with_legacy_candidates(candidates)
        .with_key(config.store_key.clone())
}

pub fn backup_guard(config: &LauncherConfig) -> BackupGuard {
    let location = resolve_store_location(&config.user_data_dir, config.mode);
    BackupGuard::new(location.primary_file, backup_location(&config.config_root))
}

/// Composition root: restore, then migrate/open, then seed defaults.
pub async fn build_state(config: LauncherConfig) -> Result<AppState> {
    let backup = backup_guard(&config);
    // The restore has to land before the migrator looks for the primary file.
    let primary_present_at_start = backup.restore_if_missing();

    let db = Database::open(store_options(&config)).await?;
    let accounts = AccountService::new(db.clone());
    accounts.ensure_config_client().await?;

    let host = HostChannel::new(
        config.user_data_dir.clone(),
        config.config_root.clone(),
        backup.clone(),
        Arc::new(EnvSystemTheme),
    );

    Ok(AppState {
        window_state: WindowStateStore::new(&config.user_data_dir),
        config,
        db,
        accounts,
        backup,
        host,
        primary_present_at_start,
    })
}

impl AppState {
    pub fn shutdown(&self) -> Result<bool> {
        self.backup.backup()
    }

    pub async fn dump(&self) -> Result<StoreDump> {
        let snapshot = self.db.snapshot().await?;
        let accounts = snapshot.table(ACCOUNTS_TABLE);
        Ok(StoreDump {
            cwd: self.db.location().dir.to_string_lossy().to_string(),
            keys: snapshot.keys(),
            config_client: snapshot.read(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID),
            accounts_count: accounts.len(),
            accounts_preview: accounts
                .iter()
                .take(DUMP_PREVIEW_ACCOUNTS)
                .map(redact_account)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::db::into_record;
    use crate::models::REDACTED;
    use crate::utils::paths::StoreMode;

    fn config() -> (PathBuf, LauncherConfig) {
        let root = std::env::temp_dir().join(format!("ys-app-test-{}", Uuid::new_v4()));
        let config =
            LauncherConfig::with_roots(StoreMode::Packaged, root.clone(), root.join("YS-Launcher"));
        (root, config)
    }

    #[tokio::test]
    async fn first_start_seeds_config_and_shutdown_backs_up() {
        let (root, config) = config();
        let state = build_state(config).await.expect("build state");
        assert!(!state.primary_present_at_start);

        let config_client = state
            .db
            .read_data(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID)
            .await
            .expect("read");
        assert!(config_client.is_some());

        assert!(state.shutdown().expect("backup"));
        assert!(root
            .join("YS-Launcher-backup")
            .join("launcher-data.json")
            .exists());
        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn data_survives_a_wiped_install_directory() {
        let (root, config) = config();
        {
            let state = build_state(config.clone()).await.expect("first start");
            state
                .accounts
                .add_account(into_record(json!({"name": "Alice"})).expect("record"))
                .await
                .expect("add");
            state.shutdown().expect("backup");
        }

        fs::remove_dir_all(root.join("YS-Launcher")).expect("simulate upgrade wipe");

        let state = build_state(config).await.expect("second start");
        assert!(state.primary_present_at_start);
        let accounts = state.accounts.list_accounts().await.expect("list");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0]["name"], "Alice");
        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn dump_redacts_and_limits_preview() {
        let (root, config) = config();
        let state = build_state(config).await.expect("build state");
        for index in 0..5 {
            state
                .accounts
                .add_account(
                    into_record(json!({
                        "name": format!("user{index}"),
                        "access_token": "secret",
                        "client_token": "secret"
                    }))
                    .expect("record"),
                )
                .await
                .expect("add");
        }

        let dump = state.dump().await.expect("dump");
        assert_eq!(dump.accounts_count, 5);
        assert_eq!(dump.accounts_preview.len(), 3);
        assert!(dump
            .accounts_preview
            .iter()
            .all(|account| account["access_token"] == REDACTED && account["client_token"] == REDACTED));
        assert_eq!(dump.keys, vec!["__bootstrap", "accounts", "configClient"]);
        assert!(dump.config_client.is_some());

        let text = serde_json::to_string(&dump).expect("serialize");
        assert!(!text.contains("secret"));
        assert!(text.contains("accountsPreview"));
        let _ = fs::remove_dir_all(&root);
    }
}
