use std::path::PathBuf;

use crate::utils::crypto::{StoreKey, DEFAULT_STORE_PASSPHRASE};
use crate::utils::paths::{
    resolve_config_root, resolve_log_dir, resolve_user_data_dir, StoreMode,
};

/// Everything the launcher derives from its environment at startup.
#[derive(Clone, Debug)]
pub struct LauncherConfig {
    pub mode: StoreMode,
    /// Platform config root (`%APPDATA%`, `~/.config`, ...).
    pub config_root: PathBuf,
    /// Per-install writable base directory.
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub store_key: StoreKey,
}

pub fn mode_from_env() -> StoreMode {
    let is_dev = |name: &str| {
        std::env::var(name)
            .map(|value| value.trim().eq_ignore_ascii_case("dev"))
            .unwrap_or(false)
    };
    if is_dev("YS_LAUNCHER_ENV") || is_dev("NODE_ENV") {
        StoreMode::Development
    } else {
        StoreMode::Packaged
    }
}

impl LauncherConfig {
    pub fn from_env() -> Self {
        let mode = mode_from_env();
        let (config_root, user_data_dir) = match mode {
            // Development keeps all state under ./data next to the working tree.
            StoreMode::Development => {
                let data = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join("data");
                (data.clone(), data.join("Launcher"))
            }
            StoreMode::Packaged => {
                let root = resolve_config_root();
                let user_data = resolve_user_data_dir(&root);
                (root, user_data)
            }
        };
        let log_dir = resolve_log_dir(&user_data_dir);

        let passphrase = std::env::var("YS_LAUNCHER_STORE_KEY")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PASSPHRASE.to_string());

        Self {
            mode,
            config_root,
            user_data_dir,
            log_dir,
            store_key: StoreKey::from_passphrase(&passphrase),
        }
    }

    /// Fixed-path configuration; reads no environment.
    pub fn with_roots(mode: StoreMode, config_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        Self {
            mode,
            config_root,
            user_data_dir,
            log_dir,
            store_key: StoreKey::default(),
        }
    }
}
