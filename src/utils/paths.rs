use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const STORE_NAME: &str = "launcher-data";
pub const STORE_DIR_NAME: &str = "databases";
pub const APP_DIR_NAME: &str = "YS-Launcher";
pub const BACKUP_DIR_NAME: &str = "YS-Launcher-backup";

/// Folder names earlier builds used for their user-data directory.
pub const LEGACY_APP_DIR_NAMES: [&str; 4] = ["YS-Launcher", "ys-launcher", "Y&S Launcher", ".YS-Launcher"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    #[default]
    Packaged,
    Development,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub primary_file: PathBuf,
}

pub fn store_file_name() -> String {
    format!("{STORE_NAME}.json")
}

fn ensure_dir(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if std::fs::create_dir_all(path).is_ok() {
        return Some(path.to_path_buf());
    }
    None
}

fn env_path(name: &str) -> Option<PathBuf> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn home_dir() -> Option<PathBuf> {
    env_path("HOME").or_else(|| env_path("USERPROFILE"))
}

/// Canonical dataset location for a base directory. Pure: touches no disk.
pub fn resolve_store_location(base_dir: &Path, mode: StoreMode) -> StoreLocation {
    let dir = match mode {
        StoreMode::Packaged => base_dir.join(STORE_DIR_NAME),
        StoreMode::Development => base_dir
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.to_path_buf()),
    };
    let primary_file = dir.join(store_file_name());
    StoreLocation { dir, primary_file }
}

/// Creates the store directory. Failures are logged only; the first write
/// will report the real error.
pub fn ensure_store_dir(location: &StoreLocation) -> bool {
    match std::fs::create_dir_all(&location.dir) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                "failed to create store directory {}: {}",
                location.dir.display(),
                err
            );
            false
        }
    }
}

pub fn legacy_candidates(config_root: &Path, location: &StoreLocation) -> Vec<PathBuf> {
    let canonical = location.primary_file.to_string_lossy().to_lowercase();
    LEGACY_APP_DIR_NAMES
        .iter()
        .map(|folder| {
            config_root
                .join(folder)
                .join(STORE_DIR_NAME)
                .join(store_file_name())
        })
        .filter(|candidate| candidate.to_string_lossy().to_lowercase() != canonical)
        .collect()
}

/// Backup copy of the dataset, kept outside the managed data directory.
pub fn backup_location(config_root: &Path) -> PathBuf {
    config_root.join(BACKUP_DIR_NAME).join(store_file_name())
}

pub fn platform_config_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        if let Some(app_data) = env_path("APPDATA") {
            return app_data;
        }
    } else if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            return home.join("Library").join("Application Support");
        }
    } else {
        if let Some(xdg) = env_path("XDG_CONFIG_HOME") {
            return xdg;
        }
        if let Some(home) = home_dir() {
            return home.join(".config");
        }
    }
    PathBuf::from(".")
}

pub fn resolve_config_root() -> PathBuf {
    if let Some(path) = env_path("YS_LAUNCHER_CONFIG_ROOT") {
        if let Some(dir) = ensure_dir(&path) {
            return dir;
        }
    }
    platform_config_root()
}

pub fn resolve_user_data_dir(config_root: &Path) -> PathBuf {
    if let Some(path) = env_path("YS_LAUNCHER_DATA_DIR") {
        if let Some(dir) = ensure_dir(&path) {
            return dir;
        }
    }
    config_root.join(APP_DIR_NAME)
}

pub fn resolve_log_dir(user_data_dir: &Path) -> PathBuf {
    if let Some(path) = env_path("YS_LAUNCHER_LOG_DIR") {
        if let Some(dir) = ensure_dir(&path) {
            return dir;
        }
    }

    let candidate = user_data_dir.join("logs");
    if let Some(found) = ensure_dir(&candidate) {
        return found;
    }

    PathBuf::from("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packaged_store_lives_under_databases() {
        let base = Path::new("/tmp/roaming/YS-Launcher");
        let location = resolve_store_location(base, StoreMode::Packaged);
        assert_eq!(location.dir, base.join("databases"));
        assert_eq!(
            location.primary_file,
            base.join("databases").join("launcher-data.json")
        );
    }

    #[test]
    fn development_store_is_a_sibling_of_user_data() {
        let base = Path::new("/work/data/Launcher");
        let location = resolve_store_location(base, StoreMode::Development);
        assert_eq!(location.dir, Path::new("/work/data"));
        assert_eq!(
            location.primary_file,
            Path::new("/work/data/launcher-data.json")
        );
    }

    #[test]
    fn location_is_deterministic() {
        let base = Path::new("/a/b");
        assert_eq!(
            resolve_store_location(base, StoreMode::Packaged),
            resolve_store_location(base, StoreMode::Packaged)
        );
    }

    #[test]
    fn legacy_candidates_skip_canonical_path_case_insensitively() {
        let root = Path::new("/cfg");
        let location = resolve_store_location(&root.join("ys-launcher"), StoreMode::Packaged);
        let candidates = legacy_candidates(root, &location);

        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0],
            root.join("Y&S Launcher")
                .join("databases")
                .join("launcher-data.json")
        );
        assert_eq!(
            candidates[1],
            root.join(".YS-Launcher")
                .join("databases")
                .join("launcher-data.json")
        );
    }

    #[test]
    fn backup_sits_outside_user_data() {
        let root = Path::new("/cfg");
        assert_eq!(
            backup_location(root),
            root.join("YS-Launcher-backup").join("launcher-data.json")
        );
    }
}
