use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::WindowBounds;
use crate::services::{BackupGuard, WindowStateStore};

/// Requests the renderer side may send to the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "kebab-case")]
pub enum HostRequest {
    PathUserData,
    #[serde(rename = "appData")]
    AppData,
    LauncherDataRestoreIfMissing,
    IsDarkTheme {
        #[serde(default)]
        theme: Option<String>,
    },
    MainWindowBounds,
    SaveMainWindowBounds {
        bounds: WindowBounds,
    },
}

pub trait SystemTheme: Send + Sync {
    fn prefers_dark(&self) -> bool;
}

/// Reads the desktop preference from the environment: an explicit
/// `YS_LAUNCHER_DARK_MODE=1|0`, else a GTK theme name ending in `:dark`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSystemTheme;

impl SystemTheme for EnvSystemTheme {
    fn prefers_dark(&self) -> bool {
        if let Ok(value) = std::env::var("YS_LAUNCHER_DARK_MODE") {
            match value.trim() {
                "1" | "true" | "dark" => return true,
                "0" | "false" | "light" => return false,
                _ => {}
            }
        }
        std::env::var("GTK_THEME")
            .map(|value| value.to_ascii_lowercase().ends_with(":dark"))
            .unwrap_or(false)
    }
}

pub fn is_dark_theme(theme: Option<&str>, system: &dyn SystemTheme) -> bool {
    match theme {
        Some("dark") => true,
        Some("light") => false,
        _ => system.prefers_dark(),
    }
}

/// Shell side of the request/response channel.
#[derive(Clone)]
pub struct HostChannel {
    user_data_dir: PathBuf,
    config_root: PathBuf,
    backup: BackupGuard,
    window_state: WindowStateStore,
    theme: Arc<dyn SystemTheme>,
}

impl HostChannel {
    pub fn new(
        user_data_dir: PathBuf,
        config_root: PathBuf,
        backup: BackupGuard,
        theme: Arc<dyn SystemTheme>,
    ) -> Self {
        let window_state = WindowStateStore::new(&user_data_dir);
        Self {
            user_data_dir,
            config_root,
            backup,
            window_state,
            theme,
        }
    }

    pub fn handle(&self, request: HostRequest) -> Result<Value, String> {
        tracing::debug!("host request {:?}", request);
        match request {
            HostRequest::PathUserData => Ok(Value::from(absolute(&self.user_data_dir))),
            HostRequest::AppData => Ok(Value::from(absolute(&self.config_root))),
            HostRequest::LauncherDataRestoreIfMissing => {
                Ok(Value::from(self.backup.restore_if_missing()))
            }
            HostRequest::IsDarkTheme { theme } => Ok(Value::from(is_dark_theme(
                theme.as_deref(),
                self.theme.as_ref(),
            ))),
            HostRequest::MainWindowBounds => {
                serde_json::to_value(self.window_state.main_window_bounds())
                    .map_err(|err| err.to_string())
            }
            HostRequest::SaveMainWindowBounds { bounds } => self
                .window_state
                .save_main_window_bounds(bounds)
                .map(|_| Value::Null)
                .map_err(|err| err.to_string()),
        }
    }

    /// Decodes a raw JSON message such as `{"channel":"is-dark-theme","theme":"auto"}`.
    pub fn handle_json(&self, raw: &str) -> Result<Value, String> {
        let request: HostRequest =
            serde_json::from_str(raw).map_err(|err| format!("invalid host request: {err}"))?;
        self.handle(request)
    }
}

fn absolute(path: &std::path::Path) -> String {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    resolved.to_string_lossy().to_string()
}
