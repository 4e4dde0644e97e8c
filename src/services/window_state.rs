use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::errors::Result;
use crate::models::WindowBounds;
use crate::utils::file::write_atomic;

pub const WINDOW_STATE_FILE: &str = "config.json";
const MAIN_WINDOW_BOUNDS_KEY: &str = "mainWindowBounds";

pub const MIN_WIDTH: u32 = 980;
pub const MIN_HEIGHT: u32 = 552;

/// Plaintext key/value slot the shell uses to remember window geometry.
#[derive(Clone, Debug)]
pub struct WindowStateStore {
    path: PathBuf,
}

impl WindowStateStore {
    pub fn new(user_data_dir: &Path) -> Self {
        Self {
            path: user_data_dir.join(WINDOW_STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Map<String, Value> {
        let Ok(contents) = fs::read(&self.path) else {
            return Map::new();
        };
        match serde_json::from_slice::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!("ignoring unreadable window state at {}", self.path.display());
                Map::new()
            }
        }
    }

    pub fn main_window_bounds(&self) -> WindowBounds {
        let stored = self
            .read_entries()
            .remove(MAIN_WINDOW_BOUNDS_KEY)
            .and_then(|value| serde_json::from_value::<WindowBounds>(value).ok())
            .unwrap_or_default();
        WindowBounds {
            width: stored.width.max(MIN_WIDTH),
            height: stored.height.max(MIN_HEIGHT),
            ..stored
        }
    }

    pub fn save_main_window_bounds(&self, bounds: WindowBounds) -> Result<()> {
        let mut entries = self.read_entries();
        entries.insert(
            MAIN_WINDOW_BOUNDS_KEY.to_string(),
            serde_json::to_value(bounds)?,
        );
        let json = serde_json::to_vec_pretty(&Value::Object(entries))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn store() -> (PathBuf, WindowStateStore) {
        let dir = std::env::temp_dir().join(format!("ys-window-test-{}", Uuid::new_v4()));
        (dir.clone(), WindowStateStore::new(&dir))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (_dir, store) = store();
        assert_eq!(store.main_window_bounds(), WindowBounds::default());
    }

    #[test]
    fn saved_bounds_are_clamped_on_load() {
        let (dir, store) = store();
        store
            .save_main_window_bounds(WindowBounds {
                width: 640,
                height: 900,
                x: Some(10),
                y: Some(-4),
            })
            .expect("save");

        let loaded = store.main_window_bounds();
        assert_eq!(loaded.width, MIN_WIDTH);
        assert_eq!(loaded.height, 900);
        assert_eq!((loaded.x, loaded.y), (Some(10), Some(-4)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn saving_keeps_unrelated_keys() {
        let (dir, store) = store();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("dir");
        fs::write(store.path(), br#"{"other":{"kept":true}}"#).expect("seed");

        store
            .save_main_window_bounds(WindowBounds::default())
            .expect("save");
        let raw: Value = serde_json::from_slice(&fs::read(store.path()).expect("read")).expect("json");
        assert_eq!(raw["other"]["kept"], true);
        assert_eq!(raw["mainWindowBounds"]["width"], 1280);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let (dir, store) = store();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("dir");
        fs::write(store.path(), b"not json").expect("seed");
        assert_eq!(store.main_window_bounds(), WindowBounds::default());
        let _ = fs::remove_dir_all(&dir);
    }
}
