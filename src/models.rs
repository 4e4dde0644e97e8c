use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::{into_record, Record};

pub const REDACTED: &str = "<redacted>";
const SECRET_ACCOUNT_KEYS: [&str; 4] = ["password", "access_token", "refresh_token", "client_token"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowBounds {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            x: None,
            y: None,
        }
    }
}

/// Settings record written the first time the launcher starts.
pub fn default_config_client() -> Record {
    let value = json!({
        "account_selected": null,
        "instance_selct": null,
        "java_config": {
            "java_path": null,
            "java_memory": { "min": 2, "max": 4 }
        },
        "game_config": {
            "screen_size": { "width": 854, "height": 480 }
        },
        "launcher_config": {
            "download_multi": 5,
            "theme": "auto",
            "closeLauncher": "close-launcher",
            "intelEnabledMac": true
        }
    });
    into_record(value).unwrap_or_default()
}

pub fn redact_account(account: &Record) -> Record {
    let mut clone = account.clone();
    for key in SECRET_ACCOUNT_KEYS {
        let holds_secret = clone
            .get(key)
            .map(|value| !matches!(value, Value::Null | Value::Bool(false)) && value != "")
            .unwrap_or(false);
        if holds_secret {
            clone.insert(key.to_string(), Value::from(REDACTED));
        }
    }
    clone
}

/// Debug dump of the store with account secrets masked.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StoreDump {
    pub cwd: String,
    pub keys: Vec<String>,
    pub config_client: Option<Record>,
    pub accounts_count: usize,
    pub accounts_preview: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_client_matches_first_run_settings() {
        let config = default_config_client();
        assert_eq!(config["account_selected"], Value::Null);
        assert_eq!(config["java_config"]["java_memory"]["max"], 4);
        assert_eq!(config["game_config"]["screen_size"]["width"], 854);
        assert_eq!(config["launcher_config"]["theme"], "auto");
        assert!(!config.contains_key("ID"));
    }

    #[test]
    fn redaction_masks_only_present_secrets() {
        let account = into_record(json!({
            "ID": 2,
            "name": "Alice",
            "access_token": "abc",
            "refresh_token": null,
            "password": ""
        }))
        .expect("record");

        let redacted = redact_account(&account);
        assert_eq!(redacted["access_token"], REDACTED);
        assert_eq!(redacted["refresh_token"], Value::Null);
        assert_eq!(redacted["password"], "");
        assert_eq!(redacted["name"], "Alice");
        assert!(!redacted.contains_key("client_token"));
    }

    #[test]
    fn window_bounds_serialize_without_missing_position() {
        let value = serde_json::to_value(WindowBounds::default()).expect("serialize");
        assert_eq!(value, json!({"width": 1280, "height": 720}));
    }
}
