use serde_json::Value;

use crate::db::table::Dataset;
use crate::errors::{LauncherError, Result};
use crate::utils::crypto::{self, StoreKey};
use crate::utils::file::first_significant_byte;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreFormat {
    /// Zero bytes or whitespace only.
    Empty,
    /// Unencrypted JSON written by older builds.
    Plaintext,
    /// Anything else is handed to the decryptor.
    Sealed,
}

pub fn sniff(contents: &[u8]) -> StoreFormat {
    match first_significant_byte(contents) {
        None => StoreFormat::Empty,
        Some(b'{') => StoreFormat::Plaintext,
        Some(_) => StoreFormat::Sealed,
    }
}

pub fn encode(dataset: &Dataset, key: &StoreKey) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(dataset.as_map())?;
    Ok(crypto::seal(key, &json)?.into_bytes())
}

pub fn decode(contents: &[u8], key: &StoreKey) -> Result<Dataset> {
    match sniff(contents) {
        StoreFormat::Empty => Ok(Dataset::new()),
        StoreFormat::Plaintext => Err(LauncherError::Store(
            "dataset is stored as plaintext".to_string(),
        )),
        StoreFormat::Sealed => {
            let json = crypto::unseal(key, contents)?;
            parse_object(&json)
        }
    }
}

pub fn decode_plaintext(contents: &[u8]) -> Result<Dataset> {
    parse_object(contents)
}

fn parse_object(json: &[u8]) -> Result<Dataset> {
    match serde_json::from_slice::<Value>(json)? {
        Value::Object(map) => Ok(Dataset::from_map(map)),
        other => Err(LauncherError::Store(format!(
            "dataset root must be an object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::table::into_record;

    #[test]
    fn sniff_distinguishes_formats() {
        assert_eq!(sniff(b""), StoreFormat::Empty);
        assert_eq!(sniff(b"\n  "), StoreFormat::Empty);
        assert_eq!(sniff(b"  {\"accounts\":[]}"), StoreFormat::Plaintext);
        assert_eq!(sniff(b"YSDB1:Zm9v"), StoreFormat::Sealed);
        assert_eq!(sniff(b"\x8f\x01garbage"), StoreFormat::Sealed);
    }

    #[test]
    fn encoded_dataset_is_not_readable_as_plaintext() {
        let key = StoreKey::default();
        let mut dataset = Dataset::new();
        dataset.create(
            "accounts",
            into_record(json!({"name": "Alice", "access_token": "tok"})).expect("record"),
        )
        .expect("create");

        let bytes = encode(&dataset, &key).expect("encode");
        assert_eq!(sniff(&bytes), StoreFormat::Sealed);
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("Alice"));
        assert!(!text.contains("access_token"));

        assert_eq!(decode(&bytes, &key).expect("decode"), dataset);
    }

    #[test]
    fn decode_refuses_plaintext_and_non_objects() {
        let key = StoreKey::default();
        assert!(decode(br#"{"accounts":[]}"#, &key).is_err());

        let sealed_array = crypto::seal(&key, b"[1,2,3]").expect("seal");
        assert!(decode(sealed_array.as_bytes(), &key).is_err());
    }

    #[test]
    fn plaintext_decoding_keeps_every_top_level_key() {
        let dataset = decode_plaintext(
            br#"{"accounts":[{"ID":1,"name":"Alice"}],"configClient":[],"__bootstrap":5}"#,
        )
        .expect("plaintext");
        assert_eq!(dataset.keys(), vec!["__bootstrap", "accounts", "configClient"]);
        assert_eq!(dataset.get("__bootstrap"), Some(&json!(5)));
    }
}
