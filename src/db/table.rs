use serde_json::{Map, Value};

use crate::errors::{LauncherError, Result};

/// A schema-less row. The only reserved key is [`ID_KEY`].
pub type Record = Map<String, Value>;

pub const ID_KEY: &str = "ID";
pub const BOOTSTRAP_KEY: &str = "__bootstrap";

pub const ACCOUNTS_TABLE: &str = "accounts";
pub const CONFIG_CLIENT_TABLE: &str = "configClient";

/// Implicit key for single-record tables such as `configClient`.
pub const DEFAULT_RECORD_ID: u64 = 1;

pub fn record_id(record: &Record) -> Option<u64> {
    record.get(ID_KEY).and_then(Value::as_u64)
}

fn value_id(value: &Value) -> Option<u64> {
    value.get(ID_KEY).and_then(Value::as_u64)
}

pub fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LauncherError::Store(format!(
            "record must be a JSON object, got {}",
            other
        ))),
    }
}

/// Every top-level key of one installation: tables plus loose values such as
/// the bootstrap marker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    entries: Map<String, Value>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Records of `table` in insertion order. Unknown tables read as empty.
    pub fn table(&self, table: &str) -> Vec<Record> {
        match self.entries.get(table) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Mutable view of `table`, created empty when absent. A loose value
    /// stored under the same key is never overwritten.
    fn table_mut(&mut self, table: &str) -> Result<&mut Vec<Value>> {
        match self
            .entries
            .entry(table.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => Ok(items),
            _ => Err(LauncherError::Store(format!(
                "key {table} holds a value that is not a table"
            ))),
        }
    }

    /// One past the highest stored ID. Fails once the ID space is exhausted.
    pub fn next_id(&self, table: &str) -> Result<u64> {
        let max = match self.entries.get(table) {
            Some(Value::Array(items)) => items.iter().filter_map(value_id).max().unwrap_or(0),
            _ => 0,
        };
        max.checked_add(1)
            .ok_or_else(|| LauncherError::Store(format!("table {table} has no IDs left")))
    }

    /// Appends `record` under a fresh ID; a caller-supplied `ID` is discarded.
    pub fn create(&mut self, table: &str, mut record: Record) -> Result<Record> {
        let id = self.next_id(table)?;
        record.insert(ID_KEY.to_string(), Value::from(id));
        self.table_mut(table)?.push(Value::Object(record.clone()));
        Ok(record)
    }

    pub fn read(&self, table: &str, id: u64) -> Option<Record> {
        match self.entries.get(table) {
            Some(Value::Array(items)) => items
                .iter()
                .find(|item| value_id(item) == Some(id))
                .and_then(|item| item.as_object().cloned()),
            _ => None,
        }
    }

    /// Replaces the record with `id` in place, or appends it when absent.
    pub fn update(&mut self, table: &str, mut record: Record, id: u64) -> Result<Record> {
        record.insert(ID_KEY.to_string(), Value::from(id));
        let items = self.table_mut(table)?;
        match items.iter().position(|item| value_id(item) == Some(id)) {
            Some(index) => items[index] = Value::Object(record.clone()),
            None => items.push(Value::Object(record.clone())),
        }
        Ok(record)
    }

    /// Atomic read-modify-write of one record. `change` sees the current
    /// record (if any) and returns the one to store under `id`.
    pub fn modify(
        &mut self,
        table: &str,
        id: u64,
        change: impl FnOnce(Option<Record>) -> Result<Record>,
    ) -> Result<Record> {
        let current = self.read(table, id);
        let next = change(current)?;
        self.update(table, next, id)
    }

    /// Strict update: fails when no record carries `id`.
    pub fn replace(&mut self, table: &str, mut record: Record, id: u64) -> Result<Record> {
        let index = match self.entries.get(table) {
            Some(Value::Array(items)) => items.iter().position(|item| value_id(item) == Some(id)),
            _ => None,
        }
        .ok_or_else(|| LauncherError::NotFound(format!("{table}#{id}")))?;

        record.insert(ID_KEY.to_string(), Value::from(id));
        self.table_mut(table)?[index] = Value::Object(record.clone());
        Ok(record)
    }

    /// Returns whether a record was removed. Missing tables and loose
    /// values are left untouched.
    pub fn delete(&mut self, table: &str, id: u64) -> bool {
        let Some(Value::Array(items)) = self.entries.get_mut(table) else {
            return false;
        };
        let before = items.len();
        items.retain(|item| value_id(item) != Some(id));
        items.len() != before
    }

    pub fn clear(&mut self, table: &str) -> Result<()> {
        self.table_mut(table)?.clear();
        Ok(())
    }
}
