use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{LauncherError, Result};
use crate::utils::crypto::StoreKey;
use crate::utils::file::write_atomic;
use crate::utils::paths::{StoreLocation, StoreMode};

pub mod codec;
pub mod migration;
pub mod table;

pub use migration::{MigrationReport, StoreState};
pub use table::{
    into_record, record_id, Dataset, Record, ACCOUNTS_TABLE, BOOTSTRAP_KEY, CONFIG_CLIENT_TABLE,
    DEFAULT_RECORD_ID, ID_KEY,
};

const COMMAND_QUEUE_DEPTH: usize = 64;

type RecordChange = Box<dyn FnOnce(Option<Record>) -> Result<Record> + Send>;

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub location: StoreLocation,
    pub mode: StoreMode,
    pub legacy_candidates: Vec<PathBuf>,
    pub key: StoreKey,
}

impl StoreOptions {
    pub fn new(location: StoreLocation, mode: StoreMode) -> Self {
        Self {
            location,
            mode,
            legacy_candidates: Vec::new(),
            key: StoreKey::default(),
        }
    }

    pub fn with_legacy_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.legacy_candidates = candidates;
        self
    }

    pub fn with_key(mut self, key: StoreKey) -> Self {
        self.key = key;
        self
    }
}

enum Command {
    Create {
        table: String,
        record: Record,
        reply: oneshot::Sender<Result<Record>>,
    },
    Read {
        table: String,
        id: u64,
        reply: oneshot::Sender<Option<Record>>,
    },
    ReadAll {
        table: String,
        reply: oneshot::Sender<Vec<Record>>,
    },
    Update {
        table: String,
        record: Record,
        id: u64,
        reply: oneshot::Sender<Result<Record>>,
    },
    Replace {
        table: String,
        record: Record,
        id: u64,
        reply: oneshot::Sender<Result<Record>>,
    },
    Modify {
        table: String,
        id: u64,
        change: RecordChange,
        reply: oneshot::Sender<Result<Record>>,
    },
    Delete {
        table: String,
        id: u64,
        reply: oneshot::Sender<Result<bool>>,
    },
    Clear {
        table: String,
        reply: oneshot::Sender<Result<()>>,
    },
    GetValue {
        key: String,
        reply: oneshot::Sender<Option<Value>>,
    },
    SetValue {
        key: String,
        value: Value,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Dataset>,
    },
}

/// Handle to the encrypted table store. Clones share one actor, which
/// applies commands strictly one after another.
#[derive(Clone)]
pub struct Database {
    sender: mpsc::Sender<Command>,
    location: StoreLocation,
    report: Arc<MigrationReport>,
}

impl Database {
    /// Runs the startup migration and spawns the store actor. Must be called
    /// from inside a tokio runtime.
    pub async fn open(options: StoreOptions) -> Result<Self> {
        let migrate_options = options.clone();
        let migration::Migration { dataset, report } =
            tokio::task::spawn_blocking(move || migration::run(&migrate_options))
                .await
                .map_err(|err| LauncherError::Store(format!("store migration task failed: {err}")))?;

        tracing::info!(
            "store open at {} ({} top-level keys)",
            options.location.primary_file.display(),
            dataset.as_map().len()
        );

        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let actor = StoreActor {
            dataset,
            path: options.location.primary_file.clone(),
            key: options.key,
        };
        tokio::spawn(actor.run(receiver));

        Ok(Self {
            sender,
            location: options.location,
            report: Arc::new(report),
        })
    }

    pub fn primary_file(&self) -> &Path {
        &self.location.primary_file
    }

    pub fn primary_file_exists(&self) -> bool {
        self.location.primary_file.exists()
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn migration_report(&self) -> &MigrationReport {
        &self.report
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| LauncherError::Store("store actor has stopped".to_string()))?;
        response
            .await
            .map_err(|_| LauncherError::Store("store actor dropped the request".to_string()))
    }

    pub async fn create_data(&self, table: &str, record: Record) -> Result<Record> {
        let table = table.to_string();
        self.request(|reply| Command::Create {
            table,
            record,
            reply,
        })
        .await?
    }

    pub async fn read_data(&self, table: &str, id: u64) -> Result<Option<Record>> {
        let table = table.to_string();
        self.request(|reply| Command::Read { table, id, reply }).await
    }

    pub async fn read_all_data(&self, table: &str) -> Result<Vec<Record>> {
        let table = table.to_string();
        self.request(|reply| Command::ReadAll { table, reply }).await
    }

    /// Upsert: replaces the record with `id` or appends it under that id.
    pub async fn update_data(&self, table: &str, record: Record, id: u64) -> Result<Record> {
        let table = table.to_string();
        self.request(|reply| Command::Update {
            table,
            record,
            id,
            reply,
        })
        .await?
    }

    /// Like [`Database::update_data`] but fails with `NotFound` instead of inserting.
    pub async fn replace_data(&self, table: &str, record: Record, id: u64) -> Result<Record> {
        let table = table.to_string();
        self.request(|reply| Command::Replace {
            table,
            record,
            id,
            reply,
        })
        .await?
    }

    /// Read-modify-write of one record as a single queued command, so no other
    /// write can land between the read and the write. `change` receives the
    /// current record (or `None`) and returns the record to store under `id`.
    pub async fn modify_data<F>(&self, table: &str, id: u64, change: F) -> Result<Record>
    where
        F: FnOnce(Option<Record>) -> Result<Record> + Send + 'static,
    {
        let table = table.to_string();
        self.request(|reply| Command::Modify {
            table,
            id,
            change: Box::new(change),
            reply,
        })
        .await?
    }

    /// Returns whether a record was removed.
    pub async fn delete_data(&self, table: &str, id: u64) -> Result<bool> {
        let table = table.to_string();
        self.request(|reply| Command::Delete { table, id, reply })
            .await?
    }

    pub async fn clear_table(&self, table: &str) -> Result<()> {
        let table = table.to_string();
        self.request(|reply| Command::Clear { table, reply }).await?
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.request(|reply| Command::GetValue { key, reply }).await
    }

    pub async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        self.request(|reply| Command::SetValue { key, value, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<Dataset> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}

struct StoreActor {
    dataset: Dataset,
    path: PathBuf,
    key: StoreKey,
}

impl StoreActor {
    async fn run(mut self, mut receiver: mpsc::Receiver<Command>) {
        while let Some(command) = receiver.recv().await {
            self.handle(command).await;
        }
        tracing::debug!("store actor for {} stopped", self.path.display());
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Create {
                table,
                record,
                reply,
            } => {
                let result = self
                    .mutate(|dataset| dataset.create(&table, record))
                    .await;
                let _ = reply.send(result);
            }
            Command::Read { table, id, reply } => {
                let _ = reply.send(self.dataset.read(&table, id));
            }
            Command::ReadAll { table, reply } => {
                let _ = reply.send(self.dataset.table(&table));
            }
            Command::Update {
                table,
                record,
                id,
                reply,
            } => {
                let result = self
                    .mutate(|dataset| dataset.update(&table, record, id))
                    .await;
                let _ = reply.send(result);
            }
            Command::Replace {
                table,
                record,
                id,
                reply,
            } => {
                let result = self
                    .mutate(|dataset| dataset.replace(&table, record, id))
                    .await;
                let _ = reply.send(result);
            }
            Command::Modify {
                table,
                id,
                change,
                reply,
            } => {
                let result = self
                    .mutate(|dataset| {
                        // A panicking callback must not take the actor down with it.
                        panic::catch_unwind(AssertUnwindSafe(|| dataset.modify(&table, id, change)))
                            .unwrap_or_else(|_| {
                                Err(LauncherError::Store(format!(
                                    "modify callback for {table}#{id} panicked"
                                )))
                            })
                    })
                    .await;
                let _ = reply.send(result);
            }
            Command::Delete { table, id, reply } => {
                if self.dataset.read(&table, id).is_none() {
                    let _ = reply.send(Ok(false));
                    return;
                }
                let result = self
                    .mutate(|dataset| Ok(dataset.delete(&table, id)))
                    .await;
                let _ = reply.send(result);
            }
            Command::Clear { table, reply } => {
                let result = self.mutate(|dataset| dataset.clear(&table)).await;
                let _ = reply.send(result);
            }
            Command::GetValue { key, reply } => {
                let _ = reply.send(self.dataset.get(&key).cloned());
            }
            Command::SetValue { key, value, reply } => {
                let result = self
                    .mutate(|dataset| {
                        dataset.set(&key, value);
                        Ok(())
                    })
                    .await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.dataset.clone());
            }
        }
    }

    /// Applies `change` to a copy, persists the copy, and only then makes it
    /// current. A failed write leaves memory matching the file.
    async fn mutate<T>(&mut self, change: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        let mut next = self.dataset.clone();
        let output = change(&mut next)?;
        let bytes = codec::encode(&next, &self.key)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|err| LauncherError::Store(format!("store write task failed: {err}")))??;
        self.dataset = next;
        Ok(output)
    }
}
