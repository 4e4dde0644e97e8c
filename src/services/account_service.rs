use serde_json::Value;

use crate::db::{
    record_id, Database, Record, ACCOUNTS_TABLE, CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID,
};
use crate::errors::{LauncherError, Result};
use crate::models::default_config_client;

const ACCOUNT_SELECTED_KEY: &str = "account_selected";

/// Accounts plus the `configClient.account_selected` pointer into them.
/// Every mutation here keeps that pointer from dangling.
#[derive(Clone)]
pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn ensure_config_client(&self) -> Result<Record> {
        if let Some(existing) = self
            .db
            .read_data(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID)
            .await?
        {
            return Ok(existing);
        }
        self.db
            .modify_data(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID, |current| {
                Ok(current.unwrap_or_else(|| {
                    tracing::info!("initializing default client configuration");
                    default_config_client()
                }))
            })
            .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Record>> {
        self.db.read_all_data(ACCOUNTS_TABLE).await
    }

    pub async fn add_account(&self, account: Record) -> Result<Record> {
        self.db.create_data(ACCOUNTS_TABLE, account).await
    }

    pub async fn selected_account_id(&self) -> Result<Option<u64>> {
        let config = self.ensure_config_client().await?;
        Ok(selection_of(&config))
    }

    /// The selected account, or `None` when nothing is selected or the
    /// stored selection no longer points at an account.
    pub async fn selected_account(&self) -> Result<Option<Record>> {
        let Some(id) = self.selected_account_id().await? else {
            return Ok(None);
        };
        let account = self.db.read_data(ACCOUNTS_TABLE, id).await?;
        if account.is_none() {
            tracing::warn!("selected account {} no longer exists", id);
        }
        Ok(account)
    }

    pub async fn select_account(&self, id: u64) -> Result<Record> {
        let account = self
            .db
            .read_data(ACCOUNTS_TABLE, id)
            .await?
            .ok_or_else(|| LauncherError::NotFound(format!("account {id}")))?;
        self.set_selection(Some(id)).await?;
        Ok(account)
    }

    /// Deletes an account. When it was selected, selection moves to the first
    /// remaining account (or clears). Returns the new selection.
    pub async fn remove_account(&self, id: u64) -> Result<Option<u64>> {
        self.db.delete_data(ACCOUNTS_TABLE, id).await?;
        let fallback = self
            .db
            .read_all_data(ACCOUNTS_TABLE)
            .await?
            .first()
            .and_then(record_id);

        // Only the selection key is touched, and only if it still names `id`.
        let config = self
            .db
            .modify_data(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID, move |current| {
                let mut config = current.unwrap_or_else(default_config_client);
                if selection_of(&config) == Some(id) {
                    set_selection_key(&mut config, fallback);
                }
                Ok(config)
            })
            .await?;
        Ok(selection_of(&config))
    }

    pub async fn clear_accounts(&self) -> Result<()> {
        self.db.clear_table(ACCOUNTS_TABLE).await?;
        self.set_selection(None).await?;
        Ok(())
    }

    /// Rewrites `account_selected` on the stored record in one queued
    /// command, keeping any other settings written concurrently.
    async fn set_selection(&self, id: Option<u64>) -> Result<()> {
        self.db
            .modify_data(CONFIG_CLIENT_TABLE, DEFAULT_RECORD_ID, move |current| {
                let mut config = current.unwrap_or_else(default_config_client);
                set_selection_key(&mut config, id);
                Ok(config)
            })
            .await?;
        Ok(())
    }
}

fn selection_of(config: &Record) -> Option<u64> {
    config.get(ACCOUNT_SELECTED_KEY).and_then(Value::as_u64)
}

fn set_selection_key(config: &mut Record, id: Option<u64>) {
    config.insert(
        ACCOUNT_SELECTED_KEY.to_string(),
        id.map(Value::from).unwrap_or(Value::Null),
    );
}
