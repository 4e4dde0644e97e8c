pub mod app;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use app::{build_state, AppState};
pub use db::{Database, Record, StoreOptions};
pub use errors::{LauncherError, Result};
