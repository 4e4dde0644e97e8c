pub mod account_service;
pub mod backup_guard;
pub mod window_state;

pub use account_service::AccountService;
pub use backup_guard::BackupGuard;
pub use window_state::WindowStateStore;
