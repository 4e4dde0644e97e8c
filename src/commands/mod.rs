pub mod host;

pub use host::{is_dark_theme, EnvSystemTheme, HostChannel, HostRequest, SystemTheme};
