use ys_launcher::commands::{is_dark_theme, EnvSystemTheme};
use ys_launcher::config::LauncherConfig;
use ys_launcher::errors::{LauncherError, Result};
use ys_launcher::{app, build_state, logging};

fn main() {
    if let Err(err) = run() {
        tracing::error!("launcher exited with error: {err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = LauncherConfig::from_env();
    logging::init(&config.log_dir)?;
    tracing::info!(
        "ys-launcher {} starting (mode {:?}, user data {})",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        config.user_data_dir.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match args.get(1).map(String::as_str) {
        None | Some("run") => runtime.block_on(cmd_run(config)),
        Some("dump") => runtime.block_on(cmd_dump(config)),
        Some("backup") => cmd_backup(&config),
        Some("restore") => cmd_restore(&config),
        Some("theme") => cmd_theme(args.get(2).map(String::as_str)),
        Some(other) => {
            print_usage();
            Err(LauncherError::Config(format!("unknown command: {other}")))
        }
    }
}

fn print_usage() {
    eprintln!("usage: ys-launcher [run|dump|backup|restore|theme <dark|light|auto>]");
}

async fn cmd_run(config: LauncherConfig) -> Result<()> {
    let state = build_state(config).await?;
    let report = state.db.migration_report();
    tracing::info!(
        "store ready: legacy_source={:?} plaintext_backup={:?} quarantined={:?} bootstrapped={}",
        report.legacy_source,
        report.plaintext_backup,
        report.quarantined,
        report.bootstrapped
    );

    match state.accounts.selected_account().await? {
        Some(account) => {
            let name = account
                .get("name")
                .or_else(|| account.get("username"))
                .and_then(|value| value.as_str())
                .unwrap_or("OfflineUser");
            println!("selected account: {name}");
        }
        None => println!("no account selected; login required"),
    }

    let backed_up = state.shutdown()?;
    tracing::info!("shutdown backup written: {}", backed_up);
    Ok(())
}

async fn cmd_dump(config: LauncherConfig) -> Result<()> {
    let state = build_state(config).await?;
    let dump = state.dump().await?;
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

fn cmd_backup(config: &LauncherConfig) -> Result<()> {
    let guard = app::backup_guard(config);
    if guard.backup()? {
        println!("backed up to {}", guard.backup_file().display());
    } else {
        println!("nothing to back up at {}", guard.primary_file().display());
    }
    Ok(())
}

fn cmd_restore(config: &LauncherConfig) -> Result<()> {
    let guard = app::backup_guard(config);
    let present = guard.restore_if_missing();
    println!("primary present: {present}");
    Ok(())
}

fn cmd_theme(preference: Option<&str>) -> Result<()> {
    println!("{}", is_dark_theme(preference, &EnvSystemTheme));
    Ok(())
}
