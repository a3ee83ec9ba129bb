//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mdr_core` linkage and database bootstrap from a shell.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `mdr_cli [DB_PATH]`. Without a path an in-memory database is used.
//! `MDR_LOG_DIR` enables file logging at `MDR_LOG_LEVEL` (default by build).

use mdr_core::db::migrations::current_user_version;
use mdr_core::db::{open_db, open_db_in_memory};
use mdr_core::{ComposerConfig, RecordComposer};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("MDR_LOG_DIR") {
        let level = std::env::var("MDR_LOG_LEVEL")
            .unwrap_or_else(|_| mdr_core::default_log_level().to_string());
        if let Err(err) = mdr_core::init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("mdr_core ping={}", mdr_core::ping());
    println!("mdr_core version={}", mdr_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ComposerConfig::from_env()?;
    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let composer = RecordComposer::with_config(&conn, config)?;
    println!("mdr_core schema_version={}", current_user_version(&conn)?);
    println!(
        "mdr_core update_policy={:?}",
        composer.config().update_policy
    );
    Ok(())
}
