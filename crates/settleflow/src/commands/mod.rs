pub mod apply;
pub mod destroy;
pub mod plan;
pub mod show;
pub mod validate;

use anyhow::Context;
use colored::Colorize;
use settleflow_config::Settings;
use settleflow_mssql::{ArmClient, SqlVirtualMachineConfig};
use std::path::PathBuf;
use tokio::sync::watch;

/// Explicit path, or the discovered resource file
pub fn resolve_file(file: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => Ok(settleflow_config::find_settle_file()?),
    }
}

/// Parse every declaration in the resource file
pub fn load_resources(file: Option<PathBuf>) -> anyhow::Result<Vec<SqlVirtualMachineConfig>> {
    let path = resolve_file(file)?;
    println!("Resource file: {}", path.display().to_string().cyan());

    let resources = settleflow_mssql::parse_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    for resource in &resources {
        settleflow_mssql::validate(resource)?;
    }
    Ok(resources)
}

/// Settings plus an authenticated management API client
pub fn connect() -> anyhow::Result<(Settings, ArmClient)> {
    let settings = Settings::load()?;
    let token = Settings::token()?;
    tracing::debug!("Using management endpoint {}", settings.arm.endpoint);
    let client = ArmClient::new(&settings.arm.endpoint, token);
    Ok((settings, client))
}

/// Publish `true` on Ctrl-C so that settle waits stop early
pub fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping settle wait...".yellow());
            let _ = tx.send(true);
        }
    });
    rx
}
