use colored::Colorize;
use settleflow_cloud::ChangeType;
use settleflow_mssql::SqlVirtualMachineResource;
use std::path::PathBuf;
use std::time::Duration;

pub async fn handle(
    file: Option<PathBuf>,
    interval: Option<u64>,
    debounce: Option<u32>,
) -> anyhow::Result<()> {
    let resources = super::load_resources(file)?;
    let (settings, client) = super::connect()?;

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.settle.interval());
    let debounce = debounce.unwrap_or(settings.settle.debounce);
    tracing::debug!("Settle interval {:?}, debounce {}", interval, debounce);

    let resource = SqlVirtualMachineResource::new(&client)
        .with_settle(interval, debounce)
        .with_cancel(super::cancel_on_ctrl_c());

    for config in &resources {
        println!("{} {}", "Applying".blue(), config.name.cyan());
        let (change, _) = resource.apply(config).await?;
        let message = match change {
            ChangeType::Create => "created",
            ChangeType::Update => "updated",
            ChangeType::Replace => "replaced",
            ChangeType::NoOp => "unchanged",
        };
        println!("  {} {} {}", "✓".green(), config.name, message);
    }

    println!();
    println!("{}", "✓ Apply complete".green().bold());
    Ok(())
}
