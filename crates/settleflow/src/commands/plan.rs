use colored::Colorize;
use settleflow_cloud::{Change, ChangeType, Plan};
use settleflow_mssql::SqlVirtualMachineResource;
use std::path::PathBuf;

pub async fn handle(file: Option<PathBuf>) -> anyhow::Result<()> {
    let resources = super::load_resources(file)?;
    let (_, client) = super::connect()?;
    let resource = SqlVirtualMachineResource::new(&client);

    println!("{}", "Planning changes...".blue());
    println!();

    let mut changes = Vec::new();
    for config in &resources {
        let change = resource.plan_change(config).await?;
        print_change(&change);
        changes.push(change);
    }

    let plan = Plan::new(changes);
    println!();
    if plan.has_changes() {
        println!("Plan: {}", plan.summary().to_string().bold());
    } else {
        println!("{}", "No changes. Infrastructure is up to date.".green());
    }

    Ok(())
}

pub fn print_change(change: &Change) {
    let symbol = match change.change_type {
        ChangeType::Create => "+".green(),
        ChangeType::Update => "~".yellow(),
        ChangeType::Replace => "-/+".red(),
        ChangeType::NoOp => "=".dimmed(),
    };
    println!("  {} {}", symbol, change.description);
    for field in &change.fields {
        println!("      {}", field.dimmed());
    }
}
