use colored::Colorize;
use settleflow_mssql::SqlVirtualMachineResource;
use std::io::{self, Write};
use std::path::PathBuf;

pub async fn handle(name: &str, file: Option<PathBuf>, yes: bool) -> anyhow::Result<()> {
    let resources = super::load_resources(file)?;
    let config = resources
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| anyhow::anyhow!("sql_virtual_machine {:?} is not declared", name))?;

    if !yes {
        print!(
            "{} Delete SQL virtual machine {}? [y/N]: ",
            "?".yellow(),
            name.cyan()
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let (_, client) = super::connect()?;
    SqlVirtualMachineResource::new(&client).delete(config).await?;
    println!("{} {} deleted", "✓".green(), name);
    Ok(())
}
