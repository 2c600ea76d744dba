use colored::Colorize;
use std::path::PathBuf;

pub async fn handle(file: Option<PathBuf>) -> anyhow::Result<()> {
    println!("{}", "Validating resource file...".blue());

    let resources = super::load_resources(file)?;

    println!("{}", "✓ Resource file is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  SQL virtual machines: {}", resources.len());
    for resource in &resources {
        let mut features = Vec::new();
        if resource.auto_backup.is_some() {
            features.push("auto_backup");
        }
        if resource.auto_patching.is_some() {
            features.push("auto_patching");
        }
        if resource.key_vault_credential.is_some() {
            features.push("key_vault_credential");
        }
        if resource.storage_configuration.is_some() {
            features.push("storage_configuration");
        }
        let features = if features.is_empty() {
            String::new()
        } else {
            format!(", {}", features.join(", "))
        };
        println!(
            "    - {} ({}{})",
            resource.name.cyan(),
            resource.sql_license_type,
            features
        );
    }

    Ok(())
}
