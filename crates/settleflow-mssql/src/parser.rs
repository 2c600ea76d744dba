//! KDL resource document parser
//!
//! ```kdl
//! sql_virtual_machine "sqlvm1" {
//!     virtual_machine_id "/subscriptions/.../virtualMachines/vm1"
//!     sql_license_type "PAYG"
//!     auto_patching { day_of_week "Sunday"; maintenance_window_duration_in_minutes 60; maintenance_window_starting_hour 2 }
//! }
//! ```
//!
//! Node names accept `snake_case` or `kebab-case`. Unknown nodes are errors.

use crate::config::{
    AutoBackup, AutoPatching, DiskConfigurationType, KeyVaultCredential, ManualSchedule,
    SqlLicenseType, SqlVirtualMachineConfig, StorageConfiguration, StorageSettings,
    StorageWorkloadType, Timeouts,
};
use crate::error::{MssqlError, Result};
use kdl::{KdlDocument, KdlNode};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Parse a resource file
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<SqlVirtualMachineConfig>> {
    let content = fs::read_to_string(path.as_ref())?;
    tracing::debug!("Parsing {}", path.as_ref().display());
    parse_document(&content)
}

/// Parse every `sql_virtual_machine` declaration in a document
pub fn parse_document(content: &str) -> Result<Vec<SqlVirtualMachineConfig>> {
    let doc: KdlDocument = content.parse()?;
    let mut seen = HashSet::new();
    let mut resources = Vec::new();

    for node in doc.nodes() {
        match node_name(node).as_str() {
            "sql_virtual_machine" => {
                let resource = parse_sql_virtual_machine(node)?;
                if !seen.insert(resource.name.clone()) {
                    return Err(MssqlError::InvalidConfig(format!(
                        "sql_virtual_machine {:?} is declared twice",
                        resource.name
                    )));
                }
                resources.push(resource);
            }
            other => return Err(unknown_node("document", other)),
        }
    }

    Ok(resources)
}

/// Parse one `sql_virtual_machine` node
pub fn parse_sql_virtual_machine(node: &KdlNode) -> Result<SqlVirtualMachineConfig> {
    let name = string_arg(node, "sql_virtual_machine")?;
    let context = format!("sql_virtual_machine {:?}", name);

    let mut virtual_machine_id = None;
    let mut sql_license_type = None;
    let mut rest = Vec::new();

    for child in children(node) {
        match node_name(child).as_str() {
            "virtual_machine_id" => virtual_machine_id = Some(string_arg(child, &context)?),
            "sql_license_type" => {
                sql_license_type = Some(string_arg(child, &context)?.parse::<SqlLicenseType>()?);
            }
            _ => rest.push(child),
        }
    }

    let mut config = SqlVirtualMachineConfig::new(
        &name,
        virtual_machine_id.ok_or_else(|| missing(&context, "virtual_machine_id"))?,
        sql_license_type.ok_or_else(|| missing(&context, "sql_license_type"))?,
    );

    for child in rest {
        match node_name(child).as_str() {
            "auto_backup" => config.auto_backup = Some(parse_auto_backup(child)?),
            "auto_patching" => config.auto_patching = Some(parse_auto_patching(child)?),
            "key_vault_credential" => {
                config.key_vault_credential = Some(parse_key_vault_credential(child)?)
            }
            "r_services_enabled" => config.r_services_enabled = bool_arg(child, &context)?,
            "sql_connectivity_port" => {
                let port = integer_arg(child, &context)?;
                config.sql_connectivity_port = u16::try_from(port).map_err(|_| {
                    MssqlError::InvalidConfig(format!(
                        "{}: sql_connectivity_port {} is out of range",
                        context, port
                    ))
                })?;
            }
            "sql_connectivity_type" => {
                config.sql_connectivity_type = string_arg(child, &context)?.parse()?
            }
            "sql_connectivity_update_username" => {
                config.sql_connectivity_update_username = Some(string_arg(child, &context)?)
            }
            "sql_connectivity_update_password" => {
                config.sql_connectivity_update_password = Some(string_arg(child, &context)?)
            }
            "storage_configuration" => {
                config.storage_configuration = Some(parse_storage_configuration(child)?)
            }
            "tags" => {
                // tags { env "prod"; team "data" }
                for tag in children(child) {
                    let key = tag.name().value().to_string();
                    config.tags.insert(key, string_arg(tag, "tags")?);
                }
            }
            "timeouts" => config.timeouts = parse_timeouts(child)?,
            other => return Err(unknown_node(&context, other)),
        }
    }

    Ok(config)
}

fn parse_auto_backup(node: &KdlNode) -> Result<AutoBackup> {
    let context = "auto_backup";
    let mut encryption_enabled = false;
    let mut encryption_password = None;
    let mut manual_schedule = None;
    let mut retention_period_in_days = None;
    let mut storage_blob_endpoint = None;
    let mut storage_account_access_key = None;
    let mut system_databases_backup_enabled = false;

    for child in children(node) {
        match node_name(child).as_str() {
            "encryption_enabled" => encryption_enabled = bool_arg(child, context)?,
            "encryption_password" => encryption_password = Some(string_arg(child, context)?),
            "manual_schedule" => manual_schedule = Some(parse_manual_schedule(child)?),
            "retention_period_in_days" => {
                retention_period_in_days = Some(integer_arg(child, context)?)
            }
            "storage_blob_endpoint" => storage_blob_endpoint = Some(string_arg(child, context)?),
            "storage_account_access_key" => {
                storage_account_access_key = Some(string_arg(child, context)?)
            }
            "system_databases_backup_enabled" => {
                system_databases_backup_enabled = bool_arg(child, context)?
            }
            other => return Err(unknown_node(context, other)),
        }
    }

    Ok(AutoBackup {
        encryption_enabled,
        encryption_password,
        manual_schedule,
        retention_period_in_days: retention_period_in_days
            .ok_or_else(|| missing(context, "retention_period_in_days"))?,
        storage_blob_endpoint: storage_blob_endpoint
            .ok_or_else(|| missing(context, "storage_blob_endpoint"))?,
        storage_account_access_key: storage_account_access_key
            .ok_or_else(|| missing(context, "storage_account_access_key"))?,
        system_databases_backup_enabled,
    })
}

fn parse_manual_schedule(node: &KdlNode) -> Result<ManualSchedule> {
    let context = "auto_backup.manual_schedule";
    let mut frequency = None;
    let mut start_hour = None;
    let mut window = None;
    let mut log_frequency = None;

    for child in children(node) {
        match node_name(child).as_str() {
            "full_backup_frequency" => frequency = Some(string_arg(child, context)?),
            "full_backup_start_hour" => start_hour = Some(integer_arg(child, context)?),
            "full_backup_window_in_hours" => window = Some(integer_arg(child, context)?),
            "log_backup_frequency_in_minutes" => {
                log_frequency = Some(integer_arg(child, context)?)
            }
            other => return Err(unknown_node(context, other)),
        }
    }

    Ok(ManualSchedule {
        full_backup_frequency: frequency.ok_or_else(|| missing(context, "full_backup_frequency"))?,
        full_backup_start_hour: start_hour
            .ok_or_else(|| missing(context, "full_backup_start_hour"))?,
        full_backup_window_in_hours: window
            .ok_or_else(|| missing(context, "full_backup_window_in_hours"))?,
        log_backup_frequency_in_minutes: log_frequency
            .ok_or_else(|| missing(context, "log_backup_frequency_in_minutes"))?,
    })
}

fn parse_auto_patching(node: &KdlNode) -> Result<AutoPatching> {
    let context = "auto_patching";
    let mut day_of_week = None;
    let mut duration = None;
    let mut starting_hour = None;

    for child in children(node) {
        match node_name(child).as_str() {
            "day_of_week" => day_of_week = Some(string_arg(child, context)?),
            "maintenance_window_duration_in_minutes" => {
                duration = Some(integer_arg(child, context)?)
            }
            "maintenance_window_starting_hour" => {
                starting_hour = Some(integer_arg(child, context)?)
            }
            other => return Err(unknown_node(context, other)),
        }
    }

    Ok(AutoPatching {
        day_of_week: day_of_week.ok_or_else(|| missing(context, "day_of_week"))?,
        maintenance_window_duration_in_minutes: duration
            .ok_or_else(|| missing(context, "maintenance_window_duration_in_minutes"))?,
        maintenance_window_starting_hour: starting_hour
            .ok_or_else(|| missing(context, "maintenance_window_starting_hour"))?,
    })
}

fn parse_key_vault_credential(node: &KdlNode) -> Result<KeyVaultCredential> {
    let context = "key_vault_credential";
    let mut name = None;
    let mut key_vault_url = None;
    let mut principal_name = None;
    let mut principal_secret = None;

    for child in children(node) {
        match node_name(child).as_str() {
            "name" => name = Some(string_arg(child, context)?),
            "key_vault_url" => key_vault_url = Some(string_arg(child, context)?),
            "service_principal_name" => principal_name = Some(string_arg(child, context)?),
            "service_principal_secret" => principal_secret = Some(string_arg(child, context)?),
            other => return Err(unknown_node(context, other)),
        }
    }

    Ok(KeyVaultCredential {
        name: name.ok_or_else(|| missing(context, "name"))?,
        key_vault_url: key_vault_url.ok_or_else(|| missing(context, "key_vault_url"))?,
        service_principal_name: principal_name
            .ok_or_else(|| missing(context, "service_principal_name"))?,
        service_principal_secret: principal_secret
            .ok_or_else(|| missing(context, "service_principal_secret"))?,
    })
}

fn parse_storage_configuration(node: &KdlNode) -> Result<StorageConfiguration> {
    let context = "storage_configuration";
    let mut disk_type = None;
    let mut workload_type = None;
    let mut data_settings = None;
    let mut log_settings = None;
    let mut temp_db_settings = None;

    for child in children(node) {
        match node_name(child).as_str() {
            "disk_type" => {
                disk_type = Some(string_arg(child, context)?.parse::<DiskConfigurationType>()?)
            }
            "storage_workload_type" => {
                workload_type = Some(string_arg(child, context)?.parse::<StorageWorkloadType>()?)
            }
            "data_settings" => data_settings = Some(parse_storage_settings(child)?),
            "log_settings" => log_settings = Some(parse_storage_settings(child)?),
            "temp_db_settings" => temp_db_settings = Some(parse_storage_settings(child)?),
            other => return Err(unknown_node(context, other)),
        }
    }

    Ok(StorageConfiguration {
        disk_type: disk_type.ok_or_else(|| missing(context, "disk_type"))?,
        storage_workload_type: workload_type
            .ok_or_else(|| missing(context, "storage_workload_type"))?,
        data_settings,
        log_settings,
        temp_db_settings,
    })
}

/// `luns 0 1 2` takes every argument
fn parse_storage_settings(node: &KdlNode) -> Result<StorageSettings> {
    let context = format!("storage_configuration.{}", node_name(node));
    let mut settings = StorageSettings::default();

    for child in children(node) {
        match node_name(child).as_str() {
            "default_file_path" => settings.default_file_path = string_arg(child, &context)?,
            "luns" => {
                settings.luns = child
                    .entries()
                    .iter()
                    .map(|e| {
                        e.value()
                            .as_integer()
                            .and_then(|v| i64::try_from(v).ok())
                            .ok_or_else(|| invalid_value(&context, "luns", "an integer"))
                    })
                    .collect::<Result<Vec<_>>>()?;
            }
            other => return Err(unknown_node(&context, other)),
        }
    }

    Ok(settings)
}

/// Values are in minutes and must leave a representable deadline
fn parse_timeouts(node: &KdlNode) -> Result<Timeouts> {
    let mut timeouts = Timeouts::default();
    let now = Instant::now();

    for child in children(node) {
        let minutes = integer_arg(child, "timeouts")?;
        let duration = u64::try_from(minutes)
            .ok()
            .filter(|m| *m > 0)
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
            .filter(|d| now.checked_add(*d).is_some())
            .ok_or_else(|| {
                invalid_value(
                    "timeouts",
                    child.name().value(),
                    "a positive number of minutes in range",
                )
            })?;

        match node_name(child).as_str() {
            "create" => timeouts.create = duration,
            "read" => timeouts.read = duration,
            "update" => timeouts.update = duration,
            "delete" => timeouts.delete = duration,
            other => return Err(unknown_node("timeouts", other)),
        }
    }

    Ok(timeouts)
}

fn node_name(node: &KdlNode) -> String {
    node.name().value().replace('-', "_")
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes())
}

fn string_arg(node: &KdlNode, context: &str) -> Result<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| invalid_value(context, node.name().value(), "a string"))
}

fn integer_arg(node: &KdlNode, context: &str) -> Result<i64> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| invalid_value(context, node.name().value(), "an integer"))
}

fn bool_arg(node: &KdlNode, context: &str) -> Result<bool> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_bool())
        .ok_or_else(|| invalid_value(context, node.name().value(), "#true or #false"))
}

fn invalid_value(context: &str, field: &str, expected: &str) -> MssqlError {
    MssqlError::InvalidConfig(format!("{}: {} expects {}", context, field, expected))
}

fn missing(context: &str, field: &str) -> MssqlError {
    MssqlError::InvalidConfig(format!("{}: {} is required", context, field))
}

fn unknown_node(context: &str, name: &str) -> MssqlError {
    MssqlError::InvalidConfig(format!("{}: unknown node {:?}", context, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectivityType;

    const VM_ID: &str =
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1";

    fn minimal(body: &str) -> String {
        format!(
            r#"sql_virtual_machine "sqlvm1" {{
    virtual_machine_id "{}"
    sql_license_type "PAYG"
    {}
}}"#,
            VM_ID, body
        )
    }

    #[test]
    fn test_parse_minimal() {
        let resources = parse_document(&minimal("")).unwrap();
        assert_eq!(resources.len(), 1);
        let vm = &resources[0];
        assert_eq!(vm.name, "sqlvm1");
        assert_eq!(vm.virtual_machine_id, VM_ID);
        assert_eq!(vm.sql_license_type, SqlLicenseType::Payg);
        assert_eq!(vm.sql_connectivity_port, 1433);
        assert!(vm.auto_backup.is_none());
    }

    #[test]
    fn test_parse_full_declaration() {
        let kdl = minimal(
            r#"
    auto_backup {
        encryption_enabled #true
        encryption_password "p@ss"
        retention_period_in_days 7
        storage_blob_endpoint "https://acct.blob.core.windows.net"
        storage_account_access_key "key"
        system_databases_backup_enabled #true
        manual_schedule {
            full_backup_frequency "Weekly"
            full_backup_start_hour 2
            full_backup_window_in_hours 4
            log_backup_frequency_in_minutes 60
        }
    }
    auto-patching { day_of_week "Sunday"; maintenance_window_duration_in_minutes 60; maintenance_window_starting_hour 2 }
    key_vault_credential {
        name "cred"
        key_vault_url "https://vault.vault.azure.net"
        service_principal_name "sp"
        service_principal_secret "secret"
    }
    r_services_enabled #true
    sql_connectivity_port 1533
    sql_connectivity_type "PUBLIC"
    storage_configuration {
        disk_type "NEW"
        storage_workload_type "OLTP"
        data_settings { default_file_path "F:\\data"; luns 0 1 }
    }
    tags { env "prod"; team "data" }
    timeouts { create 90; read 10 }
"#,
        );

        let vm = parse_document(&kdl).unwrap().remove(0);
        let backup = vm.auto_backup.unwrap();
        assert!(backup.encryption_enabled);
        assert_eq!(backup.encryption_password.as_deref(), Some("p@ss"));
        assert_eq!(backup.manual_schedule.unwrap().log_backup_frequency_in_minutes, 60);
        assert_eq!(vm.auto_patching.unwrap().day_of_week, "Sunday");
        assert_eq!(vm.key_vault_credential.unwrap().name, "cred");
        assert!(vm.r_services_enabled);
        assert_eq!(vm.sql_connectivity_port, 1533);
        assert_eq!(vm.sql_connectivity_type, ConnectivityType::Public);
        let storage = vm.storage_configuration.unwrap();
        assert_eq!(storage.disk_type, DiskConfigurationType::New);
        assert_eq!(storage.data_settings.unwrap().luns, vec![0, 1]);
        assert_eq!(vm.tags.get("team").map(String::as_str), Some("data"));
        assert_eq!(vm.timeouts.create, Duration::from_secs(90 * 60));
        assert_eq!(vm.timeouts.read, Duration::from_secs(600));
        assert_eq!(vm.timeouts.delete, Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_required_field() {
        let kdl = r#"sql_virtual_machine "sqlvm1" { sql_license_type "PAYG" }"#;
        let err = parse_document(kdl).unwrap_err();
        assert!(err.to_string().contains("virtual_machine_id is required"));
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let err = parse_document(&minimal("auto_backupp { }")).unwrap_err();
        assert!(err.to_string().contains("unknown node"));

        let err = parse_document("server \"web\" { }").unwrap_err();
        assert!(matches!(err, MssqlError::InvalidConfig(_)));
    }

    #[test]
    fn test_wrong_value_type() {
        let err = parse_document(&minimal("r_services_enabled \"yes\"")).unwrap_err();
        assert!(err.to_string().contains("#true or #false"));
    }

    #[test]
    fn test_invalid_license_type() {
        let kdl = format!(
            r#"sql_virtual_machine "sqlvm1" {{ virtual_machine_id "{}"; sql_license_type "FREE" }}"#,
            VM_ID
        );
        let err = parse_document(&kdl).unwrap_err();
        assert!(matches!(err, MssqlError::UnexpectedValue { .. }));
    }

    #[test]
    fn test_duplicate_names() {
        let kdl = format!("{}\n{}", minimal(""), minimal(""));
        let err = parse_document(&kdl).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settle.kdl");
        fs::write(&path, minimal("")).unwrap();
        assert_eq!(parse_file(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_timeouts_out_of_range() {
        for minutes in ["0", "-5", "9223372036854775807", "153722867280912930"] {
            let kdl = minimal(&format!("timeouts {{ create {} }}", minutes));
            let err = parse_document(&kdl).unwrap_err();
            assert!(
                err.to_string().contains("create expects a positive number of minutes"),
                "{}: {}",
                minutes,
                err
            );
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_document("sql_virtual_machine \"x\" {").unwrap_err();
        assert!(matches!(err, MssqlError::KdlParse(_)));
    }
}
