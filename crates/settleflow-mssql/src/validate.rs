//! Plan-time validation
//!
//! Every rule is checked and all failures are reported together.

use crate::config::{
    AutoBackup, AutoPatching, DAYS_OF_WEEK, FULL_BACKUP_FREQUENCIES, KeyVaultCredential,
    ManualSchedule, SqlVirtualMachineConfig, StorageConfiguration, StorageSettings,
};
use crate::error::{MssqlError, Result};
use crate::id::VirtualMachineId;
use reqwest::Url;
use std::ops::RangeInclusive;

const LOGIN_NAME_FORBIDDEN: &[char] = &[
    '\\', '/', '"', '[', ']', ':', '|', '<', '>', '+', '=', ';', ',', '?', '*', ' ',
];

#[derive(Default)]
struct Errors(Vec<String>);

impl Errors {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn range(&mut self, field: &str, value: i64, range: RangeInclusive<i64>) {
        if !range.contains(&value) {
            self.push(format!(
                "{} must be between {} and {}, got {}",
                field,
                range.start(),
                range.end(),
                value
            ));
        }
    }

    fn not_empty(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.push(format!("{} must not be empty", field));
        }
    }

    fn https_url(&mut self, field: &str, value: &str) {
        let valid = Url::parse(value).is_ok_and(|url| {
            url.scheme() == "https" && url.host_str().is_some_and(|host| !host.is_empty())
        });
        if !valid {
            self.push(format!("{} must be an https URL, got {:?}", field, value));
        }
    }

    fn one_of(&mut self, field: &str, value: &str, allowed: &[&str], ignore_case: bool) {
        let found = allowed.iter().any(|a| {
            if ignore_case {
                a.eq_ignore_ascii_case(value)
            } else {
                *a == value
            }
        });
        if !found {
            self.push(format!(
                "{} must be one of {}, got {:?}",
                field,
                allowed.join(", "),
                value
            ));
        }
    }
}

/// Validate a declaration, returning every failed rule
pub fn validate(config: &SqlVirtualMachineConfig) -> Result<()> {
    let mut errors = Errors::default();

    if let Err(e) = config.virtual_machine_id.parse::<VirtualMachineId>() {
        errors.push(format!("virtual_machine_id: {}", e));
    }

    if let Some(backup) = &config.auto_backup {
        validate_auto_backup(backup, &mut errors);
    }
    if let Some(patching) = &config.auto_patching {
        validate_auto_patching(patching, &mut errors);
    }
    if let Some(credential) = &config.key_vault_credential {
        validate_key_vault_credential(credential, &mut errors);
    }

    errors.range(
        "sql_connectivity_port",
        i64::from(config.sql_connectivity_port),
        1024..=65535,
    );

    if let Some(username) = &config.sql_connectivity_update_username {
        validate_login_name(username, &mut errors);
    }
    if let Some(password) = &config.sql_connectivity_update_password {
        errors.not_empty("sql_connectivity_update_password", password);
    }

    if let Some(storage) = &config.storage_configuration {
        validate_storage_configuration(storage, &mut errors);
    }

    if errors.0.is_empty() {
        Ok(())
    } else {
        Err(MssqlError::Validation {
            resource: config.name.clone(),
            errors: errors.0,
        })
    }
}

fn validate_auto_backup(backup: &AutoBackup, errors: &mut Errors) {
    errors.range(
        "auto_backup.retention_period_in_days",
        backup.retention_period_in_days,
        1..=30,
    );
    errors.https_url("auto_backup.storage_blob_endpoint", &backup.storage_blob_endpoint);
    errors.not_empty(
        "auto_backup.storage_account_access_key",
        &backup.storage_account_access_key,
    );

    let has_password = backup
        .encryption_password
        .as_deref()
        .is_some_and(|p| !p.is_empty());
    if backup.encryption_enabled && !has_password {
        errors.push("auto_backup: encryption_password is required when encryption_enabled is true");
    }
    if !backup.encryption_enabled && has_password {
        errors.push("auto_backup: encryption_enabled must be true when encryption_password is set");
    }

    if let Some(schedule) = &backup.manual_schedule {
        validate_manual_schedule(schedule, errors);
    }
}

fn validate_manual_schedule(schedule: &ManualSchedule, errors: &mut Errors) {
    errors.one_of(
        "auto_backup.manual_schedule.full_backup_frequency",
        &schedule.full_backup_frequency,
        FULL_BACKUP_FREQUENCIES,
        true,
    );
    errors.range(
        "auto_backup.manual_schedule.full_backup_start_hour",
        schedule.full_backup_start_hour,
        0..=23,
    );
    errors.range(
        "auto_backup.manual_schedule.full_backup_window_in_hours",
        schedule.full_backup_window_in_hours,
        1..=23,
    );
    errors.range(
        "auto_backup.manual_schedule.log_backup_frequency_in_minutes",
        schedule.log_backup_frequency_in_minutes,
        5..=60,
    );
}

fn validate_auto_patching(patching: &AutoPatching, errors: &mut Errors) {
    errors.one_of(
        "auto_patching.day_of_week",
        &patching.day_of_week,
        DAYS_OF_WEEK,
        false,
    );
    errors.range(
        "auto_patching.maintenance_window_duration_in_minutes",
        patching.maintenance_window_duration_in_minutes,
        30..=180,
    );
    errors.range(
        "auto_patching.maintenance_window_starting_hour",
        patching.maintenance_window_starting_hour,
        0..=23,
    );
}

fn validate_key_vault_credential(credential: &KeyVaultCredential, errors: &mut Errors) {
    errors.not_empty("key_vault_credential.name", &credential.name);
    errors.https_url("key_vault_credential.key_vault_url", &credential.key_vault_url);
    errors.not_empty(
        "key_vault_credential.service_principal_name",
        &credential.service_principal_name,
    );
    errors.not_empty(
        "key_vault_credential.service_principal_secret",
        &credential.service_principal_secret,
    );
}

/// SQL login: 2 to 128 characters, starting with a letter
fn validate_login_name(name: &str, errors: &mut Errors) {
    let field = "sql_connectivity_update_username";
    let length = name.chars().count();
    if !(2..=128).contains(&length) {
        errors.push(format!("{} must be 2 to 128 characters long", field));
    }
    if !name.chars().next().is_some_and(|c| c.is_alphabetic()) {
        errors.push(format!("{} must start with a letter", field));
    }
    if name.contains(LOGIN_NAME_FORBIDDEN) {
        errors.push(format!(
            "{} must not contain any of {:?}",
            field,
            LOGIN_NAME_FORBIDDEN.iter().collect::<String>()
        ));
    }
}

fn validate_storage_configuration(storage: &StorageConfiguration, errors: &mut Errors) {
    let settings = [
        ("data_settings", &storage.data_settings),
        ("log_settings", &storage.log_settings),
        ("temp_db_settings", &storage.temp_db_settings),
    ];
    for (name, settings) in settings {
        if let Some(settings) = settings {
            validate_storage_settings(name, settings, errors);
        }
    }
}

fn validate_storage_settings(name: &str, settings: &StorageSettings, errors: &mut Errors) {
    errors.not_empty(
        &format!("storage_configuration.{}.default_file_path", name),
        &settings.default_file_path,
    );
    if settings.luns.iter().any(|lun| *lun < 0) {
        errors.push(format!(
            "storage_configuration.{}.luns must not be negative",
            name
        ));
    }
}
