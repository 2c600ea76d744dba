//! Expand (config -> wire) and flatten (wire -> config)
//!
//! Flatten is shared by Read and by the settle targets, so both observe the
//! same normalization. Write-only fields are copied from `prior`.

use crate::config::{
    AutoBackup, AutoPatching, ConnectivityType, DiskConfigurationType, KeyVaultCredential,
    MAX_LOG_BACKUP_FREQUENCY_MINUTES, ManualSchedule, SqlLicenseType, SqlVirtualMachineConfig,
    StorageConfiguration, StorageSettings, StorageWorkloadType,
};
use crate::error::{MssqlError, Result};
use crate::wire::{
    AdditionalFeaturesServerConfigurations, AutoBackupSettings, AutoPatchingSettings,
    BACKUP_SCHEDULE_AUTOMATED, BACKUP_SCHEDULE_MANUAL, KeyVaultCredentialSettings,
    SQL_MANAGEMENT_FULL, ServerConfigurationsManagementSettings, SqlConnectivityUpdateSettings,
    SqlStorageSettings, SqlVirtualMachine, SqlVirtualMachineProperties,
    StorageConfigurationSettings,
};

/// Build the request body for a create or update
pub fn expand(config: &SqlVirtualMachineConfig, location: &str) -> SqlVirtualMachine {
    SqlVirtualMachine {
        id: None,
        name: None,
        location: location.to_string(),
        tags: Some(config.tags.clone()),
        properties: Some(SqlVirtualMachineProperties {
            virtual_machine_resource_id: Some(config.virtual_machine_id.clone()),
            sql_server_license_type: Some(config.sql_license_type.as_str().to_string()),
            sql_management: Some(SQL_MANAGEMENT_FULL.to_string()),
            auto_backup_settings: Some(expand_auto_backup(config.auto_backup.as_ref())),
            auto_patching_settings: Some(expand_auto_patching(config.auto_patching.as_ref())),
            key_vault_credential_settings: expand_key_vault_credential(
                config.key_vault_credential.as_ref(),
            ),
            server_configurations_management_settings: Some(
                ServerConfigurationsManagementSettings {
                    sql_connectivity_update_settings: Some(SqlConnectivityUpdateSettings {
                        connectivity_type: Some(config.sql_connectivity_type.as_str().to_string()),
                        port: Some(i64::from(config.sql_connectivity_port)),
                        sql_auth_update_user_name: config.sql_connectivity_update_username.clone(),
                        sql_auth_update_password: config.sql_connectivity_update_password.clone(),
                    }),
                    additional_features_server_configurations: Some(
                        AdditionalFeaturesServerConfigurations {
                            is_r_services_enabled: Some(config.r_services_enabled),
                        },
                    ),
                    sql_workload_type_update_settings: None,
                },
            ),
            storage_configuration_settings: config
                .storage_configuration
                .as_ref()
                .map(expand_storage_configuration),
            provisioning_state: None,
        }),
    }
}

/// An absent block is sent as `enable: false`
pub fn expand_auto_backup(input: Option<&AutoBackup>) -> AutoBackupSettings {
    let Some(backup) = input else {
        return AutoBackupSettings {
            enable: Some(false),
            ..Default::default()
        };
    };

    let mut settings = AutoBackupSettings {
        enable: Some(true),
        enable_encryption: Some(backup.encryption_enabled),
        retention_period: Some(backup.retention_period_in_days),
        storage_account_url: Some(backup.storage_blob_endpoint.clone()),
        storage_access_key: Some(backup.storage_account_access_key.clone()),
        backup_system_dbs: Some(backup.system_databases_backup_enabled),
        backup_schedule_type: Some(BACKUP_SCHEDULE_AUTOMATED.to_string()),
        ..Default::default()
    };

    if backup.encryption_enabled {
        settings.password = backup.encryption_password.clone();
    }

    if let Some(schedule) = &backup.manual_schedule {
        settings.backup_schedule_type = Some(BACKUP_SCHEDULE_MANUAL.to_string());
        settings.full_backup_frequency = Some(schedule.full_backup_frequency.clone());
        settings.full_backup_start_time = Some(schedule.full_backup_start_hour);
        settings.full_backup_window_hours = Some(schedule.full_backup_window_in_hours);
        settings.log_backup_frequency = Some(schedule.log_backup_frequency_in_minutes);
    }

    settings
}

/// An absent block is sent as `enable: false` so that removal can settle
pub fn expand_auto_patching(input: Option<&AutoPatching>) -> AutoPatchingSettings {
    match input {
        None => AutoPatchingSettings {
            enable: Some(false),
            ..Default::default()
        },
        Some(patching) => AutoPatchingSettings {
            enable: Some(true),
            day_of_week: Some(patching.day_of_week.clone()),
            maintenance_window_starting_hour: Some(patching.maintenance_window_starting_hour),
            maintenance_window_duration: Some(patching.maintenance_window_duration_in_minutes),
        },
    }
}

pub fn expand_key_vault_credential(
    input: Option<&KeyVaultCredential>,
) -> Option<KeyVaultCredentialSettings> {
    let credential = input?;
    Some(KeyVaultCredentialSettings {
        enable: Some(true),
        credential_name: Some(credential.name.clone()),
        azure_key_vault_url: Some(credential.key_vault_url.clone()),
        service_principal_name: Some(credential.service_principal_name.clone()),
        service_principal_secret: Some(credential.service_principal_secret.clone()),
    })
}

pub fn expand_storage_configuration(input: &StorageConfiguration) -> StorageConfigurationSettings {
    StorageConfigurationSettings {
        disk_configuration_type: Some(input.disk_type.as_str().to_string()),
        storage_workload_type: Some(input.storage_workload_type.as_str().to_string()),
        sql_data_settings: input.data_settings.as_ref().map(expand_storage_settings),
        sql_log_settings: input.log_settings.as_ref().map(expand_storage_settings),
        sql_temp_db_settings: input.temp_db_settings.as_ref().map(expand_storage_settings),
    }
}

fn expand_storage_settings(input: &StorageSettings) -> SqlStorageSettings {
    SqlStorageSettings {
        luns: Some(input.luns.clone()),
        default_file_path: Some(input.default_file_path.clone()),
    }
}

/// The service reports the 60 minute maximum as zero
pub fn normalize_log_backup_frequency(value: Option<i64>) -> i64 {
    match value {
        Some(0) => MAX_LOG_BACKUP_FREQUENCY_MINUTES,
        Some(minutes) => minutes,
        None => 0,
    }
}

/// Disabled or missing settings flatten to `None`
pub fn flatten_auto_backup(
    settings: Option<&AutoBackupSettings>,
    prior: Option<&AutoBackup>,
) -> Option<AutoBackup> {
    let settings = settings.filter(|s| s.enable == Some(true))?;

    let manual_schedule = settings
        .backup_schedule_type
        .as_deref()
        .filter(|t| t.eq_ignore_ascii_case(BACKUP_SCHEDULE_MANUAL))
        .map(|_| ManualSchedule {
            full_backup_frequency: settings.full_backup_frequency.clone().unwrap_or_default(),
            full_backup_start_hour: settings.full_backup_start_time.unwrap_or_default(),
            full_backup_window_in_hours: settings.full_backup_window_hours.unwrap_or_default(),
            log_backup_frequency_in_minutes: normalize_log_backup_frequency(
                settings.log_backup_frequency,
            ),
        });

    Some(AutoBackup {
        encryption_enabled: settings.enable_encryption.unwrap_or(false),
        encryption_password: prior.and_then(|p| p.encryption_password.clone()),
        manual_schedule,
        retention_period_in_days: settings.retention_period.unwrap_or_default(),
        storage_blob_endpoint: prior
            .map(|p| p.storage_blob_endpoint.clone())
            .unwrap_or_default(),
        storage_account_access_key: prior
            .map(|p| p.storage_account_access_key.clone())
            .unwrap_or_default(),
        system_databases_backup_enabled: settings.backup_system_dbs.unwrap_or(false),
    })
}

pub fn flatten_auto_patching(settings: Option<&AutoPatchingSettings>) -> Option<AutoPatching> {
    let settings = settings.filter(|s| s.enable == Some(true))?;
    Some(AutoPatching {
        day_of_week: settings.day_of_week.clone().unwrap_or_default(),
        maintenance_window_duration_in_minutes: settings
            .maintenance_window_duration
            .unwrap_or_default(),
        maintenance_window_starting_hour: settings
            .maintenance_window_starting_hour
            .unwrap_or_default(),
    })
}

pub fn flatten_key_vault_credential(
    settings: Option<&KeyVaultCredentialSettings>,
    prior: Option<&KeyVaultCredential>,
) -> Option<KeyVaultCredential> {
    let settings = settings.filter(|s| s.enable == Some(true))?;
    Some(KeyVaultCredential {
        name: settings.credential_name.clone().unwrap_or_default(),
        key_vault_url: prior.map(|p| p.key_vault_url.clone()).unwrap_or_default(),
        service_principal_name: prior
            .map(|p| p.service_principal_name.clone())
            .unwrap_or_default(),
        service_principal_secret: prior
            .map(|p| p.service_principal_secret.clone())
            .unwrap_or_default(),
    })
}

/// `workload_type` lives under the management settings in responses
pub fn flatten_storage_configuration(
    settings: Option<&StorageConfigurationSettings>,
    workload_type: Option<&str>,
) -> Result<Option<StorageConfiguration>> {
    let Some(settings) = settings else {
        return Ok(None);
    };

    let disk_type = settings.disk_configuration_type.as_deref().unwrap_or("");
    let workload_type = workload_type
        .filter(|w| !w.is_empty())
        .or(settings.storage_workload_type.as_deref())
        .unwrap_or("");
    let data_settings = flatten_storage_settings(settings.sql_data_settings.as_ref());
    let log_settings = flatten_storage_settings(settings.sql_log_settings.as_ref());
    let temp_db_settings = flatten_storage_settings(settings.sql_temp_db_settings.as_ref());

    if disk_type.is_empty()
        && workload_type.is_empty()
        && data_settings.is_none()
        && log_settings.is_none()
        && temp_db_settings.is_none()
    {
        return Ok(None);
    }

    Ok(Some(StorageConfiguration {
        disk_type: api_value("storage_configuration.disk_type", disk_type)?,
        storage_workload_type: api_value(
            "storage_configuration.storage_workload_type",
            workload_type,
        )?,
        data_settings,
        log_settings,
        temp_db_settings,
    }))
}

fn flatten_storage_settings(input: Option<&SqlStorageSettings>) -> Option<StorageSettings> {
    let input = input?;
    let luns = input.luns.clone()?;
    Some(StorageSettings {
        default_file_path: input.default_file_path.clone().unwrap_or_default(),
        luns,
    })
}

trait ApiValue: Sized {
    fn from_api(value: &str) -> Option<Self>;
}

macro_rules! impl_api_value {
    ($($name:ty),+) => {
        $(impl ApiValue for $name {
            fn from_api(value: &str) -> Option<Self> {
                <$name>::from_api(value)
            }
        })+
    };
}

impl_api_value!(
    SqlLicenseType,
    ConnectivityType,
    DiskConfigurationType,
    StorageWorkloadType
);

fn api_value<T: ApiValue>(field: &str, value: &str) -> Result<T> {
    T::from_api(value).ok_or_else(|| MssqlError::UnexpectedValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Translate a service response back into configuration
///
/// `prior` supplies values the service never returns (secrets, timeouts).
pub fn flatten(
    model: &SqlVirtualMachine,
    name: &str,
    prior: Option<&SqlVirtualMachineConfig>,
) -> Result<SqlVirtualMachineConfig> {
    let props = model
        .properties
        .as_ref()
        .ok_or_else(|| MssqlError::InvalidConfig(format!("{} has no properties", name)))?;

    let license = props.sql_server_license_type.as_deref().unwrap_or("");
    let mut config = SqlVirtualMachineConfig::new(
        name,
        props.virtual_machine_resource_id.clone().unwrap_or_default(),
        api_value("sql_license_type", license)?,
    );

    config.auto_backup = flatten_auto_backup(
        props.auto_backup_settings.as_ref(),
        prior.and_then(|p| p.auto_backup.as_ref()),
    );
    config.auto_patching = flatten_auto_patching(props.auto_patching_settings.as_ref());
    config.key_vault_credential = flatten_key_vault_credential(
        props.key_vault_credential_settings.as_ref(),
        prior.and_then(|p| p.key_vault_credential.as_ref()),
    );

    let management = props.server_configurations_management_settings.as_ref();
    if let Some(features) = management.and_then(|m| m.additional_features_server_configurations.as_ref())
    {
        config.r_services_enabled = features.is_r_services_enabled.unwrap_or(false);
    }
    if let Some(connectivity) = management.and_then(|m| m.sql_connectivity_update_settings.as_ref()) {
        if let Some(port) = connectivity.port {
            config.sql_connectivity_port =
                u16::try_from(port).map_err(|_| MssqlError::UnexpectedValue {
                    field: "sql_connectivity_port".to_string(),
                    value: port.to_string(),
                })?;
        }
        if let Some(connectivity_type) = connectivity.connectivity_type.as_deref() {
            config.sql_connectivity_type = api_value("sql_connectivity_type", connectivity_type)?;
        }
    }

    let workload_type = management
        .and_then(|m| m.sql_workload_type_update_settings.as_ref())
        .and_then(|w| w.sql_workload_type.as_deref());
    config.storage_configuration =
        flatten_storage_configuration(props.storage_configuration_settings.as_ref(), workload_type)?;

    config.tags = model.tags.clone().unwrap_or_default();

    if let Some(prior) = prior {
        config.sql_connectivity_update_username = prior.sql_connectivity_update_username.clone();
        config.sql_connectivity_update_password = prior.sql_connectivity_update_password.clone();
        config.timeouts = prior.timeouts;
    }

    Ok(config)
}
