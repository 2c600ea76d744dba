//! Wire representation of `Microsoft.SqlVirtualMachine/sqlVirtualMachines`
//!
//! Every property is optional: the service omits fields freely and never
//! echoes secrets back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BACKUP_SCHEDULE_MANUAL: &str = "Manual";
pub const BACKUP_SCHEDULE_AUTOMATED: &str = "Automated";
pub const SQL_MANAGEMENT_FULL: &str = "Full";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlVirtualMachine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SqlVirtualMachineProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlVirtualMachineProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_machine_resource_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_server_license_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_management: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_backup_settings: Option<AutoBackupSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_patching_settings: Option<AutoPatchingSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_vault_credential_settings: Option<KeyVaultCredentialSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_configurations_management_settings: Option<ServerConfigurationsManagementSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_configuration_settings: Option<StorageConfigurationSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoBackupSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_encryption: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_account_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_access_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_system_dbs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_schedule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_backup_frequency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_backup_start_time: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_backup_window_hours: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_backup_frequency: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPatchingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_window_starting_hour: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_window_duration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultCredentialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_key_vault_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfigurationsManagementSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_connectivity_update_settings: Option<SqlConnectivityUpdateSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_features_server_configurations: Option<AdditionalFeaturesServerConfigurations>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_workload_type_update_settings: Option<SqlWorkloadTypeUpdateSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlConnectivityUpdateSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_auth_update_user_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_auth_update_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFeaturesServerConfigurations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_r_services_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlWorkloadTypeUpdateSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_workload_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfigurationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_configuration_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_workload_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_data_settings: Option<SqlStorageSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_log_settings: Option<SqlStorageSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_temp_db_settings: Option<SqlStorageSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlStorageSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luns: Option<Vec<i64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_file_path: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status poll
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub status: String,

    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VirtualMachine {
    pub location: String,
}
