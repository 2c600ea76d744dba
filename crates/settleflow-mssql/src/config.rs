//! Typed configuration for a SQL virtual machine
//!
//! One struct per settings block. An absent optional block means the
//! feature is disabled. Secrets are never serialized.

use crate::error::MssqlError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Declares a string-backed enumeration with its exact API spelling
macro_rules! api_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Lenient lookup for values echoed back by the service
            pub fn from_api(value: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(value))
            }
        }

        impl FromStr for $name {
            type Err = MssqlError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(MssqlError::UnexpectedValue {
                        field: stringify!($name).to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

api_enum!(
    /// SQL Server license model
    SqlLicenseType {
        Payg => "PAYG",
        Ahub => "AHUB",
        Dr => "DR",
    }
);

api_enum!(
    ConnectivityType {
        Local => "LOCAL",
        Private => "PRIVATE",
        Public => "PUBLIC",
    }
);

api_enum!(
    DiskConfigurationType {
        New => "NEW",
        Extend => "EXTEND",
        Add => "ADD",
    }
);

api_enum!(
    StorageWorkloadType {
        General => "GENERAL",
        Oltp => "OLTP",
        Dw => "DW",
    }
);

pub const FULL_BACKUP_FREQUENCIES: &[&str] = &["Daily", "Weekly"];

pub const DAYS_OF_WEEK: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const DEFAULT_SQL_CONNECTIVITY_PORT: u16 = 1433;

/// Largest log backup frequency; the API reports it as zero
pub const MAX_LOG_BACKUP_FREQUENCY_MINUTES: i64 = 60;

/// A declared SQL virtual machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlVirtualMachineConfig {
    /// Name of the declaration in the resource file
    pub name: String,

    /// Compute virtual machine this SQL VM extends (force-new)
    pub virtual_machine_id: String,

    /// License model (force-new)
    pub sql_license_type: SqlLicenseType,

    pub auto_backup: Option<AutoBackup>,

    pub auto_patching: Option<AutoPatching>,

    pub key_vault_credential: Option<KeyVaultCredential>,

    pub r_services_enabled: bool,

    pub sql_connectivity_port: u16,

    pub sql_connectivity_type: ConnectivityType,

    #[serde(skip_serializing)]
    pub sql_connectivity_update_username: Option<String>,

    #[serde(skip_serializing)]
    pub sql_connectivity_update_password: Option<String>,

    pub storage_configuration: Option<StorageConfiguration>,

    pub tags: BTreeMap<String, String>,

    #[serde(skip_serializing)]
    pub timeouts: Timeouts,
}

impl SqlVirtualMachineConfig {
    pub fn new(
        name: impl Into<String>,
        virtual_machine_id: impl Into<String>,
        sql_license_type: SqlLicenseType,
    ) -> Self {
        Self {
            name: name.into(),
            virtual_machine_id: virtual_machine_id.into(),
            sql_license_type,
            auto_backup: None,
            auto_patching: None,
            key_vault_credential: None,
            r_services_enabled: false,
            sql_connectivity_port: DEFAULT_SQL_CONNECTIVITY_PORT,
            sql_connectivity_type: ConnectivityType::Private,
            sql_connectivity_update_username: None,
            sql_connectivity_update_password: None,
            storage_configuration: None,
            tags: BTreeMap::new(),
            timeouts: Timeouts::default(),
        }
    }
}

/// Automated backup settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBackup {
    pub encryption_enabled: bool,

    #[serde(skip_serializing)]
    pub encryption_password: Option<String>,

    /// `None` lets the service pick the schedule
    pub manual_schedule: Option<ManualSchedule>,

    pub retention_period_in_days: i64,

    pub storage_blob_endpoint: String,

    #[serde(skip_serializing)]
    pub storage_account_access_key: String,

    pub system_databases_backup_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualSchedule {
    /// `Daily` or `Weekly`; the API may echo it back in another case
    pub full_backup_frequency: String,

    pub full_backup_start_hour: i64,

    pub full_backup_window_in_hours: i64,

    pub log_backup_frequency_in_minutes: i64,
}

/// Automated patching window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoPatching {
    pub day_of_week: String,

    pub maintenance_window_duration_in_minutes: i64,

    pub maintenance_window_starting_hour: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyVaultCredential {
    pub name: String,

    #[serde(skip_serializing)]
    pub key_vault_url: String,

    #[serde(skip_serializing)]
    pub service_principal_name: String,

    #[serde(skip_serializing)]
    pub service_principal_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageConfiguration {
    pub disk_type: DiskConfigurationType,

    pub storage_workload_type: StorageWorkloadType,

    pub data_settings: Option<StorageSettings>,

    pub log_settings: Option<StorageSettings>,

    pub temp_db_settings: Option<StorageSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageSettings {
    pub default_file_path: String,

    pub luns: Vec<i64>,
}

/// Per-operation time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(60 * 60),
        }
    }
}
