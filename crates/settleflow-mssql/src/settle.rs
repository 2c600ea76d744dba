//! Drift rules and settle targets for SQL virtual machine settings
//!
//! The service acknowledges a PUT before `autoBackupSettings` and
//! `autoPatchingSettings` are visible on GET. The targets here classify one
//! GET against the desired block using the same flatten as Read.

use crate::config::{
    AutoBackup, AutoPatching, KeyVaultCredential, ManualSchedule, SqlVirtualMachineConfig,
    StorageConfiguration, StorageSettings,
};
use crate::mapping::{flatten_auto_backup, flatten_auto_patching};
use crate::wire::SqlVirtualMachine;
use settleflow_cloud::{Drift, PollOutcome, Settle, SettleTarget, classify_block};

impl Settle for AutoBackup {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let AutoBackup {
            encryption_enabled,
            encryption_password: _,
            manual_schedule,
            retention_period_in_days,
            storage_blob_endpoint: _,
            storage_account_access_key: _,
            system_databases_backup_enabled,
        } = self;

        drift.exact(
            "encryption_enabled",
            encryption_enabled,
            &observed.encryption_enabled,
        );
        drift.write_only("encryption_password");
        drift.nested(
            "manual_schedule",
            manual_schedule.as_ref(),
            observed.manual_schedule.as_ref(),
        );
        drift.exact(
            "retention_period_in_days",
            retention_period_in_days,
            &observed.retention_period_in_days,
        );
        drift.write_only("storage_blob_endpoint");
        drift.write_only("storage_account_access_key");
        drift.exact(
            "system_databases_backup_enabled",
            system_databases_backup_enabled,
            &observed.system_databases_backup_enabled,
        );
    }
}

impl Settle for ManualSchedule {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let ManualSchedule {
            full_backup_frequency,
            full_backup_start_hour,
            full_backup_window_in_hours,
            log_backup_frequency_in_minutes,
        } = self;

        drift.case_insensitive(
            "full_backup_frequency",
            full_backup_frequency,
            &observed.full_backup_frequency,
        );
        drift.exact(
            "full_backup_start_hour",
            full_backup_start_hour,
            &observed.full_backup_start_hour,
        );
        drift.exact(
            "full_backup_window_in_hours",
            full_backup_window_in_hours,
            &observed.full_backup_window_in_hours,
        );
        drift.exact(
            "log_backup_frequency_in_minutes",
            log_backup_frequency_in_minutes,
            &observed.log_backup_frequency_in_minutes,
        );
    }
}

impl Settle for AutoPatching {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let AutoPatching {
            day_of_week,
            maintenance_window_duration_in_minutes,
            maintenance_window_starting_hour,
        } = self;

        drift.exact("day_of_week", day_of_week, &observed.day_of_week);
        drift.exact(
            "maintenance_window_duration_in_minutes",
            maintenance_window_duration_in_minutes,
            &observed.maintenance_window_duration_in_minutes,
        );
        drift.exact(
            "maintenance_window_starting_hour",
            maintenance_window_starting_hour,
            &observed.maintenance_window_starting_hour,
        );
    }
}

/// The service reports the credential name as `vm:name1,vm:name2`
fn credential_name_matches(desired: &str, observed: &str) -> bool {
    desired == observed
        || observed
            .split(',')
            .any(|entry| entry.split(':').nth(1) == Some(desired))
}

impl Settle for KeyVaultCredential {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let KeyVaultCredential {
            name,
            key_vault_url: _,
            service_principal_name: _,
            service_principal_secret: _,
        } = self;

        drift.check("name", credential_name_matches(name, &observed.name));
        drift.write_only("key_vault_url");
        drift.write_only("service_principal_name");
        drift.write_only("service_principal_secret");
    }
}

impl Settle for StorageSettings {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let StorageSettings {
            default_file_path,
            luns,
        } = self;

        drift.exact(
            "default_file_path",
            default_file_path,
            &observed.default_file_path,
        );
        drift.exact("luns", luns, &observed.luns);
    }
}

impl Settle for StorageConfiguration {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let StorageConfiguration {
            disk_type,
            storage_workload_type,
            data_settings,
            log_settings,
            temp_db_settings,
        } = self;

        drift.exact("disk_type", disk_type, &observed.disk_type);
        drift.exact(
            "storage_workload_type",
            storage_workload_type,
            &observed.storage_workload_type,
        );
        drift.nested(
            "data_settings",
            data_settings.as_ref(),
            observed.data_settings.as_ref(),
        );
        drift.nested(
            "log_settings",
            log_settings.as_ref(),
            observed.log_settings.as_ref(),
        );
        drift.nested(
            "temp_db_settings",
            temp_db_settings.as_ref(),
            observed.temp_db_settings.as_ref(),
        );
    }
}

/// Whole-resource comparison used when planning
impl Settle for SqlVirtualMachineConfig {
    fn compare(&self, observed: &Self, drift: &mut Drift) {
        let SqlVirtualMachineConfig {
            name: _,
            virtual_machine_id,
            sql_license_type,
            auto_backup,
            auto_patching,
            key_vault_credential,
            r_services_enabled,
            sql_connectivity_port,
            sql_connectivity_type,
            sql_connectivity_update_username: _,
            sql_connectivity_update_password: _,
            storage_configuration,
            tags,
            timeouts: _,
        } = self;

        drift.case_insensitive(
            "virtual_machine_id",
            virtual_machine_id,
            &observed.virtual_machine_id,
        );
        drift.exact(
            "sql_license_type",
            sql_license_type,
            &observed.sql_license_type,
        );
        drift.nested(
            "auto_backup",
            auto_backup.as_ref(),
            observed.auto_backup.as_ref(),
        );
        drift.nested(
            "auto_patching",
            auto_patching.as_ref(),
            observed.auto_patching.as_ref(),
        );
        drift.nested(
            "key_vault_credential",
            key_vault_credential.as_ref(),
            observed.key_vault_credential.as_ref(),
        );
        drift.exact(
            "r_services_enabled",
            r_services_enabled,
            &observed.r_services_enabled,
        );
        drift.exact(
            "sql_connectivity_port",
            sql_connectivity_port,
            &observed.sql_connectivity_port,
        );
        drift.exact(
            "sql_connectivity_type",
            sql_connectivity_type,
            &observed.sql_connectivity_type,
        );
        drift.write_only("sql_connectivity_update_username");
        drift.write_only("sql_connectivity_update_password");
        drift.nested(
            "storage_configuration",
            storage_configuration.as_ref(),
            observed.storage_configuration.as_ref(),
        );
        drift.exact("tags", tags, &observed.tags);
    }
}

/// Waits until `autoBackupSettings` reflects the desired block
#[derive(Debug, Clone, Copy)]
pub struct AutoBackupTarget<'a> {
    desired: Option<&'a AutoBackup>,
}

impl<'a> AutoBackupTarget<'a> {
    pub fn new(desired: Option<&'a AutoBackup>) -> Self {
        Self { desired }
    }
}

impl SettleTarget<SqlVirtualMachine> for AutoBackupTarget<'_> {
    fn name(&self) -> &str {
        "auto_backup"
    }

    fn classify(&self, observed: &SqlVirtualMachine) -> PollOutcome {
        let Some(props) = observed.properties.as_ref() else {
            return PollOutcome::Retry;
        };
        let observed = flatten_auto_backup(props.auto_backup_settings.as_ref(), self.desired);
        classify_block(self.desired, observed.as_ref())
    }
}

/// Waits until `autoPatchingSettings` reflects the desired block
#[derive(Debug, Clone, Copy)]
pub struct AutoPatchingTarget<'a> {
    desired: Option<&'a AutoPatching>,
}

impl<'a> AutoPatchingTarget<'a> {
    pub fn new(desired: Option<&'a AutoPatching>) -> Self {
        Self { desired }
    }
}

impl SettleTarget<SqlVirtualMachine> for AutoPatchingTarget<'_> {
    fn name(&self) -> &str {
        "auto_patching"
    }

    fn classify(&self, observed: &SqlVirtualMachine) -> PollOutcome {
        let Some(props) = observed.properties.as_ref() else {
            return PollOutcome::Retry;
        };
        let observed = flatten_auto_patching(props.auto_patching_settings.as_ref());
        classify_block(self.desired, observed.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{AutoBackupSettings, AutoPatchingSettings, SqlVirtualMachineProperties};
    use settleflow_cloud::diff;

    fn desired_backup() -> AutoBackup {
        AutoBackup {
            encryption_enabled: false,
            encryption_password: None,
            manual_schedule: Some(ManualSchedule {
                full_backup_frequency: "Weekly".to_string(),
                full_backup_start_hour: 2,
                full_backup_window_in_hours: 4,
                log_backup_frequency_in_minutes: 60,
            }),
            retention_period_in_days: 7,
            storage_blob_endpoint: "https://acct.blob.core.windows.net".to_string(),
            storage_account_access_key: "key".to_string(),
            system_databases_backup_enabled: true,
        }
    }

    fn observed_backup() -> AutoBackupSettings {
        AutoBackupSettings {
            enable: Some(true),
            enable_encryption: Some(false),
            retention_period: Some(7),
            backup_system_dbs: Some(true),
            backup_schedule_type: Some("Manual".to_string()),
            full_backup_frequency: Some("WEEKLY".to_string()),
            full_backup_start_time: Some(2),
            full_backup_window_hours: Some(4),
            log_backup_frequency: Some(0),
            ..Default::default()
        }
    }

    fn model(
        backup: Option<AutoBackupSettings>,
        patching: Option<AutoPatchingSettings>,
    ) -> SqlVirtualMachine {
        SqlVirtualMachine {
            properties: Some(SqlVirtualMachineProperties {
                auto_backup_settings: backup,
                auto_patching_settings: patching,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_backup_settled_with_zero_log_frequency() {
        let desired = desired_backup();
        let target = AutoBackupTarget::new(Some(&desired));
        let outcome = target.classify(&model(Some(observed_backup()), None));
        assert_eq!(outcome, PollOutcome::Updated);
    }

    #[test]
    fn test_auto_backup_pending_on_retention_drift() {
        let desired = desired_backup();
        let mut observed = observed_backup();
        observed.retention_period = Some(30);
        let target = AutoBackupTarget::new(Some(&desired));
        assert_eq!(
            target.classify(&model(Some(observed), None)),
            PollOutcome::Pending
        );
    }

    #[test]
    fn test_auto_backup_manual_schedule_presence() {
        let mut desired = desired_backup();
        desired.manual_schedule = None;
        let target = AutoBackupTarget::new(Some(&desired));
        assert_eq!(
            target.classify(&model(Some(observed_backup()), None)),
            PollOutcome::Pending
        );

        let mut automated = observed_backup();
        automated.backup_schedule_type = Some("Automated".to_string());
        assert_eq!(
            target.classify(&model(Some(automated), None)),
            PollOutcome::Updated
        );
    }

    #[test]
    fn test_auto_backup_disable() {
        let target = AutoBackupTarget::new(None);
        assert_eq!(
            target.classify(&model(Some(observed_backup()), None)),
            PollOutcome::Pending
        );

        let disabled = AutoBackupSettings {
            enable: Some(false),
            retention_period: Some(7),
            ..Default::default()
        };
        assert_eq!(
            target.classify(&model(Some(disabled), None)),
            PollOutcome::Updated
        );
        assert_eq!(target.classify(&model(None, None)), PollOutcome::Updated);
    }

    #[test]
    fn test_missing_properties_is_retry() {
        let desired = desired_backup();
        let empty = SqlVirtualMachine::default();
        assert_eq!(
            AutoBackupTarget::new(Some(&desired)).classify(&empty),
            PollOutcome::Retry
        );
        assert_eq!(AutoPatchingTarget::new(None).classify(&empty), PollOutcome::Retry);
    }

    #[test]
    fn test_auto_patching_day_is_exact() {
        let desired = AutoPatching {
            day_of_week: "Sunday".to_string(),
            maintenance_window_duration_in_minutes: 60,
            maintenance_window_starting_hour: 2,
        };
        let mut observed = AutoPatchingSettings {
            enable: Some(true),
            day_of_week: Some("Sunday".to_string()),
            maintenance_window_starting_hour: Some(2),
            maintenance_window_duration: Some(60),
        };
        let target = AutoPatchingTarget::new(Some(&desired));
        assert_eq!(
            target.classify(&model(None, Some(observed.clone()))),
            PollOutcome::Updated
        );

        observed.day_of_week = Some("SUNDAY".to_string());
        assert_eq!(
            target.classify(&model(None, Some(observed))),
            PollOutcome::Pending
        );
    }

    #[test]
    fn test_auto_patching_absent_everywhere() {
        let target = AutoPatchingTarget::new(None);
        assert_eq!(target.classify(&model(None, None)), PollOutcome::Updated);
    }

    #[test]
    fn test_credential_name_suppression() {
        assert!(credential_name_matches("cred", "cred"));
        assert!(credential_name_matches("cred", "vm1:other,vm1:cred"));
        assert!(!credential_name_matches("cred", "vm1:other"));
        assert!(!credential_name_matches("cred", "credential"));
    }

    #[test]
    fn test_config_drift_paths() {
        let mut desired = SqlVirtualMachineConfig::new(
            "sqlvm1",
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1",
            crate::config::SqlLicenseType::Payg,
        );
        desired.auto_backup = Some(desired_backup());
        desired.sql_connectivity_update_password = Some("secret".to_string());

        let mut observed = desired.clone();
        observed.sql_connectivity_update_password = None;
        observed.virtual_machine_id = desired.virtual_machine_id.to_uppercase();
        assert!(diff(&desired, &observed).is_settled());

        observed.sql_connectivity_port = 1533;
        if let Some(backup) = observed.auto_backup.as_mut() {
            backup.retention_period_in_days = 14;
        }
        let drift = diff(&desired, &observed);
        assert_eq!(
            drift.fields(),
            [
                "auto_backup.retention_period_in_days",
                "sql_connectivity_port"
            ]
        );
    }
}
