use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VM_ID: &str =
    "/subscriptions/0000/resourceGroups/rg-sql/providers/Microsoft.Compute/virtualMachines/vm1";

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_settle_kdl(&self, content: &str) {
        let path = self.root.path().join("settle.kdl");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}

/// A complete, valid declaration
pub fn sample_kdl() -> String {
    format!(
        r#"sql_virtual_machine "sqlvm1" {{
    virtual_machine_id "{VM_ID}"
    sql_license_type "PAYG"
    auto_backup {{
        retention_period_in_days 7
        storage_blob_endpoint "https://acct.blob.core.windows.net"
        storage_account_access_key "key"
        manual_schedule {{
            full_backup_frequency "Weekly"
            full_backup_start_hour 2
            full_backup_window_in_hours 4
            log_backup_frequency_in_minutes 60
        }}
    }}
    auto_patching {{ day_of_week "Sunday"; maintenance_window_duration_in_minutes 60; maintenance_window_starting_hour 2 }}
    tags {{ env "prod" }}
    timeouts {{ create 60; update 60; read 5; delete 60 }}
}}
"#
    )
}
