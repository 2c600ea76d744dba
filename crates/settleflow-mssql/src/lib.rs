//! SettleFlow SQL virtual machine resource
//!
//! Declares `Microsoft.SqlVirtualMachine/sqlVirtualMachines` in KDL and
//! converges the backend onto the declaration.
//!
//! ```text
//! settle.kdl ──parser──► SqlVirtualMachineConfig ──validate
//!                              │
//!                            expand ──► SqlVirtualMachine (wire) ──► ArmClient::submit
//!                                                                        │
//!                  AutoBackupTarget / AutoPatchingTarget ◄── Settler ◄───┘
//!                              │
//!                           flatten ──► read state
//! ```
//!
//! The service acknowledges a write before the automated backup and patching
//! settings can be read back, so Create and Update poll with
//! [`settleflow_cloud::Settler`] until the observed settings match.

pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod mapping;
pub mod parser;
pub mod resource;
pub mod settle;
pub mod validate;
pub mod wire;

pub use client::{API_VERSION, ArmClient, SqlVirtualMachineApi};
pub use config::{
    AutoBackup, AutoPatching, ConnectivityType, DiskConfigurationType, KeyVaultCredential,
    ManualSchedule, SqlLicenseType, SqlVirtualMachineConfig, StorageConfiguration,
    StorageSettings, StorageWorkloadType, Timeouts,
};
pub use error::{MssqlError, Result};
pub use id::{SqlVirtualMachineId, VirtualMachineId};
pub use parser::{parse_document, parse_file};
pub use resource::{SqlVirtualMachineResource, replacement_fields};
pub use settle::{AutoBackupTarget, AutoPatchingTarget};
pub use validate::validate;
