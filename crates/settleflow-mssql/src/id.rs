//! Resource identifiers
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`

use crate::error::{MssqlError, Result};
use std::fmt;
use std::str::FromStr;

const COMPUTE_NAMESPACE: &str = "Microsoft.Compute";
const COMPUTE_TYPE: &str = "virtualMachines";
const SQL_VM_NAMESPACE: &str = "Microsoft.SqlVirtualMachine";
const SQL_VM_TYPE: &str = "sqlVirtualMachines";

/// Split an id into (subscription, resource group, name) after checking
/// the provider namespace and resource type. Keys match case-insensitively.
fn parse_scoped(id: &str, namespace: &str, resource_type: &str) -> Result<(String, String, String)> {
    let invalid = |reason: &str| MssqlError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 8 {
        return Err(invalid(&format!(
            "expected 8 segments, found {}",
            segments.len()
        )));
    }

    let expect_key = |index: usize, key: &str| -> Result<String> {
        if !segments[index].eq_ignore_ascii_case(key) {
            return Err(invalid(&format!(
                "expected segment {:?}, found {:?}",
                key, segments[index]
            )));
        }
        Ok(segments[index + 1].to_string())
    };

    let subscription_id = expect_key(0, "subscriptions")?;
    let resource_group = expect_key(2, "resourceGroups")?;
    let provider = expect_key(4, "providers")?;
    if !provider.eq_ignore_ascii_case(namespace) {
        return Err(invalid(&format!("expected provider {}", namespace)));
    }
    let name = expect_key(6, resource_type)?;

    Ok((subscription_id, resource_group, name))
}

/// Compute virtual machine id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualMachineId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl VirtualMachineId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }
}

impl FromStr for VirtualMachineId {
    type Err = MssqlError;

    fn from_str(s: &str) -> Result<Self> {
        let (subscription_id, resource_group, name) =
            parse_scoped(s, COMPUTE_NAMESPACE, COMPUTE_TYPE)?;
        Ok(Self {
            subscription_id,
            resource_group,
            name,
        })
    }
}

impl fmt::Display for VirtualMachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id, self.resource_group, COMPUTE_NAMESPACE, COMPUTE_TYPE, self.name
        )
    }
}

/// SQL virtual machine id; shares its name with the underlying compute VM
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlVirtualMachineId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl SqlVirtualMachineId {
    pub fn from_virtual_machine(vm: &VirtualMachineId) -> Self {
        Self {
            subscription_id: vm.subscription_id.clone(),
            resource_group: vm.resource_group.clone(),
            name: vm.name.clone(),
        }
    }

    pub fn virtual_machine(&self) -> VirtualMachineId {
        VirtualMachineId::new(&self.subscription_id, &self.resource_group, &self.name)
    }
}

impl FromStr for SqlVirtualMachineId {
    type Err = MssqlError;

    fn from_str(s: &str) -> Result<Self> {
        let (subscription_id, resource_group, name) =
            parse_scoped(s, SQL_VM_NAMESPACE, SQL_VM_TYPE)?;
        Ok(Self {
            subscription_id,
            resource_group,
            name,
        })
    }
}

impl fmt::Display for SqlVirtualMachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id, self.resource_group, SQL_VM_NAMESPACE, SQL_VM_TYPE, self.name
        )
    }
}
