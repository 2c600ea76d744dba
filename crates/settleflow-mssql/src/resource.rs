//! SQL virtual machine lifecycle
//!
//! Create and Update submit the whole resource and then wait for the nested
//! backup and patching settings to become visible. Both waits and the final
//! read share the operation's deadline.

use crate::client::SqlVirtualMachineApi;
use crate::config::SqlVirtualMachineConfig;
use crate::error::{MssqlError, Result};
use crate::id::{SqlVirtualMachineId, VirtualMachineId};
use crate::mapping::{expand, flatten};
use crate::settle::{AutoBackupTarget, AutoPatchingTarget};
use crate::validate::validate;
use settleflow_cloud::{
    Change, ChangeType, CloudError, DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL, PollOutcome,
    SettlePolicy, SettleTarget, Settler, classify_block, diff,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Fields whose change cannot be applied in place
pub fn replacement_fields(
    desired: &SqlVirtualMachineConfig,
    current: &SqlVirtualMachineConfig,
) -> Vec<String> {
    let mut fields = Vec::new();
    if !desired
        .virtual_machine_id
        .eq_ignore_ascii_case(&current.virtual_machine_id)
    {
        fields.push("virtual_machine_id".to_string());
    }
    if desired.sql_license_type != current.sql_license_type {
        fields.push("sql_license_type".to_string());
    }
    // The service cannot disable automated backup in place
    if current.auto_backup.is_some() && desired.auto_backup.is_none() {
        fields.push("auto_backup".to_string());
    }
    fields
}

/// Operations on `Microsoft.SqlVirtualMachine/sqlVirtualMachines`
pub struct SqlVirtualMachineResource<'a, C: SqlVirtualMachineApi> {
    client: &'a C,
    interval: Duration,
    debounce: u32,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, C: SqlVirtualMachineApi> SqlVirtualMachineResource<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            cancel: None,
        }
    }

    /// Override the settle interval and debounce
    pub fn with_settle(mut self, interval: Duration, debounce: u32) -> Self {
        self.interval = interval;
        self.debounce = debounce;
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn ids(config: &SqlVirtualMachineConfig) -> Result<(VirtualMachineId, SqlVirtualMachineId)> {
        let vm: VirtualMachineId = config.virtual_machine_id.parse()?;
        let id = SqlVirtualMachineId::from_virtual_machine(&vm);
        Ok((vm, id))
    }

    /// Instant at which `operation` gives up
    fn deadline(operation: &'static str, resource: &str, timeout: Duration) -> Result<Instant> {
        Instant::now().checked_add(timeout).ok_or_else(|| {
            MssqlError::InvalidConfig(format!(
                "{} timeout of {} is out of range: {:?}",
                operation, resource, timeout
            ))
        })
    }

    /// Run `fut` but give up at `deadline`
    async fn before<T>(
        deadline: Instant,
        operation: &'static str,
        resource: &str,
        timeout: Duration,
        fut: impl Future<Output = settleflow_cloud::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(MssqlError::OperationTimeout {
                operation,
                resource: resource.to_string(),
                timeout,
            }),
        }
    }

    /// Wait for `target` with whatever time the operation has left
    async fn settle<T: SettleTarget<crate::wire::SqlVirtualMachine>>(
        &self,
        id: &SqlVirtualMachineId,
        target: &T,
        deadline: Instant,
    ) -> Result<()> {
        let now = Instant::now();
        let policy = SettlePolicy::for_operation(deadline.saturating_duration_since(now))
            .with_interval(self.interval)
            .with_debounce(self.debounce);

        tracing::info!("Waiting for {} of {} to take effect", target.name(), id.name);
        let mut settler = Settler::new(self.client, policy);
        if let Some(cancel) = &self.cancel {
            settler = settler.with_cancel(cancel.clone());
        }
        settler.wait(id, target).await?;
        Ok(())
    }

    /// Create the resource and wait for its nested settings to settle
    pub async fn create(&self, config: &SqlVirtualMachineConfig) -> Result<SqlVirtualMachineConfig> {
        validate(config)?;
        let (vm, id) = Self::ids(config)?;
        let timeout = config.timeouts.create;
        let deadline = Self::deadline("create", &config.name, timeout)?;

        tracing::info!("Creating SQL virtual machine {}", id);

        match Self::before(deadline, "create", &config.name, timeout, self.client.get(&id)).await {
            Ok(_) => return Err(CloudError::ResourceAlreadyExists(id.to_string()).into()),
            Err(MssqlError::CloudError(e)) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let location = Self::before(
            deadline,
            "create",
            &config.name,
            timeout,
            self.client.virtual_machine_location(&vm),
        )
        .await?;

        let model = expand(config, &location);
        Self::before(
            deadline,
            "create",
            &config.name,
            timeout,
            self.client.submit(&id, &model),
        )
        .await?;

        if config.auto_backup.is_some() {
            self.settle(&id, &AutoBackupTarget::new(config.auto_backup.as_ref()), deadline)
                .await?;
        }
        if config.auto_patching.is_some() {
            self.settle(
                &id,
                &AutoPatchingTarget::new(config.auto_patching.as_ref()),
                deadline,
            )
            .await?;
        }

        tracing::info!("Created SQL virtual machine {}", id);
        self.read_with_prior(&id, &config.name, Some(config), "create", deadline, timeout)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()).into())
    }

    /// Update in place, settling only the blocks that differ from the
    /// current backend state
    pub async fn update(&self, config: &SqlVirtualMachineConfig) -> Result<SqlVirtualMachineConfig> {
        validate(config)?;
        let (vm, id) = Self::ids(config)?;
        let timeout = config.timeouts.update;
        let deadline = Self::deadline("update", &config.name, timeout)?;

        tracing::info!("Updating SQL virtual machine {}", id);

        let model =
            Self::before(deadline, "update", &config.name, timeout, self.client.get(&id)).await?;
        let current = flatten(&model, &config.name, Some(config))?;

        let replace = replacement_fields(config, &current);
        if !replace.is_empty() {
            return Err(MssqlError::InvalidConfig(format!(
                "{} cannot be updated in place; changing {} requires replacement",
                config.name,
                replace.join(", ")
            )));
        }

        let backup_changed = classify_block(config.auto_backup.as_ref(), current.auto_backup.as_ref())
            != PollOutcome::Updated;
        let patching_changed =
            classify_block(config.auto_patching.as_ref(), current.auto_patching.as_ref())
                != PollOutcome::Updated;

        let location = if model.location.is_empty() {
            Self::before(
                deadline,
                "update",
                &config.name,
                timeout,
                self.client.virtual_machine_location(&vm),
            )
            .await?
        } else {
            model.location.clone()
        };

        let request = expand(config, &location);
        Self::before(
            deadline,
            "update",
            &config.name,
            timeout,
            self.client.submit(&id, &request),
        )
        .await?;

        if backup_changed {
            self.settle(&id, &AutoBackupTarget::new(config.auto_backup.as_ref()), deadline)
                .await?;
        }
        if patching_changed {
            self.settle(
                &id,
                &AutoPatchingTarget::new(config.auto_patching.as_ref()),
                deadline,
            )
            .await?;
        }

        tracing::info!("Updated SQL virtual machine {}", id);
        self.read_with_prior(&id, &config.name, Some(config), "update", deadline, timeout)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()).into())
    }

    /// Current state of a declared resource; `None` when it no longer exists
    pub async fn read(&self, config: &SqlVirtualMachineConfig) -> Result<Option<SqlVirtualMachineConfig>> {
        let (_, id) = Self::ids(config)?;
        let timeout = config.timeouts.read;
        let deadline = Self::deadline("read", &config.name, timeout)?;
        self.read_with_prior(&id, &config.name, Some(config), "read", deadline, timeout)
            .await
    }

    /// Current state of a resource by id, without any declared config
    pub async fn read_id(&self, id: &SqlVirtualMachineId) -> Result<Option<SqlVirtualMachineConfig>> {
        let timeout = crate::config::Timeouts::default().read;
        let deadline = Self::deadline("read", &id.name, timeout)?;
        self.read_with_prior(id, &id.name, None, "read", deadline, timeout)
            .await
    }

    async fn read_with_prior(
        &self,
        id: &SqlVirtualMachineId,
        name: &str,
        prior: Option<&SqlVirtualMachineConfig>,
        operation: &'static str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Option<SqlVirtualMachineConfig>> {
        match Self::before(deadline, operation, name, timeout, self.client.get(id)).await {
            Ok(model) => Ok(Some(flatten(&model, name, prior)?)),
            Err(MssqlError::CloudError(e)) if e.is_not_found() => {
                tracing::info!("SQL virtual machine {} does not exist", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the resource; an already missing resource is not an error
    pub async fn delete(&self, config: &SqlVirtualMachineConfig) -> Result<()> {
        let (_, id) = Self::ids(config)?;
        let timeout = config.timeouts.delete;
        let deadline = Self::deadline("delete", &config.name, timeout)?;

        tracing::info!("Deleting SQL virtual machine {}", id);
        match Self::before(deadline, "delete", &config.name, timeout, self.client.delete(&id)).await {
            Ok(()) => {
                tracing::info!("Deleted SQL virtual machine {}", id);
                Ok(())
            }
            Err(MssqlError::CloudError(e)) if e.is_not_found() => {
                tracing::info!("SQL virtual machine {} was already deleted", id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Decide what `apply` would do
    pub async fn plan_change(&self, config: &SqlVirtualMachineConfig) -> Result<Change> {
        validate(config)?;

        let Some(current) = self.read(config).await? else {
            return Ok(Change {
                resource: config.name.clone(),
                change_type: ChangeType::Create,
                fields: Vec::new(),
                description: format!("create SQL virtual machine {}", config.name),
            });
        };

        let replace = replacement_fields(config, &current);
        if !replace.is_empty() {
            return Ok(Change {
                resource: config.name.clone(),
                change_type: ChangeType::Replace,
                description: format!(
                    "replace SQL virtual machine {} ({} forces replacement)",
                    config.name,
                    replace.join(", ")
                ),
                fields: replace,
            });
        }

        let drift = diff(config, &current);
        if drift.is_settled() {
            return Ok(Change {
                resource: config.name.clone(),
                change_type: ChangeType::NoOp,
                fields: Vec::new(),
                description: format!("SQL virtual machine {} is up to date", config.name),
            });
        }

        Ok(Change {
            resource: config.name.clone(),
            change_type: ChangeType::Update,
            fields: drift.fields().to_vec(),
            description: format!("update SQL virtual machine {} in place", config.name),
        })
    }

    /// Plan, then converge the backend onto `config`
    pub async fn apply(
        &self,
        config: &SqlVirtualMachineConfig,
    ) -> Result<(ChangeType, SqlVirtualMachineConfig)> {
        let change = self.plan_change(config).await?;
        let state = match change.change_type {
            ChangeType::Create => self.create(config).await?,
            ChangeType::Update => self.update(config).await?,
            ChangeType::Replace => {
                self.delete(config).await?;
                self.create(config).await?
            }
            ChangeType::NoOp => self
                .read(config)
                .await?
                .ok_or_else(|| MssqlError::from(CloudError::ResourceNotFound(config.name.clone())))?,
        };
        Ok((change.change_type, state))
    }
}
