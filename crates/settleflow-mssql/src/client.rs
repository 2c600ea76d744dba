//! Azure Resource Manager client for SQL virtual machines
//!
//! Bearer-token REST calls against the management endpoint. Writes are
//! long-running: a 201/202 answer is polled through its
//! `Azure-AsyncOperation` or `Location` header until it reaches a terminal
//! state.

use crate::id::{SqlVirtualMachineId, VirtualMachineId};
use crate::wire::{ErrorResponse, OperationStatus, SqlVirtualMachine, VirtualMachine};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use settleflow_cloud::{CloudError, ResourceClient, Result};
use std::fmt;
use std::time::Duration;

/// `Microsoft.SqlVirtualMachine` API version
pub const API_VERSION: &str = "2022-02-01";

const COMPUTE_API_VERSION: &str = "2023-03-01";

const ASYNC_OPERATION: &str = "azure-asyncoperation";

const DEFAULT_LRO_INTERVAL: Duration = Duration::from_secs(10);

/// Resource API plus the compute lookup needed to create a SQL VM
#[async_trait]
pub trait SqlVirtualMachineApi:
    ResourceClient<Id = SqlVirtualMachineId, Model = SqlVirtualMachine>
{
    /// Azure region of the compute virtual machine
    async fn virtual_machine_location(&self, id: &VirtualMachineId) -> Result<String>;
}

/// Terminal state of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
enum OperationState {
    Running,
    Succeeded,
    Failed(String),
}

pub struct ArmClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    lro_interval: Duration,
}

impl ArmClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            lro_interval: DEFAULT_LRO_INTERVAL,
        }
    }

    /// Fallback delay between operation polls when no `Retry-After` is sent
    pub fn with_lro_interval(mut self, interval: Duration) -> Self {
        self.lro_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resource_url(&self, id: &impl fmt::Display, api_version: &str, expand: bool) -> String {
        let mut url = format!("{}{}?api-version={}", self.endpoint, id, api_version);
        if expand {
            url.push_str("&$expand=*");
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport_error(&e, what))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body, what))
    }

    async fn wait_for_operation(&self, response: reqwest::Response, what: &str) -> Result<()> {
        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::ACCEPTED {
            return Ok(());
        }

        let Some(poll_url) = operation_url(response.headers()) else {
            return Ok(());
        };
        let mut delay = retry_after(response.headers()).unwrap_or(self.lro_interval);

        tracing::debug!("Polling operation for {}", what);
        loop {
            tokio::time::sleep(delay).await;

            let response = match self.send(self.client.get(&poll_url), what).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    tracing::warn!("Polling operation for {} failed, will retry: {}", what, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            delay = retry_after(response.headers()).unwrap_or(self.lro_interval);
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| transport_error(&e, what))?;

            match operation_state(status, &body) {
                OperationState::Running => continue,
                OperationState::Succeeded => return Ok(()),
                OperationState::Failed(message) => {
                    return Err(CloudError::ApiError(format!("{}: {}", what, message)));
                }
            }
        }
    }
}

#[async_trait]
impl ResourceClient for ArmClient {
    type Id = SqlVirtualMachineId;
    type Model = SqlVirtualMachine;

    async fn get(&self, id: &SqlVirtualMachineId) -> Result<SqlVirtualMachine> {
        let url = self.resource_url(id, API_VERSION, true);
        let what = id.to_string();
        let response = self.send(self.client.get(&url), &what).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, &what))?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn submit(&self, id: &SqlVirtualMachineId, model: &SqlVirtualMachine) -> Result<()> {
        let url = self.resource_url(id, API_VERSION, false);
        let what = id.to_string();
        tracing::debug!("PUT {}", url);
        let response = self.send(self.client.put(&url).json(model), &what).await?;
        self.wait_for_operation(response, &what).await
    }

    async fn delete(&self, id: &SqlVirtualMachineId) -> Result<()> {
        let url = self.resource_url(id, API_VERSION, false);
        let what = id.to_string();
        tracing::debug!("DELETE {}", url);
        let response = self.send(self.client.delete(&url), &what).await?;
        self.wait_for_operation(response, &what).await
    }
}

#[async_trait]
impl SqlVirtualMachineApi for ArmClient {
    async fn virtual_machine_location(&self, id: &VirtualMachineId) -> Result<String> {
        let url = self.resource_url(id, COMPUTE_API_VERSION, false);
        let what = id.to_string();
        let response = self.send(self.client.get(&url), &what).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, &what))?;
        let vm: VirtualMachine = serde_json::from_str(&body)?;

        if vm.location.is_empty() {
            return Err(CloudError::ApiError(format!(
                "location is empty for virtual machine {}",
                id.name
            )));
        }
        Ok(vm.location)
    }
}

/// Map a failed HTTP status onto the error taxonomy the poller relies on
fn status_error(status: StatusCode, body: &str, what: &str) -> CloudError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.to_string());
    let message = format!("{}: {}", what, message);

    match status {
        StatusCode::NOT_FOUND => CloudError::ResourceNotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CloudError::AuthenticationFailed(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            CloudError::Transient(message)
        }
        s if s.is_server_error() => CloudError::Transient(message),
        _ => CloudError::ApiError(message),
    }
}

fn transport_error(err: &reqwest::Error, what: &str) -> CloudError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        CloudError::Transient(format!("{}: {}", what, err))
    } else {
        CloudError::ApiError(format!("{}: {}", what, err))
    }
}

fn operation_url(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ASYNC_OPERATION)
        .or_else(|| headers.get(LOCATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// `Location` polls answer 202 while running and 200/204 when done.
/// `Azure-AsyncOperation` polls always answer 200 with a status body.
fn operation_state(status: StatusCode, body: &str) -> OperationState {
    if status == StatusCode::ACCEPTED {
        return OperationState::Running;
    }
    if body.trim().is_empty() {
        return OperationState::Succeeded;
    }

    let Ok(operation) = serde_json::from_str::<OperationStatus>(body) else {
        // Location polls may return the final resource body instead
        return OperationState::Succeeded;
    };

    match operation.status.as_str() {
        "Succeeded" => OperationState::Succeeded,
        "Failed" | "Canceled" => {
            let message = operation
                .error
                .map(|e| format!("{} ({})", e.message, e.code))
                .unwrap_or_else(|| operation.status.clone());
            OperationState::Failed(message)
        }
        _ => OperationState::Running,
    }
}
