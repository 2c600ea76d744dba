//! Resource client trait definition

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Remote management API for one resource kind
///
/// Implementations own transport concerns: authentication, request
/// construction and long-running-operation completion. Callers receive the
/// client as an explicit handle so that poll loops can be driven by an
/// in-memory fake in tests.
///
/// Errors must distinguish [`CloudError::ResourceNotFound`] (fatal) from
/// [`CloudError::Transient`] (retried by the settle poller).
///
/// [`CloudError::ResourceNotFound`]: crate::CloudError::ResourceNotFound
/// [`CloudError::Transient`]: crate::CloudError::Transient
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Resource identifier
    type Id: fmt::Display + Send + Sync;

    /// Wire representation of the resource, as returned by `get`
    type Model: Send + Sync;

    /// Fetch the current backend representation
    async fn get(&self, id: &Self::Id) -> Result<Self::Model>;

    /// Create or replace the resource and wait for the write to complete
    ///
    /// Completion of the write does not imply that nested settings have
    /// propagated; use [`Settler`](crate::Settler) for that.
    async fn submit(&self, id: &Self::Id, model: &Self::Model) -> Result<()>;

    /// Delete the resource and wait for the deletion to complete
    async fn delete(&self, id: &Self::Id) -> Result<()>;
}
