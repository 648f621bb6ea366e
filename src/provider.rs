//! Provider gateway seam.
//!
//! The control-plane side of the client: reads (model, instance view,
//! extensions) and long-running operations (update, reapply, restart). The
//! gateway is a trait so tests can script provider behavior; production
//! implementations wrap the cloud SDK and its credential plumbing, which this
//! crate deliberately does not own.

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProviderError, VmClientError, VmClientResult};
use crate::identifiers::VmIdentifier;

/// Substring marking the power-state entry among instance view status codes.
const POWER_STATE_MARKER: &str = "PowerState";

/// Partial resource properties passed to [`ProviderGateway::begin_update`].
pub type PropertyMap = serde_json::Map<String, Value>;

/// Handle to a provider-side long-running operation.
///
/// The provider resolves the operation asynchronously; awaiting the handle
/// completes when the provider reports success or failure. Deadlines are the
/// caller's concern.
pub struct AsyncOperation {
    name: String,
    completion: BoxFuture<'static, Result<(), ProviderError>>,
}

impl AsyncOperation {
    pub fn new(
        name: impl Into<String>,
        completion: BoxFuture<'static, Result<(), ProviderError>>,
    ) -> Self {
        Self {
            name: name.into(),
            completion,
        }
    }

    /// Human-readable operation name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the provider to resolve the operation.
    pub async fn wait(self) -> Result<(), ProviderError> {
        self.completion.await
    }
}

impl fmt::Debug for AsyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Operations the cloud control plane exposes for a single VM.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Fetch the current resource model.
    async fn get_model(&self, vm: &VmIdentifier) -> Result<VmModel, ProviderError>;

    /// Fetch a fresh instance view (the expanded runtime snapshot).
    async fn get_instance_view(&self, vm: &VmIdentifier) -> Result<InstanceView, ProviderError>;

    /// List the extensions attached to the VM.
    async fn list_extensions(&self, vm: &VmIdentifier) -> Result<Vec<VmExtension>, ProviderError>;

    /// Begin a create-or-update with the given resource properties.
    async fn begin_update(
        &self,
        vm: &VmIdentifier,
        properties: PropertyMap,
    ) -> Result<AsyncOperation, ProviderError>;

    /// Begin reapplying the VM's goal state.
    async fn begin_reapply(&self, vm: &VmIdentifier) -> Result<AsyncOperation, ProviderError>;

    /// Begin restarting the VM.
    async fn begin_restart(&self, vm: &VmIdentifier) -> Result<AsyncOperation, ProviderError>;
}

/// Resource model as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmModel {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: Value,
}

/// Extension sub-resource attached to a VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmExtension {
    pub name: String,
    pub publisher: String,
    #[serde(rename = "type")]
    pub extension_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_handler_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Point-in-time runtime snapshot of the VM.
///
/// Fetched fresh on every poll of the verification loop; never cached, since
/// the provider may serve snapshots that predate a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceView {
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

/// One status entry of an instance view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    /// Status code, e.g. `ProvisioningState/succeeded` or `PowerState/running`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InstanceView {
    /// Extract the power state from the status list.
    ///
    /// Exactly one status must carry the `PowerState` marker. Zero or several
    /// means the snapshot cannot be trusted at all, so this is an error
    /// carrying the full status list rather than a "not running" reading.
    pub fn power_state(&self) -> VmClientResult<PowerState> {
        let mut matches = self
            .statuses
            .iter()
            .filter(|status| status.code.contains(POWER_STATE_MARKER));
        match (matches.next(), matches.next()) {
            (Some(status), None) => Ok(PowerState::from_code(&status.code)),
            _ => Err(VmClientError::InconsistentInstanceView {
                statuses: self.statuses.clone(),
            }),
        }
    }
}

/// Coarse power classification reported by the provider.
///
/// Only `Running` drives a decision in this crate; every other value is
/// uniformly "not running yet" to the verification loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Starting,
    Stopping,
    Stopped,
    Deallocating,
    Deallocated,
    Other(String),
}

impl PowerState {
    fn from_code(code: &str) -> Self {
        match code.rsplit('/').next().unwrap_or(code) {
            "running" => PowerState::Running,
            "starting" => PowerState::Starting,
            "stopping" => PowerState::Stopping,
            "stopped" => PowerState::Stopped,
            "deallocating" => PowerState::Deallocating,
            "deallocated" => PowerState::Deallocated,
            other => PowerState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PowerState::Running)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Running => write!(f, "running"),
            PowerState::Starting => write!(f, "starting"),
            PowerState::Stopping => write!(f, "stopping"),
            PowerState::Stopped => write!(f, "stopped"),
            PowerState::Deallocating => write!(f, "deallocating"),
            PowerState::Deallocated => write!(f, "deallocated"),
            PowerState::Other(code) => write!(f, "{code}"),
        }
    }
}
