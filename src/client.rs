//! VmLifecycleClient - lifecycle operations on a single provider-managed VM.
//!
//! Thin request wrappers (model, instance view, extensions, update, reapply)
//! plus `restart`, which optionally runs the boot verification loop from
//! [`crate::boot`] to confirm the machine actually rebooted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::boot::BootVerifier;
use crate::clock::{Clock, SystemClock};
use crate::errors::{VmClientError, VmClientResult};
use crate::guest::GuestProbe;
use crate::identifiers::VmIdentifier;
use crate::provider::{AsyncOperation, InstanceView, PropertyMap, ProviderGateway, VmExtension, VmModel};
use crate::retry::execute_with_retry;

/// Default bound for provider-side long-running operations.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default bound for waiting out a reboot during [`VmLifecycleClient::restart`].
pub const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Options for [`VmLifecycleClient::restart`].
///
/// `timeout` bounds the provider-side restart operation itself; `boot_timeout`
/// bounds the subsequent boot verification when `wait_for_boot` is set.
#[derive(Clone)]
pub struct RestartOptions {
    /// Verify via the guest probe that the machine actually rebooted, rather
    /// than trusting the provider's "operation completed".
    pub wait_for_boot: bool,
    /// Guest channel used for verification. Required when `wait_for_boot`.
    pub guest_probe: Option<Arc<dyn GuestProbe>>,
    pub boot_timeout: Duration,
    pub timeout: Duration,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            wait_for_boot: false,
            guest_probe: None,
            boot_timeout: DEFAULT_BOOT_TIMEOUT,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Client for lifecycle operations on one virtual machine.
///
/// Owns no mutable state: instances for different VMs can run concurrently
/// and share nothing but the provider gateway handle.
pub struct VmLifecycleClient {
    vm: VmIdentifier,
    provider: Arc<dyn ProviderGateway>,
    clock: Arc<dyn Clock>,
}

impl VmLifecycleClient {
    pub fn new(vm: VmIdentifier, provider: Arc<dyn ProviderGateway>) -> Self {
        Self::with_clock(vm, provider, Arc::new(SystemClock))
    }

    /// Construct with an explicit time source. Tests use this to drive the
    /// verification loop with simulated time.
    pub fn with_clock(
        vm: VmIdentifier,
        provider: Arc<dyn ProviderGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { vm, provider, clock }
    }

    pub fn identifier(&self) -> &VmIdentifier {
        &self.vm
    }

    /// Retrieve the VM's resource model.
    pub async fn get_model(&self) -> VmClientResult<VmModel> {
        tracing::info!(vm = %self.vm, "retrieving VM model");
        let model =
            execute_with_retry(self.clock.as_ref(), || self.provider.get_model(&self.vm)).await?;
        Ok(model)
    }

    /// Retrieve a fresh instance view.
    pub async fn get_instance_view(&self) -> VmClientResult<InstanceView> {
        tracing::info!(vm = %self.vm, "retrieving instance view");
        let view = execute_with_retry(self.clock.as_ref(), || {
            self.provider.get_instance_view(&self.vm)
        })
        .await?;
        Ok(view)
    }

    /// Retrieve the extensions attached to the VM.
    pub async fn get_extensions(&self) -> VmClientResult<Vec<VmExtension>> {
        tracing::info!(vm = %self.vm, "retrieving extensions");
        let extensions = execute_with_retry(self.clock.as_ref(), || {
            self.provider.list_extensions(&self.vm)
        })
        .await?;
        Ok(extensions)
    }

    /// Update a set of properties on the VM.
    ///
    /// The provider requires `location` on every create-or-update, so it is
    /// injected here - into a copy, the caller's map is left untouched.
    pub async fn update(&self, properties: &PropertyMap, timeout: Duration) -> VmClientResult<()> {
        let mut properties = properties.clone();
        properties.insert(
            "location".to_string(),
            Value::String(self.vm.location.clone()),
        );

        tracing::info!(vm = %self.vm, properties = ?properties, "updating VM");

        let operation = self.provider.begin_update(&self.vm, properties).await?;
        self.execute_async_operation(operation, timeout).await
    }

    /// Reapply the VM's goal state.
    pub async fn reapply(&self, timeout: Duration) -> VmClientResult<()> {
        let operation = self.provider.begin_reapply(&self.vm).await?;
        self.execute_async_operation(operation, timeout).await
    }

    /// Restart (reboot) the VM.
    ///
    /// When `options.wait_for_boot` is set, a guest probe must be supplied;
    /// after the provider confirms the restart, the boot verification loop
    /// cross-checks power state against guest uptime until the reboot is
    /// corroborated or `options.boot_timeout` elapses.
    pub async fn restart(&self, options: RestartOptions) -> VmClientResult<()> {
        if options.wait_for_boot && options.guest_probe.is_none() {
            return Err(VmClientError::Config(
                "a guest probe must be provided when wait_for_boot is set".to_string(),
            ));
        }

        // Captured before the restart is issued; the verification loop
        // compares guest boot times against this.
        let restart_issued_at = self.clock.now_utc();

        let operation = self.provider.begin_restart(&self.vm).await?;
        self.execute_async_operation(operation, options.timeout)
            .await?;

        let probe = match options.guest_probe {
            Some(probe) if options.wait_for_boot => probe,
            _ => return Ok(()),
        };

        BootVerifier {
            vm: &self.vm,
            provider: self.provider.as_ref(),
            probe: probe.as_ref(),
            clock: self.clock.as_ref(),
            restart_issued_at,
            boot_timeout: options.boot_timeout,
        }
        .wait_for_boot()
        .await
    }

    /// Wait for a provider-side long-running operation, bounded by `timeout`.
    async fn execute_async_operation(
        &self,
        operation: AsyncOperation,
        timeout: Duration,
    ) -> VmClientResult<()> {
        let name = operation.name().to_string();
        tracing::info!(vm = %self.vm, operation = %name, "starting provider operation");
        let started = std::time::Instant::now();

        match tokio::time::timeout(timeout, operation.wait()).await {
            Ok(Ok(())) => {
                tracing::info!(
                    vm = %self.vm,
                    operation = %name,
                    elapsed = ?started.elapsed(),
                    "provider operation completed"
                );
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(VmClientError::OperationTimedOut {
                operation: name,
                timeout,
            }),
        }
    }
}

impl fmt::Display for VmLifecycleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vm)
    }
}
