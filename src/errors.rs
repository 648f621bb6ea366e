//! Error types for the cloudvm client.
//!
//! Only two conditions are ever absorbed by the restart verification loop
//! (power state not yet running, guest unreachable); everything else in this
//! taxonomy surfaces to the caller.

use std::time::Duration;

use thiserror::Error;

use crate::provider::InstanceViewStatus;

pub type VmClientResult<T> = Result<T, VmClientError>;

/// Top-level error for all client operations.
#[derive(Debug, Error)]
pub enum VmClientError {
    /// Invalid call configuration, detected before any remote call is made.
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider failure, propagated unchanged after the retry budget.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A provider-side long-running operation did not complete in time.
    #[error("operation '{operation}' did not complete within {timeout:?}")]
    OperationTimedOut { operation: String, timeout: Duration },

    /// The instance view did not contain exactly one PowerState status.
    #[error(
        "expected exactly one PowerState status in the instance view, found {}: {}",
        statuses.len(),
        render_statuses(statuses)
    )]
    InconsistentInstanceView { statuses: Vec<InstanceViewStatus> },

    /// Guest probe failure. `Unreachable` never surfaces through the restart
    /// verification loop; the other variants do.
    #[error(transparent)]
    Guest(#[from] GuestProbeError),

    /// The boot verification budget was exhausted without corroboration.
    #[error("VM {vm} did not boot after {timeout:?}")]
    BootTimeout { vm: String, timeout: Duration },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error reported by the provider gateway.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Throttling, gateway hiccups and similar conditions that a retry may
    /// resolve.
    #[error("transient provider error: {message}")]
    Transient { message: String },

    /// Definitive API failure carrying the provider's error code.
    #[error("provider error {code}: {message}")]
    Api { code: String, message: String },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}

/// Error reported by a guest probe.
///
/// The unreachable/failed distinction is part of the probe contract: probe
/// implementations classify their transport errors so callers never have to
/// inspect exit codes or message substrings.
#[derive(Debug, Error)]
pub enum GuestProbeError {
    /// The guest is not accepting connections. Expected in the early
    /// post-reboot window.
    #[error("guest not reachable: {message}")]
    Unreachable { message: String },

    /// The command ran on the guest and failed.
    #[error("guest command failed with exit code {exit_code}: {message}")]
    Command { exit_code: i32, message: String },

    /// The probe channel itself broke (spawn failure, I/O error).
    #[error("guest channel error: {0}")]
    Channel(String),
}

fn render_statuses(statuses: &[InstanceViewStatus]) -> String {
    serde_json::to_string(statuses).unwrap_or_else(|_| format!("{statuses:?}"))
}
