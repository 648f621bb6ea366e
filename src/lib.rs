//! cloudvm - lifecycle operations on a cloud-managed virtual machine.
//!
//! Test-infrastructure client for a single provider-managed VM: fetch its
//! model, instance view and extensions, push configuration updates, reapply
//! goal state, and restart it with optional boot verification.
//!
//! The restart path is the interesting part. A provider that reports
//! `PowerState/running` may be serving a snapshot captured before the reboot,
//! so [`VmLifecycleClient::restart`] can cross-check the power state against
//! the guest's own uptime and only report success once the computed boot time
//! falls after the moment the restart was issued.
//!
//! ## Architecture
//!
//! - `provider`: seam to the cloud control plane ([`ProviderGateway`],
//!   instance view model, [`PowerState`] extraction)
//! - `guest`: command channel into the guest ([`GuestProbe`], [`SshProbe`])
//!   with typed reachable/failed classification
//! - `boot`: the boot-verification polling state machine
//! - `client`: [`VmLifecycleClient`], tying it together
//! - `clock`, `retry`, `errors`, `logging`: time source seam, transient-error
//!   retry, error taxonomy, subscriber bootstrap

mod boot;
mod client;
mod clock;
mod errors;
mod guest;
mod identifiers;
mod logging;
mod provider;
mod retry;

pub use client::{
    DEFAULT_BOOT_TIMEOUT, DEFAULT_OPERATION_TIMEOUT, RestartOptions, VmLifecycleClient,
};
pub use clock::{Clock, SystemClock};
pub use errors::{GuestProbeError, ProviderError, VmClientError, VmClientResult};
pub use guest::{GuestProbe, SshProbe, UPTIME_COMMAND};
pub use identifiers::VmIdentifier;
pub use logging::init_logging;
pub use provider::{
    AsyncOperation, InstanceView, InstanceViewStatus, PowerState, PropertyMap, ProviderGateway,
    VmExtension, VmModel,
};
