//! Identifier for a provider-managed virtual machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable handle naming a single VM resource.
///
/// Supplied by the caller at client construction; never mutated. The
/// `Display` form is used in every log line and error that names the VM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmIdentifier {
    /// Cloud the resource lives in (e.g. "public", "china", "government").
    pub cloud: String,
    /// Subscription owning the resource.
    pub subscription: String,
    /// Resource group containing the VM.
    pub resource_group: String,
    /// VM name.
    pub name: String,
    /// Region the VM is deployed to. Injected into update payloads.
    pub location: String,
}

impl fmt::Display for VmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.cloud, self.subscription, self.resource_group, self.name
        )
    }
}
