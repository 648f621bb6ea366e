//! Boot verification for VM restarts.
//!
//! A `running` power state alone does not prove a reboot happened: the
//! provider may serve an instance view captured before the restart. Each
//! poll therefore cross-checks the power state against the guest's own
//! uptime, and the restart is verified only when the computed boot time
//! falls strictly after the moment the restart was issued.
//!
//! Per tick the machine is in one of three states: still polling, verified,
//! or failed. [`BootVerifier::check_once`] produces the polling/verified
//! classification; failures travel on the error channel. Only two conditions
//! keep the loop polling: a power state other than `running`, and a guest
//! that is not yet reachable.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::clock::Clock;
use crate::errors::{GuestProbeError, VmClientError, VmClientResult};
use crate::guest::{self, GuestProbe};
use crate::identifiers::VmIdentifier;
use crate::provider::{PowerState, ProviderGateway};
use crate::retry::execute_with_retry;

/// Interval between verification polls. Slept before every check, including
/// the first: an instance view fetched immediately after the restart is
/// known to be unreliable, so the loop always waits at least one interval.
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Outcome of a single verification poll.
enum BootCheck {
    /// Power state is running and the guest's uptime places the boot after
    /// the restart was issued.
    Verified { boot_time: DateTime<Utc> },
    /// Not verified yet; keep polling.
    Pending(PendingReason),
}

enum PendingReason {
    NotRunning(PowerState),
    /// Power state reads running but the boot predates the restart; the
    /// snapshot is stale.
    StaleBoot { boot_time: DateTime<Utc> },
    /// Guest not accepting connections yet.
    GuestUnreachable { message: String },
}

/// One restart verification, bounded by `boot_timeout` from loop start.
pub(crate) struct BootVerifier<'a> {
    pub(crate) vm: &'a VmIdentifier,
    pub(crate) provider: &'a dyn ProviderGateway,
    pub(crate) probe: &'a dyn GuestProbe,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) restart_issued_at: DateTime<Utc>,
    pub(crate) boot_timeout: Duration,
}

impl BootVerifier<'_> {
    /// Poll until the reboot is corroborated or the budget runs out.
    pub(crate) async fn wait_for_boot(&self) -> VmClientResult<()> {
        let deadline = self.clock.now_utc() + to_chrono(self.boot_timeout)?;

        while self.clock.now_utc() < deadline {
            tracing::info!(vm = %self.vm, "waiting for VM to boot");
            self.clock.sleep(POLL_INTERVAL).await;

            match self.check_once().await? {
                BootCheck::Verified { boot_time } => {
                    tracing::info!(
                        vm = %self.vm,
                        boot_time = %boot_time,
                        "VM completed boot and is running"
                    );
                    return Ok(());
                }
                BootCheck::Pending(PendingReason::NotRunning(power_state)) => {
                    tracing::info!(vm = %self.vm, power_state = %power_state, "VM is not running yet");
                }
                BootCheck::Pending(PendingReason::StaleBoot { boot_time }) => {
                    tracing::info!(
                        vm = %self.vm,
                        restart_issued_at = %self.restart_issued_at,
                        boot_time = %boot_time,
                        "VM has not rebooted yet"
                    );
                }
                BootCheck::Pending(PendingReason::GuestUnreachable { message }) => {
                    tracing::info!(vm = %self.vm, error = %message, "VM is not yet accepting connections");
                }
            }
        }

        Err(VmClientError::BootTimeout {
            vm: self.vm.to_string(),
            timeout: self.boot_timeout,
        })
    }

    /// Fetch a fresh instance view and classify it.
    async fn check_once(&self) -> VmClientResult<BootCheck> {
        let instance_view =
            execute_with_retry(self.clock, || self.provider.get_instance_view(self.vm)).await?;

        let power_state = instance_view.power_state()?;
        tracing::info!(vm = %self.vm, power_state = %power_state, "VM power state");

        if !power_state.is_running() {
            return Ok(BootCheck::Pending(PendingReason::NotRunning(power_state)));
        }

        // Corroborate with the guest. Single attempt: an unreachable guest
        // is expected while sshd is still coming up, and the next poll will
        // try again anyway.
        match guest::read_uptime(self.probe).await {
            Ok(uptime) => {
                let boot_time = self.clock.now_utc() - to_chrono(uptime)?;
                if boot_time > self.restart_issued_at {
                    Ok(BootCheck::Verified { boot_time })
                } else {
                    Ok(BootCheck::Pending(PendingReason::StaleBoot { boot_time }))
                }
            }
            Err(VmClientError::Guest(GuestProbeError::Unreachable { message })) => {
                Ok(BootCheck::Pending(PendingReason::GuestUnreachable { message }))
            }
            Err(other) => Err(other),
        }
    }
}

fn to_chrono(duration: Duration) -> VmClientResult<ChronoDuration> {
    ChronoDuration::from_std(duration)
        .map_err(|e| VmClientError::Internal(format!("duration out of range: {e}")))
}
