//! Guest probe channel.
//!
//! A guest probe runs a command inside the VM and returns its output. The
//! restart verification loop uses it for exactly one thing: reading the
//! guest's uptime to corroborate that a reboot actually happened.
//!
//! Probe implementations own the classification of their transport errors.
//! A guest that is not yet accepting connections reports
//! [`GuestProbeError::Unreachable`]; callers never inspect exit codes or
//! message substrings themselves.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::{GuestProbeError, VmClientError, VmClientResult};

/// Command used to read the guest's uptime; the first field of
/// `/proc/uptime` is seconds since boot.
pub const UPTIME_COMMAND: &str = "cat /proc/uptime";

/// ssh(1) exits 255 when the transport itself fails, as opposed to the
/// remote command failing.
const SSH_TRANSPORT_EXIT_CODE: i32 = 255;

/// Command execution channel into the guest.
#[async_trait]
pub trait GuestProbe: Send + Sync {
    /// Run a command on the guest and return its stdout. Single attempt, no
    /// internal retry; callers decide how to handle transient failures.
    async fn run_command(&self, command: &str) -> Result<String, GuestProbeError>;
}

/// Read how long the guest has been up.
///
/// Malformed output from a reachable guest is not retryable and maps to a
/// fatal internal error.
pub async fn read_uptime(probe: &dyn GuestProbe) -> VmClientResult<Duration> {
    let output = probe.run_command(UPTIME_COMMAND).await?;
    parse_uptime(&output)
}

fn parse_uptime(output: &str) -> VmClientResult<Duration> {
    output
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<f64>().ok())
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .ok_or_else(|| VmClientError::Internal(format!("malformed uptime output: {output:?}")))
}

/// Guest probe over an `ssh(1)` subprocess.
///
/// Uses `BatchMode` so a missing or rejected key fails instead of prompting.
pub struct SshProbe {
    user: String,
    host: String,
    port: u16,
    identity_file: Option<PathBuf>,
}

impl SshProbe {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port: 22,
            identity_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }
}

#[async_trait]
impl GuestProbe for SshProbe {
    async fn run_command(&self, command: &str) -> Result<String, GuestProbeError> {
        let mut ssh = Command::new("ssh");
        ssh.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("UserKnownHostsFile=/dev/null")
            .arg("-p")
            .arg(self.port.to_string());
        if let Some(identity) = &self.identity_file {
            ssh.arg("-i").arg(identity);
        }
        ssh.arg(format!("{}@{}", self.user, self.host)).arg(command);

        tracing::debug!(host = %self.host, command, "running guest command over ssh");

        let output = ssh
            .output()
            .await
            .map_err(|e| GuestProbeError::Channel(format!("failed to spawn ssh: {e}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let exit_code = output.status.code().unwrap_or(-1);
        let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_ssh_failure(exit_code, message))
    }
}

/// Classify an ssh failure: a refused connection on the transport exit code
/// means sshd is not up (yet); anything else is a real command failure.
fn classify_ssh_failure(exit_code: i32, message: String) -> GuestProbeError {
    if exit_code == SSH_TRANSPORT_EXIT_CODE && message.contains("Connection refused") {
        GuestProbeError::Unreachable { message }
    } else {
        GuestProbeError::Command { exit_code, message }
    }
}
