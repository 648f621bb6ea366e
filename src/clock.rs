//! Time source seam.
//!
//! The restart verification loop and the retry helper both measure wall-clock
//! deadlines and sleep between polls. Routing both through this trait lets
//! tests drive the state machine with simulated time instead of real sleeps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Wall-clock time and cooperative sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Sleep for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Real time: `chrono::Utc` + `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
