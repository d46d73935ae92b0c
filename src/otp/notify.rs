//! Code delivery.
//!
//! Issuing a code never waits on delivery. The registry hands each message to
//! a `Notifier`; the production notifier is an in-memory outbox whose worker
//! retries failed deliveries with exponential backoff and jitter, then gives
//! up and logs. Delivery channels (email, SMS) implement `Notifier` too; the
//! default for local dev is `LogNotifier`, which logs the code.
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::Purpose;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpMessage {
    pub to: String,
    pub code: String,
    pub purpose: Purpose,
    pub expires_at: DateTime<Utc>,
}

/// Delivery abstraction. Implementations must not block for long.
pub trait Notifier: Send + Sync {
    /// Deliver (or enqueue) a message, or return an error to mark it failed.
    fn notify(&self, message: &OtpMessage) -> Result<()>;
}

/// Local dev channel that logs the code instead of sending it.
#[derive(Clone, Debug)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &OtpMessage) -> Result<()> {
        info!(
            to = %message.to,
            purpose = %message.purpose,
            code = %message.code,
            expires_at = %message.expires_at,
            "otp delivery stub"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NotifyWorkerConfig {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl NotifyWorkerConfig {
    /// Default worker config: 3 attempts, 2s->30s exponential backoff with jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(self, seconds: u64) -> Self {
        self.with_backoff_base(Duration::from_secs(seconds))
    }

    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    #[must_use]
    pub fn with_backoff_max(mut self, backoff_max: Duration) -> Self {
        self.backoff_max = backoff_max;
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for NotifyWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifier that only enqueues; a worker spawned by [`spawn_outbox`] delivers.
#[derive(Clone, Debug)]
pub struct OutboxNotifier {
    tx: mpsc::UnboundedSender<OtpMessage>,
}

impl Notifier for OutboxNotifier {
    fn notify(&self, message: &OtpMessage) -> Result<()> {
        self.tx
            .send(message.clone())
            .map_err(|_| anyhow!("otp outbox worker is not running"))
    }
}

/// Spawn the outbox worker and return the enqueueing side.
///
/// Each message gets its own delivery task so a slow retry never delays
/// other recipients. Must be called inside a Tokio runtime.
pub fn spawn_outbox(
    channel: Arc<dyn Notifier>,
    config: NotifyWorkerConfig,
) -> (OutboxNotifier, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OtpMessage>();
    let config = config.normalize();

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                deliver_with_retry(channel.as_ref(), &message, &config).await;
            });
        }
    });

    (OutboxNotifier { tx }, handle)
}

/// Returns true when the message was delivered.
async fn deliver_with_retry(
    channel: &dyn Notifier,
    message: &OtpMessage,
    config: &NotifyWorkerConfig,
) -> bool {
    let mut attempt = 1;
    loop {
        match channel.notify(message) {
            Ok(()) => return true,
            Err(err) if attempt >= config.max_attempts() => {
                error!(
                    to = %message.to,
                    purpose = %message.purpose,
                    attempts = attempt,
                    "otp delivery failed, giving up: {err}"
                );
                return false;
            }
            Err(err) => {
                let delay = backoff_delay(attempt, config.backoff_base(), config.backoff_max());
                warn!(
                    to = %message.to,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "otp delivery failed, retrying: {err}"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}
