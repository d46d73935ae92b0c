//! Background sweep of expired one-time codes and bearer sessions.
//!
//! Both stores already reject stale entries on access; the sweep only keeps
//! entries nobody asks about again from piling up.

use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use crate::{account::SessionStore, otp::OtpRegistry};

/// Entries dropped by one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sweep {
    pub codes: usize,
    pub sessions: usize,
}

#[must_use]
pub fn sweep(registry: &OtpRegistry, sessions: &SessionStore) -> Sweep {
    Sweep {
        codes: registry.purge_expired(),
        sessions: sessions.purge_expired(),
    }
}

/// Run [`sweep`] every `every`. Must be called inside a Tokio runtime.
pub fn spawn_reaper(
    registry: Arc<OtpRegistry>,
    sessions: Arc<SessionStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let swept = sweep(&registry, &sessions);
            if swept != Sweep::default() {
                debug!(codes = swept.codes, sessions = swept.sessions, "purged stale entries");
            }
        }
    })
}
