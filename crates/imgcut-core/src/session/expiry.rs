use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::registry::SessionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpirySignal {
    Reset,
    Stop,
}

/// Control side of a session's idle timer.
#[derive(Debug)]
pub(crate) struct ExpiryHandle {
    tx: UnboundedSender<ExpirySignal>,
}

impl ExpiryHandle {
    pub(crate) fn reset(&self) {
        // The timer is gone once the session is terminated
        let _ = self.tx.send(ExpirySignal::Reset);
    }

    pub(crate) fn stop(&self) {
        let _ = self.tx.send(ExpirySignal::Stop);
    }
}

/// Idle timer that has a control channel but is not running yet.
///
/// Signals sent through the handle before [`ExpiryTimer::start`] are queued.
pub(crate) struct ExpiryTimer {
    runtime: Handle,
    idle: Duration,
    tx: UnboundedSender<ExpirySignal>,
    rx: UnboundedReceiver<ExpirySignal>,
}

impl ExpiryTimer {
    /// Returns `None` outside a tokio runtime; the session then never expires.
    pub(crate) fn prepare(idle: Duration) -> Option<Self> {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no tokio runtime, sessions will not expire");
                return None;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        Some(Self {
            runtime,
            idle,
            tx,
            rx,
        })
    }

    pub(crate) fn handle(&self) -> ExpiryHandle {
        ExpiryHandle {
            tx: self.tx.clone(),
        }
    }

    /// Spawn the countdown for session `id`. Call once the session is
    /// registered, so an early fire always finds it.
    pub(crate) fn start(self, registry: Weak<SessionRegistry>, id: Uuid) {
        let Self {
            runtime, idle, rx, ..
        } = self;
        runtime.spawn(run_timer(registry, id, idle, rx));
    }
}

async fn run_timer(
    registry: Weak<SessionRegistry>,
    id: Uuid,
    idle: Duration,
    mut rx: UnboundedReceiver<ExpirySignal>,
) {
    loop {
        tokio::select! {
            signal = rx.recv() => match signal {
                Some(ExpirySignal::Reset) => continue,
                Some(ExpirySignal::Stop) | None => {
                    debug!("expiry timer for session {} stopped", id);
                    return;
                }
            },
            _ = tokio::time::sleep(idle) => {}
        }

        let Some(registry) = registry.upgrade() else {
            return;
        };

        info!("session {} idle for {:?}, terminating", id, idle);
        match tokio::task::spawn_blocking(move || registry.expire(id)).await {
            Ok(Ok(())) => return,
            // Entry is still registered, try again after another idle period
            Ok(Err(e)) => warn!("failed to expire session {}: {}", id, e),
            Err(e) => {
                error!("expiry task for session {} panicked: {}", id, e);
                return;
            }
        }
    }
}
