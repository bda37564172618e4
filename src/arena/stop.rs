//! Stop requests for the cycle loop
//!
//! A stop is only observed between cycles: the orchestrator checks it before
//! starting a cycle and races it against the inter-cycle sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Why the run was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Programmatic request
    Requested,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Interrupt => write!(f, "interrupt"),
            StopReason::Terminate => write!(f, "terminate"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

struct StopInner {
    requested: AtomicBool,
    tx: watch::Sender<Option<StopReason>>,
}

/// Cloneable stop switch shared by the arena and signal handlers
#[derive(Clone)]
pub struct StopHandle {
    inner: Arc<StopInner>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(StopInner {
                requested: AtomicBool::new(false),
                tx,
            }),
        }
    }

    pub fn request_stop(&self, reason: StopReason) {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            warn!("Stop already requested, ignoring duplicate: {}", reason);
            return;
        }
        info!("Stop requested: {}", reason);
        self.inner.tx.send_replace(Some(reason));
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.inner.tx.borrow()
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        let mut rx = self.inner.tx.subscribe();
        // The sender lives in `inner`, so the channel cannot close here
        let _ = rx.wait_for(|reason| reason.is_some()).await;
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Route SIGINT and SIGTERM to `stop`
pub fn install_signal_handlers(stop: StopHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let on_term = stop.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("Received SIGTERM");
                    on_term.request_stop(StopReason::Terminate);
                }
                Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
            }
        });
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current cycle");
                stop.request_stop(StopReason::Interrupt);
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_reason_wins() {
        let stop = StopHandle::new();
        assert!(!stop.is_stop_requested());
        stop.request_stop(StopReason::Requested);
        stop.request_stop(StopReason::Terminate);
        assert!(stop.is_stop_requested());
        assert_eq!(stop.reason(), Some(StopReason::Requested));
    }

    #[tokio::test]
    async fn stopped_wakes_waiters() {
        let stop = StopHandle::new();
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.stopped().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.request_stop(StopReason::Requested);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();

        // Already stopped: returns immediately
        tokio::time::timeout(Duration::from_millis(50), stop.stopped())
            .await
            .unwrap();
    }
}
