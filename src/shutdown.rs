//! Two-phase shutdown of live sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::session::SessionRegistry;

/// Time sessions get to finish a polite close before they are forced.
pub const GRACE_PERIOD: Duration = Duration::from_millis(300);

/// What a shutdown did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sessions asked to close politely.
    pub requested: usize,
    /// Sessions still open after the grace period and forcibly stopped.
    pub terminated: usize,
}

/// Closes every session within a bounded time, then stops the listener.
pub struct ShutdownCoordinator {
    sessions: Arc<SessionRegistry>,
    server: CancellationToken,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// `server` is cancelled to close the listening socket.
    pub fn new(sessions: Arc<SessionRegistry>, server: CancellationToken) -> Self {
        Self {
            sessions,
            server,
            grace: GRACE_PERIOD,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run the shutdown and call `done` exactly once at the end.
    ///
    /// `done` runs even if this future is dropped or panics part way.
    pub async fn shutdown<F: FnOnce()>(self, done: F) -> ShutdownReport {
        let completion = OnDrop(Some(done));

        let requested = self.sessions.close_all();
        info!(sessions = requested, "closing sessions");

        tokio::time::sleep(self.grace).await;

        let terminated = self.sessions.terminate_remaining();
        if terminated > 0 {
            info!(sessions = terminated, "terminated sessions after grace period");
        }

        self.server.cancel();
        drop(completion);

        ShutdownReport {
            requested,
            terminated,
        }
    }
}

struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SocketPhase;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_all_sessions_closed_within_grace() {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::new();

        // Half honour the polite close, half ignore it.
        for i in 0..6 {
            let link = registry.register().unwrap();
            let id = link.id();
            let task = tokio::spawn(async move {
                if i % 2 == 0 {
                    link.close_requested().await;
                    link.set_phase(SocketPhase::Closed);
                } else {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
            });
            assert!(registry.attach(&id, task.abort_handle()));
            tasks.push(task);
        }

        let server = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let started = Instant::now();
        let report = ShutdownCoordinator::new(registry.clone(), server.clone())
            .shutdown(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(started.elapsed() < GRACE_PERIOD + Duration::from_millis(500));
        assert_eq!(report.requested, 6);
        assert_eq!(report.terminated, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(server.is_cancelled());

        for task in tasks {
            tokio::time::timeout(Duration::from_secs(1), task)
                .await
                .expect("session task still running")
                .ok();
        }
        for id in registry.list_ids().unwrap() {
            assert_eq!(registry.phase(&id), Some(SocketPhase::Closed));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_completes() {
        let registry = Arc::new(SessionRegistry::new());
        let server = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let report = ShutdownCoordinator::new(registry, server.clone())
            .with_grace(Duration::from_millis(10))
            .shutdown(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(
            report,
            ShutdownReport {
                requested: 0,
                terminated: 0
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(server.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_runs_when_cancelled() {
        let registry = Arc::new(SessionRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let shutdown = ShutdownCoordinator::new(registry, CancellationToken::new()).shutdown(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        let _ = tokio::time::timeout(Duration::from_millis(10), shutdown).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
