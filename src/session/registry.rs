//! Registry of live connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tokio::task::AbortHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use super::SessionId;
use crate::error::ShellSocketError;
use crate::Result;

/// Lifecycle phase of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPhase {
    Open,
    Closing,
    Closed,
}

impl SocketPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SocketPhase::Open,
            1 => SocketPhase::Closing,
            _ => SocketPhase::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SocketPhase::Open => 0,
            SocketPhase::Closing => 1,
            SocketPhase::Closed => 2,
        }
    }
}

/// The connection's side of its registry entry.
///
/// The connection watches [`SessionLink::close_requested`] for the
/// polite close request and reports its phase back.
#[derive(Debug, Clone)]
pub struct SessionLink {
    id: SessionId,
    close: CancellationToken,
    phase: Arc<AtomicU8>,
}

impl SessionLink {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Resolves once a graceful close has been requested.
    pub fn close_requested(&self) -> WaitForCancellationFuture<'_> {
        self.close.cancelled()
    }

    pub fn is_close_requested(&self) -> bool {
        self.close.is_cancelled()
    }

    pub fn phase(&self) -> SocketPhase {
        SocketPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn set_phase(&self, phase: SocketPhase) {
        self.phase.store(phase.as_u8(), Ordering::Release);
    }
}

struct Entry {
    link: SessionLink,
    task: Option<AbortHandle>,
}

/// Thread-safe set of open sessions.
///
/// Grows on connect, shrinks on disconnect. Removal is idempotent, so a
/// disconnect racing a shutdown sweep is harmless.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a new open session and return its link.
    pub fn register(&self) -> Result<SessionLink> {
        let id = SessionId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let link = SessionLink {
            id,
            close: CancellationToken::new(),
            phase: Arc::new(AtomicU8::new(SocketPhase::Open.as_u8())),
        };

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ShellSocketError::LockPoisoned)?;
        sessions.insert(
            id,
            Entry {
                link: link.clone(),
                task: None,
            },
        );
        Ok(link)
    }

    /// Attach the task serving `id`, used by the forced sweep.
    ///
    /// Returns `false` if the session is already gone. A task attached
    /// after the forced sweep marked its session closed is aborted at once.
    pub fn attach(&self, id: &SessionId, task: AbortHandle) -> bool {
        match self.sessions.write() {
            Ok(mut sessions) => match sessions.get_mut(id) {
                Some(entry) => {
                    if entry.link.phase() == SocketPhase::Closed {
                        task.abort();
                    }
                    entry.task = Some(task);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Remove a session. Returns `true` if it was present.
    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions
            .write()
            .map(|mut sessions| sessions.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Get the number of sessions in the registry.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// List all session IDs.
    pub fn list_ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ShellSocketError::LockPoisoned)?;
        let mut ids: Vec<SessionId> = sessions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    /// Phase of a session, `None` if it is not registered.
    pub fn phase(&self, id: &SessionId) -> Option<SocketPhase> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(id).map(|e| e.link.phase()))
    }

    /// Ask every session to close gracefully. Returns how many were asked.
    pub fn close_all(&self) -> usize {
        let Ok(sessions) = self.sessions.read() else {
            return 0;
        };
        for entry in sessions.values() {
            entry.link.close.cancel();
        }
        sessions.len()
    }

    /// Forcibly stop every session that is still open or closing.
    ///
    /// Returns how many were terminated.
    pub fn terminate_remaining(&self) -> usize {
        let Ok(sessions) = self.sessions.read() else {
            return 0;
        };
        let mut terminated = 0;
        for entry in sessions.values() {
            if entry.link.phase() == SocketPhase::Closed {
                continue;
            }
            entry.link.set_phase(SocketPhase::Closed);
            if let Some(task) = &entry.task {
                task.abort();
            }
            terminated += 1;
        }
        terminated
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
