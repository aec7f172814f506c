//! Shared state and plain HTTP handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::security::Gatekeeper;
use crate::session::{SessionRegistry, ShellEnv};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Working directory, navigator, completer and executor.
    pub env: ShellEnv,
    /// Live connections.
    pub sessions: Arc<SessionRegistry>,
    /// Handshake guard; `None` serves without authentication.
    pub gate: Option<Arc<Gatekeeper>>,
}

impl AppState {
    pub fn new(env: ShellEnv) -> Self {
        Self {
            env,
            sessions: Arc::new(SessionRegistry::new()),
            gate: None,
        }
    }

    /// Require authentication through `gate`.
    pub fn with_gatekeeper(mut self, gate: Arc<Gatekeeper>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "shell-socket",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "sessions": state.sessions.count(),
    }))
}
