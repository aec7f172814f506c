//! Router, listener binding and server lifecycle.

use std::future::Future;
use std::io::ErrorKind;

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers::{api_info, health, AppState};
use super::websocket::ws_handler;
use crate::error::ShellSocketError;
use crate::security::auth_middleware;
use crate::shutdown::ShutdownCoordinator;
use crate::Result;

/// How many ports above the requested one are tried when searching.
const PORT_SEARCH_LIMIT: u16 = 100;

/// Create the router with all routes configured.
///
/// The session socket is served on `/` and `/ws`. When the state has a
/// gatekeeper every route except `/health` requires credentials.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", any(ws_handler))
        .route("/ws", any(ws_handler))
        .route("/health", get(health))
        .route("/api/info", get(api_info));

    if let Some(gate) = state.gate.clone() {
        router = router.layer(middleware::from_fn_with_state(gate, auth_middleware));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Move on to the next free port when the requested one is taken.
    pub find_next_port: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            find_next_port: false,
        }
    }

    pub fn with_find_next_port(mut self, enabled: bool) -> Self {
        self.find_next_port = enabled;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 8099)
    }
}

/// Bind the listening socket.
///
/// A taken port is fatal unless `find_next_port` is set, in which case
/// the following ports are tried once each before the server starts.
pub async fn bind_listener(config: &ServerConfig) -> Result<TcpListener> {
    let attempts = if config.find_next_port {
        PORT_SEARCH_LIMIT
    } else {
        1
    };
    let mut port = config.port;

    for _ in 0..attempts {
        match TcpListener::bind((config.host.as_str(), port)).await {
            Ok(listener) => {
                if port != config.port {
                    warn!(requested = config.port, port, "port in use, using next free port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => match port.checked_add(1) {
                Some(next) if config.find_next_port => port = next,
                _ => break,
            },
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(ShellSocketError::PortPermissionDenied(port));
            }
            Err(e) => return Err(ShellSocketError::Io(e)),
        }
    }

    Err(ShellSocketError::PortInUse(config.port))
}

/// Start the server and run until Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig, state: AppState) -> Result<()> {
    let listener = bind_listener(&config).await?;
    serve_listener(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `signal` resolves, then run
/// the two-phase session shutdown.
pub async fn serve_listener<F>(listener: TcpListener, state: AppState, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("shell-socket listening on {}", addr);

    let router = create_router(state.clone());
    let server_handle = CancellationToken::new();
    let stop = server_handle.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
    });

    signal.await;

    let (done_tx, done_rx) = oneshot::channel();
    ShutdownCoordinator::new(state.sessions.clone(), server_handle)
        .shutdown(move || {
            let _ = done_tx.send(());
        })
        .await;
    let _ = done_rx.await;

    match server.await {
        Ok(result) => result.map_err(ShellSocketError::Io),
        Err(e) => Err(ShellSocketError::Io(std::io::Error::other(e.to_string()))),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8099");
        assert!(!config.find_next_port);
    }

    #[test]
    fn test_server_config_custom() {
        let config = ServerConfig::new("127.0.0.1", 8080).with_find_next_port(true);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(config.find_next_port);
    }

    #[tokio::test]
    async fn test_port_in_use_is_fatal_without_search() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = bind_listener(&ServerConfig::new("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellSocketError::PortInUse(p) if p == port));
    }

    #[tokio::test]
    async fn test_find_next_port() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        if port == u16::MAX {
            return;
        }

        let listener = bind_listener(&ServerConfig::new("127.0.0.1", port).with_find_next_port(true))
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().port() > port);
    }
}
