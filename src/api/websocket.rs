//! WebSocket handler for the interactive shell session.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::handlers::AppState;
use super::types::{ClientMessage, ServerMessage};
use crate::session::{SessionLink, ShellEnv, ShellSession, SocketPhase};

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Register the connection, serve it, and deregister it afterwards.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let link = match state.sessions.register() {
        Ok(link) => link,
        Err(e) => {
            error!("failed to register connection: {}", e);
            return;
        }
    };
    let id = link.id();
    info!(session = %id, live = state.sessions.count(), "client connected");

    let task = tokio::spawn(run_connection(socket, state.env.clone(), link));
    state.sessions.attach(&id, task.abort_handle());

    match task.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!(session = %id, "connection terminated"),
        Err(e) => error!(session = %id, "connection task failed: {}", e),
    }

    state.sessions.remove(&id);
    info!(session = %id, live = state.sessions.count(), "client disconnected");
}

async fn run_connection(socket: WebSocket, env: ShellEnv, link: SessionLink) {
    let id = link.id();
    let (mut sink, mut stream) = socket.split();
    let (outbox_tx, mut outbox) = mpsc::unbounded_channel();
    let (mut session, mut events) = ShellSession::new(id, env, outbox_tx);

    session.greet();

    loop {
        tokio::select! {
            biased;

            Some(message) = outbox.recv() => {
                if !send_json(&mut sink, &message).await {
                    break;
                }
            }
            Some(event) = events.recv() => session.handle_event(event),
            _ = link.close_requested(), if link.phase() == SocketPhase::Open => {
                link.set_phase(SocketPhase::Closing);
                debug!(session = %id, "closing on server shutdown");
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: Utf8Bytes::from_static("server shutting down"),
                };
                if sink.send(Message::Close(Some(frame))).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(message) => session.handle(message).await,
                        Err(e) => warn!(session = %id, "ignoring malformed message: {}", e),
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    session.close();
    link.set_phase(SocketPhase::Closed);
}

/// Serialize and send one message. Returns `false` once the socket is gone.
async fn send_json(sink: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("failed to serialize message: {}", e);
            true
        }
    }
}
