//! Desktop realtime channel.
//!
//! Each socket gets a `Connection` from the notifier. A writer task drains
//! the connection's event queue into the socket while this task reads
//! client frames. When the reader ends the connection is dropped, which
//! removes it from its session group. A desktop evicted for not keeping up
//! is disconnected; it gets a fresh snapshot when it reconnects.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::AppState;
use crate::realtime::{ClientEvent, Connection, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Join this session right away, without a `join_session` frame
    session: Option<String>,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(state, socket, query.session))
}

async fn handle_ws(state: AppState, socket: WebSocket, session: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut events) = state.notifier.connect();
    let id = connection.id();
    info!(connection = %id, "desktop connected");

    if let Some(session_id) = session.filter(|s| !s.is_empty()) {
        state.notifier.subscribe(&connection, &session_id);
    }

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                debug!("socket send failed, client gone");
                break;
            }
        }
    });

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = connection.evicted() => {
                warn!(connection = %id, "desktop fell behind, closing socket");
                break;
            }
        };
        let Some(msg) = msg else { break };

        match msg {
            Ok(Message::Text(text)) => handle_client_text(&state, &connection, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(connection = %id, error = %err, "socket error");
                break;
            }
        }
    }

    drop(connection);
    send_task.abort();
    info!(connection = %id, "desktop disconnected");
}

fn handle_client_text(state: &AppState, connection: &Connection, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::JoinSession { session_id }) if session_id.is_empty() => {
            connection.send(ServerEvent::error("sessionId must not be empty"));
        }
        Ok(ClientEvent::JoinSession { session_id }) => {
            info!(connection = %connection.id(), session = %session_id, "desktop joined session");
            state.notifier.subscribe(connection, &session_id);
        }
        Err(err) => {
            warn!(connection = %connection.id(), error = %err, "unreadable client frame");
            connection.send(ServerEvent::error(format!("invalid message: {err}")));
        }
    }
}
