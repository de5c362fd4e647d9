//! WebSocket handler for the realtime conversation surface.
//!
//! The `/ws` endpoint upgrades an HTTP connection to a WebSocket. Each
//! connection runs as its own task and owns a [`ConnectionSession`]. The
//! handler:
//!
//! - **Forwards deliveries:** Events queued on the connection's outbound
//!   channel (roster broadcasts, message deliveries, history responses)
//!   are written to the socket as JSON text frames.
//! - **Receives events:** Parses incoming text frames as [`ClientEvent`]
//!   and dispatches identity announcement, group subscription, sends, and
//!   history fetches.
//!
//! Malformed frames are logged and ignored. Disconnecting withdraws the
//! connection's presence entry (unless a newer connection for the same
//! user already superseded it), leaves its groups, and broadcasts the
//! updated roster.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use parlor_core::session::{ConnectionHandle, ConnectionSession};
use parlor_types::conversation::ConversationId;
use parlor_types::event::{ClientEvent, ServerEvent};
use parlor_types::user::UserId;

use crate::state::AppState;

/// Upgrade an HTTP request to the realtime WebSocket connection.
///
/// This is mounted at `/ws` in the router.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Core WebSocket connection handler.
///
/// Uses `tokio::select!` to multiplex between the connection's outbound
/// delivery channel and incoming WebSocket frames. Keeping both sides in
/// one task means inbound handling can await persistence without blocking
/// any other connection, while deliveries from other tasks queue on the
/// channel.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ConnectionSession::new(ConnectionHandle::new(tx));
    state.presence.register(session.handle().clone());
    tracing::debug!(conn_id = %session.id(), "websocket connected");

    loop {
        tokio::select! {
            // --- Branch 1: Write queued deliveries to the socket ---
            outbound = rx.recv() => {
                match outbound {
                    Some(event) => {
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                    // Client disconnected
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!("Failed to serialize server event: {err}");
                            }
                        }
                    }
                    // All senders dropped; no further deliveries possible.
                    None => break,
                }
            }

            // --- Branch 2: Process events from the client ---
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        process_event(&text, &mut session, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // Client disconnected
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Disconnect cleanup. Safe to run while a send from this connection is
    // still in flight: delivery snapshots taken before this point may
    // include the dead handle, whose sends drop silently.
    state.groups.leave_all(session.id(), session.joined());
    if let Some(roster) = state.presence.disconnect(session.id()) {
        roster.broadcast();
    }
    tracing::debug!(conn_id = %session.id(), "websocket disconnected");
}

/// Parse and dispatch a single client event.
async fn process_event(text: &str, session: &mut ConnectionSession, state: &AppState) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(
                raw = %text,
                error = %err,
                "Ignoring malformed client event"
            );
            return;
        }
    };

    match event {
        ClientEvent::Join { user_id } => {
            let Ok(user) = UserId::new(user_id) else {
                tracing::warn!(conn_id = %session.id(), "join dropped: missing userId");
                return;
            };
            if !session.bind(user.clone()) {
                tracing::warn!(
                    conn_id = %session.id(),
                    user = %user,
                    "join refused: connection already bound to another identity"
                );
                return;
            }
            state.presence.announce(user, session.id()).broadcast();
        }
        ClientEvent::JoinConversation { conversation_id } => {
            let Ok(conversation) = ConversationId::parse(conversation_id) else {
                tracing::warn!(conn_id = %session.id(), "joinConversation dropped: missing conversationId");
                return;
            };
            if session.record_join(conversation.clone()) {
                state.groups.join(conversation, session.id());
            }
        }
        ClientEvent::SendMessage(submission) => {
            state.router.send(session.handle(), submission).await;
        }
        ClientEvent::FetchMessages { conversation_id } => {
            state.router.fetch(session.handle(), &conversation_id).await;
        }
        ClientEvent::Ping => {
            session.handle().send(ServerEvent::Pong);
        }
    }
}
