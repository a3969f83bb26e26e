//! HTTP upgrade endpoints and per-socket task plumbing.
//!
//! Each accepted socket is split into a receive loop (parse + dispatch) and
//! a send pump draining the connection's outbound queue; whichever side
//! finishes first aborts the other and the connection is torn down exactly
//! once.
//!
//! The booked channel authenticates at the handshake: the upgrade request
//! must carry a token the identity verifier accepts, and the resulting
//! verified identity is bound to the connection for its whole lifetime.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::domain::foundation::ConnectionId;
use crate::ports::{IdentityVerifier, VerifiedIdentity};

use super::anonymous::AnonymousChannel;
use super::booked::BookedChannel;
use super::messages::{AnonymousClientEvent, BookedClientEvent};

/// Shared state for the realtime endpoints.
#[derive(Clone)]
pub struct RealtimeState {
    pub booked: Arc<BookedChannel>,
    pub anonymous: Arc<AnonymousChannel>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

/// Builds the realtime router: `/ws/booked` and `/ws/anonymous`.
pub fn router(state: RealtimeState) -> Router {
    Router::new()
        .route("/ws/booked", get(booked_ws))
        .route("/ws/anonymous", get(anonymous_ws))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct BookedWsQuery {
    token: String,
}

/// Upgrade handler for the booked channel. Rejects the handshake outright
/// when the token does not verify.
async fn booked_ws(
    ws: WebSocketUpgrade,
    Query(query): Query<BookedWsQuery>,
    State(state): State<RealtimeState>,
) -> Result<impl IntoResponse, StatusCode> {
    let identity = state.verifier.verify(&query.token).await.map_err(|e| {
        tracing::debug!("booked handshake rejected: {}", e);
        StatusCode::UNAUTHORIZED
    })?;
    Ok(ws.on_upgrade(move |socket| run_booked(socket, state, identity)))
}

/// Upgrade handler for the anonymous channel; no credentials involved.
async fn anonymous_ws(
    ws: WebSocketUpgrade,
    State(state): State<RealtimeState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_anonymous(socket, state))
}

async fn run_booked(socket: WebSocket, state: RealtimeState, identity: VerifiedIdentity) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = state.booked.connect(identity, tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let booked = Arc::clone(&state.booked);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<BookedClientEvent>(&text) {
                    Ok(event) => dispatch_booked(&booked, connection, event).await,
                    Err(e) => {
                        tracing::debug!(%connection, "ignoring unparseable client event: {}", e);
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    state.booked.disconnect(connection).await;
}

async fn dispatch_booked(channel: &BookedChannel, connection: ConnectionId, event: BookedClientEvent) {
    match event {
        // The wire role is ignored; group membership follows the verified
        // role bound at the handshake.
        BookedClientEvent::Identify { user_id, role: _ } => {
            channel.identify(connection, &user_id).await;
        }
        BookedClientEvent::JoinRoom { room_id } => {
            channel.join_room(connection, room_id).await;
        }
        BookedClientEvent::Typing { room_id, user_id } => {
            channel.typing(connection, room_id, user_id).await;
        }
        BookedClientEvent::StopTyping { room_id, user_id } => {
            channel.stop_typing(connection, room_id, user_id).await;
        }
        BookedClientEvent::SendMessage {
            room_id,
            sender,
            text,
            booking_id,
            file_url,
            file_type,
            is_anonymous,
        } => {
            channel
                .send_message(
                    connection,
                    room_id,
                    &sender,
                    text,
                    booking_id,
                    file_url,
                    file_type,
                    is_anonymous,
                )
                .await;
        }
        BookedClientEvent::CallUser {
            user_to_call,
            signal_data,
            from: _,
            booking_id,
        } => {
            channel
                .call_user(connection, user_to_call, signal_data, booking_id)
                .await;
        }
        BookedClientEvent::AcceptCall { to, signal } => {
            channel.accept_call(to, signal).await;
        }
        BookedClientEvent::IceCandidate { to, candidate } => {
            channel.ice_candidate(to, candidate).await;
        }
        BookedClientEvent::CallEnded { to } => {
            channel.call_ended(to).await;
        }
    }
}

async fn run_anonymous(socket: WebSocket, state: RealtimeState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = state.anonymous.connect(tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let anonymous = Arc::clone(&state.anonymous);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<AnonymousClientEvent>(&text) {
                    Ok(event) => dispatch_anonymous(&anonymous, connection, event).await,
                    Err(e) => {
                        tracing::debug!(%connection, "ignoring unparseable client event: {}", e);
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    state.anonymous.disconnect(connection).await;
}

async fn dispatch_anonymous(
    channel: &AnonymousChannel,
    connection: ConnectionId,
    event: AnonymousClientEvent,
) {
    match event {
        AnonymousClientEvent::FindMatch { meeting_mode } => {
            channel.find_match(connection, meeting_mode).await;
        }
        // Any senderId in the payload is dropped here; messages are
        // attributed to the connection that carried them.
        AnonymousClientEvent::SendMessage {
            room_id,
            sender_id: _,
            text,
        } => {
            channel.send_message(connection, room_id, text).await;
        }
        AnonymousClientEvent::CallUser {
            user_to_call,
            signal_data,
        } => {
            channel.call_user(connection, user_to_call, signal_data).await;
        }
        AnonymousClientEvent::AcceptCall { to, signal } => {
            channel.accept_call(to, signal).await;
        }
        AnonymousClientEvent::CallEnded { to } => {
            channel.call_ended(to).await;
        }
        AnonymousClientEvent::Skip => {
            channel.skip(connection).await;
        }
    }
}
