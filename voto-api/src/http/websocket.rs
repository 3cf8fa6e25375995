//! WebSocket endpoint for live sessions
//!
//! Clients authenticate once on upgrade, with `?token=` or the same header
//! and cookie the REST routes accept. Every socket is joined to its private
//! `user:<id>` channel; further subscriptions go through the channel policy.
//! Frames are JSON text in both directions: `{"event": ..., "data": ...}`.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        FromRequestParts, Query, State, WebSocketUpgrade,
    },
    http::request::Parts,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use voto_core::models::Principal;
use voto_realtime::{Channel, ClientMessage, ServerEvent};

use super::{middleware::authenticate, AppError, AppState};

/// Inbound frames above this size are rejected by the socket
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub fn create_websocket_router() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Principal of a socket, resolved before the upgrade is accepted
#[derive(Debug, Clone)]
pub struct SocketUser(pub Principal);

impl FromRequestParts<AppState> for SocketUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<WsQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        let principal = authenticate(state, &parts.headers, query.token.as_deref()).await?;
        Ok(Self(principal))
    }
}

pub async fn websocket_handler(
    State(state): State<AppState>,
    SocketUser(principal): SocketUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, principal))
}

async fn handle_socket(socket: WebSocket, state: AppState, principal: Principal) {
    let hub = state.live.hub().clone();
    let connection_id = nanoid::nanoid!();
    let mut events = hub.register(connection_id.clone(), principal.user_id.clone());

    let user_channel = Channel::User(principal.user_id.clone());
    if let Err(e) = hub.join(&connection_id, user_channel.clone()) {
        warn!(connection_id = %connection_id, error = %e, "Failed to join private channel");
        hub.disconnect(&connection_id);
        return;
    }
    hub.send_to(
        &connection_id,
        ServerEvent::Connected {
            connection_id: connection_id.clone(),
            user_id: principal.user_id.clone(),
            user_channel: user_channel.to_string(),
        },
    );

    let (mut sink, mut stream) = socket.split();

    // Hub events -> socket
    let writer_id = connection_id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(connection_id = %writer_id, error = %e, "Failed to encode event");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                debug!(connection_id = %writer_id, error = %e, "Socket write failed");
                return false;
            }
        }
        // The hub dropped this connection (account deleted)
        let _ = sink.send(Message::Close(None)).await;
        true
    });

    let mut dropped_by_hub = false;
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&state, &principal, &connection_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong are answered by the transport; binary frames are not part of the protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "Socket read failed");
                    break;
                }
            },
            finished = &mut writer => {
                debug!(connection_id = %connection_id, "Writer finished, closing socket");
                dropped_by_hub = matches!(finished, Ok(true));
                break;
            }
        }
    }

    if !dropped_by_hub {
        hub.disconnect(&connection_id);
    }
    writer.abort();
    info!(
        user_id = %principal.user_id.as_str(),
        connection_id = %connection_id,
        "WebSocket connection closed"
    );
}

/// Decode one frame and run it; failures are reported to this connection only
async fn handle_text(state: &AppState, principal: &Principal, connection_id: &str, text: &str) {
    let hub = state.live.hub();

    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "Malformed client frame");
            hub.send_to(connection_id, ServerEvent::error("ER_INVALID_MESSAGE"));
            return;
        }
    };

    let event_type = message.event_type();
    if let Err(e) = dispatch(state, principal, connection_id, message).await {
        debug!(
            connection_id = %connection_id,
            event_type,
            error = %e,
            "Client event rejected"
        );
        hub.send_to(connection_id, ServerEvent::error(e.client_message()));
    }
}

async fn dispatch(
    state: &AppState,
    principal: &Principal,
    connection_id: &str,
    message: ClientMessage,
) -> voto_realtime::Result<()> {
    let hub = state.live.hub();
    let user_id = &principal.user_id;

    match message {
        ClientMessage::Room(class_id) => {
            let channel = Channel::Class(class_id);
            state.policy.authorize(principal, &channel).await?;
            subscribe(state, connection_id, vec![channel])?;
        }
        ClientMessage::SubscribeToClassChannels => {
            let channels = state.policy.class_channels(principal).await?;
            subscribe(state, connection_id, channels)?;
        }
        ClientMessage::SubscribeToSessionsStudent => {
            let (channels, sessions) = state.policy.session_channels(principal).await?;
            subscribe(state, connection_id, channels)?;
            hub.send_to(connection_id, ServerEvent::SessionActive { sessions });
        }
        ClientMessage::TogglePresentation {
            presentation_id,
            state: active,
        } => {
            state
                .live
                .set_presentation_active(user_id, &presentation_id, active)
                .await?;
        }
        ClientMessage::ToggleSlide {
            slide_id,
            state: active,
        } => {
            state.live.set_slide_active(user_id, &slide_id, active).await?;
        }
        ClientMessage::SaveResponse {
            presentation_id,
            slide_id,
            answer,
        } => {
            state
                .live
                .save_response(user_id, &presentation_id, &slide_id, Some(&answer))
                .await?;
        }
        ClientMessage::Leave(name) => {
            let channel: Channel = name.parse()?;
            hub.leave(connection_id, &channel);
            hub.send_to(connection_id, ServerEvent::Unsubscribed { channel: name });
        }
    }

    Ok(())
}

/// Join already-authorized channels and confirm them to the client
fn subscribe(
    state: &AppState,
    connection_id: &str,
    channels: Vec<Channel>,
) -> voto_realtime::Result<()> {
    let hub = state.live.hub();
    let mut names = Vec::with_capacity(channels.len());
    for channel in channels {
        names.push(channel.to_string());
        hub.join(connection_id, channel)?;
    }
    hub.send_to(connection_id, ServerEvent::Subscribed { channels: names });
    Ok(())
}
