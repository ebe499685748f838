use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use ulid::Ulid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::runtime::SessionHandle;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(session): State<SessionHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

/// Handle one connection: every connection is one participant identity
async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Ulid::new().to_string();

    tracing::info!(participant_id = %connection_id, "WebSocket connected");

    // Subscribe before anything can be sent on our behalf
    let mut events = session.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(outbound) => {
                        if !outbound.is_for(&connection_id) {
                            continue;
                        }
                        if send_json(&mut sender, &outbound.msg).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(participant_id = %connection_id, skipped, "Connection lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(participant_id = %connection_id, "Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if !session.send(&connection_id, client_msg).await {
                                    tracing::error!("Session task is gone");
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(participant_id = %connection_id, "Failed to parse client message: {}", e);
                                let error = ServerMessage::ErrorNotice {
                                    message: format!("Invalid message format: {}", e),
                                };
                                let _ = send_json(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(participant_id = %connection_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(participant_id = %connection_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    session.disconnect(&connection_id).await;
    tracing::info!(participant_id = %connection_id, "WebSocket connection closed");
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|e| {
        tracing::error!("Failed to serialize server message: {}", e);
    })?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
