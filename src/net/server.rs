//! Websocket endpoint
//!
//! One socket per participant. The read half parses JSON client messages
//! and routes them to the match actor named by the join; the write half
//! drains a per-connection channel the actor pushes into. Dropping either
//! half tears the connection down and notifies the match.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::core::config::ServerConfig;
use crate::core::error::Result;
use crate::core::types::PlayerId;
use crate::net::protocol::{ClientMsg, ServerMsg};
use crate::session::registry::{MatchCmd, MatchHandle, MatchRegistry};

pub fn router(registry: Arc<MatchRegistry>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(registry)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &ServerConfig, registry: Arc<MatchRegistry>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "listening for websocket connections");
    axum::serve(listener, router(registry)).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<MatchRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<MatchRegistry>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Write half: drain the actor-facing channel onto the socket
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let raw = match serde_json::to_string(&msg) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(raw)).await.is_err() {
                break;
            }
        }
    });

    // Read half: the connection is anonymous until its first join
    let mut session: Option<(MatchHandle, PlayerId)> = None;
    while let Some(Ok(frame)) = ws_rx.next().await {
        let raw = match frame {
            Message::Text(raw) => raw,
            Message::Close(_) => break,
            _ => continue,
        };

        let msg: ClientMsg = match serde_json::from_str(&raw) {
            Ok(msg) => msg,
            Err(e) => {
                let _ = out_tx.send(ServerMsg::Rejection {
                    reason: format!("malformed message: {e}"),
                });
                continue;
            }
        };

        match msg {
            ClientMsg::Join {
                match_id,
                display_name,
                movement_mode,
            } => {
                let handle = registry.get_or_create(&match_id);
                let (reply, response) = oneshot::channel();
                handle
                    .send(MatchCmd::Join {
                        display_name,
                        movement_mode,
                        sink: out_tx.clone(),
                        reply,
                    })
                    .await;
                match response.await {
                    Ok(Ok(player_id)) => {
                        session = Some((handle, player_id));
                    }
                    Ok(Err(e)) => {
                        let _ = out_tx.send(ServerMsg::Rejection {
                            reason: e.rejection_reason(),
                        });
                    }
                    Err(_) => {
                        // Actor gone mid-join; the room was reaped
                        let _ = out_tx.send(ServerMsg::Rejection {
                            reason: "match no longer exists".into(),
                        });
                    }
                }
            }
            other => {
                let Some((handle, player_id)) = &session else {
                    let _ = out_tx.send(ServerMsg::Rejection {
                        reason: "join a match first".into(),
                    });
                    continue;
                };
                handle
                    .send(MatchCmd::Client {
                        player_id: *player_id,
                        msg: other,
                    })
                    .await;
            }
        }
    }

    if let Some((handle, player_id)) = session {
        handle.send(MatchCmd::Disconnect { player_id }).await;
    }
    writer.abort();
}
