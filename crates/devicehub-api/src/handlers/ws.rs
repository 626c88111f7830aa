//! Live channel upgrade and socket loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use devicehub_auth::identity::IdentityClaims;
use devicehub_core::error::{AppError, ErrorKind};
use devicehub_realtime::connection::handle::ConnectionHandle;
use devicehub_realtime::message::types::{InboundMessage, OutboundMessage};

use crate::dto::request::ChannelQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// How long the writer may take to flush and close after the reader ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// GET /ws/{device_id}?token={bearer}
///
/// The credential is verified before the upgrade; a device row owned by
/// another user is refused.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<ChannelQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = state
        .channel_authenticator()
        .authenticate(query.token.as_deref())
        .await?;

    if let Some(row) = state.sessions.session(&device_id).await? {
        if row.user_id != claims.user_id() {
            warn!(
                device_id = %device_id,
                user_id = %claims.user_id(),
                "Live channel refused for device owned by another user"
            );
            return Err(AppError::authorization("Device belongs to another user").into());
        }
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(state, device_id, claims, socket)))
}

/// Runs one device's socket until either side closes.
async fn handle_socket(
    state: AppState,
    device_id: String,
    claims: IdentityClaims,
    socket: WebSocket,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, outbound_rx) = state.registry.connect(&device_id, claims.user_id());
    let conn_id = handle.id;

    let mut writer = tokio::spawn(write_loop(Arc::clone(&handle), outbound_rx, ws_tx));
    let mut writer_done = false;

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&state, &handle, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(conn_id = %conn_id, error = %e, "Live channel read error");
                    break;
                }
            },
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    state.registry.release(&device_id, conn_id);
    handle.close();
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    info!(
        conn_id = %conn_id,
        device_id = %device_id,
        user_id = %claims.user_id(),
        "Live channel closed"
    );
}

async fn handle_frame(state: &AppState, handle: &ConnectionHandle, text: &str) {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(InboundMessage::Ping) => {
            handle.send(OutboundMessage::Pong);
        }
        Ok(InboundMessage::Activity) => {
            state.sessions.record_activity(&handle.device_id).await;
        }
        Err(e) => {
            debug!(conn_id = %handle.id, error = %e, "Unrecognized live channel frame");
            handle.send(OutboundMessage::error(
                "INVALID_MESSAGE",
                format!("Unrecognized message: {e}"),
            ));
        }
    }
}

/// Forwards queued frames to the socket. On close, flushes whatever is
/// already queued and sends a close frame.
async fn write_loop(
    handle: Arc<ConnectionHandle>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    mut ws_tx: SplitSink<WebSocket, Message>,
) {
    let shutdown = handle.shutdown_token();

    loop {
        tokio::select! {
            biased;
            msg = outbound_rx.recv() => {
                let Some(msg) = msg else { break };
                if send_frame(&mut ws_tx, &msg).await.is_err() {
                    handle.mark_dead();
                    return;
                }
            }
            _ = shutdown.cancelled() => {
                while let Ok(msg) = outbound_rx.try_recv() {
                    if send_frame(&mut ws_tx, &msg).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }

    let _ = ws_tx.send(Message::Close(None)).await;
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &OutboundMessage,
) -> Result<(), AppError> {
    let text = serde_json::to_string(msg)?;
    ws_tx
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Live channel write failed", e))
}
