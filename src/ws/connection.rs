//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::ws::TIMEOUT_DURATION_SECONDS;
use crate::{AppState, dtos::WsEventDTO, ws::usermap::InternalSignal};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: i32) {
    info!("WebSocket connection established");

    let (ws_tx, ws_rx) = ws.split();

    // il trasmettitore resta nella UserMap, il ricevitore al task di scrittura
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();
    state.users_online.register_online(user_id, int_tx.clone());

    tokio::spawn(listen_ws(user_id, ws_rx, int_tx, state));
    tokio::spawn(write_ws(user_id, ws_tx, int_rx));
}

#[instrument(skip(websocket_tx, internal_rx))]
pub async fn write_ws(
    user_id: i32,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
) {
    info!("Write task started");

    while let Some(signal) = internal_rx.recv().await {
        let outgoing = match signal {
            InternalSignal::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
            InternalSignal::Pong(payload) => Message::Pong(payload),
            InternalSignal::Event(event) => match serialize_event(&event) {
                Some(json) => Message::Text(Utf8Bytes::from(json)),
                None => continue,
            },
        };

        if let Err(e) = websocket_tx.send(outgoing).await {
            warn!("Failed to write to WebSocket: {:?}", e);
            break;
        }
    }

    let _ = websocket_tx.send(Message::Close(None)).await;
    info!("Write task terminated");
}

fn serialize_event(event: &WsEventDTO) -> Option<String> {
    serde_json::to_string(event)
        .map_err(|e| error!("Failed to serialize event: {:?}", e))
        .ok()
}

#[instrument(skip(websocket_rx, internal_tx, state))]
pub async fn listen_ws(
    user_id: i32,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Listen task started");
    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, websocket_rx.next()).await {
            Ok(Some(Ok(msg))) => match msg {
                Message::Ping(payload) => {
                    if internal_tx.send(InternalSignal::Pong(payload)).is_err() {
                        break;
                    }
                }
                Message::Close(_) => {
                    info!("Close message received");
                    break;
                }
                Message::Text(text) => {
                    // il canale è solo in uscita
                    debug!("Ignoring client text frame of {} bytes", text.len());
                }
                _ => {}
            },
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = TIMEOUT_DURATION_SECONDS, "Connection timeout");
                break;
            }
        }
    }

    // Cleanup
    info!("Cleaning up connection");
    let _ = internal_tx.send(InternalSignal::Shutdown);
    state.users_online.remove_from_online(user_id, &internal_tx);
    info!("Listen task terminated");
}
