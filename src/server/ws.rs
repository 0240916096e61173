use crate::feeds::quote_api::QuoteSource;
use crate::state::{AppState, WsMessage};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// WebSocket upgrade handler
pub async fn ws_handler<Q: QuoteSource + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<Q>>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket<Q: QuoteSource + 'static>(socket: WebSocket, state: Arc<AppState<Q>>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.ws_tx.subscribe();

    // Send the current form so a fresh page shows the latest output
    let initial = WsMessage::Form(state.snapshot());
    if let Ok(json) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    // Forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ws_msg) => {
                    let Ok(json) = serde_json::to_string(&ws_msg) else { continue };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "ws client lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Read (and discard) incoming messages; detect disconnect
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
}
