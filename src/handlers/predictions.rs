use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Json},
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::prediction::PredictionResult;
use crate::services::push_service::PushEnvelope;
use crate::state::AppState;

// GET /api/predictions/results
pub async fn get_prediction_results(State(state): State<AppState>) -> Json<Vec<PredictionResult>> {
    let results = state.orchestrator.get_results().await;
    tracing::info!(count = results.len(), "📊 Served prediction results");
    Json(results)
}

// GET /ws/predictions
pub async fn prediction_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let receiver = state.hub.subscribe();
    ws.on_upgrade(move |socket| stream_predictions(socket, receiver))
}

async fn stream_predictions(mut socket: WebSocket, mut receiver: broadcast::Receiver<Arc<PushEnvelope>>) {
    tracing::info!("🔌 Prediction feed subscriber connected");

    loop {
        tokio::select! {
            pushed = receiver.recv() => match pushed {
                Ok(envelope) => {
                    let text = match serde_json::to_string(envelope.as_ref()) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode push envelope");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Prediction feed subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Prediction feed subscriber disconnected");
}
