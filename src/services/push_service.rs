// src/services/push_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::{AppError, Result};

pub const PREDICTION_RESULTS_EVENT: &str = "ReceivePredictionResults";

const HUB_CAPACITY: usize = 64;

/// Frame delivered to every push subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub event: String,
    pub payload: Value,
}

#[async_trait]
pub trait PushPublisher: Send + Sync {
    async fn publish(&self, event_name: &str, payload: Value) -> Result<()>;
}

/// In-process fan-out to connected WebSocket clients.
pub struct BroadcastHub {
    sender: broadcast::Sender<Arc<PushEnvelope>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(HUB_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEnvelope>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushPublisher for BroadcastHub {
    async fn publish(&self, event_name: &str, payload: Value) -> Result<()> {
        let envelope = Arc::new(PushEnvelope {
            event: event_name.to_string(),
            payload,
        });

        match self.sender.send(envelope) {
            Ok(delivered) => {
                tracing::info!(event = event_name, subscribers = delivered, "📡 Pushed to live subscribers");
            }
            Err(_) => {
                tracing::debug!(event = event_name, "No live subscribers connected");
            }
        }
        Ok(())
    }
}

/// Forwards push envelopes to an external HTTP endpoint.
pub struct WebhookPublisher {
    client: Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PushPublisher for WebhookPublisher {
    async fn publish(&self, event_name: &str, payload: Value) -> Result<()> {
        let envelope = PushEnvelope {
            event: event_name.to_string(),
            payload,
        };

        let response = self.client.post(&self.url).json(&envelope).send().await?;

        if response.status().is_success() {
            tracing::info!(event = event_name, "✅ Webhook push delivered");
            Ok(())
        } else {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            Err(AppError::external_api(format!(
                "webhook returned {}: {}",
                status, details
            )))
        }
    }
}

/// Publishes to every target; one failing target does not stop the others.
pub struct FanoutPublisher {
    targets: Vec<Arc<dyn PushPublisher>>,
}

impl FanoutPublisher {
    pub fn new(targets: Vec<Arc<dyn PushPublisher>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl PushPublisher for FanoutPublisher {
    async fn publish(&self, event_name: &str, payload: Value) -> Result<()> {
        let mut failures = 0usize;
        for target in &self.targets {
            if let Err(e) = target.publish(event_name, payload.clone()).await {
                tracing::error!(event = event_name, error = %e, "❌ Push target failed");
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(AppError::service(format!(
                "{} of {} push targets failed",
                failures,
                self.targets.len()
            )));
        }
        Ok(())
    }
}
