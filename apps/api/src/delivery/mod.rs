//! Delivery Client — best-effort POST of ranking results to a webhook.
//!
//! Fire-and-forget: one attempt, no retry, and the response is never read.
//! The status code and body are discarded so the caller cannot come to rely
//! on them; only transport-level failures are reported back.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ranking::export::NotificationPayload;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The request left the process. Says nothing about what the endpoint did with it.
    Sent { at: DateTime<Utc> },
    Failed { reason: String, at: DateTime<Utc> },
}

impl DeliveryOutcome {
    pub fn failed(err: &DeliveryError) -> Self {
        DeliveryOutcome::Failed {
            reason: err.to_string(),
            at: Utc::now(),
        }
    }
}

/// Anything that can receive a notification payload.
///
/// Carried in `AppState` as `Arc<dyn ResultSink>`.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, endpoint: &str, payload: &NotificationPayload) -> DeliveryOutcome;
}

/// reqwest-backed sink used in production.
#[derive(Clone)]
pub struct DeliveryClient {
    client: Client,
}

impl DeliveryClient {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    async fn post(&self, endpoint: &str, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|_| DeliveryError::InvalidEndpoint(endpoint.to_string()))?;

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await?;

        // Opaque delivery: drop without inspecting status or body.
        drop(response);
        Ok(())
    }
}

#[async_trait]
impl ResultSink for DeliveryClient {
    async fn deliver(&self, endpoint: &str, payload: &NotificationPayload) -> DeliveryOutcome {
        match self.post(endpoint, payload).await {
            Ok(()) => {
                debug!(endpoint, rankings = payload.rankings.len(), "Webhook sent");
                DeliveryOutcome::Sent { at: Utc::now() }
            }
            Err(e) => {
                warn!(endpoint, "Webhook delivery failed: {e}");
                DeliveryOutcome::failed(&e)
            }
        }
    }
}
