//! Remote Order Sink
//!
//! Posts each placed order to a webhook (a spreadsheet script in the
//! storefront's deployment). The body is the order JSON sent as
//! `text/plain`, which such endpoints accept without a CORS preflight.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::order::Order;
use crate::domain::repository::{OrderSink, SinkAck, SinkError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON reply of the webhook
#[derive(Debug, Deserialize)]
struct SinkReply {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl OrderSink for WebhookSink {
    async fn push(&self, order: &Order) -> Result<SinkAck, SinkError> {
        let body = serde_json::to_string(order).map_err(|e| SinkError::Transport(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        interpret_reply(status, &text)
    }
}

/// Map an HTTP reply to an acknowledgement
pub fn interpret_reply(status: u16, body: &str) -> Result<SinkAck, SinkError> {
    if !(200..300).contains(&status) {
        return Err(SinkError::Status(status));
    }
    match serde_json::from_str::<SinkReply>(body) {
        Ok(reply) if reply.status.eq_ignore_ascii_case("error") => {
            Err(SinkError::Rejected(reply.message))
        }
        Ok(reply) => Ok(SinkAck::Accepted(if reply.message.is_empty() {
            reply.status
        } else {
            reply.message
        })),
        Err(_) => Ok(SinkAck::Ambiguous),
    }
}

/// Sink used when no remote endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl OrderSink for NoopSink {
    async fn push(&self, order: &Order) -> Result<SinkAck, SinkError> {
        tracing::debug!(order_number = %order.order_number, "No remote sink configured");
        Ok(SinkAck::Accepted("skipped".to_string()))
    }
}

/// Either sink, chosen at startup
pub enum ConfiguredSink {
    Webhook(WebhookSink),
    Disabled(NoopSink),
}

impl ConfiguredSink {
    pub fn from_url(url: Option<&str>) -> Result<Self, SinkError> {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Ok(ConfiguredSink::Webhook(WebhookSink::new(url)?)),
            None => Ok(ConfiguredSink::Disabled(NoopSink)),
        }
    }
}

impl OrderSink for ConfiguredSink {
    async fn push(&self, order: &Order) -> Result<SinkAck, SinkError> {
        match self {
            ConfiguredSink::Webhook(sink) => sink.push(order).await,
            ConfiguredSink::Disabled(sink) => sink.push(order).await,
        }
    }
}
