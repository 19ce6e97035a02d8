use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::events::{
    default_dispatcher, ChatEnvelope, EventContext, EventDispatcher, HandlerResult,
};
use crate::messages::OutgoingMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport reply failed: {0}")]
    Respond(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Event stream from the host platform. The platform client itself lives behind this seam.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    /// Answers the interaction behind `envelope_id`.
    async fn respond(&self, envelope_id: &str, message: &OutgoingMessage)
        -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Holds the stream open; no events ever arrive.
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        std::future::pending().await
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn respond(
        &self,
        _envelope_id: &str,
        _message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
    ready: watch::Sender<bool>,
    connected_once: watch::Sender<bool>,
}

impl Default for GatewayRunner {
    fn default() -> Self {
        Self::new(Arc::new(NoopGatewayTransport), default_dispatcher(), ReconnectPolicy::default())
    }
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        let (connected_once, _) = watch::channel(false);
        Self { transport, dispatcher, reconnect_policy, ready, connected_once }
    }

    /// Flips to `true` once the transport has connected, and back on disconnect.
    pub fn readiness(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Latches `true` on the first successful connect and never flips back.
    pub fn connected_once(&self) -> watch::Receiver<bool> {
        self.connected_once.subscribe()
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    self.ready.send_replace(false);
                    warn!(
                        event_name = "gateway.transport.failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            event_name = "gateway.transport.exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(event_name = "gateway.transport.connecting", attempt, "opening gateway connection");
        self.transport.connect().await?;
        self.ready.send_replace(true);
        self.connected_once.send_replace(true);
        info!(event_name = "gateway.transport.connected", attempt, "gateway connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(event_name = "gateway.transport.closed", attempt, "gateway stream closed");
                self.ready.send_replace(false);
                self.transport.disconnect().await?;
                return Ok(());
            };
            let community_id = envelope
                .event
                .community_id()
                .map(|community| community.0.as_str())
                .unwrap_or("none");

            info!(
                event_name = "gateway.envelope.received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                community_id,
                "received gateway envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "gateway.envelope.ack_sent",
                    correlation_id = %envelope.envelope_id,
                    community_id,
                    error = %error,
                    "failed to acknowledge gateway envelope"
                );
            } else {
                debug!(
                    event_name = "gateway.envelope.ack_sent",
                    correlation_id = %envelope.envelope_id,
                    community_id,
                    "acknowledged gateway envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(message)) => {
                    if let Err(error) = self.transport.respond(&envelope.envelope_id, &message).await {
                        warn!(
                            event_name = "gateway.envelope.reply_failed",
                            correlation_id = %envelope.envelope_id,
                            community_id,
                            error = %error,
                            "failed to reply to interaction"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        event_name = "gateway.envelope.dispatch_failed",
                        correlation_id = %envelope.envelope_id,
                        community_id,
                        error = %error,
                        "event dispatch failed; continuing gateway loop"
                    );
                }
            }
        }
    }
}
