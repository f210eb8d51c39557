// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery transport: one POST of a [`BatchPayload`] to the collector.
//!
//! ```text
//!   BatchPayload ──> JSON body
//!                       │
//!                       v
//!              ┌─────────────────┐   Ok(status)    success iff 2xx
//!              │ preferred sender│ ──────────────> (no fallback)
//!              └────────┬────────┘
//!                       │ transport error / timeout / not available
//!                       v
//!              ┌─────────────────┐   Ok(status)    success iff == 200
//!              │  legacy sender  │ ──────────────>
//!              └────────┬────────┘
//!                       │ transport error / timeout
//!                       v
//!                     false
//! ```
//!
//! A send is a single attempt; retrying is up to the agent. Both paths run under the
//! configured request timeout, and every path resolves to a `bool`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::logs::constants::CONTENT_TYPE;
use crate::logs::event::BatchPayload;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Performs one HTTP POST and reports the response status.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<u16, TransportError>;
}

/// [`RequestSender`] over a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestSender { client }
    }

    /// Default client; negotiates HTTP/2 where the collector offers it.
    #[must_use]
    pub fn preferred(config: &Config) -> Self {
        ReqwestSender::new(get_client(config, false))
    }

    /// HTTP/1.1-only client used when the preferred path is unavailable.
    #[must_use]
    pub fn legacy(config: &Config) -> Self {
        ReqwestSender::new(get_client(config, true))
    }
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }
}

#[must_use]
pub fn get_client(config: &Config, http1_only: bool) -> reqwest::Client {
    match build_client(config, http1_only) {
        Ok(client) => client,
        Err(e) => {
            error!("FLUSHER | Unable to build HTTP client: {e}, using reqwest defaults");
            reqwest::Client::new()
        }
    }
}

fn build_client(config: &Config, http1_only: bool) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)));
    if http1_only {
        builder = builder.http1_only();
    }
    builder.build()
}

pub struct Flusher {
    preferred: Option<Arc<dyn RequestSender>>,
    legacy: Arc<dyn RequestSender>,
    request_timeout: Duration,
}

impl Flusher {
    #[must_use]
    pub fn new(
        preferred: Option<Arc<dyn RequestSender>>,
        legacy: Arc<dyn RequestSender>,
        request_timeout: Duration,
    ) -> Self {
        Flusher {
            preferred,
            legacy,
            request_timeout,
        }
    }

    /// Flusher over the two `reqwest` senders built from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Flusher::new(
            Some(Arc::new(ReqwestSender::preferred(config))),
            Arc::new(ReqwestSender::legacy(config)),
            config.request_timeout,
        )
    }

    /// Sends `payload` to `url`. Returns `true` on success.
    pub async fn send(&self, url: &str, payload: &BatchPayload) -> bool {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                error!("FLUSHER | Failed to serialize batch of {} logs: {e}", payload.logs.len());
                return false;
            }
        };

        if let Some(preferred) = &self.preferred {
            match tokio::time::timeout(self.request_timeout, preferred.post(url, body.clone())).await
            {
                Ok(Ok(status)) => {
                    let delivered = (200..300).contains(&status);
                    if delivered {
                        debug!("FLUSHER | Delivered {} logs ({status})", payload.logs.len());
                    } else {
                        warn!("FLUSHER | Collector rejected {} logs ({status})", payload.logs.len());
                    }
                    return delivered;
                }
                Ok(Err(e)) => {
                    debug!("FLUSHER | Preferred transport failed: {e}, falling back to legacy");
                }
                Err(_) => {
                    debug!(
                        "FLUSHER | Preferred transport timed out after {} ms, falling back to legacy",
                        self.request_timeout.as_millis()
                    );
                }
            }
        }

        match tokio::time::timeout(self.request_timeout, self.legacy.post(url, body)).await {
            Ok(Ok(200)) => {
                debug!("FLUSHER | Delivered {} logs over legacy transport", payload.logs.len());
                true
            }
            Ok(Ok(status)) => {
                warn!("FLUSHER | Collector rejected {} logs ({status})", payload.logs.len());
                false
            }
            Ok(Err(e)) => {
                warn!("FLUSHER | Failed to send {} logs: {e}", payload.logs.len());
                false
            }
            Err(_) => {
                warn!(
                    "FLUSHER | Sending {} logs timed out after {} ms",
                    payload.logs.len(),
                    self.request_timeout.as_millis()
                );
                false
            }
        }
    }
}
