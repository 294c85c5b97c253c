// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat and transcription routes.
//!
//! The chat route streams plain-text chunks (no SSE framing). A 429 is
//! deliberately degraded into a successful single-chunk stream carrying a
//! "try again shortly" message, so an overloaded backend reads as a slow
//! assistant rather than a failed command that would trip the breaker.

use std::pin::Pin;
use std::time::Duration;

use comanda_core::ComandaError;
use futures::{Stream, StreamExt, stream};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ChatRequest, ChatTurn, RateLimitBody, TranscriptionResponse};

/// Fallback text for a rate-limited chat call without a message body.
const RATE_LIMIT_FALLBACK: &str =
    "El sistema está experimentando mucha demanda. Por favor intenta nuevamente en un minuto.";

/// A stream of plain-text response chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ComandaError>> + Send>>;

/// Client for the Comanda AI endpoints.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    chat_endpoint: String,
    transcription_endpoint: String,
}

impl ChatClient {
    /// Creates a client for the given endpoints.
    ///
    /// `api_key`, when present, is sent as a bearer token on every request.
    pub fn new(
        chat_endpoint: String,
        transcription_endpoint: String,
        api_key: Option<&str>,
    ) -> Result<Self, ComandaError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ComandaError::Config(format!("invalid API key header value: {e}"))
            })?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ComandaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            chat_endpoint,
            transcription_endpoint,
        })
    }

    /// Overrides both endpoints (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.chat_endpoint = format!("{base}/api/chat");
        self.transcription_endpoint = format!("{base}/api/process-audio");
        self
    }

    /// Requests a streamed completion for one order's conversation.
    ///
    /// Returns a stream of text chunks. 429 yields a single degraded chunk;
    /// other non-2xx statuses are `Provider` errors.
    pub async fn stream_chat(
        &self,
        order_id: &str,
        turns: Vec<ChatTurn>,
    ) -> Result<ChunkStream, ComandaError> {
        let request = ChatRequest {
            order_id: order_id.to_string(),
            messages: turns,
        };

        let response = self
            .client
            .post(&self.chat_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ComandaError::Provider {
                message: format!("chat request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(order_id, status = %status, "chat response received");

        if status.as_u16() == 429 {
            let message = response
                .json::<RateLimitBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| RATE_LIMIT_FALLBACK.to_string());
            warn!(order_id, "chat route rate limited, degrading to static reply");
            return Ok(Box::pin(stream::iter(vec![Ok::<_, ComandaError>(message)])));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComandaError::Provider {
                message: format!("chat route returned {status}: {body}"),
                source: None,
            });
        }

        let chunks = response.bytes_stream().map(|item| match item {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => Err(ComandaError::Provider {
                message: format!("chat stream interrupted: {e}"),
                source: Some(Box::new(e)),
            }),
        });
        Ok(Box::pin(chunks))
    }

    /// Transcribes recorded audio for an order.
    ///
    /// This is a direct call; it does not go through the command queue.
    pub async fn transcribe(
        &self,
        order_id: &str,
        audio: Vec<u8>,
    ) -> Result<String, ComandaError> {
        let response = self
            .client
            .post(&self.transcription_endpoint)
            .query(&[("orderId", order_id)])
            .header("content-type", "audio/webm")
            .body(audio)
            .send()
            .await
            .map_err(|e| ComandaError::Provider {
                message: format!("transcription request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(order_id, status = %status, "transcription response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComandaError::Provider {
                message: format!("transcription route returned {status}: {body}"),
                source: None,
            });
        }

        let body: TranscriptionResponse =
            response.json().await.map_err(|e| ComandaError::Provider {
                message: format!("failed to parse transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.transcription)
    }
}
