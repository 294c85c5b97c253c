// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the chat and transcription routes.

use serde::{Deserialize, Serialize};

/// One conversation turn as sent to the chat route.
///
/// The route accepts only user/assistant roles; callers map or filter
/// anything else before building the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Body of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub order_id: String,
    pub messages: Vec<ChatTurn>,
}

/// Body returned by the transcription route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

/// Error body the chat route may attach to a 429.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitBody {
    pub message: Option<String>,
}
