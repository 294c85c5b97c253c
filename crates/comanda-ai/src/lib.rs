// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the Comanda AI endpoints.
//!
//! Speaks to the chat completion route (plain-text chunked streaming) and
//! the audio transcription route. Circuit breaking and retry live with the
//! callers; this crate only shapes requests and translates responses.

pub mod client;
pub mod types;

pub use client::{ChatClient, ChunkStream};
pub use types::{ChatRequest, ChatTurn, TranscriptionResponse};
