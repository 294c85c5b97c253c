// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concrete queue commands for the chat flow.

use std::sync::Arc;

use async_trait::async_trait;
use comanda_ai::{ChatClient, ChatTurn};
use comanda_bus::{ChatEvent, EventBus};
use comanda_core::{ComandaError, LocalMessage, MessageKind, MessageRole};
use comanda_queue::Command;
use comanda_resilience::CircuitBreaker;
use comanda_state::{ConversationEvent, ConversationStateMachine};
use comanda_storage::database::Database;
use comanda_storage::queries::messages;
use futures::StreamExt;
use tracing::debug;
use uuid::Uuid;

/// Durably writes one user message to the local store.
///
/// This is the local-write half of sending: once it succeeds the message
/// cannot be lost, no matter what the network does afterwards.
pub struct SendMessageCommand {
    id: String,
    db: Database,
    message: LocalMessage,
    bus: EventBus,
}

impl SendMessageCommand {
    pub fn new(db: Database, message: LocalMessage, bus: EventBus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            db,
            message,
            bus,
        }
    }
}

#[async_trait]
impl Command for SendMessageCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "send_message"
    }

    async fn execute(&self) -> Result<(), ComandaError> {
        // A retry after a partial failure must not insert twice.
        if messages::get_message(&self.db, &self.message.id)
            .await?
            .is_some()
        {
            debug!(message_id = self.message.id, "message already stored, skipping");
            return Ok(());
        }

        let seq = messages::insert_with_next_sequence(&self.db, &self.message).await?;
        debug!(
            message_id = self.message.id,
            sequence = seq,
            "user message stored locally"
        );
        self.bus.publish(&ChatEvent::MessageSent {
            order_id: self.message.order_id.clone(),
            message_id: self.message.id.clone(),
        });
        Ok(())
    }
}

/// Calls the AI endpoint with the order's conversation and streams the
/// reply into a lazily created assistant message.
///
/// The assistant row is only inserted once the first chunk arrives, so a
/// failed call leaves no empty message behind. Appended chunks make partial
/// responses visible to readers of the local store.
pub struct CallAiCommand {
    id: String,
    order_id: String,
    db: Database,
    client: ChatClient,
    breaker: Arc<CircuitBreaker>,
    fsm: ConversationStateMachine,
    bus: EventBus,
}

impl CallAiCommand {
    pub fn new(
        order_id: String,
        db: Database,
        client: ChatClient,
        breaker: Arc<CircuitBreaker>,
        fsm: ConversationStateMachine,
        bus: EventBus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id,
            db,
            client,
            breaker,
            fsm,
            bus,
        }
    }

    fn set_typing(&self, active: bool) {
        self.bus.publish(&ChatEvent::AiTyping {
            order_id: self.order_id.clone(),
            active,
        });
    }
}

#[async_trait]
impl Command for CallAiCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "call_ai"
    }

    // AI calls are expensive; cap attempts regardless of queue defaults.
    fn max_retries(&self) -> Option<u32> {
        Some(3)
    }

    async fn execute(&self) -> Result<(), ComandaError> {
        // Always read fresh state: messages queued after this command was
        // scheduled are included in the conversation.
        let conversation = messages::messages_for_order(&self.db, &self.order_id).await?;
        let turns: Vec<ChatTurn> = conversation
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| ChatTurn {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        self.fsm.transition(ConversationEvent::AiCallStarted);
        self.set_typing(true);

        // Only the request itself counts toward the breaker; a stream that
        // dies mid-flight is not evidence the endpoint is down.
        let stream = self
            .breaker
            .execute(|| self.client.stream_chat(&self.order_id, turns))
            .await;
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                self.set_typing(false);
                return Err(e);
            }
        };

        let mut assistant_id: Option<String> = None;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.set_typing(false);
                    return Err(e);
                }
            };
            match &assistant_id {
                None => {
                    let message = LocalMessage {
                        id: Uuid::new_v4().to_string(),
                        order_id: self.order_id.clone(),
                        role: MessageRole::Assistant,
                        kind: MessageKind::Text,
                        content: chunk,
                        audio_data: None,
                        audio_file_id: None,
                        sequence_number: 0,
                        sync_status: comanda_core::SyncStatus::Pending,
                        created_at: chrono::Utc::now().to_rfc3339(),
                    };
                    messages::insert_with_next_sequence(&self.db, &message).await?;
                    assistant_id = Some(message.id);
                    self.fsm.transition(ConversationEvent::AiResponseStreaming);
                }
                Some(id) => {
                    messages::append_content(&self.db, id, &chunk).await?;
                }
            }
        }

        self.fsm.transition(ConversationEvent::AiResponseComplete);
        self.set_typing(false);
        if let Some(message_id) = assistant_id {
            debug!(order_id = self.order_id, message_id, "assistant response stored");
            self.bus.publish(&ChatEvent::MessageReceived {
                order_id: self.order_id.clone(),
                message_id,
                role: MessageRole::Assistant,
            });
        }
        Ok(())
    }
}
