// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-order chat session wiring.

use std::sync::Arc;
use std::time::Duration;

use comanda_ai::ChatClient;
use comanda_bus::{ChatEvent, EventBus};
use comanda_core::{
    CommandStatus, ComandaError, LocalMessage, MessageKind, MessageRole, SyncStatus,
};
use comanda_queue::{CommandQueue, QueueSettings, QueueStatus};
use comanda_resilience::CircuitBreaker;
use comanda_state::{ConversationEvent, ConversationState, ConversationStateMachine};
use comanda_storage::database::Database;
use comanda_storage::queries::messages;
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use crate::commands::{CallAiCommand, SendMessageCommand};
use crate::dispatcher::AiDispatcher;

/// One order's chat session.
///
/// Owns the conversation state machine, the command queue, and the
/// debounced dispatcher for that order. Sessions are independent; two open
/// orders never share queue or state.
pub struct ChatSession {
    order_id: String,
    db: Database,
    client: ChatClient,
    queue: Arc<CommandQueue>,
    dispatcher: AiDispatcher,
    fsm: ConversationStateMachine,
    bus: EventBus,
}

impl ChatSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: impl Into<String>,
        db: Database,
        client: ChatClient,
        breaker: Arc<CircuitBreaker>,
        bus: EventBus,
        queue_settings: QueueSettings,
        debounce: Duration,
        online: watch::Receiver<bool>,
    ) -> Self {
        let order_id = order_id.into();
        let fsm = ConversationStateMachine::new();
        let queue = Arc::new(CommandQueue::new(queue_settings));

        // Weak references keep the callbacks from creating a queue cycle.
        {
            let bus = bus.clone();
            let weak_queue = Arc::downgrade(&queue);
            queue.set_on_executed(move |_| {
                if let Some(queue) = weak_queue.upgrade() {
                    bus.publish(&ChatEvent::QueueStatusChanged {
                        pending: queue.status().pending,
                        status: CommandStatus::Success,
                    });
                }
            });
        }
        {
            let bus = bus.clone();
            let fsm = fsm.clone();
            let order_id = order_id.clone();
            let weak_queue = Arc::downgrade(&queue);
            queue.set_on_failed(move |cmd, err| {
                warn!(order_id, kind = cmd.kind(), error = %err, "command failed terminally");
                fsm.transition(ConversationEvent::ErrorOccurred);
                bus.publish(&ChatEvent::ErrorOccurred {
                    order_id: Some(order_id.clone()),
                    message: format!("{}: {err}", cmd.kind()),
                });
                if let Some(queue) = weak_queue.upgrade() {
                    bus.publish(&ChatEvent::QueueStatusChanged {
                        pending: queue.status().pending,
                        status: CommandStatus::Failed,
                    });
                }
            });
        }

        let factory = {
            let order_id = order_id.clone();
            let db = db.clone();
            let client = client.clone();
            let fsm = fsm.clone();
            let bus = bus.clone();
            Arc::new(move || {
                Box::new(CallAiCommand::new(
                    order_id.clone(),
                    db.clone(),
                    client.clone(),
                    Arc::clone(&breaker),
                    fsm.clone(),
                    bus.clone(),
                )) as Box<dyn comanda_queue::Command>
            })
        };
        let dispatcher = AiDispatcher::new(Arc::clone(&queue), factory, debounce, online);

        Self {
            order_id,
            db,
            client,
            queue,
            dispatcher,
            fsm,
            bus,
        }
    }

    /// Queues a text message for durable local storage and schedules the
    /// debounced AI call. Returns the message id.
    pub async fn send_message(&self, content: &str) -> String {
        let message = self.build_message(MessageKind::Text, content, None);
        let id = message.id.clone();

        self.fsm.transition(ConversationEvent::MessageQueued);
        self.queue
            .enqueue(Box::new(SendMessageCommand::new(
                self.db.clone(),
                message,
                self.bus.clone(),
            )))
            .await;
        self.dispatcher.schedule();
        id
    }

    /// Queues a recorded audio message.
    ///
    /// Transcription is attempted immediately as a direct call; if it fails
    /// (typically: offline) the message is stored with the raw audio only
    /// and no AI call is scheduled, leaving the blob for the sync engine.
    pub async fn send_audio_message(&self, audio: Vec<u8>) -> String {
        let transcript = match self.client.transcribe(&self.order_id, audio.clone()).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(order_id = self.order_id, error = %e, "transcription unavailable, storing raw audio");
                None
            }
        };

        let message = self.build_message(
            MessageKind::Audio,
            transcript.as_deref().unwrap_or_default(),
            Some(audio),
        );
        let id = message.id.clone();

        self.fsm.transition(ConversationEvent::MessageQueued);
        self.queue
            .enqueue(Box::new(SendMessageCommand::new(
                self.db.clone(),
                message,
                self.bus.clone(),
            )))
            .await;
        if transcript.is_some() {
            self.dispatcher.schedule();
        }
        id
    }

    /// The user started typing; a pending AI dispatch is cancelled so the
    /// coming message is included in the call.
    pub fn start_typing(&self) {
        self.dispatcher.cancel();
        self.fsm.transition(ConversationEvent::UserStartedTyping);
    }

    pub fn stop_typing(&self) {
        self.fsm.transition(ConversationEvent::UserStoppedTyping);
    }

    /// The user started recording; cancels a pending dispatch like typing.
    pub fn start_recording(&self) {
        self.dispatcher.cancel();
        self.fsm.transition(ConversationEvent::UserStartedRecording);
    }

    pub fn stop_recording(&self) {
        self.fsm.transition(ConversationEvent::UserStoppedRecording);
    }

    /// The conversation so far, in sequence order.
    pub async fn conversation(&self) -> Result<Vec<LocalMessage>, ComandaError> {
        messages::messages_for_order(&self.db, &self.order_id).await
    }

    pub fn state(&self) -> ConversationState {
        self.fsm.state()
    }

    pub fn state_machine(&self) -> &ConversationStateMachine {
        &self.fsm
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Drops pending commands and cancels any pending AI dispatch. Messages
    /// already written to the local store are unaffected.
    pub fn shutdown(&self) {
        self.dispatcher.cancel();
        self.queue.clear();
    }

    fn build_message(
        &self,
        kind: MessageKind,
        content: &str,
        audio_data: Option<Vec<u8>>,
    ) -> LocalMessage {
        LocalMessage {
            id: Uuid::new_v4().to_string(),
            order_id: self.order_id.clone(),
            role: MessageRole::User,
            kind,
            content: content.to_string(),
            audio_data,
            audio_file_id: None,
            sequence_number: 0,
            sync_status: SyncStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comanda_bus::ChatEventKind;
    use comanda_core::OrderStatus;
    use comanda_resilience::BreakerSettings;
    use comanda_storage::queries::orders;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEBOUNCE: Duration = Duration::from_millis(50);

    struct Harness {
        session: ChatSession,
        db: Database,
        events: Arc<Mutex<Vec<ChatEvent>>>,
        online_tx: watch::Sender<bool>,
        _dir: tempfile::TempDir,
    }

    async fn harness(server: &MockServer, online: bool) -> Harness {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("session.db").to_str().unwrap())
            .await
            .unwrap();
        orders::insert_order(
            &db,
            &comanda_core::LocalOrder {
                id: "order-1".to_string(),
                organization_id: "org-1".to_string(),
                status: OrderStatus::Draft,
                sync_status: SyncStatus::Pending,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();

        let bus = EventBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            ChatEventKind::MessageSent,
            ChatEventKind::MessageReceived,
            ChatEventKind::AiTyping,
            ChatEventKind::ErrorOccurred,
        ] {
            let events = Arc::clone(&events);
            bus.subscribe(kind, move |e| {
                events.lock().unwrap().push(e.clone());
            });
        }

        let client = ChatClient::new(
            format!("{}/api/chat", server.uri()),
            format!("{}/api/process-audio", server.uri()),
            None,
        )
        .unwrap();
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::default()));
        let online_tx = watch::Sender::new(online);

        let session = ChatSession::new(
            "order-1",
            db.clone(),
            client,
            breaker,
            bus,
            QueueSettings {
                max_retries: 3,
                retry_delay: Duration::from_millis(10),
                exponential_backoff: true,
            },
            DEBOUNCE,
            online_tx.subscribe(),
        );

        Harness {
            session,
            db,
            events,
            online_tx,
            _dir: dir,
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    async fn wait_for_conversation_len(session: &ChatSession, n: usize) {
        for _ in 0..200 {
            if session.conversation().await.unwrap().len() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("conversation did not reach {n} messages within 2s");
    }

    #[tokio::test]
    async fn message_flows_through_to_streamed_assistant_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Noted: five kilos of flour."))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        let user_id = h.session.send_message("five kilos of flour please").await;
        assert_eq!(h.session.state(), ConversationState::SendingMessage);

        wait_for_conversation_len(&h.session, 2).await;
        wait_until(|| h.session.state() == ConversationState::Idle).await;

        let conversation = h.session.conversation().await.unwrap();
        assert_eq!(conversation[0].id, user_id);
        assert_eq!(conversation[0].sequence_number, 1);
        assert_eq!(conversation[1].role, MessageRole::Assistant);
        assert_eq!(conversation[1].content, "Noted: five kilos of flour.");
        assert_eq!(conversation[1].sequence_number, 2);

        let events = h.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            ChatEvent::MessageSent { message_id, .. } if *message_id == user_id
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ChatEvent::AiTyping { active: true, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ChatEvent::MessageReceived { role: MessageRole::Assistant, .. }
        )));
    }

    #[tokio::test]
    async fn burst_of_messages_yields_one_ai_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("All noted."))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        h.session.send_message("tomatoes").await;
        h.session.send_message("and onions").await;
        h.session.send_message("and garlic").await;

        wait_for_conversation_len(&h.session, 4).await;
        // Mock's expect(1) verifies the coalescing on drop.
    }

    #[tokio::test]
    async fn typing_cancels_the_pending_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("never sent"))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        h.session.send_message("first thought").await;
        h.session.start_typing();
        assert_eq!(h.session.state(), ConversationState::Typing);

        tokio::time::sleep(DEBOUNCE * 4).await;
        // expect(0) verifies no call was made.
    }

    #[tokio::test]
    async fn offline_message_is_stored_but_not_dispatched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("never sent"))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server, false).await;
        let id = h.session.send_message("offline order").await;
        tokio::time::sleep(DEBOUNCE * 4).await;

        let msg = messages::get_message(&h.db, &id).await.unwrap().unwrap();
        assert_eq!(msg.sync_status, SyncStatus::Pending);
        assert_eq!(h.session.conversation().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_ai_call_surfaces_an_error_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        h.session.send_message("doomed request").await;

        let events = Arc::clone(&h.events);
        wait_until(move || {
            events
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, ChatEvent::ErrorOccurred { .. }))
        })
        .await;
        assert_eq!(h.session.state(), ConversationState::Error);

        // No assistant message was materialized for the failed call.
        assert_eq!(h.session.conversation().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn audio_message_stores_transcript_and_blob() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-audio"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"transcription": "three lemons"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Three lemons, got it."))
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        let id = h.session.send_audio_message(vec![1, 2, 3]).await;

        let msg = messages::get_message(&h.db, &id).await.unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::Audio);
        assert_eq!(msg.content, "three lemons");
        assert_eq!(msg.audio_data.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[tokio::test]
    async fn failed_transcription_keeps_audio_and_skips_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-audio"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("never sent"))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        let id = h.session.send_audio_message(vec![7, 7]).await;
        tokio::time::sleep(DEBOUNCE * 4).await;

        let msg = messages::get_message(&h.db, &id).await.unwrap().unwrap();
        assert_eq!(msg.content, "");
        assert_eq!(msg.audio_data.as_deref(), Some(&[7u8, 7][..]));
    }

    #[tokio::test]
    async fn shutdown_cancels_dispatch_and_clears_queue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("never sent"))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server, true).await;
        h.session.send_message("about to close").await;
        h.session.shutdown();

        tokio::time::sleep(DEBOUNCE * 4).await;
        assert_eq!(h.session.queue_status().pending, 0);
        // The message itself was already durably stored.
        assert_eq!(h.session.conversation().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reconnect_allows_dispatch_again() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Back online."))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server, false).await;
        h.session.send_message("while offline").await;
        tokio::time::sleep(DEBOUNCE * 2).await;

        h.online_tx.send(true).unwrap();
        h.session.send_message("and now online").await;

        wait_for_conversation_len(&h.session, 3).await;
    }
}
