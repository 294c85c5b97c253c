// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit transition table over conversation states.
//!
//! Undefined (state, event) pairs are ignored with a warning rather than
//! panicking: the UI may emit stale events (a late "stopped typing" after a
//! message was queued) and those must not corrupt the flow.

use std::sync::{Arc, Mutex};

use strum::Display;
use tracing::{debug, warn};

/// Where the chat flow for one order currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConversationState {
    Idle,
    Typing,
    Recording,
    SendingMessage,
    AiProcessing,
    AiStreaming,
    Error,
}

/// Inputs that drive the conversation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConversationEvent {
    UserStartedTyping,
    UserStoppedTyping,
    UserStartedRecording,
    UserStoppedRecording,
    MessageQueued,
    AiCallStarted,
    AiResponseStreaming,
    AiResponseComplete,
    ErrorOccurred,
    ErrorRecovered,
}

/// Token for removing a state listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle(u64);

type Listener = Box<dyn Fn(ConversationState) + Send + Sync>;

struct Inner {
    state: ConversationState,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Per-order conversation state machine.
///
/// Cloning is cheap; clones share state and listeners.
#[derive(Clone)]
pub struct ConversationStateMachine {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ConversationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStateMachine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ConversationState::Idle,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Applies `event`. Returns true if a transition happened; false (with a
    /// warning) when the event is undefined for the current state.
    pub fn transition(&self, event: ConversationEvent) -> bool {
        let (next, listener_ids): (ConversationState, Vec<u64>) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let Some(next) = next_state(inner.state, event) else {
                warn!(state = %inner.state, event = %event, "ignoring undefined transition");
                return false;
            };
            debug!(from = %inner.state, to = %next, event = %event, "conversation transition");
            inner.state = next;
            // Snapshot ids; callbacks run outside the lock so they may
            // re-enter the machine.
            (next, inner.listeners.iter().map(|(id, _)| *id).collect())
        };

        for id in listener_ids {
            self.notify_one(id, next);
        }
        true
    }

    fn notify_one(&self, id: u64, state: ConversationState) {
        // Temporarily move the listener out so it runs without the lock,
        // allowing it to re-enter the machine (e.g. trigger a follow-up
        // transition or unsubscribe).
        let taken = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner
                .listeners
                .iter()
                .position(|(lid, _)| *lid == id)
                .map(|pos| (pos, inner.listeners.remove(pos)))
        };
        let Some((pos, entry)) = taken else {
            return;
        };
        (entry.1)(state);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let at = pos.min(inner.listeners.len());
        inner.listeners.insert(at, entry);
    }

    pub fn state(&self) -> ConversationState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Registers a listener invoked after every successful transition.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(ConversationState) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        ListenerHandle(id)
    }

    pub fn unsubscribe(&self, handle: ListenerHandle) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.listeners.retain(|(id, _)| *id != handle.0);
    }
}

/// The transition table. Absent pairs are ignored by `transition`.
fn next_state(
    state: ConversationState,
    event: ConversationEvent,
) -> Option<ConversationState> {
    use ConversationEvent::*;
    use ConversationState::*;
    let next = match (state, event) {
        (Idle, UserStartedTyping) => Typing,
        (Idle, UserStartedRecording) => Recording,
        (Idle, MessageQueued) => SendingMessage,
        (Idle, AiCallStarted) => AiProcessing,

        (Typing, UserStoppedTyping) => Idle,
        // Switching input mode cancels typing.
        (Typing, UserStartedRecording) => Recording,
        (Typing, MessageQueued) => SendingMessage,

        (Recording, UserStoppedRecording) => Idle,
        // Switching input mode cancels recording.
        (Recording, UserStartedTyping) => Typing,
        (Recording, MessageQueued) => SendingMessage,

        (SendingMessage, AiCallStarted) => AiProcessing,
        (SendingMessage, ErrorOccurred) => Error,
        // A second message can queue behind the first (e.g. offline).
        (SendingMessage, MessageQueued) => SendingMessage,
        (SendingMessage, UserStartedTyping) => Typing,

        (AiProcessing, AiResponseStreaming) => AiStreaming,
        (AiProcessing, ErrorOccurred) => Error,

        (AiStreaming, AiResponseComplete) => Idle,
        // User input mid-stream cancels the stream.
        (AiStreaming, UserStartedTyping) => Typing,
        (AiStreaming, UserStartedRecording) => Recording,
        (AiStreaming, ErrorOccurred) => Error,

        (Error, ErrorRecovered) => Idle,
        // Any fresh user action recovers from the error state.
        (Error, UserStartedTyping) => Typing,
        (Error, UserStartedRecording) => Recording,

        _ => return None,
    };
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn happy_path_message_flow() {
        let fsm = ConversationStateMachine::new();
        assert_eq!(fsm.state(), ConversationState::Idle);

        assert!(fsm.transition(ConversationEvent::UserStartedTyping));
        assert!(fsm.transition(ConversationEvent::MessageQueued));
        assert!(fsm.transition(ConversationEvent::AiCallStarted));
        assert!(fsm.transition(ConversationEvent::AiResponseStreaming));
        assert!(fsm.transition(ConversationEvent::AiResponseComplete));
        assert_eq!(fsm.state(), ConversationState::Idle);
    }

    #[test]
    #[tracing_test::traced_test]
    fn undefined_transitions_are_rejected() {
        let fsm = ConversationStateMachine::new();

        assert!(!fsm.transition(ConversationEvent::AiResponseStreaming));
        assert_eq!(fsm.state(), ConversationState::Idle);

        fsm.transition(ConversationEvent::AiCallStarted);
        assert!(!fsm.transition(ConversationEvent::MessageQueued));
        assert_eq!(fsm.state(), ConversationState::AiProcessing);
        assert!(logs_contain("ignoring undefined transition"));
    }

    #[test]
    fn switching_input_mode_cancels_the_other() {
        let fsm = ConversationStateMachine::new();

        fsm.transition(ConversationEvent::UserStartedTyping);
        assert!(fsm.transition(ConversationEvent::UserStartedRecording));
        assert_eq!(fsm.state(), ConversationState::Recording);

        assert!(fsm.transition(ConversationEvent::UserStartedTyping));
        assert_eq!(fsm.state(), ConversationState::Typing);
    }

    #[test]
    fn user_input_cancels_streaming() {
        let fsm = ConversationStateMachine::new();
        fsm.transition(ConversationEvent::MessageQueued);
        fsm.transition(ConversationEvent::AiCallStarted);
        fsm.transition(ConversationEvent::AiResponseStreaming);

        assert!(fsm.transition(ConversationEvent::UserStartedTyping));
        assert_eq!(fsm.state(), ConversationState::Typing);
    }

    #[test]
    fn error_state_recovers_on_user_action() {
        let fsm = ConversationStateMachine::new();
        fsm.transition(ConversationEvent::MessageQueued);
        fsm.transition(ConversationEvent::ErrorOccurred);
        assert_eq!(fsm.state(), ConversationState::Error);

        assert!(fsm.transition(ConversationEvent::UserStartedTyping));
        assert_eq!(fsm.state(), ConversationState::Typing);

        fsm.transition(ConversationEvent::MessageQueued);
        fsm.transition(ConversationEvent::ErrorOccurred);
        assert!(fsm.transition(ConversationEvent::ErrorRecovered));
        assert_eq!(fsm.state(), ConversationState::Idle);
    }

    #[test]
    fn repeated_message_queued_stays_in_sending() {
        let fsm = ConversationStateMachine::new();
        fsm.transition(ConversationEvent::MessageQueued);
        assert!(fsm.transition(ConversationEvent::MessageQueued));
        assert_eq!(fsm.state(), ConversationState::SendingMessage);
    }

    #[test]
    fn listeners_observe_transitions_until_unsubscribed() {
        let fsm = ConversationStateMachine::new();
        let count = std::sync::Arc::new(AtomicUsize::new(0));

        let handle = {
            let count = std::sync::Arc::clone(&count);
            fsm.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        fsm.transition(ConversationEvent::UserStartedTyping);
        // Rejected events do not notify.
        fsm.transition(ConversationEvent::AiResponseComplete);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        fsm.unsubscribe(handle);
        fsm.transition(ConversationEvent::MessageQueued);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_reenter_the_machine() {
        let fsm = ConversationStateMachine::new();
        let fsm2 = fsm.clone();
        fsm.subscribe(move |state| {
            if state == ConversationState::SendingMessage {
                fsm2.transition(ConversationEvent::AiCallStarted);
            }
        });

        fsm.transition(ConversationEvent::MessageQueued);
        assert_eq!(fsm.state(), ConversationState::AiProcessing);
    }
}
