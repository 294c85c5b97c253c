// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event payloads published on the bus.

use comanda_core::{CommandStatus, MessageRole};
use strum::{Display, EnumDiscriminants, EnumString};

/// An in-process notification about chat, queue, or connectivity activity.
///
/// Payloads are owned so events can outlive the publisher's borrow.
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ChatEventKind))]
#[strum_discriminants(derive(Display, EnumString, Hash))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
pub enum ChatEvent {
    /// A user message was committed to the local store.
    MessageSent {
        order_id: String,
        message_id: String,
    },
    /// An assistant message finished streaming.
    MessageReceived {
        order_id: String,
        message_id: String,
        role: MessageRole,
    },
    /// The assistant started or stopped producing output.
    AiTyping { order_id: String, active: bool },
    /// Connectivity to the remote store changed.
    ConnectionChanged { online: bool },
    /// A queued command or background operation failed terminally.
    ErrorOccurred {
        order_id: Option<String>,
        message: String,
    },
    /// The command queue's depth or activity changed.
    QueueStatusChanged {
        pending: usize,
        status: CommandStatus,
    },
}

impl ChatEvent {
    /// Discriminant used for subscription routing.
    pub fn kind(&self) -> ChatEventKind {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let event = ChatEvent::ConnectionChanged { online: true };
        assert_eq!(event.kind(), ChatEventKind::ConnectionChanged);
        assert_eq!(event.kind().to_string(), "connection_changed");
    }
}
