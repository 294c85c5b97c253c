// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Comanda workspace.
//!
//! Every locally owned record carries a [`SyncStatus`] tag. Records are
//! created with client-generated UUIDs and RFC 3339 timestamps stored as
//! TEXT, so identity survives the offline -> online transition unchanged.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ComandaError;

/// Reconciliation state of a locally owned record against the remote store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// Order lifecycle status.
///
/// The legal flow is `draft -> review -> sent | archived`, with `cancelled`
/// reachable from any non-terminal state and `archived -> draft` allowed as
/// a restore.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Review,
    Sent,
    Archived,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Draft, Review)
                | (Review, Sent)
                | (Review, Archived)
                | (Review, Draft)
                | (Archived, Draft)
                | (Draft, Cancelled)
                | (Review, Cancelled)
                | (Sent, Archived)
        )
    }
}

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Content form of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Audio,
}

/// Lifecycle status of a queued command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Pending,
    Executing,
    Success,
    Failed,
    Cancelled,
}

/// A purchase order owned by the local store until synchronized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOrder {
    pub id: String,
    pub organization_id: String,
    pub status: OrderStatus,
    pub sync_status: SyncStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A conversation message attached to an order.
///
/// `sequence_number` is assigned by the local store at insert time and is
/// strictly increasing within an order. It is never derived from wall-clock
/// time, which would overflow the remote integer column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMessage {
    pub id: String,
    pub order_id: String,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    /// Raw audio bytes captured offline; dropped once uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<Vec<u8>>,
    /// Remote audio-file record id, set once the blob is committed remotely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<String>,
    pub sequence_number: i64,
    pub sync_status: SyncStatus,
    pub created_at: String,
}

/// A line item extracted from the conversation by the remote batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOrderItem {
    pub id: String,
    pub order_id: String,
    pub product: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    pub sync_status: SyncStatus,
    pub created_at: String,
}

impl LocalOrderItem {
    /// Validates the quantity invariant. Items with non-positive quantities
    /// are rejected before they reach the local store.
    pub fn validate(&self) -> Result<(), ComandaError> {
        if self.quantity <= 0.0 {
            return Err(ComandaError::Internal(format!(
                "order item quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// A message as handed to the remote save operation.
///
/// Carries the locally assigned sequence number so conversation order
/// survives the offline -> online transition. The wire role is restricted
/// to user/assistant; system messages are mapped by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: String,
    pub order_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<String>,
    pub sequence_number: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_lifecycle_allows_documented_flow() {
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Review));
        assert!(OrderStatus::Review.can_transition_to(OrderStatus::Sent));
        assert!(OrderStatus::Review.can_transition_to(OrderStatus::Archived));
        assert!(OrderStatus::Archived.can_transition_to(OrderStatus::Draft));
        assert!(OrderStatus::Review.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn order_lifecycle_rejects_skips() {
        assert!(!OrderStatus::Draft.can_transition_to(OrderStatus::Sent));
        assert!(!OrderStatus::Sent.can_transition_to(OrderStatus::Draft));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Review));
    }

    #[test]
    fn order_item_quantity_must_be_positive() {
        let mut item = LocalOrderItem {
            id: "item-1".into(),
            order_id: "order-1".into(),
            product: "tomatoes".into(),
            quantity: 5.0,
            unit: "kg".into(),
            supplier_id: None,
            confidence_score: Some(0.92),
            original_text: Some("five kilos of tomatoes".into()),
            sync_status: SyncStatus::Pending,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        assert!(item.validate().is_ok());

        item.quantity = 0.0;
        assert!(item.validate().is_err());
        item.quantity = -1.0;
        assert!(item.validate().is_err());
    }

    #[test]
    fn statuses_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Pending).unwrap(),
            r#""pending""#
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Review).unwrap(),
            r#""review""#
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            r#""assistant""#
        );
    }
}
