// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote store trait covering the hosted backend surface the sync engine calls.

use async_trait::async_trait;

use crate::error::ComandaError;
use crate::types::{LocalOrder, OrderStatus, RemoteMessage};

/// Row-level CRUD and storage operations exposed by the hosted backend.
///
/// Membership-scoped authorization is the collaborator's responsibility;
/// the sync engine only supplies client-generated ids. Idempotency of the
/// batch extraction trigger is likewise owned by the remote side.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns true if an order row with this id already exists remotely.
    async fn order_exists(&self, order_id: &str) -> Result<bool, ComandaError>;

    /// Creates the remote order row with the client-generated id.
    async fn insert_order(&self, order: &LocalOrder) -> Result<(), ComandaError>;

    /// Updates the mutable fields of an existing remote order.
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<(), ComandaError>;

    /// Uploads raw audio bytes to object storage keyed by `order_id/message_id`.
    ///
    /// Returns the storage path of the uploaded object.
    async fn upload_audio(
        &self,
        order_id: &str,
        message_id: &str,
        data: &[u8],
    ) -> Result<String, ComandaError>;

    /// Registers an audio-file metadata record for an uploaded object.
    ///
    /// Returns the id of the created record, referenced by the message row.
    async fn register_audio_file(
        &self,
        order_id: &str,
        storage_path: &str,
    ) -> Result<String, ComandaError>;

    /// Persists a conversation message with its locally assigned sequence number.
    async fn save_message(&self, message: &RemoteMessage) -> Result<(), ComandaError>;

    /// Triggers remote batch line-item extraction for an order.
    async fn trigger_batch_extraction(&self, order_id: &str) -> Result<(), ComandaError>;
}
