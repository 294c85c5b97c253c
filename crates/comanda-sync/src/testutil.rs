// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory remote store for engine and scheduler tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use comanda_core::traits::RemoteStore;
use comanda_core::{ComandaError, LocalOrder, OrderStatus, RemoteMessage};

#[derive(Default)]
struct State {
    existing_orders: HashSet<String>,
    inserted_orders: Vec<String>,
    status_updates: Vec<(String, OrderStatus)>,
    saved_messages: Vec<RemoteMessage>,
    uploads: Vec<(String, String)>,
    registered_files: Vec<(String, String)>,
    extractions: Vec<String>,
    fail_saves: HashSet<String>,
    call_delay: Option<Duration>,
}

/// Records every call; individual operations can be made to fail.
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<State>,
    order_exists_calls: AtomicUsize,
}

impl MockRemote {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn maybe_delay(&self) {
        let delay = self.lock().call_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn seed_existing_order(&self, id: &str) {
        self.lock().existing_orders.insert(id.to_string());
    }

    pub fn fail_save_for(&self, message_id: &str) {
        self.lock().fail_saves.insert(message_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().fail_saves.clear();
    }

    pub fn set_call_delay(&self, delay: Duration) {
        self.lock().call_delay = Some(delay);
    }

    pub fn inserted_orders(&self) -> Vec<String> {
        self.lock().inserted_orders.clone()
    }

    pub fn status_updates(&self) -> Vec<(String, OrderStatus)> {
        self.lock().status_updates.clone()
    }

    pub fn saved_messages(&self) -> Vec<RemoteMessage> {
        self.lock().saved_messages.clone()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.lock().uploads.clone()
    }

    pub fn extractions(&self) -> Vec<String> {
        self.lock().extractions.clone()
    }

    pub fn order_exists_calls(&self) -> usize {
        self.order_exists_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn order_exists(&self, order_id: &str) -> Result<bool, ComandaError> {
        self.maybe_delay().await;
        self.order_exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().existing_orders.contains(order_id))
    }

    async fn insert_order(&self, order: &LocalOrder) -> Result<(), ComandaError> {
        self.maybe_delay().await;
        let mut state = self.lock();
        state.existing_orders.insert(order.id.clone());
        state.inserted_orders.push(order.id.clone());
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<(), ComandaError> {
        self.maybe_delay().await;
        self.lock()
            .status_updates
            .push((order_id.to_string(), status));
        Ok(())
    }

    async fn upload_audio(
        &self,
        order_id: &str,
        message_id: &str,
        _data: &[u8],
    ) -> Result<String, ComandaError> {
        self.maybe_delay().await;
        self.lock()
            .uploads
            .push((order_id.to_string(), message_id.to_string()));
        Ok(format!("{order_id}/{message_id}.webm"))
    }

    async fn register_audio_file(
        &self,
        order_id: &str,
        storage_path: &str,
    ) -> Result<String, ComandaError> {
        self.maybe_delay().await;
        let mut state = self.lock();
        state
            .registered_files
            .push((order_id.to_string(), storage_path.to_string()));
        Ok(format!("af-{}", state.registered_files.len()))
    }

    async fn save_message(&self, message: &RemoteMessage) -> Result<(), ComandaError> {
        self.maybe_delay().await;
        let mut state = self.lock();
        if state.fail_saves.contains(&message.id) {
            return Err(ComandaError::Remote {
                message: format!("save rejected for {}", message.id),
                source: None,
            });
        }
        state.saved_messages.push(message.clone());
        Ok(())
    }

    async fn trigger_batch_extraction(&self, order_id: &str) -> Result<(), ComandaError> {
        self.maybe_delay().await;
        self.lock().extractions.push(order_id.to_string());
        Ok(())
    }
}
