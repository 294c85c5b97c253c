// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The synchronization pass.
//!
//! A pass pushes pending orders first, then pending messages, then triggers
//! batch extraction for the orders those messages touched. Failures are
//! per-record: a record that cannot be pushed stays pending and the pass
//! moves on, so one poisoned row never wedges the whole backlog.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use comanda_core::traits::RemoteStore;
use comanda_core::{ComandaError, MessageRole, OrderStatus, RemoteMessage};
use comanda_storage::database::Database;
use comanda_storage::queries::{messages, orders};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

/// What one pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub orders_synced: usize,
    pub messages_synced: usize,
    pub extractions_triggered: usize,
    /// Records that failed and remain pending.
    pub failures: usize,
}

type SharedPass = Shared<BoxFuture<'static, SyncReport>>;

/// Pushes pending local records to the remote store.
///
/// `sync` is single-flight: concurrent callers join the pass already in
/// progress instead of starting another one.
pub struct SyncEngine {
    db: Database,
    remote: Arc<dyn RemoteStore>,
    in_flight: Mutex<Option<SharedPass>>,
}

impl SyncEngine {
    pub fn new(db: Database, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            db,
            remote,
            in_flight: Mutex::new(None),
        }
    }

    /// Runs a synchronization pass, or joins the one already running.
    pub async fn sync(self: &Arc<Self>) -> SyncReport {
        let pass = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(pass) = slot.as_ref() {
                debug!("joining sync pass already in flight");
                pass.clone()
            } else {
                let this = Arc::clone(self);
                let pass: SharedPass = async move {
                    let report = this.run_pass().await;
                    *this.in_flight.lock().unwrap_or_else(|e| e.into_inner()) = None;
                    report
                }
                .boxed()
                .shared();
                *slot = Some(pass.clone());
                pass
            }
        };
        pass.await
    }

    async fn run_pass(&self) -> SyncReport {
        let mut report = SyncReport::default();

        self.push_orders(&mut report).await;
        let touched = self.push_messages(&mut report).await;
        self.trigger_extractions(touched, &mut report).await;

        info!(
            orders = report.orders_synced,
            messages = report.messages_synced,
            extractions = report.extractions_triggered,
            failures = report.failures,
            "sync pass finished"
        );
        report
    }

    async fn push_orders(&self, report: &mut SyncReport) {
        let pending = match orders::pending_orders(&self.db).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "failed to read pending orders");
                report.failures += 1;
                return;
            }
        };

        for order in pending {
            let result = self.push_one_order(&order).await;
            match result {
                Ok(()) => report.orders_synced += 1,
                Err(e) => {
                    warn!(order_id = order.id, error = %e, "failed to sync order, keeping pending");
                    report.failures += 1;
                }
            }
        }
    }

    async fn push_one_order(
        &self,
        order: &comanda_core::LocalOrder,
    ) -> Result<(), ComandaError> {
        if self.remote.order_exists(&order.id).await? {
            self.remote
                .update_order_status(&order.id, order.status)
                .await?;
        } else {
            self.remote.insert_order(order).await?;
        }
        orders::mark_synced(&self.db, &order.id).await
    }

    async fn push_messages(&self, report: &mut SyncReport) -> HashSet<String> {
        let mut touched = HashSet::new();
        let pending = match messages::pending_messages(&self.db).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "failed to read pending messages");
                report.failures += 1;
                return touched;
            }
        };

        for msg in pending {
            match self.push_one_message(&msg).await {
                Ok(()) => {
                    report.messages_synced += 1;
                    touched.insert(msg.order_id.clone());
                }
                Err(e) => {
                    warn!(message_id = msg.id, error = %e, "failed to sync message, keeping pending");
                    report.failures += 1;
                }
            }
        }
        touched
    }

    async fn push_one_message(
        &self,
        msg: &comanda_core::LocalMessage,
    ) -> Result<(), ComandaError> {
        // Offline-recorded audio is committed first: upload the object,
        // then register the metadata record the message row references.
        let mut audio_file_id = msg.audio_file_id.clone();
        if audio_file_id.is_none()
            && let Some(audio) = msg.audio_data.as_deref()
        {
            let storage_path = self
                .remote
                .upload_audio(&msg.order_id, &msg.id, audio)
                .await?;
            let file_id = self
                .remote
                .register_audio_file(&msg.order_id, &storage_path)
                .await?;
            audio_file_id = Some(file_id);
        }

        // The remote conversation table only knows user/assistant.
        let role = match msg.role {
            MessageRole::System => MessageRole::Assistant,
            other => other,
        };

        self.remote
            .save_message(&RemoteMessage {
                id: msg.id.clone(),
                order_id: msg.order_id.clone(),
                role,
                content: msg.content.clone(),
                audio_file_id: audio_file_id.clone(),
                sequence_number: msg.sequence_number,
            })
            .await?;

        messages::mark_synced(&self.db, &msg.id, audio_file_id.as_deref()).await
    }

    async fn trigger_extractions(&self, touched: HashSet<String>, report: &mut SyncReport) {
        for order_id in touched {
            let order = match orders::get_order(&self.db, &order_id).await {
                Ok(order) => order,
                Err(e) => {
                    warn!(order_id, error = %e, "failed to load order for extraction check");
                    report.failures += 1;
                    continue;
                }
            };
            // Only orders the user has moved to review are worth extracting.
            let Some(order) = order else { continue };
            if order.status != OrderStatus::Review {
                continue;
            }

            debug!(order_id, "triggering batch extraction");
            match self.remote.trigger_batch_extraction(&order_id).await {
                Ok(()) => report.extractions_triggered += 1,
                Err(e) => {
                    warn!(order_id, error = %e, "batch extraction trigger failed");
                    report.failures += 1;
                }
            }
        }
    }
}
