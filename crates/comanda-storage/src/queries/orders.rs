// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order CRUD operations.
//!
//! Content mutations always reset `sync_status` to pending so the sync
//! engine eventually reconciles them, regardless of who wrote.

use comanda_core::{ComandaError, OrderStatus, SyncStatus};
use rusqlite::params;

use crate::database::Database;
use crate::models::LocalOrder;
use crate::queries::parse_enum;

fn row_to_order(row: &rusqlite::Row<'_>) -> Result<LocalOrder, rusqlite::Error> {
    Ok(LocalOrder {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        status: parse_enum(2, row.get::<_, String>(2)?)?,
        sync_status: parse_enum(3, row.get::<_, String>(3)?)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const ORDER_COLUMNS: &str = "id, organization_id, status, sync_status, created_at, updated_at";

/// Insert a new order.
pub async fn insert_order(db: &Database, order: &LocalOrder) -> Result<(), ComandaError> {
    let order = order.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO orders (id, organization_id, status, sync_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    order.id,
                    order.organization_id,
                    order.status.to_string(),
                    order.sync_status.to_string(),
                    order.created_at,
                    order.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an order by id.
pub async fn get_order(db: &Database, id: &str) -> Result<Option<LocalOrder>, ComandaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_order);
            match result {
                Ok(order) => Ok(Some(order)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all orders in creation order.
pub async fn list_orders(db: &Database) -> Result<Vec<LocalOrder>, ComandaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_order)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List orders awaiting reconciliation, oldest first.
pub async fn pending_orders(db: &Database) -> Result<Vec<LocalOrder>, ComandaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE sync_status = 'pending' ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_order)?;
            let mut orders = Vec::new();
            for row in rows {
                orders.push(row?);
            }
            Ok(orders)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update an order's lifecycle status.
///
/// Resets `sync_status` to pending and bumps `updated_at`.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: OrderStatus,
) -> Result<(), ComandaError> {
    let id = id.to_string();
    let now = chrono::Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE orders SET status = ?2, sync_status = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, status.to_string(), SyncStatus::Pending.to_string(), now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an order as reconciled with the remote store.
pub async fn mark_synced(db: &Database, id: &str) -> Result<(), ComandaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE orders SET sync_status = 'synced' WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
