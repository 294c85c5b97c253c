// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order line-item persistence.

use comanda_core::ComandaError;
use rusqlite::params;

use crate::database::Database;
use crate::models::LocalOrderItem;
use crate::queries::parse_enum;

const ITEM_COLUMNS: &str = "id, order_id, product, quantity, unit, supplier_id, \
                            confidence_score, original_text, sync_status, created_at";

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<LocalOrderItem, rusqlite::Error> {
    Ok(LocalOrderItem {
        id: row.get(0)?,
        order_id: row.get(1)?,
        product: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        supplier_id: row.get(5)?,
        confidence_score: row.get(6)?,
        original_text: row.get(7)?,
        sync_status: parse_enum(8, row.get::<_, String>(8)?)?,
        created_at: row.get(9)?,
    })
}

/// Insert a line item after validating its quantity invariant.
pub async fn insert_item(db: &Database, item: &LocalOrderItem) -> Result<(), ComandaError> {
    item.validate()?;
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO order_items (id, order_id, product, quantity, unit, supplier_id,
                                          confidence_score, original_text, sync_status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    item.id,
                    item.order_id,
                    item.product,
                    item.quantity,
                    item.unit,
                    item.supplier_id,
                    item.confidence_score,
                    item.original_text,
                    item.sync_status.to_string(),
                    item.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All line items for an order, in creation order.
pub async fn items_for_order(
    db: &Database,
    order_id: &str,
) -> Result<Vec<LocalOrderItem>, ComandaError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM order_items
                 WHERE order_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![order_id], row_to_item)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Line items awaiting reconciliation, oldest first.
pub async fn pending_items(db: &Database) -> Result<Vec<LocalOrderItem>, ComandaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM order_items
                 WHERE sync_status = 'pending' ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_item)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a line item as reconciled with the remote store.
pub async fn mark_synced(db: &Database, id: &str) -> Result<(), ComandaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE order_items SET sync_status = 'synced' WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comanda_core::{OrderStatus, SyncStatus};
    use tempfile::tempdir;

    use crate::models::LocalOrder;
    use crate::queries::orders;

    async fn setup_db_with_order() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        orders::insert_order(
            &db,
            &LocalOrder {
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
        (db, dir)
    }

    fn make_item(id: &str, quantity: f64) -> LocalOrderItem {
        LocalOrderItem {
            id: id.to_string(),
            order_id: "order-1".to_string(),
            product: "tomatoes".to_string(),
            quantity,
            unit: "kg".to_string(),
            supplier_id: None,
            confidence_score: Some(0.9),
            original_text: Some("tomatoes".to_string()),
            sync_status: SyncStatus::Pending,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_list_items() {
        let (db, _dir) = setup_db_with_order().await;

        insert_item(&db, &make_item("i1", 2.5)).await.unwrap();
        let items = items_for_order(&db, "order-1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2.5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_rejects_non_positive_quantity() {
        let (db, _dir) = setup_db_with_order().await;

        let err = insert_item(&db, &make_item("i1", 0.0)).await;
        assert!(err.is_err());
        assert!(items_for_order(&db, "order-1").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_synced_removes_from_pending() {
        let (db, _dir) = setup_db_with_order().await;

        insert_item(&db, &make_item("i1", 1.0)).await.unwrap();
        insert_item(&db, &make_item("i2", 2.0)).await.unwrap();
        mark_synced(&db, "i1").await.unwrap();

        let pending = pending_items(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "i2");
        db.close().await.unwrap();
    }
}
