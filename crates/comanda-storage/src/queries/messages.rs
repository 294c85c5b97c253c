// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation message persistence.
//!
//! Sequence numbers are assigned here, inside the single writer, as
//! `MAX(sequence_number) + 1` per order within a transaction. Callers must
//! not supply their own sequence numbers.

use comanda_core::ComandaError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::LocalMessage;
use crate::queries::parse_enum;

const MESSAGE_COLUMNS: &str = "id, order_id, role, kind, content, audio_data, audio_file_id, \
                               sequence_number, sync_status, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<LocalMessage, rusqlite::Error> {
    Ok(LocalMessage {
        id: row.get(0)?,
        order_id: row.get(1)?,
        role: parse_enum(2, row.get::<_, String>(2)?)?,
        kind: parse_enum(3, row.get::<_, String>(3)?)?,
        content: row.get(4)?,
        audio_data: row.get(5)?,
        audio_file_id: row.get(6)?,
        sequence_number: row.get(7)?,
        sync_status: parse_enum(8, row.get::<_, String>(8)?)?,
        created_at: row.get(9)?,
    })
}

/// Insert a message, assigning the next sequence number for its order.
///
/// The caller's `sequence_number` field is ignored. Returns the assigned
/// number. The SELECT and INSERT run in one transaction on the single
/// writer thread, so concurrent inserts can never collide or leave gaps.
pub async fn insert_with_next_sequence(
    db: &Database,
    msg: &LocalMessage,
) -> Result<i64, ComandaError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM messages WHERE order_id = ?1",
                params![msg.order_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO messages (id, order_id, role, kind, content, audio_data,
                                       audio_file_id, sequence_number, sync_status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    msg.id,
                    msg.order_id,
                    msg.role.to_string(),
                    msg.kind.to_string(),
                    msg.content,
                    msg.audio_data,
                    msg.audio_file_id,
                    seq,
                    msg.sync_status.to_string(),
                    msg.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(seq)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<LocalMessage>, ComandaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let msg = stmt.query_row(params![id], row_to_message).optional()?;
            Ok(msg)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages for an order, in conversation order.
pub async fn messages_for_order(
    db: &Database,
    order_id: &str,
) -> Result<Vec<LocalMessage>, ComandaError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE order_id = ?1 ORDER BY sequence_number ASC"
            ))?;
            let rows = stmt.query_map(params![order_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages awaiting reconciliation, grouped by order then sequence so the
/// sync engine replays each conversation in order.
pub async fn pending_messages(db: &Database) -> Result<Vec<LocalMessage>, ComandaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE sync_status = 'pending'
                 ORDER BY order_id ASC, sequence_number ASC"
            ))?;
            let rows = stmt.query_map([], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a streamed chunk to a message's content.
///
/// Resets `sync_status` to pending so the grown content is re-pushed.
pub async fn append_content(db: &Database, id: &str, chunk: &str) -> Result<(), ComandaError> {
    let id = id.to_string();
    let chunk = chunk.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET content = content || ?2, sync_status = 'pending'
                 WHERE id = ?1",
                params![id, chunk],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a message as reconciled with the remote store.
///
/// When the upload produced a remote audio-file record, its id is stored
/// and the local audio blob is dropped; the remote copy is now canonical.
pub async fn mark_synced(
    db: &Database,
    id: &str,
    audio_file_id: Option<&str>,
) -> Result<(), ComandaError> {
    let id = id.to_string();
    let audio_file_id = audio_file_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET sync_status = 'synced',
                        audio_file_id = COALESCE(?2, audio_file_id),
                        audio_data = NULL
                 WHERE id = ?1",
                params![id, audio_file_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
