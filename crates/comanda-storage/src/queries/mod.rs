// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the local store collections.

pub mod items;
pub mod messages;
pub mod orders;

use std::str::FromStr;

/// Parses a TEXT column into a status enum, mapping parse failures onto
/// rusqlite's conversion error so they surface through the normal row path.
pub(crate) fn parse_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
