//! Ledger reconciliation: the one-row-per-key upsert.
//!
//! The store may hold more than one row for an identity key — historical
//! writes predate the invariant, and the bulk import path appends rows by
//! design. Every upsert therefore reads *all* rows for its key and collapses
//! extras while applying the new quantity, so corrupted keys converge back
//! to a single row on their next write. The read-modify-write runs in one
//! transaction; either the whole sequence applies or none of it does.

use crate::database;
use crate::error::{LedgerError, Result};
use crate::models::{Collection, CollectionKind, UserContext, Variant};
use rusqlite::Connection;
use serde::Serialize;

/// What an upsert did to the identity key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpsertAction {
    Created,
    Updated,
    Deleted,
}

/// Result of an upsert
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    /// The surviving row, if the key still has one
    pub row_id: Option<i64>,
    pub action: UpsertAction,
    /// Number of duplicate rows collapsed while applying the write
    pub healed: usize,
}

/// Write an absolute quantity for (collection, card, variant).
///
/// - `quantity <= 0` deletes every row for the key.
/// - No existing row: inserts one.
/// - One or more existing rows: the oldest row gets the new quantity
///   (replace, not add) and any extras are deleted.
///
/// The outer option on `notes` distinguishes "not provided" (stored notes
/// kept) from "explicitly set" (`Some(None)` clears the field).
pub fn upsert(
    conn: &mut Connection,
    collection_id: i64,
    card_id: &str,
    variant: Variant,
    quantity: i64,
    notes: Option<Option<&str>>,
) -> Result<UpsertOutcome> {
    if card_id.trim().is_empty() {
        return Err(LedgerError::Validation("card id is required".to_string()));
    }

    let tx = conn.transaction()?;

    if database::get_collection(&tx, collection_id)?.is_none() {
        return Err(LedgerError::NotFound(format!(
            "collection {}",
            collection_id
        )));
    }

    let rows = database::rows_for_key(&tx, collection_id, card_id, variant)?;

    let outcome = if quantity <= 0 {
        let removed = database::delete_rows_for_key(&tx, collection_id, card_id, variant)?;
        log::debug!(
            "Removed {} row(s) for ({}, {}, {})",
            removed,
            collection_id,
            card_id,
            variant
        );
        UpsertOutcome {
            row_id: None,
            action: UpsertAction::Deleted,
            healed: removed.saturating_sub(1),
        }
    } else if rows.is_empty() {
        let row_id = database::insert_row(
            &tx,
            collection_id,
            card_id,
            variant,
            quantity,
            notes.flatten(),
        )?;
        UpsertOutcome {
            row_id: Some(row_id),
            action: UpsertAction::Created,
            healed: 0,
        }
    } else {
        // Keep the oldest row, collapse the rest
        let keep = rows[0].id;
        database::update_row(&tx, keep, quantity, notes)?;
        let extras: Vec<i64> = rows[1..].iter().map(|r| r.id).collect();
        if !extras.is_empty() {
            database::delete_rows_by_id(&tx, &extras)?;
            log::warn!(
                "Collapsed {} duplicate row(s) for ({}, {}, {})",
                extras.len(),
                collection_id,
                card_id,
                variant
            );
        }
        UpsertOutcome {
            row_id: Some(keep),
            action: UpsertAction::Updated,
            healed: extras.len(),
        }
    };

    tx.commit()?;
    Ok(outcome)
}

/// Create a collection for the given user context
pub fn create_collection(
    conn: &Connection,
    ctx: &UserContext,
    name: &str,
    kind: CollectionKind,
    filter_json: Option<&str>,
) -> Result<Collection> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "collection name is required".to_string(),
        ));
    }
    Ok(database::create_collection(
        conn,
        &ctx.user_id,
        name,
        kind,
        filter_json,
    )?)
}

/// All collections belonging to the user context, oldest first
pub fn list_collections(conn: &Connection, ctx: &UserContext) -> Result<Vec<Collection>> {
    Ok(database::list_collections(conn, &ctx.user_id)?)
}

/// Delete a collection and, via cascade, all of its ledger rows.
///
/// The store performs the cascade atomically; on failure nothing changes.
pub fn delete_collection(conn: &Connection, collection_id: i64) -> Result<()> {
    if !database::delete_collection(conn, collection_id)? {
        return Err(LedgerError::NotFound(format!(
            "collection {}",
            collection_id
        )));
    }
    Ok(())
}
