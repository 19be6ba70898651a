//! SQLite store for the inventory ledger.
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Multi-statement writes are transactional.
//!
//! `ledger_entries` deliberately has no UNIQUE index on
//! (collection_id, card_id, variant): the bulk import path appends rows for
//! keys that may already exist, so duplicate keys must stay representable.
//! The reconciler collapses them back to one row on its next write.

use crate::models::{Collection, CollectionKind, LedgerRow, Variant};
use rusqlite::{params, Connection};
use serde::Serialize;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `collections`: named groupings of ledger rows, per owner
/// - `ledger_entries`: one ownership record per row
/// - `price_points`: optional real price time-series per card
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS collections (
            id          INTEGER PRIMARY KEY,
            owner       TEXT NOT NULL,
            name        TEXT NOT NULL,
            kind        TEXT NOT NULL,
            filter_json TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_collections_owner ON collections(owner);

        CREATE TABLE IF NOT EXISTS ledger_entries (
            id            INTEGER PRIMARY KEY,
            collection_id INTEGER NOT NULL,
            card_id       TEXT NOT NULL,
            variant       TEXT NOT NULL,
            quantity      INTEGER NOT NULL,
            notes         TEXT,
            added_at      TEXT NOT NULL,
            FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_entries_key
            ON ledger_entries(collection_id, card_id, variant);

        -- Real price observations; one point per card/date/source
        CREATE TABLE IF NOT EXISTS price_points (
            card_id    TEXT NOT NULL,
            point_date TEXT NOT NULL,
            price      REAL NOT NULL,
            source     TEXT NOT NULL,
            PRIMARY KEY (card_id, point_date, source)
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Current timestamp as RFC 3339 UTC
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn kind_from_tag(tag: &str) -> rusqlite::Result<CollectionKind> {
    CollectionKind::parse(tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown collection kind: {}", tag).into(),
        )
    })
}

fn variant_from_tag(tag: &str) -> rusqlite::Result<Variant> {
    Variant::parse(tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown variant tag: {}", tag).into(),
        )
    })
}

fn collection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Collection> {
    let kind_tag: String = row.get(3)?;
    Ok(Collection {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        kind: kind_from_tag(&kind_tag)?,
        filter_json: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn ledger_row_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerRow> {
    let variant_tag: String = row.get(3)?;
    Ok(LedgerRow {
        id: row.get(0)?,
        collection_id: row.get(1)?,
        card_id: row.get(2)?,
        variant: variant_from_tag(&variant_tag)?,
        quantity: row.get(4)?,
        notes: row.get(5)?,
        added_at: row.get(6)?,
    })
}

// ── Collections ────────────────────────────────────────────────────────────

/// Create a collection and return it
pub fn create_collection(
    conn: &Connection,
    owner: &str,
    name: &str,
    kind: CollectionKind,
    filter_json: Option<&str>,
) -> DbResult<Collection> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO collections (owner, name, kind, filter_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![owner, name, kind.as_str(), filter_json, created_at],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("Created collection '{}' (id {})", name, id);
    Ok(Collection {
        id,
        owner: owner.to_string(),
        name: name.to_string(),
        kind,
        filter_json: filter_json.map(str::to_string),
        created_at,
    })
}

/// Look up a collection by id
pub fn get_collection(conn: &Connection, collection_id: i64) -> DbResult<Option<Collection>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, owner, name, kind, filter_json, created_at
         FROM collections WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![collection_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(collection_from_row(row)?)),
        None => Ok(None),
    }
}

/// All collections belonging to an owner, oldest first
pub fn list_collections(conn: &Connection, owner: &str) -> DbResult<Vec<Collection>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, owner, name, kind, filter_json, created_at
         FROM collections WHERE owner = ?1 ORDER BY id",
    )?;
    let results: DbResult<Vec<Collection>> = stmt
        .query_map(params![owner], collection_from_row)?
        .collect();
    results
}

/// Delete a collection; its ledger rows go with it via cascade.
///
/// Returns true if a collection row was actually removed.
pub fn delete_collection(conn: &Connection, collection_id: i64) -> DbResult<bool> {
    let affected = conn.execute(
        "DELETE FROM collections WHERE id = ?1",
        params![collection_id],
    )?;
    if affected > 0 {
        log::info!("Deleted collection {} (cascading ledger rows)", collection_id);
    }
    Ok(affected > 0)
}

// ── Ledger rows ────────────────────────────────────────────────────────────

/// All rows for one identity key, oldest first.
///
/// Returns every row, not just one: the store may hold duplicates for a key
/// (historical unguarded writes, bulk imports) and callers must see them all.
pub fn rows_for_key(
    conn: &Connection,
    collection_id: i64,
    card_id: &str,
    variant: Variant,
) -> DbResult<Vec<LedgerRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, collection_id, card_id, variant, quantity, notes, added_at
         FROM ledger_entries
         WHERE collection_id = ?1 AND card_id = ?2 AND variant = ?3
         ORDER BY id",
    )?;
    let results: DbResult<Vec<LedgerRow>> = stmt
        .query_map(
            params![collection_id, card_id, variant.as_str()],
            ledger_row_from_row,
        )?
        .collect();
    results
}

/// All rows in a collection, oldest first
pub fn rows_in_collection(conn: &Connection, collection_id: i64) -> DbResult<Vec<LedgerRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, collection_id, card_id, variant, quantity, notes, added_at
         FROM ledger_entries WHERE collection_id = ?1 ORDER BY id",
    )?;
    let results: DbResult<Vec<LedgerRow>> = stmt
        .query_map(params![collection_id], ledger_row_from_row)?
        .collect();
    results
}

/// All positive-quantity rows across every collection of an owner
pub fn rows_for_owner(conn: &Connection, owner: &str) -> DbResult<Vec<LedgerRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT e.id, e.collection_id, e.card_id, e.variant, e.quantity, e.notes, e.added_at
         FROM ledger_entries e
         JOIN collections c ON c.id = e.collection_id
         WHERE c.owner = ?1 AND e.quantity > 0
         ORDER BY e.id",
    )?;
    let results: DbResult<Vec<LedgerRow>> =
        stmt.query_map(params![owner], ledger_row_from_row)?.collect();
    results
}

/// Insert a single ledger row and return its id
pub fn insert_row(
    conn: &Connection,
    collection_id: i64,
    card_id: &str,
    variant: Variant,
    quantity: i64,
    notes: Option<&str>,
) -> DbResult<i64> {
    conn.execute(
        "INSERT INTO ledger_entries (collection_id, card_id, variant, quantity, notes, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            collection_id,
            card_id,
            variant.as_str(),
            quantity,
            notes,
            now_timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replace a row's quantity (and optionally its notes), touching `added_at`.
///
/// The outer option on `notes` distinguishes "not provided" (`None`, stored
/// value kept) from "explicitly set" (`Some(value)`, where `Some(None)`
/// clears the field).
pub fn update_row(
    conn: &Connection,
    row_id: i64,
    quantity: i64,
    notes: Option<Option<&str>>,
) -> DbResult<()> {
    match notes {
        Some(notes) => {
            conn.execute(
                "UPDATE ledger_entries SET quantity = ?1, notes = ?2, added_at = ?3 WHERE id = ?4",
                params![quantity, notes, now_timestamp(), row_id],
            )?;
        }
        None => {
            conn.execute(
                "UPDATE ledger_entries SET quantity = ?1, added_at = ?2 WHERE id = ?3",
                params![quantity, now_timestamp(), row_id],
            )?;
        }
    }
    Ok(())
}

/// Delete every row for an identity key; returns the number removed
pub fn delete_rows_for_key(
    conn: &Connection,
    collection_id: i64,
    card_id: &str,
    variant: Variant,
) -> DbResult<usize> {
    conn.execute(
        "DELETE FROM ledger_entries
         WHERE collection_id = ?1 AND card_id = ?2 AND variant = ?3",
        params![collection_id, card_id, variant.as_str()],
    )
}

/// Delete a specific set of rows by id; returns the number removed
pub fn delete_rows_by_id(conn: &Connection, row_ids: &[i64]) -> DbResult<usize> {
    let mut stmt = conn.prepare_cached("DELETE FROM ledger_entries WHERE id = ?1")?;
    let mut removed = 0;
    for id in row_ids {
        removed += stmt.execute(params![id])?;
    }
    Ok(removed)
}

// ── Price points ───────────────────────────────────────────────────────────

/// One observed or inferred price for a card on a date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
    pub source: String,
}

/// Record a real price observation; same (card, date, source) is replaced
pub fn record_price_point(
    conn: &Connection,
    card_id: &str,
    date: &str,
    price: f64,
    source: &str,
) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO price_points (card_id, point_date, price, source)
         VALUES (?1, ?2, ?3, ?4)",
        params![card_id, date, price, source],
    )?;
    Ok(())
}

/// Real price observations for a card, ordered chronologically
pub fn price_points_for_card(conn: &Connection, card_id: &str) -> DbResult<Vec<PricePoint>> {
    let mut stmt = conn.prepare_cached(
        "SELECT point_date, price, source FROM price_points
         WHERE card_id = ?1 ORDER BY point_date",
    )?;
    let results: DbResult<Vec<PricePoint>> = stmt
        .query_map(params![card_id], |row| {
            Ok(PricePoint {
                date: row.get(0)?,
                price: row.get(1)?,
                source: row.get(2)?,
            })
        })?
        .collect();
    results
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Create an in-memory database for testing
    pub fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    /// Create a manual collection owned by guest
    pub fn test_collection(conn: &Connection, name: &str) -> Collection {
        create_collection(conn, "guest", name, CollectionKind::Manual, None).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{test_collection, test_db};
    use super::*;

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_db();
        for table in ["collections", "ledger_entries", "price_points"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn create_and_get_collection() {
        let conn = test_db();
        let created = test_collection(&conn, "Binder");

        let fetched = get_collection(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Binder");
        assert_eq!(fetched.owner, "guest");
        assert_eq!(fetched.kind, CollectionKind::Manual);
        assert!(fetched.filter_json.is_none());

        assert!(get_collection(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn list_collections_is_scoped_to_owner() {
        let conn = test_db();
        test_collection(&conn, "Binder");
        create_collection(&conn, "alice", "Trades", CollectionKind::Manual, None).unwrap();

        let guest = list_collections(&conn, "guest").unwrap();
        assert_eq!(guest.len(), 1);
        assert_eq!(guest[0].name, "Binder");
    }

    #[test]
    fn delete_collection_cascades_to_rows() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 3, None).unwrap();

        assert!(delete_collection(&conn, col.id).unwrap());

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM ledger_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn delete_collection_missing_returns_false() {
        let conn = test_db();
        assert!(!delete_collection(&conn, 42).unwrap());
    }

    #[test]
    fn rows_for_key_returns_all_duplicates_oldest_first() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        let first = insert_row(&conn, col.id, "base1-4", Variant::Normal, 1, None).unwrap();
        let second = insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();
        // Different variant, must not appear
        insert_row(&conn, col.id, "base1-4", Variant::Holofoil, 5, None).unwrap();

        let rows = rows_for_key(&conn, col.id, "base1-4", Variant::Normal).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first);
        assert_eq!(rows[1].id, second);
    }

    #[test]
    fn update_row_can_leave_notes_untouched() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        let id = insert_row(&conn, col.id, "base1-4", Variant::Normal, 1, Some("graded")).unwrap();

        update_row(&conn, id, 7, None).unwrap();
        let rows = rows_for_key(&conn, col.id, "base1-4", Variant::Normal).unwrap();
        assert_eq!(rows[0].quantity, 7);
        assert_eq!(rows[0].notes.as_deref(), Some("graded"));

        update_row(&conn, id, 7, Some(None)).unwrap();
        let rows = rows_for_key(&conn, col.id, "base1-4", Variant::Normal).unwrap();
        assert!(rows[0].notes.is_none());
    }

    #[test]
    fn rows_for_owner_skips_zero_quantity() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();
        insert_row(&conn, col.id, "base1-5", Variant::Normal, 0, None).unwrap();

        let rows = rows_for_owner(&conn, "guest").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].card_id, "base1-4");
    }

    #[test]
    fn price_points_are_ordered_and_replace_on_conflict() {
        let conn = test_db();
        record_price_point(&conn, "base1-4", "2026-08-20", 10.0, "cardmarket").unwrap();
        record_price_point(&conn, "base1-4", "2026-08-10", 8.0, "cardmarket").unwrap();
        record_price_point(&conn, "base1-4", "2026-08-20", 11.0, "cardmarket").unwrap();

        let points = price_points_for_card(&conn, "base1-4").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2026-08-10");
        assert_eq!(points[1].price, 11.0);
    }
}
