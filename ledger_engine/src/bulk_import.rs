//! Bulk import: match human-entered card numbers against a catalog set,
//! then commit the validated batch in one transaction.
//!
//! Sets are bounded (well under a thousand cards), so validation fetches the
//! whole set once and matches in memory rather than querying per entry.
//!
//! Committing *appends* rows rather than merging with existing holdings for
//! the same key. That is an explicit policy choice for large batches; the
//! reconciler collapses any resulting duplicates on the next upsert of the
//! affected key.

use crate::database;
use crate::error::{LedgerError, Result};
use crate::models::Variant;
use card_common::{CatalogCard, CatalogProvider};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// One user-entered line of a bulk import
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    /// The text exactly as typed or scanned
    pub raw_text: String,
    /// The card number extracted from the raw text
    pub parsed_number: String,
    pub quantity: i64,
}

/// Matched-card summary returned for valid entries
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub rarity: Option<String>,
}

/// Validation result for one entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EntryMatch {
    Valid { card: CardSummary },
    Invalid { error: String },
}

/// A validated entry ready for `commit_batch`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitItem {
    pub card_id: String,
    #[serde(default)]
    pub variant: Variant,
    pub quantity: i64,
}

/// Strip leading zeros so "001" and "1" compare equal.
///
/// All-zero input normalizes to "0"; surrounding whitespace is ignored.
pub fn normalize_number(number: &str) -> &str {
    let trimmed = number.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Find the catalog card an entry refers to.
///
/// Exact printed-number matches beat normalized matches; within a tier the
/// lowest card id wins, so the result never depends on catalog order.
fn match_number<'a>(cards: &'a [CatalogCard], parsed_number: &str) -> Option<&'a CatalogCard> {
    let wanted = parsed_number.trim();
    let exact = cards
        .iter()
        .filter(|c| c.number.trim() == wanted)
        .min_by(|a, b| a.id.cmp(&b.id));
    if exact.is_some() {
        return exact;
    }

    let wanted_norm = normalize_number(parsed_number);
    cards
        .iter()
        .filter(|c| normalize_number(&c.number) == wanted_norm)
        .min_by(|a, b| a.id.cmp(&b.id))
}

fn summarize(card: &CatalogCard) -> CardSummary {
    CardSummary {
        id: card.id.clone(),
        name: card.name.clone(),
        image: card
            .images
            .small
            .clone()
            .or_else(|| card.images.large.clone()),
        rarity: card.rarity.clone(),
    }
}

/// Validate a batch of entries against one catalog set.
///
/// Returns one result per input entry, in input order. A catalog failure
/// fails the whole batch; no partial results are returned. A set the
/// catalog has no cards for is `NotFound` rather than a batch of misses.
pub fn validate_batch(
    catalog: &dyn CatalogProvider,
    set_id: &str,
    entries: &[ImportEntry],
) -> Result<Vec<EntryMatch>> {
    if set_id.trim().is_empty() {
        return Err(LedgerError::Validation("set id is required".to_string()));
    }
    if entries.is_empty() {
        return Err(LedgerError::Validation(
            "import batch is empty".to_string(),
        ));
    }

    let cards = catalog.set_cards(set_id)?;
    if cards.is_empty() {
        return Err(LedgerError::NotFound(format!("set {}", set_id)));
    }
    log::info!(
        "Validating {} import entries against set {} ({} cards)",
        entries.len(),
        set_id,
        cards.len()
    );

    let results = entries
        .iter()
        .map(|entry| match match_number(&cards, &entry.parsed_number) {
            Some(card) => EntryMatch::Valid {
                card: summarize(card),
            },
            None => {
                log::debug!(
                    "No catalog match for '{}' (number '{}') in set {}",
                    entry.raw_text,
                    entry.parsed_number,
                    set_id
                );
                EntryMatch::Invalid {
                    error: "not found".to_string(),
                }
            }
        })
        .collect();

    Ok(results)
}

/// Insert validated items into a collection as one batched transaction.
///
/// Rows are appended, never merged with existing holdings for the same key.
/// Returns the number of rows inserted. Rejected before any write if the
/// collection is missing or any item is invalid.
pub fn commit_batch(
    conn: &mut Connection,
    collection_id: i64,
    items: &[CommitItem],
) -> Result<usize> {
    if items.is_empty() {
        return Err(LedgerError::Validation(
            "commit batch is empty".to_string(),
        ));
    }
    for item in items {
        if item.card_id.trim().is_empty() {
            return Err(LedgerError::Validation("card id is required".to_string()));
        }
        if item.quantity <= 0 {
            return Err(LedgerError::Validation(format!(
                "quantity must be positive for card {}",
                item.card_id
            )));
        }
    }

    let tx = conn.transaction()?;

    if database::get_collection(&tx, collection_id)?.is_none() {
        return Err(LedgerError::NotFound(format!(
            "collection {}",
            collection_id
        )));
    }

    let inserted = {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO ledger_entries
             (collection_id, card_id, variant, quantity, notes, added_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
        )?;
        let added_at = database::now_timestamp();
        let mut inserted = 0;
        for item in items {
            stmt.execute(params![
                collection_id,
                item.card_id,
                item.variant.as_str(),
                item.quantity,
                added_at
            ])?;
            inserted += 1;
        }
        inserted
    };

    tx.commit()?;
    log::info!(
        "Bulk import committed {} row(s) into collection {}",
        inserted,
        collection_id
    );
    Ok(inserted)
}
