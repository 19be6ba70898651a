//! Duplicate detection: per-(card, variant) totals above a usable threshold.
//!
//! Aggregation sums across every row in a group rather than trusting the
//! one-row-per-key invariant, so the report stays correct even while a key
//! holds bulk-imported or race-written duplicates that the reconciler has
//! not collapsed yet.

use crate::database;
use crate::error::{LedgerError, Result};
use crate::models::Variant;
use card_common::{CardImages, CardmarketPrices, CatalogProvider, TcgplayerPrices};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// Copies of a (card, variant) beyond this count are surplus
pub const DEFAULT_THRESHOLD: i64 = 4;

/// Catalog metadata attached to a reported group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCardInfo {
    pub name: String,
    pub number: String,
    pub rarity: Option<String>,
    pub images: CardImages,
    pub tcgplayer: Option<TcgplayerPrices>,
    pub cardmarket: Option<CardmarketPrices>,
}

/// One over-threshold holding
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub card_id: String,
    pub variant: Variant,
    pub summed_quantity: i64,
    /// How many copies exceed the threshold
    pub excess: i64,
    /// Catalog metadata; `None` when the catalog has no entry for the card
    pub card: Option<DuplicateCardInfo>,
}

/// Report holdings whose summed quantity strictly exceeds `threshold`.
///
/// A card held at exactly the threshold is not reported. Results are sorted
/// by descending summed quantity, ties by card id then variant. A per-card
/// catalog miss degrades that group's metadata to `None` instead of failing
/// the report.
pub fn find_duplicates(
    conn: &Connection,
    catalog: &dyn CatalogProvider,
    collection_id: i64,
    threshold: Option<i64>,
) -> Result<Vec<DuplicateGroup>> {
    let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);

    if database::get_collection(conn, collection_id)?.is_none() {
        return Err(LedgerError::NotFound(format!(
            "collection {}",
            collection_id
        )));
    }

    let mut totals: HashMap<(String, Variant), i64> = HashMap::new();
    for row in database::rows_in_collection(conn, collection_id)? {
        *totals.entry((row.card_id, row.variant)).or_insert(0) += row.quantity;
    }

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for ((card_id, variant), summed) in totals {
        if summed <= threshold {
            continue;
        }

        let card = match catalog.card(&card_id) {
            Ok(Some(card)) => Some(DuplicateCardInfo {
                name: card.name,
                number: card.number,
                rarity: card.rarity,
                images: card.images,
                tcgplayer: card.tcgplayer,
                cardmarket: card.cardmarket,
            }),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Catalog lookup failed for {}: {}", card_id, e);
                None
            }
        };

        groups.push(DuplicateGroup {
            card_id,
            variant,
            summed_quantity: summed,
            excess: summed - threshold,
            card,
        });
    }

    groups.sort_by(|a, b| {
        b.summed_quantity
            .cmp(&a.summed_quantity)
            .then_with(|| a.card_id.cmp(&b.card_id))
            .then_with(|| a.variant.as_str().cmp(b.variant.as_str()))
    });

    log::debug!(
        "Duplicate check on collection {}: {} group(s) over threshold {}",
        collection_id,
        groups.len(),
        threshold
    );
    Ok(groups)
}
