//! Price history per card: real observations when we have them, otherwise a
//! trend inferred from the catalog's rolling averages.
//!
//! The inferred series is three points at most — 30 days ago from `avg30`,
//! 7 days ago from `avg7`, today from `avg1` — each tagged with its
//! synthetic source label. Non-positive averages are omitted; a card with no
//! averages yields an empty sequence, not an error.

use crate::database::{self, PricePoint};
use crate::error::{LedgerError, Result};
use card_common::{CatalogCard, CatalogProvider};
use chrono::{Duration, NaiveDate, Utc};
use rusqlite::Connection;

/// Ordered price history for a card.
///
/// Real `price_points` rows win; the inferred trend is only synthesized when
/// none exist. An unknown card id is `NotFound`.
pub fn card_price_history(
    conn: &Connection,
    catalog: &dyn CatalogProvider,
    card_id: &str,
) -> Result<Vec<PricePoint>> {
    if card_id.trim().is_empty() {
        return Err(LedgerError::Validation("card id is required".to_string()));
    }

    let real = database::price_points_for_card(conn, card_id)?;
    if !real.is_empty() {
        return Ok(real);
    }

    let card = catalog
        .card(card_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("card {}", card_id)))?;

    Ok(inferred_trend(&card, Utc::now().date_naive()))
}

/// Synthesize the 3-point trend from Cardmarket rolling averages
fn inferred_trend(card: &CatalogCard, today: NaiveDate) -> Vec<PricePoint> {
    let Some(cm) = card.cardmarket.as_ref() else {
        return Vec::new();
    };

    let candidates = [
        (cm.avg30, 30, "cardmarket.avg30"),
        (cm.avg7, 7, "cardmarket.avg7"),
        (cm.avg1, 0, "cardmarket.avg1"),
    ];

    candidates
        .into_iter()
        .filter_map(|(value, days_ago, source)| {
            let price = value.filter(|v| *v > 0.0)?;
            Some(PricePoint {
                date: (today - Duration::days(days_ago)).format("%Y-%m-%d").to_string(),
                price,
                source: source.to_string(),
            })
        })
        .collect()
}
