//! Portfolio valuation: variant-aware pricing plus a staleness report.
//!
//! The target currency selects the snapshot — USD reads TCGplayer, EUR reads
//! Cardmarket. No cross-currency conversion happens here: a row priced only
//! in the other snapshot reports no unit price and contributes nothing to
//! the total. That is a documented limitation, not an error.

use crate::database;
use crate::error::Result;
use crate::models::{UserContext, Variant};
use card_common::{CatalogCard, CatalogProvider};
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// A price snapshot older than this is reported stale
pub const STALE_AFTER_HOURS: i64 = 24;

/// Valuation target currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            _ => None,
        }
    }
}

/// Valuation of one ledger row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationItem {
    pub collection_id: i64,
    pub card_id: String,
    pub variant: Variant,
    pub quantity: i64,
    /// `None` when no price exists in the target currency
    pub unit_price: Option<f64>,
    pub line_value: f64,
}

/// Portfolio valuation across all of a user's collections
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub currency: Currency,
    pub items: Vec<ValuationItem>,
    pub total_value: f64,
    /// Distinct cards whose price snapshot needs a refresh, sorted
    pub stale_card_ids: Vec<String>,
}

/// Variant-aware unit price in the requested currency.
///
/// A variant with no entry of its own falls back to a default field rather
/// than pricing the card at nothing: TCGplayer falls back to the "normal"
/// stats (then any entry, lowest tag first); Cardmarket reverse-holo fields
/// fall back to the plain trend and sell averages.
pub fn unit_price(card: &CatalogCard, variant: Variant, currency: Currency) -> Option<f64> {
    match currency {
        Currency::Usd => {
            let prices = &card.tcgplayer.as_ref()?.prices;
            let stats = prices
                .get(variant.as_str())
                .or_else(|| prices.get(Variant::Normal.as_str()))
                .or_else(|| {
                    prices
                        .iter()
                        .min_by(|a, b| a.0.cmp(b.0))
                        .map(|(_, stats)| stats)
                })?;
            stats.market.or(stats.mid)
        }
        Currency::Eur => {
            let cm = card.cardmarket.as_ref()?;
            match variant {
                Variant::ReverseHolofoil => cm
                    .reverse_holo_trend
                    .or(cm.reverse_holo_avg1)
                    .or(cm.trend_price)
                    .or(cm.average_sell_price),
                _ => cm.trend_price.or(cm.average_sell_price),
            }
        }
    }
}

/// Whether a card's price snapshot is older than the staleness cutoff.
/// A card that was never synced is always stale.
pub fn is_stale(card: &CatalogCard, now: DateTime<Utc>) -> bool {
    match card.last_synced_at {
        Some(synced) => now - synced > Duration::hours(STALE_AFTER_HOURS),
        None => true,
    }
}

/// Valuate every non-zero row across all of the user's collections.
///
/// A catalog failure fails the whole call. Cards absent from the catalog
/// value at nothing and are reported stale so the caller can trigger a sync.
pub fn valuate_portfolio(
    conn: &Connection,
    catalog: &dyn CatalogProvider,
    ctx: &UserContext,
    currency: Currency,
) -> Result<PortfolioValuation> {
    let rows = database::rows_for_owner(conn, &ctx.user_id)?;
    let now = Utc::now();

    // One catalog lookup per distinct card
    let mut cards: HashMap<String, Option<CatalogCard>> = HashMap::new();
    for row in &rows {
        if !cards.contains_key(&row.card_id) {
            cards.insert(row.card_id.clone(), catalog.card(&row.card_id)?);
        }
    }

    let mut stale: BTreeSet<String> = BTreeSet::new();
    let mut items = Vec::with_capacity(rows.len());
    let mut total = 0.0;

    for row in rows {
        let card = cards.get(&row.card_id).and_then(Option::as_ref);

        let price = card.and_then(|c| unit_price(c, row.variant, currency));
        let line_value = price.map_or(0.0, |p| p * row.quantity as f64);
        total += line_value;

        match card {
            Some(c) if !is_stale(c, now) => {}
            _ => {
                stale.insert(row.card_id.clone());
            }
        }

        items.push(ValuationItem {
            collection_id: row.collection_id,
            card_id: row.card_id,
            variant: row.variant,
            quantity: row.quantity,
            unit_price: price,
            line_value,
        });
    }

    log::info!(
        "Valuated {} row(s) for {}: {:.2} {} ({} stale card(s))",
        items.len(),
        ctx.user_id,
        total,
        currency.as_str(),
        stale.len()
    );

    Ok(PortfolioValuation {
        currency,
        items,
        total_value: total,
        stale_card_ids: stale.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_file::FileCatalog;
    use crate::database::test_support::{test_collection, test_db};
    use crate::database::insert_row;
    use crate::error::LedgerError;
    use card_common::{
        make_test_card, CardmarketPrices, CatalogError, CatalogResult, PriceStats,
        TcgplayerPrices,
    };

    fn stats(market: f64) -> PriceStats {
        PriceStats {
            low: Some(market * 0.5),
            mid: Some(market - 1.0),
            high: Some(market * 2.0),
            market: Some(market),
        }
    }

    fn priced_card(id: &str, normal: f64, holo: Option<f64>) -> card_common::CatalogCard {
        let mut card = make_test_card(id, "base1", "4", "Charizard");
        let mut prices = std::collections::HashMap::new();
        prices.insert("normal".to_string(), stats(normal));
        if let Some(holo) = holo {
            prices.insert("holofoil".to_string(), stats(holo));
        }
        card.tcgplayer = Some(TcgplayerPrices { prices });
        card.last_synced_at = Some(Utc::now());
        card
    }

    #[test]
    fn variant_prices_sum_per_card() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();
        insert_row(&conn, col.id, "base1-4", Variant::Holofoil, 1, None).unwrap();

        let catalog = FileCatalog::from_cards(vec![priced_card("base1-4", 10.0, Some(25.0))]);
        let report = valuate_portfolio(
            &conn,
            &catalog,
            &UserContext::guest(),
            Currency::Usd,
        )
        .unwrap();

        // 2 x 10 normal + 1 x 25 holofoil
        assert!((report.total_value - 45.0).abs() < f64::EPSILON);
        assert_eq!(report.items.len(), 2);
        assert!(report.stale_card_ids.is_empty());
    }

    #[test]
    fn missing_variant_falls_back_to_normal_stats() {
        let card = priced_card("base1-4", 10.0, None);
        assert_eq!(
            unit_price(&card, Variant::Holofoil, Currency::Usd),
            Some(10.0)
        );
    }

    #[test]
    fn market_price_falls_back_to_mid() {
        let mut card = priced_card("base1-4", 10.0, None);
        if let Some(tcg) = card.tcgplayer.as_mut() {
            tcg.prices.get_mut("normal").unwrap().market = None;
        }
        assert_eq!(unit_price(&card, Variant::Normal, Currency::Usd), Some(9.0));
    }

    #[test]
    fn eur_reads_cardmarket_with_reverse_holo_fields() {
        let mut card = make_test_card("base1-4", "base1", "4", "Charizard");
        card.cardmarket = Some(CardmarketPrices {
            average_sell_price: Some(8.0),
            trend_price: Some(9.0),
            reverse_holo_trend: Some(14.0),
            ..Default::default()
        });

        assert_eq!(unit_price(&card, Variant::Normal, Currency::Eur), Some(9.0));
        assert_eq!(
            unit_price(&card, Variant::ReverseHolofoil, Currency::Eur),
            Some(14.0)
        );
    }

    #[test]
    fn other_currency_snapshot_does_not_convert() {
        // Card priced only on Cardmarket, valuated in USD: no price
        let mut card = make_test_card("base1-4", "base1", "4", "Charizard");
        card.cardmarket = Some(CardmarketPrices {
            trend_price: Some(9.0),
            ..Default::default()
        });
        assert_eq!(unit_price(&card, Variant::Normal, Currency::Usd), None);
    }

    #[test]
    fn unpriced_rows_contribute_zero_with_no_unit_price() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();
        insert_row(&conn, col.id, "base1-99", Variant::Normal, 3, None).unwrap();

        let catalog = FileCatalog::from_cards(vec![priced_card("base1-4", 10.0, None)]);
        let report = valuate_portfolio(
            &conn,
            &catalog,
            &UserContext::guest(),
            Currency::Usd,
        )
        .unwrap();

        assert!((report.total_value - 20.0).abs() < f64::EPSILON);
        let unpriced = report
            .items
            .iter()
            .find(|i| i.card_id == "base1-99")
            .unwrap();
        assert!(unpriced.unit_price.is_none());
        assert_eq!(unpriced.line_value, 0.0);
        // Unknown card needs a catalog sync
        assert_eq!(report.stale_card_ids, vec!["base1-99".to_string()]);
    }

    #[test]
    fn staleness_cutoff_is_24_hours() {
        let now = Utc::now();

        let mut fresh = make_test_card("base1-1", "base1", "1", "Fresh");
        fresh.last_synced_at = Some(now - Duration::hours(23));
        assert!(!is_stale(&fresh, now));

        let mut old = make_test_card("base1-2", "base1", "2", "Old");
        old.last_synced_at = Some(now - Duration::hours(25));
        assert!(is_stale(&old, now));

        let never = make_test_card("base1-3", "base1", "3", "Never");
        assert!(is_stale(&never, now));
    }

    #[test]
    fn stale_card_ids_are_deduplicated_across_collections() {
        let conn = test_db();
        let col_a = test_collection(&conn, "Binder");
        let col_b = test_collection(&conn, "Box");
        insert_row(&conn, col_a.id, "base1-4", Variant::Normal, 1, None).unwrap();
        insert_row(&conn, col_b.id, "base1-4", Variant::Holofoil, 1, None).unwrap();

        let mut card = priced_card("base1-4", 10.0, None);
        card.last_synced_at = Some(Utc::now() - Duration::hours(48));
        let catalog = FileCatalog::from_cards(vec![card]);

        let report = valuate_portfolio(
            &conn,
            &catalog,
            &UserContext::guest(),
            Currency::Usd,
        )
        .unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.stale_card_ids, vec!["base1-4".to_string()]);
    }

    #[test]
    fn catalog_failure_fails_the_whole_valuation() {
        struct DownCatalog;
        impl CatalogProvider for DownCatalog {
            fn card(&self, _: &str) -> CatalogResult<Option<CatalogCard>> {
                Err(CatalogError::Unavailable("offline".to_string()))
            }
            fn set_cards(&self, _: &str) -> CatalogResult<Vec<CatalogCard>> {
                Err(CatalogError::Unavailable("offline".to_string()))
            }
        }

        let conn = test_db();
        let col = test_collection(&conn, "Binder");
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();

        let err = valuate_portfolio(&conn, &DownCatalog, &UserContext::guest(), Currency::Usd)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Catalog(_)));
    }

    #[test]
    fn valuation_is_scoped_to_user_context() {
        let conn = test_db();
        let col = test_collection(&conn, "Binder"); // owned by guest
        insert_row(&conn, col.id, "base1-4", Variant::Normal, 2, None).unwrap();

        let catalog = FileCatalog::from_cards(vec![priced_card("base1-4", 10.0, None)]);
        let report = valuate_portfolio(
            &conn,
            &catalog,
            &UserContext::new("alice"),
            Currency::Usd,
        )
        .unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.total_value, 0.0);
    }

    #[test]
    fn currency_parse() {
        assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
        assert_eq!(Currency::parse("EUR"), Some(Currency::Eur));
        assert_eq!(Currency::parse("GBP"), None);
    }
}
