//! Catalog card types and marketplace price snapshots.
//!
//! Wire shapes follow the catalog source's JSON: camelCase keys, nullable
//! price fields. A card carries two independent snapshots (TCGplayer in
//! USD, Cardmarket in EUR); either or both may be absent for a given card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate price statistics for one printing variant (TCGplayer, USD)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceStats {
    pub low: Option<f64>,
    pub mid: Option<f64>,
    pub high: Option<f64>,
    pub market: Option<f64>,
}

/// TCGplayer price snapshot: one `PriceStats` per variant tag
/// ("normal", "holofoil", "reverseHolofoil", ...)
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TcgplayerPrices {
    #[serde(default)]
    pub prices: HashMap<String, PriceStats>,
}

/// Cardmarket price snapshot (EUR) with rolling averages
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardmarketPrices {
    pub average_sell_price: Option<f64>,
    pub trend_price: Option<f64>,
    pub avg1: Option<f64>,
    pub avg7: Option<f64>,
    pub avg30: Option<f64>,
    pub reverse_holo_sell: Option<f64>,
    pub reverse_holo_trend: Option<f64>,
    pub reverse_holo_avg1: Option<f64>,
    pub reverse_holo_avg7: Option<f64>,
    pub reverse_holo_avg30: Option<f64>,
}

/// Card image URLs
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

/// A card as supplied by the catalog source.
///
/// `number` is the printed collector number: free-form text that may carry
/// leading zeros ("001") or suffixes, so it is never parsed as an integer.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCard {
    pub id: String,
    pub set_id: String,
    pub number: String,
    pub name: String,
    pub rarity: Option<String>,
    #[serde(default)]
    pub images: CardImages,
    pub tcgplayer: Option<TcgplayerPrices>,
    pub cardmarket: Option<CardmarketPrices>,
    /// When the catalog last refreshed this card from its upstream source.
    /// `None` means the card has never been synced.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CatalogCard {
    /// TCGplayer stats for a variant tag, if the snapshot carries them
    pub fn tcgplayer_stats(&self, variant: &str) -> Option<&PriceStats> {
        self.tcgplayer.as_ref()?.prices.get(variant)
    }
}

/// Create a test card with no prices and no sync timestamp
#[cfg(feature = "test-helpers")]
pub fn make_test_card(id: &str, set_id: &str, number: &str, name: &str) -> CatalogCard {
    CatalogCard {
        id: id.to_string(),
        set_id: set_id.to_string(),
        number: number.to_string(),
        name: name.to_string(),
        rarity: Some("Common".to_string()),
        images: CardImages::default(),
        tcgplayer: None,
        cardmarket: None,
        last_synced_at: None,
    }
}
