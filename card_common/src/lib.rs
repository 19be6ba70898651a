//! Shared types for collectible-card operations.
//!
//! This crate defines the read-only catalog side of the system: card
//! metadata, the two marketplace price snapshots, and the `CatalogProvider`
//! contract the ledger engine consumes. It owns no storage and performs no
//! I/O of its own.

pub mod card;
pub mod provider;

pub use card::{CardImages, CardmarketPrices, CatalogCard, PriceStats, TcgplayerPrices};
#[cfg(feature = "test-helpers")]
pub use card::make_test_card;
pub use provider::{CatalogError, CatalogProvider, CatalogResult};
