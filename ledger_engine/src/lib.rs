//! Collectible-card inventory ledger.
//!
//! Maintains a canonical quantity record per (collection, card, variant) in
//! SQLite, ingests bulk imports matched against a card catalog, flags
//! over-accumulated holdings, and values the portfolio from marketplace
//! price snapshots. Catalog data arrives through the
//! [`card_common::CatalogProvider`] contract; this crate never talks to the
//! network itself.

pub mod bulk_import;
pub mod catalog_file;
pub mod database;
pub mod duplicates;
pub mod error;
pub mod ledger;
pub mod models;
pub mod price_history;
pub mod valuation;

pub use bulk_import::{commit_batch, validate_batch, CommitItem, EntryMatch, ImportEntry};
pub use catalog_file::FileCatalog;
pub use database::{init_schema, PricePoint};
pub use duplicates::{find_duplicates, DuplicateGroup, DEFAULT_THRESHOLD};
pub use error::{LedgerError, Result};
pub use ledger::{upsert, UpsertAction, UpsertOutcome};
pub use models::{Collection, CollectionKind, LedgerRow, UserContext, Variant};
pub use price_history::card_price_history;
pub use valuation::{valuate_portfolio, Currency, PortfolioValuation};
