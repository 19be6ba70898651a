//! The catalog provider contract.
//!
//! The ledger engine only ever reads card data through this trait. How the
//! data gets there (HTTP sync jobs, bundled dumps) is a concern of the
//! implementing crate.

use crate::card::CatalogCard;
use thiserror::Error;

/// Errors a catalog provider can surface
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog source cannot be reached or read
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    /// The catalog returned data that could not be parsed
    #[error("malformed catalog data: {0}")]
    Malformed(String),
}

/// Result alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read-only access to card reference data.
///
/// `card` returns `Ok(None)` for an unknown id; `Err` is reserved for the
/// source itself failing. Sets are bounded (well under a thousand cards),
/// so `set_cards` returns the full list for in-memory matching.
pub trait CatalogProvider {
    /// Look up a single card by its catalog id
    fn card(&self, card_id: &str) -> CatalogResult<Option<CatalogCard>>;

    /// All cards in a set
    fn set_cards(&self, set_id: &str) -> CatalogResult<Vec<CatalogCard>>;
}
