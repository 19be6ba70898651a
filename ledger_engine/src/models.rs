//! Core ledger types: variants, collections, ledger rows, user context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Printing variant of an owned card.
///
/// Stored as its camelCase tag, matching the catalog's price-snapshot keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    #[default]
    Normal,
    Holofoil,
    ReverseHolofoil,
}

impl Variant {
    /// The tag stored in the database and used as a price-snapshot key
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Normal => "normal",
            Variant::Holofoil => "holofoil",
            Variant::ReverseHolofoil => "reverseHolofoil",
        }
    }

    /// Parse a stored tag; unknown tags are rejected rather than coerced
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "normal" => Some(Variant::Normal),
            "holofoil" => Some(Variant::Holofoil),
            "reverseHolofoil" => Some(Variant::ReverseHolofoil),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a collection's membership is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    /// Cards added explicitly by the user
    Manual,
    /// Membership derived from a stored filter descriptor
    Automatic,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Manual => "manual",
            CollectionKind::Automatic => "automatic",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "manual" => Some(CollectionKind::Manual),
            "automatic" => Some(CollectionKind::Automatic),
            _ => None,
        }
    }
}

/// A named grouping of ledger rows, owned by a single user
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub kind: CollectionKind,
    /// Filter descriptor for automatic collections; opaque to the engine
    pub filter_json: Option<String>,
    pub created_at: String,
}

/// A single ownership record: how many copies of one (card, variant)
/// a collection holds. One row per (collection, card, variant) once the
/// reconciler has written the key; the bulk path may append extra rows.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    pub id: i64,
    pub collection_id: i64,
    pub card_id: String,
    pub variant: Variant,
    pub quantity: i64,
    pub notes: Option<String>,
    /// Timestamp of the last mutation to this row
    pub added_at: String,
}

/// The user identity ledger operations run under.
///
/// The engine is single-user today; threading the context explicitly keeps
/// call sites honest about whose collections they touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// The default single-user identity
    pub fn guest() -> Self {
        Self::new("guest")
    }
}
