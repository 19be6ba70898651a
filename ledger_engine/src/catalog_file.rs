//! JSON-dump-backed catalog provider.
//!
//! Loads a full card dump into memory and serves lookups from `HashMap`s.
//! Used by the CLI binary and the test suites; production deployments can
//! swap in any other `CatalogProvider`.

use card_common::{CatalogCard, CatalogError, CatalogProvider, CatalogResult};
use std::collections::HashMap;
use std::path::Path;

/// Catalog lookup over an in-memory card dump
#[derive(Debug)]
pub struct FileCatalog {
    by_id: HashMap<String, CatalogCard>,
    /// Card ids per set, in dump order
    by_set: HashMap<String, Vec<String>>,
}

impl FileCatalog {
    /// Load a catalog dump: a JSON array of catalog cards
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Unavailable(format!("{}: {}", path.display(), e))
        })?;
        let cards: Vec<CatalogCard> =
            serde_json::from_str(&data).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        log::info!("Loaded {} catalog cards from {}", cards.len(), path.display());
        Ok(Self::from_cards(cards))
    }

    /// Build a catalog from already-parsed cards
    pub fn from_cards(cards: Vec<CatalogCard>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_set: HashMap<String, Vec<String>> = HashMap::new();
        for card in cards {
            by_set
                .entry(card.set_id.clone())
                .or_default()
                .push(card.id.clone());
            by_id.insert(card.id.clone(), card);
        }
        Self { by_id, by_set }
    }

    /// Total number of cards
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl CatalogProvider for FileCatalog {
    fn card(&self, card_id: &str) -> CatalogResult<Option<CatalogCard>> {
        Ok(self.by_id.get(card_id).cloned())
    }

    fn set_cards(&self, set_id: &str) -> CatalogResult<Vec<CatalogCard>> {
        let ids = self.by_set.get(set_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(ids
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_common::make_test_card;
    use std::io::Write;

    #[test]
    fn from_cards_groups_by_set() {
        let catalog = FileCatalog::from_cards(vec![
            make_test_card("base1-1", "base1", "1", "Alakazam"),
            make_test_card("base1-4", "base1", "4", "Charizard"),
            make_test_card("fossil-1", "fossil", "1", "Aerodactyl"),
        ]);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.set_cards("base1").unwrap().len(), 2);
        assert_eq!(catalog.set_cards("fossil").unwrap().len(), 1);
        assert!(catalog.set_cards("jungle").unwrap().is_empty());
        assert!(catalog.card("base1-4").unwrap().is_some());
        assert!(catalog.card("base1-99").unwrap().is_none());
    }

    #[test]
    fn load_reads_json_dump() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "id": "base1-4",
                "setId": "base1",
                "number": "4",
                "name": "Charizard",
                "rarity": "Rare Holo",
                "tcgplayer": null,
                "cardmarket": null,
                "lastSyncedAt": null
            }}]"#
        )
        .unwrap();

        let catalog = FileCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.card("base1-4").unwrap().unwrap().name, "Charizard");
    }

    #[test]
    fn load_maps_bad_json_to_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = FileCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn load_maps_missing_file_to_unavailable() {
        let err = FileCatalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }
}
