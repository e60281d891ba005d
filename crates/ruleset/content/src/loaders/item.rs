//! Item catalog loader.

use std::path::Path;

use ruleset_core::ItemSource;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, parse_document};

/// Item catalog structure for RON/JSON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    pub items: Vec<ItemSource>,
}

impl ItemCatalog {
    /// Finds an item by id, falling back to its identifier (explicit or
    /// derived from its name).
    pub fn find(&self, key: &str) -> Option<&ItemSource> {
        self.items
            .iter()
            .find(|item| item.id == key)
            .or_else(|| self.items.iter().find(|item| item.identifier() == key))
    }
}

/// Loader for item catalogs.
pub struct ItemLoader;

impl ItemLoader {
    /// Load an item catalog from a RON or JSON file.
    pub fn load(path: &Path) -> LoadResult<ItemCatalog> {
        let catalog: ItemCatalog = parse_document(path, "item catalog")?;

        for (i, item) in catalog.items.iter().enumerate() {
            if let Some(dup) = catalog.items[..i]
                .iter()
                .find(|other| other.identifier() == item.identifier())
            {
                anyhow::bail!(
                    "Duplicate item identifier '{}' in {} ('{}' and '{}')",
                    item.identifier(),
                    path.display(),
                    dup.name,
                    item.name
                );
            }
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_catalog_and_finds_by_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.ron");
        std::fs::write(
            &path,
            r#"{
                "items": [
                    { "id": "cloak", "name": "Cloak of Protection", "type": "equipment" },
                    {
                        "id": "ring", "name": "Ring", "type": "equipment",
                        "identifier": "ring-of-warmth",
                    },
                ],
            }"#,
        )
        .unwrap();

        let catalog = ItemLoader::load(&path).unwrap();
        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.find("cloak-of-protection").map(|i| i.id.as_str()), Some("cloak"));
        assert_eq!(catalog.find("ring-of-warmth").map(|i| i.id.as_str()), Some("ring"));
        assert!(catalog.find("warmth").is_none());
    }

    #[test]
    fn find_prefers_item_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.ron");
        std::fs::write(
            &path,
            r#"{
                "items": [
                    { "id": "feat-tough", "name": "Tough", "type": "feat" },
                    {
                        "id": "tough-hide", "name": "Hide", "type": "armor",
                        "identifier": "feat-tough",
                    },
                ],
            }"#,
        )
        .unwrap();

        let catalog = ItemLoader::load(&path).unwrap();
        assert_eq!(catalog.find("feat-tough").map(|i| i.name.as_str()), Some("Tough"));
        assert_eq!(catalog.find("tough").map(|i| i.id.as_str()), Some("feat-tough"));
    }

    #[test]
    fn rejects_duplicate_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"{ "items": [
                { "id": "a", "name": "Rope", "type": "loot" },
                { "id": "b", "name": "Rope", "type": "loot" }
            ] }"#,
        )
        .unwrap();

        let err = ItemLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate item identifier 'rope'"));
    }
}
