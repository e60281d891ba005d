//! Actor document loader.

use std::path::Path;

use ruleset_core::ActorSource;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, parse_document};

/// An actor file: the actor document plus references into the item catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDocument {
    #[serde(flatten)]
    pub actor: ActorSource,

    /// Identifiers of catalog items the actor owns.
    #[serde(rename = "catalogItems", default, skip_serializing_if = "Vec::is_empty")]
    pub catalog_items: Vec<String>,
}

/// Loader for actor documents from RON or JSON files.
pub struct ActorLoader;

impl ActorLoader {
    /// Load an actor document, ignoring catalog references.
    pub fn load(path: &Path) -> LoadResult<ActorSource> {
        Ok(Self::load_document(path)?.actor)
    }

    /// Load an actor document together with its catalog references.
    pub fn load_document(path: &Path) -> LoadResult<ActorDocument> {
        parse_document(path, "actor")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_json_actor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "vex.json",
            r#"{
                "id": "pc-vex",
                "name": "Vex",
                "type": "character",
                "system": { "abilities": { "dex": { "value": 16 } } },
                "catalogItems": ["cloak-of-protection"]
            }"#,
        );

        let document = ActorLoader::load_document(&path).unwrap();
        assert_eq!(document.actor.actor_type, "character");
        assert_eq!(document.catalog_items, ["cloak-of-protection"]);
        assert!(document.actor.items.is_empty());
    }

    #[test]
    fn loads_ron_actor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "brienne.ron",
            r#"{
                "id": "pc-brienne",
                "name": "Brienne",
                "type": "character",
                "system": { "attributes": { "hp": { "max": 12 } } },
                "items": [
                    {
                        "id": "belt",
                        "name": "Belt of Vigor",
                        "type": "equipment",
                        "rules": [
                            { "type": "modifier", "name": "Belt", "formula": "2", "target": "hp" },
                        ],
                    },
                ],
            }"#,
        );

        let actor = ActorLoader::load(&path).unwrap();
        assert_eq!(actor.name, "Brienne");
        assert_eq!(actor.items[0].get_rules()[0].kind, "modifier");
    }

    #[test]
    fn rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "vex.yaml", "id: pc-vex");

        let err = ActorLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported actor format"));
    }

    #[test]
    fn reports_missing_files() {
        let err = ActorLoader::load(Path::new("/nonexistent/actor.ron")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
