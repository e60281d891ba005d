//! Content factory for loading ruleset data from a data directory.

use std::path::{Path, PathBuf};

use ruleset_core::{ActorSource, EngineConfig};

use crate::loaders::{ActorLoader, ConfigLoader, ItemCatalog, ItemLoader, LoadResult};

/// Content factory that loads actors, items and engine config from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── items.ron
/// └── actors/
///     ├── brienne.ron
///     └── vex.json
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Path to the directory containing data files
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `config.toml`.
    ///
    /// A missing file yields the default configuration.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config.toml, using defaults");
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load item catalog from `items.ron`.
    pub fn load_items(&self) -> LoadResult<ItemCatalog> {
        let path = self.data_dir.join("items.ron");
        ItemLoader::load(&path)
    }

    /// Resolves `actors/{name}.ron`, falling back to `actors/{name}.json`.
    pub fn actor_path(&self, name: &str) -> LoadResult<PathBuf> {
        let actors_dir = self.data_dir.join("actors");
        ["ron", "json"]
            .iter()
            .map(|ext| actors_dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.exists())
            .ok_or_else(|| {
                anyhow::anyhow!("Actor '{}' not found in {}", name, actors_dir.display())
            })
    }

    /// Load an actor document by name, without resolving catalog references.
    pub fn load_actor(&self, name: &str) -> LoadResult<ActorSource> {
        ActorLoader::load(&self.actor_path(name)?)
    }

    /// Load an actor and attach the catalog items it references by id or
    /// identifier.
    ///
    /// Referenced items are cloned from `items.ron` and appended after the
    /// actor's inline items, in reference order.
    pub fn load_actor_with_catalog(&self, name: &str) -> LoadResult<ActorSource> {
        let document = ActorLoader::load_document(&self.actor_path(name)?)?;
        let mut actor = document.actor;

        if document.catalog_items.is_empty() {
            return Ok(actor);
        }

        let catalog = self.load_items()?;
        for reference in &document.catalog_items {
            let item = catalog.find(reference).ok_or_else(|| {
                anyhow::anyhow!(
                    "Actor '{}' references unknown catalog item '{}'",
                    actor.id,
                    reference
                )
            })?;

            if actor.item(&item.id).is_some() {
                anyhow::bail!(
                    "Actor '{}' already owns an item with id '{}' (catalog item '{}')",
                    actor.id,
                    item.id,
                    reference
                );
            }

            tracing::debug!(actor = %actor.id, item = %item.id, "attached catalog item");
            actor.items.push(item.clone());
        }

        Ok(actor)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> ContentFactory {
        ContentFactory::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"))
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn bundled_config_loads() {
        let config = bundled().load_config().unwrap();
        assert_eq!(config.modifier_actor_types, ["character"]);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ContentFactory::new(dir.path()).load_config().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn bundled_actors_resolve_catalog_items() {
        let factory = bundled();

        let vex = factory.load_actor_with_catalog("vex").unwrap();
        assert_eq!(vex.name, "Vex");
        assert!(vex.item("cloak-of-protection").is_some());
        assert!(vex.item("feat-alert").is_some());

        let brienne = factory.load_actor_with_catalog("brienne").unwrap();
        assert!(brienne.item("amulet-of-health").is_some());
        assert!(brienne.item("feat-tough").is_some());
        assert_eq!(brienne.items.len(), 3);
    }

    #[test]
    fn unknown_catalog_reference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("actors")).unwrap();
        std::fs::write(dir.path().join("items.ron"), r#"{ "items": [] }"#).unwrap();
        std::fs::write(
            dir.path().join("actors/ghost.json"),
            r#"{ "id": "ghost", "name": "Ghost", "type": "npc", "catalogItems": ["sword"] }"#,
        )
        .unwrap();

        let factory = ContentFactory::new(dir.path());
        let err = factory.load_actor_with_catalog("ghost").unwrap_err();
        assert!(err.to_string().contains("unknown catalog item 'sword'"));

        // Plain loading ignores the references.
        assert_eq!(factory.load_actor("ghost").unwrap().id, "ghost");
    }

    #[test]
    fn missing_actor_is_reported() {
        let err = bundled().actor_path("nobody").unwrap_err();
        assert!(err.to_string().contains("Actor 'nobody' not found"));
    }
}
