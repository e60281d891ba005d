//! Content loaders for reading ruleset data from files.
//!
//! Actor documents and item catalogs are accepted as RON or JSON (chosen by
//! file extension); engine configuration is TOML. Loaders only read.

pub mod actor;
pub mod config;
pub mod factory;
pub mod item;

pub use actor::{ActorDocument, ActorLoader};
pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use item::{ItemCatalog, ItemLoader};

use std::path::Path;

use serde::de::DeserializeOwned;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

/// Parses a RON or JSON document, picked by extension.
///
/// RON input is read into a JSON tree first, so RON maps and structs both
/// land in the same camelCase document model as JSON files.
pub(crate) fn parse_document<T: DeserializeOwned>(path: &Path, what: &str) -> LoadResult<T> {
    let content = read_file(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    let tree: serde_json::Value = match extension {
        "json" => serde_json::from_str(&content)
            .map_err(|e| {
                anyhow::anyhow!("Failed to parse {} JSON {}: {}", what, path.display(), e)
            })?,
        "ron" => ron::from_str(&content)
            .map_err(|e| {
                anyhow::anyhow!("Failed to parse {} RON {}: {}", what, path.display(), e)
            })?,
        other => anyhow::bail!(
            "Unsupported {} format '{}' for {} (expected .ron or .json)",
            what,
            other,
            path.display()
        ),
    };

    serde_json::from_value(tree)
        .map_err(|e| anyhow::anyhow!("Invalid {} document {}: {}", what, path.display(), e))
}
