//! Data-driven ruleset content and loaders.
//!
//! This crate reads the documents `ruleset-core` operates on:
//! - Actor documents (RON or JSON), optionally referencing catalog items
//! - Item catalogs (RON or JSON)
//! - Engine configuration (TOML)
//!
//! Loaders produce `ruleset-core` types directly via serde. Nothing here
//! interprets rules; content is handed to the preparer as-is.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ActorDocument, ActorLoader, ConfigLoader, ContentFactory, ItemCatalog, ItemLoader, LoadResult,
};
