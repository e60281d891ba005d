//! Engine configuration loader.

use std::path::Path;

use ruleset_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Omitted keys fall back to [`EngineConfig::default`].
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
modifier_actor_types = ["character", "npc"]

[default_priorities]
modifier = 90
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.modifier_actor_types, ["character", "npc"]);
        assert!(config.warn_missing_paths);
        assert_eq!(config.default_priorities.modifier, 90);
        assert_eq!(config.default_priorities.scale_value, 0);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "warn_missing_paths = maybe").unwrap();

        let err = ConfigLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config TOML"));
    }
}
