//! Strictly validate authored rule data
//!
//! Every rule on every catalog item and every inline actor item is built in
//! strict mode: unknown predicate types and unparseable formulas are errors
//! here, where preparation would only log and continue.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};

use ruleset_content::{ActorLoader, ContentFactory, ItemLoader};
use ruleset_core::{EngineConfig, ItemSource, RulesetError, RulesetRegistry};

use crate::dirs;

/// Strictly validate authored rule data
#[derive(Parser)]
pub struct Validate {
    /// Validate a single item catalog or actor file instead of the data directory
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Custom data directory (defaults to RULESET_DATA_DIR or platform location)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

impl Validate {
    pub fn execute(self) -> Result<()> {
        let registry = RulesetRegistry::standard();

        let (config, sources) = match &self.file {
            Some(file) => (EngineConfig::default(), vec![load_file(file)?]),
            None => {
                let factory = ContentFactory::new(dirs::data_dir(self.data_dir.as_deref())?);
                (factory.load_config()?, load_data_dir(&factory)?)
            }
        };

        let mut failures = 0;
        for (label, items) in &sources {
            println!("{} {}", style("Checking").bold().cyan(), label);
            for item in items {
                failures += check_item(&registry, &config, item);
            }
        }

        println!();
        if failures > 0 {
            anyhow::bail!("{} invalid rule(s) found", failures);
        }
        println!("{}", style("All rules valid").bold().green());
        Ok(())
    }
}

fn check_item(registry: &RulesetRegistry, config: &EngineConfig, item: &ItemSource) -> usize {
    let errors = registry.validate_item(item, config);
    if errors.is_empty() {
        println!(
            "  {} {} ({} rule(s))",
            style("✓").green(),
            item.id,
            item.rules.len()
        );
        return 0;
    }

    println!("  {} {}", style("✗").red(), item.id);
    for (index, error) in &errors {
        println!(
            "      #{} [{}] {}",
            index,
            style(error.error_code()).yellow(),
            error
        );
    }
    errors.len()
}

type Source = (String, Vec<ItemSource>);

fn load_file(path: &Path) -> Result<Source> {
    let label = path.display().to_string();

    // Catalogs have a top-level `items` list and no actor `type`.
    match ItemLoader::load(path) {
        Ok(catalog) => Ok((label, catalog.items)),
        Err(catalog_err) => {
            let actor = ActorLoader::load(path).with_context(|| {
                format!("Not an item catalog ({}) or an actor document", catalog_err)
            })?;
            Ok((label, actor.items))
        }
    }
}

fn load_data_dir(factory: &ContentFactory) -> Result<Vec<Source>> {
    let mut sources = Vec::new();

    let items_path = factory.data_dir().join("items.ron");
    if items_path.exists() {
        sources.push((items_path.display().to_string(), factory.load_items()?.items));
    }

    let actors_dir = factory.data_dir().join("actors");
    if actors_dir.is_dir() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&actors_dir)
            .with_context(|| format!("Failed to read actors directory: {}", actors_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("ron" | "json")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let actor = ActorLoader::load(&path)?;
            sources.push((path.display().to_string(), actor.items));
        }
    }

    if sources.is_empty() {
        anyhow::bail!(
            "No items.ron or actors/ found in {}",
            factory.data_dir().display()
        );
    }

    Ok(sources)
}
