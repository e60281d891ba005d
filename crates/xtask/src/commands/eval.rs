//! Evaluate a formula
//!
//! The context is either an inline JSON object or the roll data of a prepared
//! actor. Parse and evaluation errors are reported rather than resolved to 0.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use serde_json::Value;
use std::path::PathBuf;

use ruleset_content::ContentFactory;
use ruleset_core::{Formula, RulesetError};

use crate::dirs;

/// Evaluate a formula against a JSON context or a prepared actor
#[derive(Parser)]
pub struct Eval {
    /// Formula text (e.g., "2 * @details.level + max(@abilities.dex.mod, 1)")
    #[arg(value_name = "FORMULA")]
    formula: String,

    /// Inline JSON context (e.g., '{"abilities":{"dex":{"mod":3}}}')
    #[arg(short, long, value_name = "JSON", conflicts_with = "actor")]
    context: Option<String>,

    /// Prepare this actor and evaluate against its roll data
    #[arg(short, long, value_name = "ACTOR")]
    actor: Option<String>,

    /// Custom data directory (defaults to RULESET_DATA_DIR or platform location)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

impl Eval {
    pub fn execute(self) -> Result<()> {
        let ctx = self.load_context()?;

        let formula = Formula::compile_strict(&self.formula).map_err(|e| {
            anyhow::anyhow!("Failed to parse formula [{}]: {}", e.error_code(), e)
        })?;

        if let Some(value) = formula.as_literal() {
            println!("{} {} (literal)", style("=").bold().green(), value);
            return Ok(());
        }

        let value = formula.try_resolve(&ctx).map_err(|e| {
            anyhow::anyhow!("Failed to evaluate formula [{}]: {}", e.error_code(), e)
        })?;

        println!("{} {}", style("=").bold().green(), value);
        Ok(())
    }

    fn load_context(&self) -> Result<Value> {
        if let Some(raw) = &self.context {
            let ctx: Value =
                serde_json::from_str(raw).context("Failed to parse --context as JSON")?;
            if !ctx.is_object() {
                anyhow::bail!("--context must be a JSON object");
            }
            return Ok(ctx);
        }

        let Some(name) = &self.actor else {
            return Ok(Value::Object(Default::default()));
        };

        let factory = ContentFactory::new(dirs::data_dir(self.data_dir.as_deref())?);
        let actor = factory.load_actor_with_catalog(name)?;
        let prepared = super::preparer(&factory)?.prepare(&actor);
        Ok(prepared.roll_data().clone())
    }
}
