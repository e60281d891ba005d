//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod eval;
mod prepare;
mod validate;

pub use eval::Eval;
pub use prepare::Prepare;
pub use validate::Validate;

use std::sync::Arc;

use ruleset_content::ContentFactory;
use ruleset_core::{ActorPreparer, RulesetRegistry};

/// Builds a preparer from the data directory's `config.toml`.
pub(crate) fn preparer(factory: &ContentFactory) -> anyhow::Result<ActorPreparer> {
    let config = factory.load_config()?;
    Ok(ActorPreparer::new(Arc::new(RulesetRegistry::standard()), config))
}
