//! Attribute-preparation pipeline.
//!
//! # Pass
//!
//! ```text
//! ActorSource
//!     │  base data        fresh working copy, ability mods, proficiency,
//!     │                   user modifiers, empty scale/overrides
//!     │  embedded docs    build rules from items → drop failures → sort
//!     │                   by priority → on_active_effects
//!     │  derived data     abilities → prof → skills → init → hp → spells → ac
//!     │  post-derived     after_derived
//!     ▼
//! PreparedActor (+ PreparationReport)
//! ```
//!
//! A pass never fails. Unconstructible rules are dropped and reported,
//! invalid predicates fail closed, and broken formulas resolve to 0.

mod base;
mod derived;
mod report;

pub use base::{ability_mod, proficiency};
pub use report::{DroppedRule, PreparationReport};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::{ActorSource, get_path};
use crate::formula::FormulaCache;
use crate::modifier::{AttributeModifiers, AttributeTarget};
use crate::registry::RulesetRegistry;
use crate::rules::{Rule, RuleEnv};

// ============================================================================
// Prepared Actor
// ============================================================================

/// Result of one preparation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedActor {
    pub id: String,
    pub name: String,
    pub actor_type: String,

    /// Working copy of the actor's `system` data with derived values.
    pub system: Value,

    /// Modifier sets per attribute, as used for the derived totals.
    pub modifiers: AttributeModifiers,

    /// Rule-computed values, keyed by `system.`-prefixed path.
    pub overrides: BTreeMap<String, Value>,
}

impl PreparedActor {
    pub(crate) fn new(actor: &ActorSource, system: Value) -> Self {
        Self {
            id: actor.id.clone(),
            name: actor.name.clone(),
            actor_type: actor.actor_type.clone(),
            system,
            modifiers: AttributeModifiers::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Reads a value by dotted path. The `system.` prefix is optional.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = path.strip_prefix("system.").unwrap_or(path);
        match path {
            "system" => Some(&self.system),
            _ => get_path(&self.system, path),
        }
    }

    /// Data context for formulas.
    pub fn roll_data(&self) -> &Value {
        &self.system
    }

    /// Marks `key` as rule-computed.
    pub fn record_override(&mut self, key: &str, value: Value) {
        self.overrides.insert(key.to_string(), value);
    }

    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Current total of one attribute's modifier set.
    pub fn total(&self, target: AttributeTarget) -> f64 {
        self.modifiers
            .get(target)
            .map_or(0.0, |set| set.total(&self.system))
    }
}

// ============================================================================
// Preparer
// ============================================================================

/// Runs preparation passes against a shared registry.
///
/// The preparer is `Send + Sync`; the formula cache is shared across passes.
#[derive(Debug)]
pub struct ActorPreparer {
    registry: Arc<RulesetRegistry>,
    config: EngineConfig,
    formulas: FormulaCache,
}

impl ActorPreparer {
    pub fn new(registry: Arc<RulesetRegistry>, config: EngineConfig) -> Self {
        let formulas = FormulaCache::new(config.warn_missing_paths);
        Self {
            registry,
            config,
            formulas,
        }
    }

    pub fn registry(&self) -> &RulesetRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn formulas(&self) -> &FormulaCache {
        &self.formulas
    }

    /// Prepares `actor`, discarding the report.
    pub fn prepare(&self, actor: &ActorSource) -> PreparedActor {
        self.prepare_with_report(actor).0
    }

    /// Prepares `actor` and reports what happened to its rules.
    pub fn prepare_with_report(&self, actor: &ActorSource) -> (PreparedActor, PreparationReport) {
        let mut report = PreparationReport::default();

        // Base data
        let mut prepared = base::prepare_base(actor, &self.formulas);

        // Embedded documents
        let rules = self.collect_rules(actor, &mut report);
        let env = RuleEnv {
            actor,
            formulas: &self.formulas,
            config: &self.config,
            hooks: self.registry.custom_hooks(),
        };
        for rule in &rules {
            if rule.on_active_effects(&mut prepared, &env) {
                report.rules_applied += 1;
            }
        }

        // Derived data
        derived::prepare_derived(&mut prepared, actor, &self.formulas);

        // Post-derived
        for rule in &rules {
            if rule.after_derived(&mut prepared, &env) {
                report.rules_applied += 1;
            }
        }

        tracing::debug!(
            target: "ruleset::prepare",
            actor = %actor.id,
            built = report.rules_built,
            applied = report.rules_applied,
            dropped = report.dropped.len(),
            overrides = prepared.overrides.len(),
            "Actor prepared"
        );

        (prepared, report)
    }

    /// Builds every live rule of `actor`, sorted by priority.
    ///
    /// Ignored rules are skipped before construction, failures are dropped
    /// and disabled rules are discarded. The sort is stable, so equal
    /// priorities keep item order.
    fn collect_rules(
        &self,
        actor: &ActorSource,
        report: &mut PreparationReport,
    ) -> Vec<Box<dyn Rule>> {
        let base = self.registry.context(&self.formulas, &self.config, false);
        let mut rules = Vec::new();

        for item in &actor.items {
            for (index, raw) in item.get_rules().iter().enumerate() {
                if raw.ignored {
                    report.ignored += 1;
                    continue;
                }

                let rule = match self.registry.build_rule(raw, &base.for_item(item, index)) {
                    Ok(rule) => rule,
                    Err(err) => {
                        tracing::warn!(
                            target: "ruleset::prepare",
                            actor = %actor.id,
                            item = %item.id,
                            index,
                            kind = %raw.kind,
                            error = %err,
                            "Dropping rule that failed to construct"
                        );
                        report.dropped.push(DroppedRule::new(&item.id, index, &raw.kind, &err));
                        continue;
                    }
                };

                report.rules_built += 1;
                if rule.is_disabled() {
                    report.disabled += 1;
                    continue;
                }
                rules.push(rule);
            }
        }

        rules.sort_by_key(|rule| rule.priority());
        rules
    }
}
