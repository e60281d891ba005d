//! Registries mapping authored type tags to constructors.
//!
//! A [`RulesetRegistry`] is built once at startup (typically with
//! [`RulesetRegistry::standard`] plus host registrations), then shared
//! immutably, usually behind an `Arc`, with every
//! [`ActorPreparer`](crate::prepare::ActorPreparer).
//!
//! # Construction modes
//!
//! Every factory receives a [`BuildContext`]. In lenient mode (preparation)
//! malformed predicate data degrades to [`Predicate::Invalid`]; in strict mode
//! (authoring-time validation) the first error is returned instead.

mod predicates;
mod rules;

pub use predicates::{PredicateFactory, PredicateRegistry};
pub use rules::{RuleFactory, RuleRegistry};

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::ItemSource;
use crate::formula::FormulaCache;
use crate::predicate::{Predicate, PredicateError, PredicateSource};
use crate::rules::{Rule, RuleEnv, RuleError, RuleSource};

// ============================================================================
// Build Context
// ============================================================================

/// Services and settings available to rule and predicate factories.
#[derive(Clone, Copy, Debug)]
pub struct BuildContext<'a> {
    pub predicates: &'a PredicateRegistry,
    pub formulas: &'a FormulaCache,
    pub config: &'a EngineConfig,
    /// Surface errors instead of degrading them.
    pub strict: bool,
    /// Item owning the rule being built.
    pub item: Option<&'a ItemSource>,
    /// Index of the rule inside the owning item's rule list.
    pub index: usize,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        predicates: &'a PredicateRegistry,
        formulas: &'a FormulaCache,
        config: &'a EngineConfig,
        strict: bool,
    ) -> Self {
        Self {
            predicates,
            formulas,
            config,
            strict,
            item: None,
            index: 0,
        }
    }

    /// Scopes the context to one rule of `item`.
    pub fn for_item(self, item: &'a ItemSource, index: usize) -> Self {
        Self {
            item: Some(item),
            index,
            ..self
        }
    }

    /// Builds a predicate according to the construction mode.
    pub fn predicate(&self, raw: &PredicateSource) -> Result<Predicate, PredicateError> {
        if self.strict {
            self.predicates.build(raw, self)
        } else {
            Ok(self.predicates.from_raw_data(raw, self))
        }
    }

    /// Builds a predicate from untyped JSON.
    pub fn predicate_value(&self, value: &Value) -> Result<Predicate, PredicateError> {
        match PredicateSource::deserialize(value) {
            Ok(raw) => self.predicate(&raw),
            Err(err) => {
                let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
                if self.strict {
                    return Err(PredicateError::invalid(kind, "predicate", err.to_string()));
                }
                tracing::warn!(
                    target: "ruleset::predicate",
                    kind,
                    error = %err,
                    "Malformed predicate data, predicate will always fail"
                );
                Ok(Predicate::invalid(kind, err))
            }
        }
    }
}

// ============================================================================
// Custom Mode Hooks
// ============================================================================

/// Host extension point for `ae-like` rules in `custom` mode.
///
/// The rule itself performs no transform; every registered hook is called in
/// registration order and may mutate the working data. If the value at the
/// rule's key changed afterwards, the rule records an override.
pub trait CustomModeHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Applies a custom change at `path` (relative to `system`).
    fn apply(&self, system: &mut Value, path: &str, value: &Value, env: &RuleEnv<'_>);
}

// ============================================================================
// Ruleset Registry
// ============================================================================

/// Rule factories, predicate factories and custom-mode hooks.
#[derive(Clone, Default)]
pub struct RulesetRegistry {
    rules: RuleRegistry,
    predicates: PredicateRegistry,
    custom_hooks: Vec<Arc<dyn CustomModeHook>>,
}

impl RulesetRegistry {
    pub fn new(rules: RuleRegistry, predicates: PredicateRegistry) -> Self {
        Self {
            rules,
            predicates,
            custom_hooks: Vec::new(),
        }
    }

    /// Creates a registry with every built-in rule and predicate tag.
    pub fn standard() -> Self {
        Self::new(RuleRegistry::standard(), PredicateRegistry::standard())
    }

    /// Adds a custom-mode hook (builder pattern).
    pub fn with_custom_hook(mut self, hook: Arc<dyn CustomModeHook>) -> Self {
        self.custom_hooks.push(hook);
        self
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn predicates_mut(&mut self) -> &mut PredicateRegistry {
        &mut self.predicates
    }

    pub fn custom_hooks(&self) -> &[Arc<dyn CustomModeHook>] {
        &self.custom_hooks
    }

    /// Creates a build context backed by this registry's predicates.
    pub fn context<'a>(
        &'a self,
        formulas: &'a FormulaCache,
        config: &'a EngineConfig,
        strict: bool,
    ) -> BuildContext<'a> {
        BuildContext::new(&self.predicates, formulas, config, strict)
    }

    pub fn build_rule(
        &self,
        raw: &RuleSource,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn Rule>, RuleError> {
        self.rules.build(raw, ctx)
    }

    /// Strictly validates one authored rule.
    ///
    /// Unlike preparation, any malformed predicate node or unparseable
    /// formula is reported instead of degrading.
    pub fn validate_rule(&self, raw: &RuleSource) -> Result<Box<dyn Rule>, RuleError> {
        let formulas = FormulaCache::new(false);
        let config = EngineConfig::default();
        self.build_rule(raw, &self.context(&formulas, &config, true))
    }

    /// Strictly validates every rule of `item`, returning `(index, error)`
    /// for each failure.
    pub fn validate_item(
        &self,
        item: &ItemSource,
        config: &EngineConfig,
    ) -> Vec<(usize, RuleError)> {
        let formulas = FormulaCache::new(false);
        let base = self.context(&formulas, config, true);
        item.get_rules()
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                self.build_rule(raw, &base.for_item(item, index))
                    .err()
                    .map(|err| (index, err))
            })
            .collect()
    }

    /// Runs every rule's creation hook when `item` is first added to an actor.
    ///
    /// Rules that fail to build are skipped with a warning.
    pub fn on_item_created(&self, item: &mut ItemSource, config: &EngineConfig) {
        let formulas = FormulaCache::new(false);
        let rules: Vec<Box<dyn Rule>> = {
            let base = self.context(&formulas, config, false);
            item.get_rules()
                .iter()
                .enumerate()
                .filter_map(|(index, raw)| match self.build_rule(raw, &base.for_item(item, index)) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        tracing::warn!(
                            target: "ruleset::rules",
                            item = %item.id,
                            index,
                            error = %err,
                            "Skipping creation hook of unconstructible rule"
                        );
                        None
                    }
                })
                .collect()
        };

        for rule in rules {
            rule.on_create(item);
        }
    }
}

impl fmt::Debug for RulesetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<_> = self.custom_hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("RulesetRegistry")
            .field("rules", &self.rules)
            .field("predicates", &self.predicates)
            .field("custom_hooks", &hooks)
            .finish()
    }
}
