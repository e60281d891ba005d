use std::collections::HashMap;
use std::fmt;

use crate::predicate::{Predicate, PredicateError, PredicateSource, compound, simple};

use super::BuildContext;

/// Builds a predicate node from its raw definition.
pub type PredicateFactory =
    fn(&PredicateSource, &BuildContext<'_>) -> Result<Predicate, PredicateError>;

/// Predicate tag → factory.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    factories: HashMap<String, PredicateFactory>,
}

impl PredicateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in predicate tag.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for op in ["eq", "equ", "gt", "gte", "lt", "lte"] {
            registry.register(op, simple::build_comparison);
        }
        registry.register("actor-type", simple::build_actor_type);
        registry.register("has-item", simple::build_has_item);
        registry.register("all", compound::build_all);
        registry.register("any", compound::build_any);
        registry.register("one", compound::build_one);
        registry.register("inverse", compound::build_inverse);
        registry
    }

    /// Registers (or replaces) the factory for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, factory: PredicateFactory) {
        self.factories.insert(tag.into(), factory);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Builds a predicate, surfacing any construction error.
    pub fn build(
        &self,
        raw: &PredicateSource,
        ctx: &BuildContext<'_>,
    ) -> Result<Predicate, PredicateError> {
        if raw.kind.trim().is_empty() {
            return Err(PredicateError::MissingType);
        }
        let factory = self
            .factories
            .get(raw.kind.as_str())
            .ok_or_else(|| PredicateError::UnknownType(raw.kind.clone()))?;
        factory(raw, ctx)
    }

    /// Builds a predicate, degrading any failure to [`Predicate::Invalid`].
    pub fn from_raw_data(&self, raw: &PredicateSource, ctx: &BuildContext<'_>) -> Predicate {
        match self.build(raw, ctx) {
            Ok(predicate) => predicate,
            Err(err) => {
                tracing::warn!(
                    target: "ruleset::predicate",
                    kind = %raw.kind,
                    error = %err,
                    "Invalid predicate data, predicate will always fail"
                );
                Predicate::invalid(raw.kind.clone(), err)
            }
        }
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry").field("tags", &self.tags()).finish()
    }
}
