use std::collections::HashMap;
use std::fmt;

use crate::rules::{Rule, RuleError, RuleSource, ae_like, modifier_rule, scale_value};

use super::BuildContext;

/// Builds a rule instance from its raw definition.
pub type RuleFactory = fn(&RuleSource, &BuildContext<'_>) -> Result<Box<dyn Rule>, RuleError>;

/// Rule tag → factory.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `ae-like`, `modifier` and `scale-value`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ae_like::AELikeRule::KIND, ae_like::build);
        registry.register(modifier_rule::ModifierRule::KIND, modifier_rule::build);
        registry.register(scale_value::ScaleValueRule::KIND, scale_value::build);
        registry
    }

    /// Registers (or replaces) the factory for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, factory: RuleFactory) {
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

    /// Constructs a rule.
    ///
    /// # Errors
    ///
    /// `MissingType` / `UnknownType` for untagged or unregistered data,
    /// otherwise whatever the factory reports.
    pub fn build(
        &self,
        raw: &RuleSource,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn Rule>, RuleError> {
        if raw.kind.trim().is_empty() {
            return Err(RuleError::MissingType);
        }
        let factory = self
            .factories
            .get(raw.kind.as_str())
            .ok_or_else(|| RuleError::UnknownType(raw.kind.clone()))?;
        factory(raw, ctx)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry").field("tags", &self.tags()).finish()
    }
}
