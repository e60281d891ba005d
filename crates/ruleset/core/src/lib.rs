//! Data-driven rule evaluation for tabletop character sheets.
//!
//! `ruleset-core` lets item definitions contribute computed changes to actor
//! attributes. Changes are gated by composable predicates, applied in priority
//! order, and run at two fixed points of attribute derivation. All preparation
//! flows through [`prepare::ActorPreparer`], which rebuilds every rule from raw
//! item data on each pass using an injected [`registry::RulesetRegistry`].
pub mod config;
pub mod document;
pub mod error;
pub mod formula;
pub mod modifier;
pub mod predicate;
pub mod prepare;
pub mod registry;
pub mod rules;
pub use config::{DefaultPriorities, EngineConfig};
pub use document::{ActorSource, ItemSource};
pub use error::{ErrorContext, ErrorSeverity, RulesetError};
pub use formula::{Formula, FormulaCache, FormulaError};
pub use modifier::{
    AttributeModifiers, AttributeTarget, Modifier, ModifierCategory, ModifierError, ModifierSet,
    ModifierSource,
};
pub use predicate::{Predicate, PredicateError, PredicateSource};
pub use prepare::{ActorPreparer, DroppedRule, PreparationReport, PreparedActor};
pub use registry::{
    BuildContext, CustomModeHook, PredicateRegistry, RuleRegistry, RulesetRegistry,
};
pub use rules::{
    AELikeMode, AELikeRule, ModifierRule, Rule, RuleEnv, RuleError, RuleHeader, RulePhase,
    RuleSource, ScaleValueRule,
};
