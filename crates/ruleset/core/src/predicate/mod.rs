//! Predicates - boolean condition trees gating rules.
//!
//! Predicates are a closed set of node types built from raw data through the
//! [`PredicateRegistry`](crate::registry::PredicateRegistry):
//!
//! ```text
//! Predicate
//! ├── simple:   Comparison(eq | equ | gt | gte | lt | lte), ActorType, HasItem
//! ├── compound: All, Any, One, Inverse
//! └── Invalid   (unknown or malformed data, always false)
//! ```
//!
//! Construction is fail-closed: corrupted or unknown predicate data becomes
//! [`Predicate::Invalid`], which never passes. A bad predicate can hide an
//! effect but can never grant one.

pub mod compound;
pub mod simple;

pub use simple::{ActorTypePredicate, CompareOp, Comparison, HasItemPredicate, Operand};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::ActorSource;
use crate::error::{ErrorSeverity, RulesetError};
use crate::formula::FormulaError;

// ============================================================================
// Raw Data
// ============================================================================

/// Raw predicate definition: `{type, ...type-specific fields}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateSource {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl PredicateSource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: Map::new(),
        }
    }

    /// Adds a field (builder pattern).
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.data.insert(field.to_string(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Predicate construction errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("predicate has no type")]
    MissingType,

    #[error("unknown predicate type '{0}'")]
    UnknownType(String),

    #[error("predicate '{kind}' requires field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("predicate '{kind}' has invalid field '{field}': {reason}")]
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },

    #[error("predicate '{kind}' has an invalid formula in '{field}': {source}")]
    Formula {
        kind: String,
        field: &'static str,
        source: FormulaError,
    },
}

impl PredicateError {
    pub(crate) fn missing(kind: &str, field: &'static str) -> Self {
        Self::MissingField {
            kind: kind.to_string(),
            field,
        }
    }

    pub(crate) fn invalid(kind: &str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            kind: kind.to_string(),
            field,
            reason: reason.into(),
        }
    }
}

impl RulesetError for PredicateError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingType => "PREDICATE_MISSING_TYPE",
            Self::UnknownType(_) => "PREDICATE_UNKNOWN_TYPE",
            Self::MissingField { .. } => "PREDICATE_MISSING_FIELD",
            Self::InvalidField { .. } => "PREDICATE_INVALID_FIELD",
            Self::Formula { .. } => "PREDICATE_FORMULA",
        }
    }
}

// ============================================================================
// Predicate
// ============================================================================

/// A predicate node.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Operand comparison.
    Comparison(Comparison),

    /// Actor type is in an allow-set.
    ActorType(ActorTypePredicate),

    /// Actor owns a matching item.
    HasItem(HasItemPredicate),

    /// Every child passes (vacuously true when empty).
    All(Vec<Predicate>),

    /// At least one child passes (false when empty).
    Any(Vec<Predicate>),

    /// Exactly one child passes (false when empty).
    One(Vec<Predicate>),

    /// The child fails.
    Inverse(Box<Predicate>),

    /// Unknown or malformed data. Always fails.
    Invalid { kind: String, reason: String },
}

impl Predicate {
    /// Compound constructors collapse to `Invalid` when any child is
    /// invalid, so a broken child can never be negated into a pass.
    pub fn all(children: Vec<Predicate>) -> Self {
        Self::compound("all", children, Self::All)
    }

    pub fn any(children: Vec<Predicate>) -> Self {
        Self::compound("any", children, Self::Any)
    }

    pub fn one(children: Vec<Predicate>) -> Self {
        Self::compound("one", children, Self::One)
    }

    pub fn inverse(child: Predicate) -> Self {
        match child.invalid_reason() {
            Some(reason) => Self::invalid("inverse", reason),
            None => Self::Inverse(Box::new(child)),
        }
    }

    fn compound(kind: &str, children: Vec<Predicate>, node: fn(Vec<Predicate>) -> Self) -> Self {
        match children.iter().find_map(Predicate::invalid_reason) {
            Some(reason) => Self::invalid(kind, reason),
            None => node(children),
        }
    }

    fn invalid_reason(&self) -> Option<String> {
        match self {
            Self::Invalid { kind, reason } => Some(format!("child '{kind}' is invalid: {reason}")),
            _ => None,
        }
    }

    pub fn actor_type<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ActorType(ActorTypePredicate::new(types))
    }

    /// A permanently failing predicate recording why construction failed.
    pub fn invalid(kind: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            kind: kind.into(),
            reason: reason.to_string(),
        }
    }

    /// Evaluates the predicate for `actor` against `data`.
    pub fn test(&self, actor: &ActorSource, data: &Value) -> bool {
        match self {
            Self::Comparison(comparison) => comparison.test(data),
            Self::ActorType(predicate) => predicate.test(actor),
            Self::HasItem(predicate) => predicate.test(actor),
            Self::All(children) => compound::all(children, actor, data),
            Self::Any(children) => compound::any(children, actor, data),
            Self::One(children) => compound::one(children, actor, data),
            Self::Inverse(child) => !child.test(actor, data),
            Self::Invalid { .. } => false,
        }
    }

    /// Registry tag of this node.
    pub fn kind(&self) -> &str {
        match self {
            Self::Comparison(comparison) => <&'static str>::from(comparison.op()),
            Self::ActorType(_) => "actor-type",
            Self::HasItem(_) => "has-item",
            Self::All(_) => "all",
            Self::Any(_) => "any",
            Self::One(_) => "one",
            Self::Inverse(_) => "inverse",
            Self::Invalid { kind, .. } => kind,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::ItemSource;

    fn character() -> ActorSource {
        ActorSource::new("a1", "Vex", "character")
            .with_item(ItemSource::new("i1", "Longsword", "weapon"))
    }

    fn yes() -> Predicate {
        Predicate::actor_type(["character"])
    }

    fn no() -> Predicate {
        Predicate::actor_type(["npc"])
    }

    #[test]
    fn empty_compounds() {
        let actor = character();
        let data = json!({});
        assert!(Predicate::all(vec![]).test(&actor, &data));
        assert!(!Predicate::one(vec![]).test(&actor, &data));
        assert!(!Predicate::any(vec![]).test(&actor, &data));
    }

    #[test]
    fn any_is_logical_or() {
        let actor = character();
        let data = json!({});
        assert!(Predicate::any(vec![no(), yes()]).test(&actor, &data));
        assert!(Predicate::any(vec![yes(), yes()]).test(&actor, &data));
        assert!(!Predicate::any(vec![no(), no()]).test(&actor, &data));
    }

    #[test]
    fn one_requires_exactly_one() {
        let actor = character();
        let data = json!({});
        assert!(Predicate::one(vec![no(), yes(), no()]).test(&actor, &data));
        assert!(!Predicate::one(vec![yes(), yes()]).test(&actor, &data));
        assert!(!Predicate::one(vec![no(), no()]).test(&actor, &data));
    }

    #[test]
    fn double_inverse_is_identity() {
        let actors = [character(), ActorSource::new("n1", "Goblin", "npc")];
        let data = json!({});
        let predicates = [yes(), no(), Predicate::all(vec![]), Predicate::invalid("x", "y")];

        for actor in &actors {
            for p in &predicates {
                let twice = Predicate::inverse(Predicate::inverse(p.clone()));
                assert_eq!(twice.test(actor, &data), p.test(actor, &data));
            }
        }
    }

    #[test]
    fn invalid_always_fails() {
        let p = Predicate::invalid("unknown-tag", "unregistered");
        assert!(!p.test(&character(), &json!({})));
        assert!(!Predicate::all(vec![yes(), p.clone()]).test(&character(), &json!({})));
        assert_eq!(p.kind(), "unknown-tag");
    }

    #[test]
    fn invalid_children_poison_compounds() {
        let actor = character();
        let data = json!({});
        let bad = Predicate::invalid("unknown-tag", "unregistered");

        let negated = Predicate::inverse(bad.clone());
        assert!(negated.is_invalid());
        assert!(!negated.test(&actor, &data));

        let nested = Predicate::inverse(Predicate::all(vec![yes(), bad.clone()]));
        assert!(!nested.test(&actor, &data));
        assert_eq!(nested.kind(), "inverse");

        assert!(!Predicate::any(vec![bad, yes()]).test(&actor, &data));
    }

    #[test]
    fn comparison_kind_is_its_tag() {
        let comparison = Comparison::new(
            CompareOp::Gte,
            Operand::Literal(json!(1)),
            Operand::Literal(json!(1)),
        );
        assert_eq!(Predicate::Comparison(comparison).kind(), "gte");
    }

    #[test]
    fn source_round_trips_extra_fields() {
        let raw: PredicateSource = serde_json::from_value(json!({
            "type": "gte",
            "lh": "@details.level",
            "rh": 5,
            "eval": true
        }))
        .unwrap();
        assert_eq!(raw.kind, "gte");
        assert_eq!(raw.field("rh"), Some(&json!(5)));
    }
}
