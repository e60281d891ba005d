//! Rules - predicate-gated, priority-ordered attribute mutations carried by items.
//!
//! # Lifecycle
//!
//! Rules are transient. Every preparation pass rebuilds them from the raw
//! [`RuleSource`] entries of the actor's items through the
//! [`RuleRegistry`](crate::registry::RuleRegistry), sorts them by priority
//! and invokes them at two fixed points:
//!
//! ```text
//! base data ─→ on_active_effects (priority order) ─→ derived data ─→ after_derived
//! ```
//!
//! Each rule acts in exactly one of the two hooks, selected by its [`RulePhase`].

pub mod ae_like;
pub mod modifier_rule;
pub mod scale_value;

pub use ae_like::{AELikeMode, AELikeRule, apply_mode};
pub use modifier_rule::ModifierRule;
pub use scale_value::ScaleValueRule;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::document::{ActorSource, ItemSource};
use crate::error::{ErrorSeverity, RulesetError};
use crate::formula::{FormulaCache, FormulaError};
use crate::modifier::ModifierError;
use crate::predicate::{Predicate, PredicateError};
use crate::prepare::PreparedActor;
use crate::registry::{BuildContext, CustomModeHook};

// ============================================================================
// Raw Data
// ============================================================================

/// Raw rule definition as authored on an item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSource {
    /// Registry tag (`ae-like`, `modifier`, `scale-value`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Lower runs earlier. Each rule type supplies a default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,

    /// Raw predicate tree. Kept untyped so a malformed predicate cannot
    /// prevent the owning document from loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Value>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,

    /// Ignored rules are skipped before construction.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Type-specific fields.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl RuleSource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Adds a type-specific field (builder pattern).
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.data.insert(field.to_string(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(Value::from(priority));
        self
    }

    pub fn with_predicate(mut self, predicate: Value) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_phase(mut self, phase: RulePhase) -> Self {
        self.phase = Some(phase.as_ref().to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Non-empty string field.
    pub(crate) fn text(&self, field: &'static str) -> Result<Option<&str>, RuleError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(RuleError::invalid(&self.kind, field, "expected a string")),
        }
    }

    pub(crate) fn require_text(&self, field: &'static str) -> Result<&str, RuleError> {
        self.text(field)?
            .ok_or_else(|| RuleError::missing(&self.kind, field))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Rule construction errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule has no type")]
    MissingType,

    #[error("unknown rule type '{0}'")]
    UnknownType(String),

    #[error("rule '{kind}' requires field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("rule '{kind}' has invalid field '{field}': {reason}")]
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },

    #[error("rule '{kind}' has an invalid predicate: {source}")]
    Predicate { kind: String, source: PredicateError },

    #[error("rule '{kind}' has an invalid formula in '{field}': {source}")]
    Formula {
        kind: String,
        field: &'static str,
        source: FormulaError,
    },

    #[error(transparent)]
    Modifier(#[from] ModifierError),
}

impl RuleError {
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

impl RulesetError for RuleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingType => "RULE_MISSING_TYPE",
            Self::UnknownType(_) => "RULE_UNKNOWN_TYPE",
            Self::MissingField { .. } => "RULE_MISSING_FIELD",
            Self::InvalidField { .. } => "RULE_INVALID_FIELD",
            Self::Predicate { .. } => "RULE_PREDICATE",
            Self::Formula { .. } => "RULE_FORMULA",
            Self::Modifier(err) => err.error_code(),
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Point in the preparation pass where a rule acts.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum RulePhase {
    /// Before derived data is computed.
    #[default]
    ActiveEffects,
    /// After derived data is computed.
    PostDerived,
}

/// Fields shared by every rule type.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleHeader {
    pub id: String,
    pub label: String,
    /// Owning item id; empty when built outside an item.
    pub item_id: String,
    /// Position in the owning item's rule list.
    pub index: usize,
    pub priority: i32,
    pub predicate: Option<Predicate>,
    pub disabled: bool,
    pub phase: RulePhase,
}

impl RuleHeader {
    /// Parses the common fields of `raw`.
    pub fn from_source(
        raw: &RuleSource,
        ctx: &BuildContext<'_>,
        default_priority: i32,
    ) -> Result<Self, RuleError> {
        let priority = match &raw.priority {
            None | Some(Value::Null) => default_priority,
            Some(Value::Number(n)) => match n.as_f64() {
                Some(p) if p.is_finite() && p.fract() == 0.0 && p.abs() <= i32::MAX as f64 => {
                    p as i32
                }
                _ => {
                    return Err(RuleError::invalid(
                        &raw.kind,
                        "priority",
                        format!("expected an integer, got {n}"),
                    ));
                }
            },
            Some(other) => {
                return Err(RuleError::invalid(
                    &raw.kind,
                    "priority",
                    format!("expected an integer, got {other}"),
                ));
            }
        };

        let phase = match raw.phase.as_deref() {
            None => RulePhase::default(),
            Some(phase) => phase
                .parse()
                .map_err(|_| {
                    RuleError::invalid(&raw.kind, "phase", format!("unknown phase '{phase}'"))
                })?,
        };

        let predicate = raw
            .predicate
            .as_ref()
            .map(|value| ctx.predicate_value(value))
            .transpose()
            .map_err(|source| RuleError::Predicate {
                kind: raw.kind.clone(),
                source,
            })?;

        let item_id = ctx.item.map(|item| item.id.clone()).unwrap_or_default();
        let id = raw
            .id
            .clone()
            .unwrap_or_else(|| format!("{item_id}#{}", ctx.index));
        let label = raw
            .label
            .clone()
            .or_else(|| ctx.item.map(|item| item.name.clone()))
            .unwrap_or_else(|| raw.kind.clone());

        Ok(Self {
            id,
            label,
            item_id,
            index: ctx.index,
            priority,
            predicate,
            disabled: raw.disabled,
            phase,
        })
    }

    /// `!disabled && predicate passes` (no predicate passes).
    pub fn test(&self, actor: &ActorSource, data: &Value) -> bool {
        !self.disabled
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate.test(actor, data))
    }
}

// ============================================================================
// Rule
// ============================================================================

/// Read-only services available to rule hooks.
#[derive(Clone, Copy)]
pub struct RuleEnv<'a> {
    /// The source document being prepared.
    pub actor: &'a ActorSource,
    pub formulas: &'a FormulaCache,
    pub config: &'a EngineConfig,
    /// Custom-mode hooks registered at startup.
    pub hooks: &'a [Arc<dyn CustomModeHook>],
}

impl fmt::Debug for RuleEnv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEnv")
            .field("actor", &self.actor.id)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// A constructed rule instance.
///
/// Implementations only override the hook matching their phase; the others
/// default to no-ops.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Registry tag of this rule type.
    fn kind(&self) -> &'static str;

    fn header(&self) -> &RuleHeader;

    fn priority(&self) -> i32 {
        self.header().priority
    }

    fn phase(&self) -> RulePhase {
        self.header().phase
    }

    fn is_disabled(&self) -> bool {
        self.header().disabled
    }

    /// True when the rule is live for `actor` against `data`.
    fn test(&self, actor: &ActorSource, data: &Value) -> bool {
        self.header().test(actor, data)
    }

    /// Called once when the owning item is first added to an actor.
    fn on_create(&self, _item: &mut ItemSource) {}

    /// Called during the embedded-document phase, before derived data.
    ///
    /// Returns true when the rule acted.
    fn on_active_effects(&self, _prepared: &mut PreparedActor, _env: &RuleEnv<'_>) -> bool {
        false
    }

    /// Called after all derived data has been computed.
    ///
    /// Returns true when the rule acted.
    fn after_derived(&self, _prepared: &mut PreparedActor, _env: &RuleEnv<'_>) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::PredicateRegistry;

    #[test]
    fn source_keeps_type_specific_fields() {
        let raw: RuleSource = serde_json::from_value(json!({
            "type": "ae-like",
            "key": "system.attributes.ac.bonus",
            "mode": "add",
            "value": 1,
            "priority": 25,
            "disabled": true
        }))
        .unwrap();

        assert_eq!(raw.kind, "ae-like");
        assert_eq!(raw.field("mode"), Some(&json!("add")));
        assert_eq!(raw.priority, Some(json!(25)));
        assert!(raw.disabled);
        assert!(!raw.ignored);
    }

    #[test]
    fn header_defaults() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let item = ItemSource::new("ring", "Ring of Protection", "equipment");
        let ctx = BuildContext::new(&predicates, &formulas, &config, false).for_item(&item, 2);

        let header = RuleHeader::from_source(&RuleSource::new("modifier"), &ctx, 100).unwrap();
        assert_eq!(header.id, "ring#2");
        assert_eq!(header.label, "Ring of Protection");
        assert_eq!(header.priority, 100);
        assert_eq!(header.phase, RulePhase::ActiveEffects);
        assert!(header.test(&ActorSource::default(), &json!({})));
    }

    #[test]
    fn header_rejects_bad_priority_and_phase() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);

        let mut raw = RuleSource::new("modifier");
        raw.priority = Some(json!("high"));
        assert!(matches!(
            RuleHeader::from_source(&raw, &ctx, 0),
            Err(RuleError::InvalidField { field: "priority", .. })
        ));

        let raw = RuleSource {
            phase: Some("whenever".into()),
            ..RuleSource::new("modifier")
        };
        assert!(matches!(
            RuleHeader::from_source(&raw, &ctx, 0),
            Err(RuleError::InvalidField { field: "phase", .. })
        ));
    }

    #[test]
    fn disabled_header_never_passes() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);

        let header =
            RuleHeader::from_source(&RuleSource::new("modifier").disabled(), &ctx, 0).unwrap();
        assert!(!header.test(&ActorSource::default(), &json!({})));
    }

    #[test]
    fn phase_tags() {
        assert_eq!(RulePhase::PostDerived.as_ref(), "post-derived");
        assert_eq!("active-effects".parse::<RulePhase>(), Ok(RulePhase::ActiveEffects));
    }
}
