//! Simple predicates: operand comparisons, actor type and item ownership.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::Value;

use super::{Predicate, PredicateError, PredicateSource};
use crate::document::{ActorSource, coerce_number, number};
use crate::formula::Formula;
use crate::registry::BuildContext;

// ============================================================================
// Comparison
// ============================================================================

/// Comparison operator. The registry tag doubles as the operator name.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum CompareOp {
    /// Strict equality (`===`).
    Eq,
    /// Loose equality (`==`), coercing numbers and numeric strings.
    Equ,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// One side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Used verbatim.
    Literal(Value),
    /// Resolved against the data context on every test.
    Formula(Formula),
}

impl Operand {
    fn resolve(&self, data: &Value) -> Value {
        match self {
            Operand::Literal(value) => value.clone(),
            Operand::Formula(formula) => number(formula.resolve(data)),
        }
    }
}

/// `lh <op> rh`.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    op: CompareOp,
    lh: Operand,
    rh: Operand,
}

impl Comparison {
    pub fn new(op: CompareOp, lh: Operand, rh: Operand) -> Self {
        Self { op, lh, rh }
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn test(&self, data: &Value) -> bool {
        let lh = self.lh.resolve(data);
        let rh = self.rh.resolve(data);
        compare(self.op, &lh, &rh)
    }
}

/// Applies `op` with JavaScript-like coercion rules.
pub fn compare(op: CompareOp, lh: &Value, rh: &Value) -> bool {
    match op {
        CompareOp::Eq => strict_eq(lh, rh),
        CompareOp::Equ => loose_eq(lh, rh),
        CompareOp::Gt => matches!(order(lh, rh), Some(Ordering::Greater)),
        CompareOp::Gte => matches!(order(lh, rh), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Lt => matches!(order(lh, rh), Some(Ordering::Less)),
        CompareOp::Lte => matches!(order(lh, rh), Some(Ordering::Less | Ordering::Equal)),
    }
}

fn strict_eq(lh: &Value, rh: &Value) -> bool {
    match (lh, rh) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lh == rh,
    }
}

fn loose_eq(lh: &Value, rh: &Value) -> bool {
    match (lh, rh) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            lh == rh
        }
        _ => match (coerce_number(lh), coerce_number(rh)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn order(lh: &Value, rh: &Value) -> Option<Ordering> {
    match (lh, rh) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => coerce_number(lh)?.partial_cmp(&coerce_number(rh)?),
    }
}

fn build_operand(
    raw: &PredicateSource,
    field: &'static str,
    eval: bool,
    ctx: &BuildContext<'_>,
) -> Result<Operand, PredicateError> {
    let value = raw
        .field(field)
        .ok_or_else(|| PredicateError::missing(&raw.kind, field))?;

    if !eval {
        return Ok(Operand::Literal(value.clone()));
    }

    let formula = match value {
        Value::Number(n) => Formula::literal(n.as_f64().unwrap_or(0.0)),
        Value::String(source) => ctx.formulas.compile(source),
        other => {
            return Err(PredicateError::invalid(
                &raw.kind,
                field,
                format!("expected a formula, got {other}"),
            ));
        }
    };

    if ctx.strict
        && let Some(err) = formula.error()
    {
        return Err(PredicateError::Formula {
            kind: raw.kind.clone(),
            field,
            source: err.clone(),
        });
    }

    Ok(Operand::Formula(formula))
}

/// Factory shared by every comparison tag.
pub fn build_comparison(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    let op: CompareOp = raw
        .kind
        .parse()
        .map_err(|_| PredicateError::UnknownType(raw.kind.clone()))?;
    let eval = match raw.field("eval") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(PredicateError::invalid(
                &raw.kind,
                "eval",
                format!("expected a boolean, got {other}"),
            ));
        }
    };

    let lh = build_operand(raw, "lh", eval, ctx)?;
    let rh = build_operand(raw, "rh", eval, ctx)?;
    Ok(Predicate::Comparison(Comparison::new(op, lh, rh)))
}

// ============================================================================
// ActorType
// ============================================================================

/// Actor type membership test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorTypePredicate {
    types: BTreeSet<String>,
}

impl ActorTypePredicate {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.iter().map(String::as_str)
    }

    pub fn test(&self, actor: &ActorSource) -> bool {
        self.types.contains(&actor.actor_type)
    }
}

pub fn build_actor_type(
    raw: &PredicateSource,
    _ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    let types = match raw.field("types") {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    PredicateError::invalid(&raw.kind, "types", "entries must be strings")
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::String(single)) => vec![single.clone()],
        Some(_) => {
            return Err(PredicateError::invalid(
                &raw.kind,
                "types",
                "expected a list of strings",
            ));
        }
        None => return Err(PredicateError::missing(&raw.kind, "types")),
    };

    if types.is_empty() {
        return Err(PredicateError::invalid(&raw.kind, "types", "must not be empty"));
    }
    Ok(Predicate::ActorType(ActorTypePredicate::new(types)))
}

// ============================================================================
// HasItem
// ============================================================================

/// Item ownership test. Every supplied criterion must match the same item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HasItemPredicate {
    pub item_type: Option<String>,
    pub identifier: Option<String>,
    pub name: Option<String>,
}

impl HasItemPredicate {
    pub fn test(&self, actor: &ActorSource) -> bool {
        actor.items.iter().any(|item| {
            self.item_type.as_ref().is_none_or(|t| *t == item.item_type)
                && self.identifier.as_ref().is_none_or(|id| *id == item.identifier())
                && self.name.as_ref().is_none_or(|n| *n == item.name)
        })
    }
}

pub fn build_has_item(
    raw: &PredicateSource,
    _ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    let text = |field: &'static str| -> Result<Option<String>, PredicateError> {
        match raw.field(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(PredicateError::invalid(&raw.kind, field, "expected a string")),
        }
    };

    let predicate = HasItemPredicate {
        item_type: text("itemType")?,
        identifier: text("identifier")?,
        name: text("name")?,
    };

    if predicate == HasItemPredicate::default() {
        return Err(PredicateError::missing(&raw.kind, "itemType|identifier|name"));
    }
    Ok(Predicate::HasItem(predicate))
}
