//! Compound predicates combining child predicates.
//!
//! | Node    | Passes when                | Empty  |
//! |---------|----------------------------|--------|
//! | All     | every child passes         | true   |
//! | Any     | at least one child passes  | false  |
//! | One     | exactly one child passes   | false  |
//! | Inverse | its single child fails     | n/a    |

use serde_json::Value;

use super::{Predicate, PredicateError, PredicateSource};
use crate::document::ActorSource;
use crate::registry::BuildContext;

pub(crate) fn all(children: &[Predicate], actor: &ActorSource, data: &Value) -> bool {
    children.iter().all(|child| child.test(actor, data))
}

pub(crate) fn any(children: &[Predicate], actor: &ActorSource, data: &Value) -> bool {
    children.iter().any(|child| child.test(actor, data))
}

pub(crate) fn one(children: &[Predicate], actor: &ActorSource, data: &Value) -> bool {
    let mut passed = children.iter().filter(|child| child.test(actor, data));
    passed.next().is_some() && passed.next().is_none()
}

/// Builds the `predicates` list of a compound node.
///
/// In lenient mode a malformed child becomes `Invalid`, which in turn makes
/// the whole compound `Invalid`.
fn children(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Vec<Predicate>, PredicateError> {
    match raw.field("predicates") {
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| ctx.predicate_value(value))
            .collect(),
        Some(_) => Err(PredicateError::invalid(&raw.kind, "predicates", "expected a list")),
        None => Err(PredicateError::missing(&raw.kind, "predicates")),
    }
}

fn fail_closed(predicate: Predicate) -> Predicate {
    if let Predicate::Invalid { kind, reason } = &predicate {
        tracing::warn!(
            target: "ruleset::predicate",
            kind = %kind,
            reason = %reason,
            "Compound predicate has an invalid child, predicate will always fail"
        );
    }
    predicate
}

pub fn build_all(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    Ok(fail_closed(Predicate::all(children(raw, ctx)?)))
}

pub fn build_any(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    Ok(fail_closed(Predicate::any(children(raw, ctx)?)))
}

pub fn build_one(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    Ok(fail_closed(Predicate::one(children(raw, ctx)?)))
}

/// Accepts either `predicate: {..}` or a single-element `predicates` list.
pub fn build_inverse(
    raw: &PredicateSource,
    ctx: &BuildContext<'_>,
) -> Result<Predicate, PredicateError> {
    if let Some(value) = raw.field("predicate") {
        return Ok(fail_closed(Predicate::inverse(ctx.predicate_value(value)?)));
    }

    let mut list = children(raw, ctx).map_err(|err| match err {
        PredicateError::MissingField { kind, .. } => PredicateError::MissingField {
            kind,
            field: "predicate",
        },
        other => other,
    })?;
    if list.len() != 1 {
        return Err(PredicateError::invalid(
            &raw.kind,
            "predicates",
            format!("expected exactly one child, got {}", list.len()),
        ));
    }
    Ok(fail_closed(Predicate::inverse(list.remove(0))))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::EngineConfig;
    use crate::formula::FormulaCache;
    use crate::registry::PredicateRegistry;

    fn source(value: Value) -> PredicateSource {
        serde_json::from_value(value).unwrap()
    }

    fn fixtures() -> (PredicateRegistry, FormulaCache, EngineConfig) {
        (
            PredicateRegistry::standard(),
            FormulaCache::default(),
            EngineConfig::default(),
        )
    }

    #[test]
    fn lenient_invalid_child_invalidates_compound() {
        let (predicates, formulas, config) = fixtures();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);
        let character = ActorSource::new("a", "A", "character");

        let built = build_any(
            &source(json!({
                "type": "any",
                "predicates": [
                    { "type": "bogus" },
                    { "type": "actor-type", "types": ["character"] }
                ]
            })),
            &ctx,
        )
        .unwrap();

        assert!(built.is_invalid());
        assert!(!built.test(&character, &json!({})));
    }

    #[test]
    fn negating_unknown_data_never_passes() {
        let (predicates, formulas, config) = fixtures();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);
        let character = ActorSource::new("a", "A", "character");

        let direct = build_inverse(
            &source(json!({ "type": "inverse", "predicate": { "type": "unknown-tag" } })),
            &ctx,
        )
        .unwrap();
        assert!(!direct.test(&character, &json!({})));

        let nested = build_inverse(
            &source(json!({
                "type": "inverse",
                "predicate": {
                    "type": "all",
                    "predicates": [
                        { "type": "actor-type", "types": ["npc"] },
                        { "type": "unknown-tag" }
                    ]
                }
            })),
            &ctx,
        )
        .unwrap();
        assert!(!nested.test(&character, &json!({})));

        let listed = build_inverse(
            &source(json!({ "type": "inverse", "predicates": [{ "type": "unknown-tag" }] })),
            &ctx,
        )
        .unwrap();
        assert!(!listed.test(&character, &json!({})));
    }

    #[test]
    fn strict_children_propagate_errors() {
        let (predicates, formulas, config) = fixtures();
        let ctx = BuildContext::new(&predicates, &formulas, &config, true);

        let err = build_all(
            &source(json!({ "type": "all", "predicates": [{ "type": "bogus" }] })),
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, PredicateError::UnknownType("bogus".into()));
    }

    #[test]
    fn inverse_requires_exactly_one_child() {
        let (predicates, formulas, config) = fixtures();
        let ctx = BuildContext::new(&predicates, &formulas, &config, true);

        let two = source(json!({
            "type": "inverse",
            "predicates": [
                { "type": "all", "predicates": [] },
                { "type": "all", "predicates": [] }
            ]
        }));
        assert!(build_inverse(&two, &ctx).is_err());

        let single = source(json!({
            "type": "inverse",
            "predicate": { "type": "all", "predicates": [] }
        }));
        let built = build_inverse(&single, &ctx).unwrap();
        assert!(!built.test(&ActorSource::default(), &json!({})));
    }
}
