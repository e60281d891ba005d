//! Base-data phase: fresh working data and persisted user modifiers.

use serde_json::{Map, Value};

use super::PreparedActor;
use crate::config::EngineConfig;
use crate::document::{ActorSource, coerce_number, get_path, number, set_path};
use crate::formula::FormulaCache;
use crate::modifier::Modifier;

/// `floor((score - 10) / 2)`.
pub fn ability_mod(score: f64) -> f64 {
    ((score - 10.0) / 2.0).floor()
}

/// `floor((level + 7) / 4)`.
pub fn proficiency(level: u32) -> f64 {
    ((f64::from(level) + 7.0) / 4.0).floor()
}

/// Score of `ability` in `system`, 10 when absent or non-numeric.
pub(crate) fn ability_score(system: &Value, ability: &str) -> f64 {
    get_path(system, &format!("abilities.{ability}.value"))
        .and_then(coerce_number)
        .unwrap_or(10.0)
}

pub(crate) fn prepare_base(actor: &ActorSource, formulas: &FormulaCache) -> PreparedActor {
    let mut system = match &actor.system {
        Value::Object(_) => actor.system.clone(),
        Value::Null => Value::Object(Map::new()),
        other => {
            tracing::warn!(
                target: "ruleset::prepare",
                actor = %actor.id,
                found = %other,
                "Actor system data is not an object, starting from empty data"
            );
            Value::Object(Map::new())
        }
    };

    set_path(&mut system, "scale", Value::Object(Map::new()));

    for ability in EngineConfig::ABILITIES {
        let score = ability_score(&system, ability);
        set_path(&mut system, &format!("abilities.{ability}.value"), number(score));
        set_path(&mut system, &format!("abilities.{ability}.mod"), number(ability_mod(score)));
    }

    let level = actor.level();
    set_path(&mut system, "details.level", Value::from(level));
    set_path(&mut system, "attributes.prof", number(proficiency(level)));

    let mut prepared = PreparedActor::new(actor, system);

    for (target, sources) in &actor.user_modifiers {
        for source in sources {
            match Modifier::from_source(source, formulas) {
                Ok(modifier) => prepared.modifiers.push(*target, modifier),
                Err(err) => tracing::warn!(
                    target: "ruleset::prepare",
                    actor = %actor.id,
                    attribute = %target,
                    error = %err,
                    "Skipping malformed user modifier"
                ),
            }
        }
    }

    prepared
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::modifier::{AttributeTarget, ModifierCategory, ModifierSource};

    #[test]
    fn ability_modifiers() {
        assert_eq!(ability_mod(10.0), 0.0);
        assert_eq!(ability_mod(9.0), -1.0);
        assert_eq!(ability_mod(15.0), 2.0);
        assert_eq!(ability_mod(1.0), -5.0);
    }

    #[test]
    fn proficiency_by_level() {
        assert_eq!(proficiency(1), 2.0);
        assert_eq!(proficiency(4), 2.0);
        assert_eq!(proficiency(5), 3.0);
        assert_eq!(proficiency(17), 6.0);
    }

    #[test]
    fn base_phase_resets_scale_and_fills_abilities() {
        let actor = ActorSource::new("a1", "Vex", "character").with_system(json!({
            "abilities": { "dex": { "value": 16 } },
            "details": { "level": 5 },
            "scale": { "stale": { "value": 1 } }
        }));

        let prepared = prepare_base(&actor, &FormulaCache::default());
        assert_eq!(prepared.get("system.scale"), Some(&json!({})));
        assert_eq!(prepared.get("abilities.dex.mod"), Some(&json!(3)));
        assert_eq!(prepared.get("abilities.str.value"), Some(&json!(10)));
        assert_eq!(prepared.get("attributes.prof"), Some(&json!(3)));
        assert!(prepared.overrides.is_empty());
    }

    #[test]
    fn user_modifiers_are_reinstantiated() {
        let actor = ActorSource::new("a1", "Vex", "character")
            .with_user_modifier(
                AttributeTarget::Ac,
                ModifierSource::new("Shield", "5", ModifierCategory::Effect),
            )
            .with_user_modifier(AttributeTarget::Ac, ModifierSource::default());

        let prepared = prepare_base(&actor, &FormulaCache::default());
        let ac = prepared.modifiers.get(AttributeTarget::Ac).unwrap();
        assert_eq!(ac.len(), 1);
        assert_eq!(ac.user_entries().count(), 1);
    }
}
