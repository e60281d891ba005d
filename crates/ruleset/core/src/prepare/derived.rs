//! Derived-data phase.
//!
//! Runs in a fixed order, each step reading the values written by the ones
//! before it:
//!
//! ```text
//! abilities → proficiency → skills → initiative → hp → spellcasting → ac
//! ```
//!
//! Attribute steps push their built-in modifiers into the target's set, write
//! the set total at the target path, and record an override whenever rule
//! contributions moved the total away from the baseline.

use serde_json::{Map, Value};

use super::PreparedActor;
use super::base::{ability_mod, ability_score, proficiency};
use crate::config::EngineConfig;
use crate::document::{ActorSource, coerce_number, get_path, number, set_path};
use crate::formula::FormulaCache;
use crate::modifier::{AttributeTarget, Modifier, ModifierCategory};

const ABILITY_TARGETS: [AttributeTarget; 6] = [
    AttributeTarget::Str,
    AttributeTarget::Dex,
    AttributeTarget::Con,
    AttributeTarget::Int,
    AttributeTarget::Wis,
    AttributeTarget::Cha,
];

pub(crate) fn prepare_derived(
    prepared: &mut PreparedActor,
    actor: &ActorSource,
    formulas: &FormulaCache,
) {
    abilities(prepared, formulas);
    proficiency_bonus(prepared, actor);
    skills(prepared, formulas);
    initiative(prepared, formulas);
    hit_points(prepared, formulas);
    spellcasting(prepared);
    armor_class(prepared, formulas);
}

fn push_builtin(
    prepared: &mut PreparedActor,
    target: AttributeTarget,
    name: &str,
    category: ModifierCategory,
    formula: &str,
    formulas: &FormulaCache,
) {
    match Modifier::new(name, category, formula, false, formulas) {
        Ok(modifier) => prepared.modifiers.push(target, modifier),
        Err(err) => tracing::error!(
            target: "ruleset::prepare",
            attribute = %target,
            error = %err,
            "Built-in modifier could not be created"
        ),
    }
}

/// Pushes a bonus modifier only when the bonus is authored.
fn push_bonus(
    prepared: &mut PreparedActor,
    target: AttributeTarget,
    path: &str,
    formulas: &FormulaCache,
) {
    if get_path(&prepared.system, path).is_some_and(|v| !v.is_null()) {
        push_builtin(
            prepared,
            target,
            "Bonus",
            ModifierCategory::Base,
            &format!("@{path}"),
            formulas,
        );
    }
}

/// Writes the set total at the target path. Returns the total.
fn settle(prepared: &mut PreparedActor, target: AttributeTarget) -> f64 {
    let (total, baseline) = prepared
        .modifiers
        .get(target)
        .map(|set| (set.total(&prepared.system), set.baseline(&prepared.system)))
        .unwrap_or_default();

    set_path(&mut prepared.system, target.path(), number(total));
    if total != baseline {
        prepared.record_override(&format!("system.{}", target.path()), number(total));
    }
    total
}

fn abilities(prepared: &mut PreparedActor, formulas: &FormulaCache) {
    for target in ABILITY_TARGETS {
        let Some(ability) = target.ability() else {
            continue;
        };
        push_builtin(
            prepared,
            target,
            "Base",
            ModifierCategory::Base,
            &format!("@abilities.{ability}.value"),
            formulas,
        );
        let score = settle(prepared, target);
        set_path(
            &mut prepared.system,
            &format!("abilities.{ability}.mod"),
            number(ability_mod(score)),
        );
    }
}

fn proficiency_bonus(prepared: &mut PreparedActor, actor: &ActorSource) {
    // An active effect may have pinned the bonus.
    if prepared.overrides.contains_key("system.attributes.prof") {
        return;
    }
    // Level comes from the working data so active effects on it count.
    let level = get_path(&prepared.system, "details.level")
        .and_then(coerce_number)
        .map(|level| level.max(0.0).floor() as u32)
        .unwrap_or_else(|| actor.level());
    set_path(&mut prepared.system, "attributes.prof", number(proficiency(level)));
}

fn current_prof(system: &Value) -> f64 {
    get_path(system, "attributes.prof")
        .and_then(coerce_number)
        .unwrap_or(0.0)
}

fn ability_modifier(system: &Value, ability: &str) -> f64 {
    get_path(system, &format!("abilities.{ability}.mod"))
        .and_then(coerce_number)
        .unwrap_or_else(|| ability_mod(ability_score(system, ability)))
}

fn skills(prepared: &mut PreparedActor, formulas: &FormulaCache) {
    let prof = current_prof(&prepared.system);

    for (key, default_ability) in EngineConfig::SKILLS {
        let path = format!("skills.{key}");
        let mut skill = get_path(&prepared.system, &path)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);

        let ability = skill
            .get("ability")
            .and_then(Value::as_str)
            .filter(|a| EngineConfig::ABILITIES.contains(a))
            .unwrap_or(default_ability)
            .to_string();
        let proficient = skill.get("value").and_then(coerce_number).unwrap_or(0.0);
        let bonus = match skill.get("bonus") {
            None | Some(Value::Null) => 0.0,
            Some(Value::String(s)) if s.trim().is_empty() => 0.0,
            Some(raw) => formulas.resolve_value(raw, &prepared.system),
        };

        let modifier = ability_modifier(&prepared.system, &ability);
        let trained = (proficient * prof).floor();
        let total = modifier + trained + bonus;

        skill.insert("ability".into(), Value::String(ability));
        skill.insert("value".into(), number(proficient));
        skill.insert("mod".into(), number(modifier));
        skill.insert("prof".into(), number(trained));
        skill.insert("total".into(), number(total));
        skill.insert("passive".into(), number(10.0 + total));
        set_path(&mut prepared.system, &path, Value::Object(skill));
    }
}

fn initiative(prepared: &mut PreparedActor, formulas: &FormulaCache) {
    let target = AttributeTarget::Init;
    push_builtin(
        prepared,
        target,
        "Dexterity",
        ModifierCategory::Attribute,
        "@abilities.dex.mod",
        formulas,
    );
    push_bonus(prepared, target, "attributes.init.bonus", formulas);
    let total = settle(prepared, target);
    set_path(&mut prepared.system, "attributes.init.mod", number(total));
}

fn hit_points(prepared: &mut PreparedActor, formulas: &FormulaCache) {
    let target = AttributeTarget::Hp;
    push_builtin(
        prepared,
        target,
        "Base",
        ModifierCategory::Base,
        "@attributes.hp.max",
        formulas,
    );
    let max = settle(prepared, target);

    let current = get_path(&prepared.system, "attributes.hp.value")
        .and_then(coerce_number)
        .unwrap_or(max);
    set_path(&mut prepared.system, "attributes.hp.value", number(current.min(max)));
}

fn spellcasting(prepared: &mut PreparedActor) {
    let Some(ability) = get_path(&prepared.system, "attributes.spellcasting")
        .and_then(Value::as_str)
        .filter(|a| EngineConfig::ABILITIES.contains(a))
        .map(str::to_string)
    else {
        return;
    };

    let prof = current_prof(&prepared.system);
    let modifier = ability_modifier(&prepared.system, &ability);
    set_path(&mut prepared.system, "attributes.spelldc", number(8.0 + prof + modifier));
    set_path(&mut prepared.system, "attributes.spellattack", number(prof + modifier));
}

fn armor_class(prepared: &mut PreparedActor, formulas: &FormulaCache) {
    let target = AttributeTarget::Ac;
    let flat =
        get_path(&prepared.system, "attributes.ac.calc").and_then(Value::as_str) == Some("flat");

    if flat {
        push_builtin(
            prepared,
            target,
            "Base",
            ModifierCategory::Base,
            "@attributes.ac.flat",
            formulas,
        );
    } else {
        push_builtin(prepared, target, "Base", ModifierCategory::Base, "10", formulas);
        push_builtin(
            prepared,
            target,
            "Dexterity",
            ModifierCategory::Attribute,
            "@abilities.dex.mod",
            formulas,
        );
    }
    push_bonus(prepared, target, "attributes.ac.bonus", formulas);
    settle(prepared, target);
}
