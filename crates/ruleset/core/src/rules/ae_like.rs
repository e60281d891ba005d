//! Keyed value mutation with selectable modes.

use serde_json::Value;

use super::{Rule, RuleEnv, RuleError, RuleHeader, RulePhase, RuleSource};
use crate::document::{get_path, number, set_path};
use crate::prepare::PreparedActor;
use crate::registry::BuildContext;

/// Prefix every `ae-like` key must carry.
pub const SYSTEM_PREFIX: &str = "system.";

/// How a change combines with the current value.
///
/// Declaration order is the mode rank; the default priority of a rule is
/// `rank * 10`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::FromRepr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AELikeMode {
    Custom,
    Multiply,
    Add,
    Downgrade,
    Upgrade,
    Override,
}

impl AELikeMode {
    pub const fn rank(self) -> i32 {
        self as i32
    }

    pub const fn default_priority(self) -> i32 {
        self.rank() * 10
    }
}

/// Combines `original` with `change` under `mode`.
///
/// Returns the new value, or `None` when the mode does not apply to the
/// operand types (or, for `custom`, always). `None` means "leave unchanged".
pub fn apply_mode(mode: AELikeMode, original: Option<&Value>, change: &Value) -> Option<Value> {
    let numbers = || Some((original?.as_f64()?, change.as_f64()?));

    match mode {
        AELikeMode::Custom => None,
        AELikeMode::Multiply => numbers().map(|(o, c)| number(o * c)),
        AELikeMode::Downgrade => numbers().and_then(|(o, c)| (c < o).then(|| change.clone())),
        AELikeMode::Upgrade => numbers().and_then(|(o, c)| (c > o).then(|| change.clone())),
        AELikeMode::Add => match original? {
            Value::Array(items) => {
                let mut items = items.clone();
                match change {
                    Value::Array(more) => items.extend(more.iter().cloned()),
                    single => items.push(single.clone()),
                }
                Some(Value::Array(items))
            }
            Value::Number(o) => Some(number(o.as_f64()? + change.as_f64()?)),
            Value::String(s) => {
                let suffix = match change {
                    Value::String(c) => c.clone(),
                    Value::Number(c) => c.to_string(),
                    Value::Bool(c) => c.to_string(),
                    _ => return None,
                };
                Some(Value::String(format!("{s}{suffix}")))
            }
            _ => None,
        },
        AELikeMode::Override => match original {
            Some(Value::Array(_)) => change.is_array().then(|| change.clone()),
            _ => Some(change.clone()),
        },
    }
}

/// `ae-like`: mutates the value at a `system.` key.
#[derive(Clone, Debug, PartialEq)]
pub struct AELikeRule {
    header: RuleHeader,
    key: String,
    mode: AELikeMode,
    value: Value,
}

impl AELikeRule {
    pub const KIND: &'static str = "ae-like";

    pub fn from_source(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Self, RuleError> {
        let key = raw.require_text("key")?.trim().to_string();
        if !key.starts_with(SYSTEM_PREFIX) || key.len() == SYSTEM_PREFIX.len() {
            return Err(RuleError::invalid(
                &raw.kind,
                "key",
                format!("'{key}' must be a path under '{SYSTEM_PREFIX}'"),
            ));
        }

        let mode = match raw.field("mode") {
            Some(Value::String(mode)) => mode
                .parse::<AELikeMode>()
                .map_err(|_| {
                    RuleError::invalid(&raw.kind, "mode", format!("unknown mode '{mode}'"))
                })?,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|rank| AELikeMode::from_repr(rank as usize))
                .ok_or_else(|| RuleError::invalid(&raw.kind, "mode", format!("unknown mode {n}")))?,
            Some(_) => return Err(RuleError::invalid(&raw.kind, "mode", "expected a string")),
            None => return Err(RuleError::missing(&raw.kind, "mode")),
        };

        let value = raw
            .data
            .get("value")
            .cloned()
            .ok_or_else(|| RuleError::missing(&raw.kind, "value"))?;

        Ok(Self {
            header: RuleHeader::from_source(raw, ctx, mode.default_priority())?,
            key,
            mode,
            value,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> AELikeMode {
        self.mode
    }

    fn path(&self) -> &str {
        &self.key[SYSTEM_PREFIX.len()..]
    }

    /// Resolves the authored value against the working data.
    ///
    /// Numbers pass through. Strings that parse as formulas are evaluated,
    /// unless the current value is itself a string, in which case the text
    /// is appended or written verbatim. Anything else is used as authored.
    fn resolve_value(&self, original: Option<&Value>, data: &Value, env: &RuleEnv<'_>) -> Value {
        match &self.value {
            Value::String(_) if matches!(original, Some(Value::String(_))) => self.value.clone(),
            Value::String(source) => {
                let formula = env.formulas.compile(source);
                if formula.is_valid() {
                    number(formula.resolve(data))
                } else {
                    self.value.clone()
                }
            }
            other => other.clone(),
        }
    }

    fn apply(&self, prepared: &mut PreparedActor, env: &RuleEnv<'_>) -> bool {
        if !self.test(env.actor, &prepared.system) {
            return false;
        }

        let path = self.path();
        let change = self.resolve_value(get_path(&prepared.system, path), &prepared.system, env);

        if self.mode == AELikeMode::Custom {
            let before = get_path(&prepared.system, path).cloned();
            for hook in env.hooks {
                hook.apply(&mut prepared.system, path, &change, env);
            }
            let after = get_path(&prepared.system, path).cloned();
            if after != before
                && let Some(after) = after
            {
                prepared.record_override(&self.key, after);
            }
            return true;
        }

        let original = get_path(&prepared.system, path);
        let Some(updated) = apply_mode(self.mode, original, &change) else {
            tracing::trace!(
                target: "ruleset::rules",
                rule = %self.header.id,
                key = %self.key,
                mode = %self.mode,
                "Change does not apply to current value"
            );
            return true;
        };

        if set_path(&mut prepared.system, path, updated.clone()) {
            prepared.record_override(&self.key, updated);
        } else {
            tracing::warn!(
                target: "ruleset::rules",
                rule = %self.header.id,
                key = %self.key,
                "Key runs through a non-object value, change skipped"
            );
        }
        true
    }
}

impl Rule for AELikeRule {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn on_active_effects(&self, prepared: &mut PreparedActor, env: &RuleEnv<'_>) -> bool {
        self.phase() == RulePhase::ActiveEffects && self.apply(prepared, env)
    }

    fn after_derived(&self, prepared: &mut PreparedActor, env: &RuleEnv<'_>) -> bool {
        self.phase() == RulePhase::PostDerived && self.apply(prepared, env)
    }
}

pub fn build(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Box<dyn Rule>, RuleError> {
    Ok(Box::new(AELikeRule::from_source(raw, ctx)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn default_priorities_follow_mode_rank() {
        let priorities: Vec<_> = AELikeMode::iter().map(AELikeMode::default_priority).collect();
        assert_eq!(priorities, [0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn multiply_ignores_non_numeric_originals() {
        assert_eq!(apply_mode(AELikeMode::Multiply, Some(&json!("fast")), &json!(2)), None);
        assert_eq!(apply_mode(AELikeMode::Multiply, None, &json!(2)), None);
        assert_eq!(
            apply_mode(AELikeMode::Multiply, Some(&json!(30)), &json!(0.5)),
            Some(json!(15))
        );
    }

    #[test]
    fn add_appends_to_arrays() {
        assert_eq!(
            apply_mode(AELikeMode::Add, Some(&json!(["common"])), &json!("elvish")),
            Some(json!(["common", "elvish"]))
        );
        assert_eq!(
            apply_mode(AELikeMode::Add, Some(&json!([1])), &json!([2, 3])),
            Some(json!([1, 2, 3]))
        );
    }

    #[test]
    fn add_sums_numbers_and_concatenates_strings() {
        assert_eq!(apply_mode(AELikeMode::Add, Some(&json!(2)), &json!(3)), Some(json!(5)));
        assert_eq!(apply_mode(AELikeMode::Add, Some(&json!(2)), &json!("x")), None);
        assert_eq!(
            apply_mode(AELikeMode::Add, Some(&json!("1d8")), &json!(" + 2")),
            Some(json!("1d8 + 2"))
        );
        assert_eq!(apply_mode(AELikeMode::Add, Some(&json!({})), &json!(1)), None);
    }

    #[test]
    fn downgrade_only_lowers() {
        assert_eq!(apply_mode(AELikeMode::Downgrade, Some(&json!(10)), &json!(10)), None);
        assert_eq!(apply_mode(AELikeMode::Downgrade, Some(&json!(10)), &json!(12)), None);
        assert_eq!(apply_mode(AELikeMode::Downgrade, Some(&json!(10)), &json!(8)), Some(json!(8)));
    }

    #[test]
    fn upgrade_only_raises() {
        assert_eq!(apply_mode(AELikeMode::Upgrade, Some(&json!(10)), &json!(10)), None);
        assert_eq!(apply_mode(AELikeMode::Upgrade, Some(&json!(10)), &json!(12)), Some(json!(12)));
    }

    #[test]
    fn override_protects_arrays_from_scalars() {
        assert_eq!(apply_mode(AELikeMode::Override, Some(&json!(["a"])), &json!("b")), None);
        assert_eq!(
            apply_mode(AELikeMode::Override, Some(&json!(["a"])), &json!(["b"])),
            Some(json!(["b"]))
        );
        assert_eq!(
            apply_mode(AELikeMode::Override, Some(&json!(5)), &json!("x")),
            Some(json!("x"))
        );
        assert_eq!(apply_mode(AELikeMode::Override, None, &json!(60)), Some(json!(60)));
    }

    #[test]
    fn custom_mode_never_transforms() {
        assert_eq!(apply_mode(AELikeMode::Custom, Some(&json!(1)), &json!(2)), None);
    }

    #[test]
    fn modes_parse_from_names_and_ranks() {
        assert_eq!("Override".parse::<AELikeMode>(), Ok(AELikeMode::Override));
        assert_eq!(AELikeMode::from_repr(2), Some(AELikeMode::Add));
        assert_eq!(AELikeMode::from_repr(6), None);
    }
}
