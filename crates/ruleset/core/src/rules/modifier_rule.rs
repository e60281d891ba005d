use super::{Rule, RuleEnv, RuleError, RuleHeader, RulePhase, RuleSource};
use crate::modifier::{AttributeTarget, Modifier, ModifierCategory, formula_text};
use crate::predicate::Predicate;
use crate::prepare::PreparedActor;
use crate::registry::BuildContext;

/// `modifier`: injects a modifier into one attribute's set.
///
/// Always restricted to the actor types in
/// [`EngineConfig::modifier_actor_types`](crate::config::EngineConfig), on
/// top of any authored predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct ModifierRule {
    header: RuleHeader,
    target: AttributeTarget,
    modifier: Modifier,
}

impl ModifierRule {
    pub const KIND: &'static str = "modifier";

    pub fn from_source(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Self, RuleError> {
        let mut header = RuleHeader::from_source(raw, ctx, ctx.config.default_priorities.modifier)?;
        if header.phase != RulePhase::ActiveEffects {
            return Err(RuleError::invalid(
                &raw.kind,
                "phase",
                "modifier rules only run during active effects",
            ));
        }

        let target_name = raw.require_text("target")?;
        let target: AttributeTarget = target_name.parse().map_err(|_| {
            RuleError::invalid(&raw.kind, "target", format!("unknown target '{target_name}'"))
        })?;

        let name = raw.require_text("name")?;
        let formula = raw
            .field("formula")
            .and_then(formula_text)
            .ok_or_else(|| RuleError::missing(&raw.kind, "formula"))?;
        let category = ModifierCategory::parse_or_custom(raw.text("category")?);

        let modifier = Modifier::new(name, category, &formula, false, ctx.formulas)?
            .with_source(header.id.clone());
        if ctx.strict
            && let Some(err) = modifier.formula().error()
        {
            return Err(RuleError::Formula {
                kind: raw.kind.clone(),
                field: "formula",
                source: err.clone(),
            });
        }

        let implicit = Predicate::actor_type(ctx.config.modifier_actor_types.iter().cloned());
        header.predicate = Some(match header.predicate.take() {
            Some(supplied) => Predicate::all(vec![supplied, implicit]),
            None => implicit,
        });

        Ok(Self {
            header,
            target,
            modifier,
        })
    }

    pub fn target(&self) -> AttributeTarget {
        self.target
    }

    pub fn modifier(&self) -> &Modifier {
        &self.modifier
    }
}

impl Rule for ModifierRule {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn on_active_effects(&self, prepared: &mut PreparedActor, env: &RuleEnv<'_>) -> bool {
        if !self.test(env.actor, &prepared.system) {
            return false;
        }
        prepared.modifiers.push(self.target, self.modifier.clone());
        true
    }
}

pub fn build(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Box<dyn Rule>, RuleError> {
    Ok(Box::new(ModifierRule::from_source(raw, ctx)?))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::config::EngineConfig;
    use crate::document::ActorSource;
    use crate::formula::FormulaCache;
    use crate::registry::PredicateRegistry;

    fn raw(value: Value) -> RuleSource {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn implicit_actor_type_is_always_applied() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);

        let rule = ModifierRule::from_source(
            &raw(json!({
                "type": "modifier",
                "name": "Toughness",
                "formula": 2,
                "target": "hp",
                "category": "feat"
            })),
            &ctx,
        )
        .unwrap();

        assert_eq!(rule.priority(), 100);
        assert_eq!(rule.target(), AttributeTarget::Hp);
        assert_eq!(rule.modifier().category(), ModifierCategory::Feat);
        assert!(rule.test(&ActorSource::new("a", "A", "character"), &json!({})));
        assert!(!rule.test(&ActorSource::new("n", "N", "npc"), &json!({})));
    }

    #[test]
    fn supplied_predicate_is_combined_with_actor_type() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default().with_modifier_actor_types(["character", "npc"]);
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);

        let rule = ModifierRule::from_source(
            &raw(json!({
                "type": "modifier",
                "name": "Rage",
                "formula": "2",
                "target": "str",
                "predicate": { "type": "gte", "lh": "@details.level", "rh": 3, "eval": true }
            })),
            &ctx,
        )
        .unwrap();

        let npc = ActorSource::new("n", "N", "npc");
        assert!(rule.test(&npc, &json!({ "details": { "level": 5 } })));
        assert!(!rule.test(&npc, &json!({ "details": { "level": 1 } })));
        let vehicle = ActorSource::new("v", "V", "vehicle");
        assert!(!rule.test(&vehicle, &json!({ "details": { "level": 5 } })));
    }

    #[test]
    fn construction_errors() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let ctx = BuildContext::new(&predicates, &formulas, &config, false);

        let missing_formula = raw(json!({ "type": "modifier", "name": "X", "target": "hp" }));
        assert!(matches!(
            ModifierRule::from_source(&missing_formula, &ctx),
            Err(RuleError::MissingField { field: "formula", .. })
        ));

        let bad_target =
            raw(json!({ "type": "modifier", "name": "X", "formula": "1", "target": "speed" }));
        assert!(matches!(
            ModifierRule::from_source(&bad_target, &ctx),
            Err(RuleError::InvalidField { field: "target", .. })
        ));
    }

    #[test]
    fn strict_mode_rejects_dice_formulas() {
        let predicates = PredicateRegistry::standard();
        let formulas = FormulaCache::default();
        let config = EngineConfig::default();
        let lenient = BuildContext::new(&predicates, &formulas, &config, false);
        let strict = BuildContext::new(&predicates, &formulas, &config, true);
        let dice =
            raw(json!({ "type": "modifier", "name": "Bless", "formula": "1d4", "target": "ac" }));

        assert!(ModifierRule::from_source(&dice, &lenient).is_ok());
        assert!(matches!(
            ModifierRule::from_source(&dice, &strict),
            Err(RuleError::Formula { field: "formula", .. })
        ));
    }
}
