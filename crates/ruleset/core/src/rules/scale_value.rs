use serde_json::{Map, Value};

use super::{Rule, RuleEnv, RuleError, RuleHeader, RulePhase, RuleSource};
use crate::document::{ItemSource, slugify};
use crate::prepare::PreparedActor;
use crate::registry::BuildContext;

/// `scale-value`: publishes a per-class scalar at
/// `system.scale.<classIdentifier>.<identifier>`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleValueRule {
    header: RuleHeader,
    class_identifier: String,
    identifier: String,
    value: Value,
}

impl ScaleValueRule {
    pub const KIND: &'static str = "scale-value";

    pub fn from_source(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Self, RuleError> {
        let header = RuleHeader::from_source(raw, ctx, ctx.config.default_priorities.scale_value)?;
        if header.phase != RulePhase::ActiveEffects {
            return Err(RuleError::invalid(
                &raw.kind,
                "phase",
                "scale values are published during active effects",
            ));
        }

        let class_identifier = raw.require_text("classIdentifier")?.to_string();
        let identifier = raw.require_text("identifier")?.to_string();
        let value = raw
            .field("scaleValue")
            .cloned()
            .ok_or_else(|| RuleError::missing(&raw.kind, "scaleValue"))?;

        Ok(Self {
            header,
            class_identifier,
            identifier,
            value,
        })
    }

    pub fn class_identifier(&self) -> &str {
        &self.class_identifier
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Rule for ScaleValueRule {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn on_create(&self, item: &mut ItemSource) {
        let Some(raw) = item.rules.get_mut(self.header.index) else {
            return;
        };
        for field in ["classIdentifier", "identifier"] {
            if let Some(Value::String(text)) = raw.data.get_mut(field) {
                *text = slugify(text);
            }
        }
    }

    fn on_active_effects(&self, prepared: &mut PreparedActor, env: &RuleEnv<'_>) -> bool {
        if !self.test(env.actor, &prepared.system) {
            return false;
        }

        let Some(system) = prepared.system.as_object_mut() else {
            return false;
        };
        let scale = system
            .entry("scale")
            .or_insert_with(|| Value::Object(Map::new()));
        if !scale.is_object() {
            *scale = Value::Object(Map::new());
        }
        let Some(class) = scale.as_object_mut().map(|scale| {
            scale
                .entry(self.class_identifier.clone())
                .or_insert_with(|| Value::Object(Map::new()))
        }) else {
            return false;
        };
        if !class.is_object() {
            *class = Value::Object(Map::new());
        }
        if let Some(class) = class.as_object_mut() {
            class.insert(self.identifier.clone(), self.value.clone());
        }

        tracing::trace!(
            target: "ruleset::rules",
            rule = %self.header.id,
            class = %self.class_identifier,
            identifier = %self.identifier,
            "Scale value published"
        );
        true
    }
}

pub fn build(raw: &RuleSource, ctx: &BuildContext<'_>) -> Result<Box<dyn Rule>, RuleError> {
    Ok(Box::new(ScaleValueRule::from_source(raw, ctx)?))
}
