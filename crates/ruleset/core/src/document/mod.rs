//! Raw actor and item documents.
//!
//! These are the persisted shapes the host hands to the engine. Only these
//! raw definitions survive between passes; every rule, predicate and modifier
//! instance is rebuilt from them on each preparation.

pub mod path;

pub use path::{coerce_number, get_path, number, set_path, slugify};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::modifier::{AttributeTarget, ModifierSource};
use crate::rules::RuleSource;

/// A persisted actor document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSource {
    pub id: String,

    pub name: String,

    /// Actor type (`character`, `npc`, `vehicle`, ...).
    #[serde(rename = "type")]
    pub actor_type: String,

    /// System data tree. Formulas resolve `@path` against a working copy of it.
    #[serde(default)]
    pub system: Value,

    /// Owned items.
    #[serde(default)]
    pub items: Vec<ItemSource>,

    /// User-authored modifiers, persisted per target and re-instantiated each pass.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_modifiers: BTreeMap<AttributeTarget, Vec<ModifierSource>>,
}

impl ActorSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        actor_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor_type: actor_type.into(),
            system: Value::Object(Default::default()),
            items: Vec::new(),
            user_modifiers: BTreeMap::new(),
        }
    }

    /// Replaces the system data tree (builder pattern).
    pub fn with_system(mut self, system: Value) -> Self {
        self.system = system;
        self
    }

    /// Adds an owned item (builder pattern).
    pub fn with_item(mut self, item: ItemSource) -> Self {
        self.items.push(item);
        self
    }

    /// Adds a persisted user modifier (builder pattern).
    pub fn with_user_modifier(mut self, target: AttributeTarget, modifier: ModifierSource) -> Self {
        self.user_modifiers.entry(target).or_default().push(modifier);
        self
    }

    pub fn item(&self, id: &str) -> Option<&ItemSource> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Character level: `details.level` when authored, otherwise the sum of
    /// class item levels.
    pub fn level(&self) -> u32 {
        if let Some(level) = get_path(&self.system, "details.level").and_then(Value::as_u64) {
            return level as u32;
        }
        self.items
            .iter()
            .filter(|item| item.item_type == EngineConfig::CLASS_ITEM_TYPE)
            .filter_map(|item| get_path(&item.system, "levels").and_then(Value::as_u64))
            .sum::<u64>() as u32
    }
}

/// A persisted item document owned by an actor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSource {
    pub id: String,

    pub name: String,

    /// Item type (`weapon`, `equipment`, `feat`, `class`, ...).
    #[serde(rename = "type")]
    pub item_type: String,

    /// Stable identifier; derived from the name when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default)]
    pub system: Value,

    /// Raw rule definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSource>,
}

impl ItemSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: item_type.into(),
            identifier: None,
            system: Value::Object(Default::default()),
            rules: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_system(mut self, system: Value) -> Self {
        self.system = system;
        self
    }

    pub fn with_rule(mut self, rule: RuleSource) -> Self {
        self.rules.push(rule);
        self
    }

    /// Raw rule definitions carried by this item.
    pub fn get_rules(&self) -> &[RuleSource] {
        &self.rules
    }

    /// Explicit identifier, or a slug of the item name.
    pub fn identifier(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| slugify(&self.name))
    }
}
