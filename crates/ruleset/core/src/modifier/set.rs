//! Ordered modifier collections.

use std::collections::BTreeMap;

use serde_json::Value;
use strum::IntoEnumIterator;

use super::{AttributeTarget, Modifier, ModifierCategory};

/// Ordered collection of modifiers feeding one attribute.
///
/// Members are kept in canonical order: category rank, then case-normalized
/// name, then formula source. Equal keys keep insertion order. Totals are
/// summed in canonical order, so they never depend on insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModifierSet {
    modifiers: Vec<Modifier>,
}

fn sort_key(modifier: &Modifier) -> (ModifierCategory, String, &str) {
    (
        modifier.category(),
        modifier.name().to_lowercase(),
        modifier.formula().source(),
    )
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a modifier at its canonical position.
    pub fn push(&mut self, modifier: Modifier) {
        let key = sort_key(&modifier);
        let index = self.modifiers.partition_point(|m| sort_key(m) <= key);
        self.modifiers.insert(index, modifier);
    }

    pub fn extend(&mut self, modifiers: impl IntoIterator<Item = Modifier>) {
        for modifier in modifiers {
            self.push(modifier);
        }
    }

    /// Sum of every member's value against `ctx`.
    pub fn total(&self, ctx: &Value) -> f64 {
        self.modifiers.iter().map(|m| m.evaluate(ctx)).sum()
    }

    /// Sum over members that were not injected by a rule.
    pub fn baseline(&self, ctx: &Value) -> f64 {
        self.modifiers
            .iter()
            .filter(|m| m.source().is_none())
            .map(|m| m.evaluate(ctx))
            .sum()
    }

    /// Iterates members in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Modifier> + '_ {
        self.modifiers.iter()
    }

    /// User-authored members.
    pub fn user_entries(&self) -> impl Iterator<Item = &Modifier> + '_ {
        self.modifiers.iter().filter(|m| m.is_user())
    }

    pub fn clear(&mut self) {
        self.modifiers.clear();
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// One [`ModifierSet`] per [`AttributeTarget`].
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeModifiers {
    sets: BTreeMap<AttributeTarget, ModifierSet>,
}

impl AttributeModifiers {
    /// Creates an empty set for every target.
    pub fn new() -> Self {
        Self {
            sets: AttributeTarget::iter()
                .map(|target| (target, ModifierSet::new()))
                .collect(),
        }
    }

    /// Empties every target's set.
    pub fn reset(&mut self) {
        for target in AttributeTarget::iter() {
            self.sets.entry(target).or_default().clear();
        }
    }

    pub fn get(&self, target: AttributeTarget) -> Option<&ModifierSet> {
        self.sets.get(&target)
    }

    pub fn get_mut(&mut self, target: AttributeTarget) -> &mut ModifierSet {
        self.sets.entry(target).or_default()
    }

    pub fn push(&mut self, target: AttributeTarget, modifier: Modifier) {
        self.get_mut(target).push(modifier);
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeTarget, &ModifierSet)> + '_ {
        self.sets.iter().map(|(target, set)| (*target, set))
    }
}

impl Default for AttributeModifiers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::formula::FormulaCache;

    fn modifier(
        cache: &FormulaCache,
        name: &str,
        category: ModifierCategory,
        formula: &str,
    ) -> Modifier {
        Modifier::new(name, category, formula, false, cache).unwrap()
    }

    #[test]
    fn canonical_order_is_category_then_name() {
        let cache = FormulaCache::default();
        let set: ModifierSet = [
            modifier(&cache, "zeta", ModifierCategory::Item, "1"),
            modifier(&cache, "Alpha", ModifierCategory::Item, "1"),
            modifier(&cache, "Dexterity", ModifierCategory::Base, "1"),
            modifier(&cache, "beta", ModifierCategory::Item, "1"),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = set.iter().map(Modifier::name).collect();
        assert_eq!(names, ["Dexterity", "Alpha", "beta", "zeta"]);
    }

    #[test]
    fn total_is_independent_of_insertion_order() {
        let cache = FormulaCache::default();
        let ctx = json!({ "abilities": { "dex": { "mod": 2 } } });
        let members = [
            modifier(&cache, "Dexterity", ModifierCategory::Base, "@abilities.dex.mod"),
            modifier(&cache, "Gloves", ModifierCategory::Item, "3"),
            modifier(&cache, "Haste", ModifierCategory::Effect, "0.1"),
            modifier(&cache, "Curse", ModifierCategory::Custom, "-0.7"),
        ];

        let forward: ModifierSet = members.iter().cloned().collect();
        let backward: ModifierSet = members.iter().rev().cloned().collect();
        let shuffled: ModifierSet = [2, 0, 3, 1].iter().map(|&i| members[i].clone()).collect();

        assert_eq!(forward.total(&ctx), backward.total(&ctx));
        assert_eq!(forward.total(&ctx), shuffled.total(&ctx));
        assert_eq!(forward, backward);
    }

    #[test]
    fn baseline_ignores_rule_injected_members() {
        let cache = FormulaCache::default();
        let mut set = ModifierSet::new();
        set.push(modifier(&cache, "Base", ModifierCategory::Base, "10"));
        set.push(modifier(&cache, "Ring", ModifierCategory::Item, "1").with_source("ring"));

        assert_eq!(set.total(&json!({})), 11.0);
        assert_eq!(set.baseline(&json!({})), 10.0);
    }

    #[test]
    fn reset_empties_every_target() {
        let cache = FormulaCache::default();
        let mut attributes = AttributeModifiers::new();
        attributes.push(
            AttributeTarget::Hp,
            modifier(&cache, "Toughness", ModifierCategory::Feat, "2"),
        );
        assert_eq!(attributes.get(AttributeTarget::Hp).map(ModifierSet::len), Some(1));

        attributes.reset();
        assert!(attributes.iter().all(|(_, set)| set.is_empty()));
        assert_eq!(attributes.iter().count(), 9);
    }
}
