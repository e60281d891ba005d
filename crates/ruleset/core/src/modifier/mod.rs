//! Modifiers - named, formula-backed contributions to one attribute.
//!
//! # Architecture
//!
//! ```text
//! [ ModifierSource (persisted, user) ]   [ ModifierRule (item data) ]   [ built-ins ]
//!                   ↓                                ↓                       ↓
//!               [ ModifierSet per AttributeTarget, canonically sorted ]
//!                                        ↓
//!                          total = Σ evaluate(modifier, ctx)
//! ```
//!
//! Values are never cached: every read of a total re-evaluates each member
//! against the current working data.

pub mod set;

pub use set::{AttributeModifiers, ModifierSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorSeverity, RulesetError};
use crate::formula::{Formula, FormulaCache};

// ============================================================================
// Enumerations
// ============================================================================

/// Modifier category. Declaration order is the canonical display rank.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModifierCategory {
    Base,
    Attribute,
    Class,
    Feat,
    Item,
    Effect,
    #[default]
    Custom,
}

impl ModifierCategory {
    /// Parses a category, defaulting to `Custom` for unknown or missing input.
    pub fn parse_or_custom(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
    }
}

/// Attributes that own a [`ModifierSet`].
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttributeTarget {
    Hp,
    Ac,
    Init,
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl AttributeTarget {
    /// Path of the derived value inside `system`.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Hp => "attributes.hp.max",
            Self::Ac => "attributes.ac.value",
            Self::Init => "attributes.init.total",
            Self::Str => "abilities.str.value",
            Self::Dex => "abilities.dex.value",
            Self::Con => "abilities.con.value",
            Self::Int => "abilities.int.value",
            Self::Wis => "abilities.wis.value",
            Self::Cha => "abilities.cha.value",
        }
    }

    /// Ability key for ability targets.
    pub const fn ability(self) -> Option<&'static str> {
        match self {
            Self::Str => Some("str"),
            Self::Dex => Some("dex"),
            Self::Con => Some("con"),
            Self::Int => Some("int"),
            Self::Wis => Some("wis"),
            Self::Cha => Some("cha"),
            Self::Hp | Self::Ac | Self::Init => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Modifier construction errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModifierError {
    #[error("modifier requires a non-empty name")]
    MissingName,

    #[error("modifier '{0}' requires a non-empty formula")]
    MissingFormula(String),
}

impl RulesetError for ModifierError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingName => "MODIFIER_MISSING_NAME",
            Self::MissingFormula(_) => "MODIFIER_MISSING_FORMULA",
        }
    }
}

// ============================================================================
// Raw Data
// ============================================================================

/// Persisted user-authored modifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierSource {
    #[serde(default)]
    pub name: String,

    /// Formula text; plain numbers are accepted.
    #[serde(default)]
    pub formula: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ModifierSource {
    pub fn new(
        name: impl Into<String>,
        formula: impl Into<String>,
        category: ModifierCategory,
    ) -> Self {
        Self {
            name: name.into(),
            formula: Value::String(formula.into()),
            category: Some(category.to_string()),
        }
    }
}

/// Formula text of a raw JSON value (numbers are stringified).
pub(crate) fn formula_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Modifier
// ============================================================================

/// A named, categorized, formula-bound contribution to one attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    name: String,
    category: ModifierCategory,
    formula: Formula,
    user: bool,
    source: Option<String>,
}

impl Modifier {
    /// Creates a modifier.
    ///
    /// # Errors
    ///
    /// `MissingName` / `MissingFormula` when either is empty.
    pub fn new(
        name: impl Into<String>,
        category: ModifierCategory,
        formula: &str,
        user: bool,
        cache: &FormulaCache,
    ) -> Result<Self, ModifierError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModifierError::MissingName);
        }
        if formula.trim().is_empty() {
            return Err(ModifierError::MissingFormula(name));
        }

        Ok(Self {
            name,
            category,
            formula: cache.compile(formula),
            user,
            source: None,
        })
    }

    /// Re-instantiates a persisted user modifier.
    pub fn from_source(
        source: &ModifierSource,
        cache: &FormulaCache,
    ) -> Result<Self, ModifierError> {
        let formula = formula_text(&source.formula)
            .ok_or_else(|| ModifierError::MissingFormula(source.name.clone()))?;
        Self::new(
            source.name.clone(),
            ModifierCategory::parse_or_custom(source.category.as_deref()),
            &formula,
            true,
            cache,
        )
    }

    /// Tags the modifier with the rule that injected it (builder pattern).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Evaluates the formula against `ctx`. Never memoized.
    pub fn evaluate(&self, ctx: &Value) -> f64 {
        self.formula.resolve(ctx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ModifierCategory {
        self.category
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// True for user-authored entries.
    pub fn is_user(&self) -> bool {
        self.user
    }

    /// Rule that injected this modifier, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
