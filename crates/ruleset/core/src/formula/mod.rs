//! Formula system for data-driven numeric values.
//!
//! Formulas let authored rule data reference the actor's own data tree:
//!
//! ```text
//! "@abilities.str.mod + 2"
//! "floor(@details.level / 2)"
//! "3"
//! ```
//!
//! Each distinct source string is parsed once into an [`Expr`] and shared
//! through [`FormulaCache`]. Resolution never fails: unparseable or
//! non-deterministic input (dice notation) resolves to 0 and is logged, so a
//! bad authored formula can never abort attribute preparation.
//!
//! ## Examples
//!
//! ```
//! # use ruleset_core::formula::FormulaCache;
//! # use serde_json::json;
//! let cache = FormulaCache::default();
//! let ctx = json!({ "abilities": { "dex": { "mod": 2 } } });
//!
//! assert_eq!(cache.compile("@abilities.dex.mod + 3").resolve(&ctx), 5.0);
//! assert_eq!(cache.compile("1d6").resolve(&ctx), 0.0);
//! ```

pub mod evaluate;
pub mod parse;

pub use evaluate::evaluate;
pub use parse::parse;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::{ErrorSeverity, RulesetError};

// ============================================================================
// Expression Tree
// ============================================================================

/// Parsed formula expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),

    /// `@path` reference into the data context.
    Path(String),

    /// Unary negation.
    Neg(Box<Expr>),

    /// Binary arithmetic.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Pure math function call.
    Call { func: Function, args: Vec<Expr> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Functions available inside formulas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Floor,
    Ceil,
    Round,
    Trunc,
    Abs,
    Sign,
    Min,
    Max,
}

impl Function {
    /// Validates the number of call arguments.
    pub fn check_arity(self, found: usize) -> Result<(), FormulaError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (found >= 1, "at least 1"),
            _ => (found == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                name: self.as_ref().to_string(),
                expected,
                found,
            })
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors produced while parsing or evaluating a formula.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula produced a non-finite result")]
    NonFinite,

    #[error("formula value must be a number or string, got {0}")]
    NotAFormula(String),

    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("formula has more than {limit} tokens")]
    TooLong { limit: usize },
}

impl RulesetError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NonFinite => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "FORMULA_EMPTY",
            Self::UnexpectedChar { .. } => "FORMULA_UNEXPECTED_CHAR",
            Self::UnexpectedToken { .. } => "FORMULA_UNEXPECTED_TOKEN",
            Self::UnexpectedEnd => "FORMULA_UNEXPECTED_END",
            Self::InvalidNumber(_) => "FORMULA_INVALID_NUMBER",
            Self::UnknownFunction(_) => "FORMULA_UNKNOWN_FUNCTION",
            Self::Arity { .. } => "FORMULA_ARITY",
            Self::DivisionByZero => "FORMULA_DIVISION_BY_ZERO",
            Self::NonFinite => "FORMULA_NON_FINITE",
            Self::NotAFormula(_) => "FORMULA_NOT_A_FORMULA",
            Self::TooDeep { .. } => "FORMULA_TOO_DEEP",
            Self::TooLong { .. } => "FORMULA_TOO_LONG",
        }
    }
}

// ============================================================================
// Formula
// ============================================================================

#[derive(Debug)]
enum Compiled {
    Literal(f64),
    Expr(Expr),
    Invalid(FormulaError),
}

/// A compiled formula. Cloning is cheap; clones share the parsed tree.
#[derive(Clone, Debug)]
pub struct Formula {
    source: Arc<str>,
    compiled: Arc<Compiled>,
    warn_missing: bool,
}

impl Formula {
    /// A formula that always resolves to `value`.
    pub fn literal(value: f64) -> Self {
        Self {
            source: Arc::from(value.to_string()),
            compiled: Arc::new(Compiled::Literal(value)),
            warn_missing: true,
        }
    }

    /// Compiles a formula, returning the parse error instead of deferring it.
    ///
    /// Used by authoring-time validation. Preparation goes through
    /// [`FormulaCache::compile`], which never fails.
    pub fn compile_strict(source: &str) -> Result<Self, FormulaError> {
        let formula = Self::compile_uncached(source, true);
        match formula.compiled.as_ref() {
            Compiled::Invalid(err) => Err(err.clone()),
            _ => Ok(formula),
        }
    }

    fn compile_uncached(source: &str, warn_missing: bool) -> Self {
        let trimmed = source.trim();
        let compiled = match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Compiled::Literal(value),
            _ => match parse(trimmed) {
                Ok(expr) => Compiled::Expr(expr),
                Err(err) => Compiled::Invalid(err),
            },
        };
        Self {
            source: Arc::from(source),
            compiled: Arc::new(compiled),
            warn_missing,
        }
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the literal value if the formula is a plain number.
    pub fn as_literal(&self) -> Option<f64> {
        match self.compiled.as_ref() {
            Compiled::Literal(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns true if the formula parsed successfully.
    pub fn is_valid(&self) -> bool {
        !matches!(self.compiled.as_ref(), Compiled::Invalid(_))
    }

    /// Returns the parse error, if any.
    pub fn error(&self) -> Option<&FormulaError> {
        match self.compiled.as_ref() {
            Compiled::Invalid(err) => Some(err),
            _ => None,
        }
    }

    /// Evaluates the formula, surfacing parse and arithmetic errors.
    pub fn try_resolve(&self, ctx: &Value) -> Result<f64, FormulaError> {
        match self.compiled.as_ref() {
            Compiled::Literal(value) => Ok(*value),
            Compiled::Expr(expr) => evaluate(expr, ctx, self.warn_missing),
            Compiled::Invalid(err) => Err(err.clone()),
        }
    }

    /// Evaluates the formula, falling back to 0 on any error.
    pub fn resolve(&self, ctx: &Value) -> f64 {
        match self.try_resolve(ctx) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    target: "ruleset::formula",
                    formula = %self.source,
                    error = %err,
                    "Formula could not be resolved, using 0"
                );
                0.0
            }
        }
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Parse-once cache keyed by formula source.
///
/// Shared across preparation passes; entries are immutable so they never go
/// stale. A poisoned lock degrades to compiling without caching.
#[derive(Debug)]
pub struct FormulaCache {
    entries: RwLock<HashMap<String, Formula>>,
    warn_missing_paths: bool,
}

impl FormulaCache {
    pub fn new(warn_missing_paths: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            warn_missing_paths,
        }
    }

    /// Returns the compiled formula for `source`, parsing it on first use.
    pub fn compile(&self, source: &str) -> Formula {
        if let Ok(entries) = self.entries.read()
            && let Some(formula) = entries.get(source)
        {
            return formula.clone();
        }

        let formula = Formula::compile_uncached(source, self.warn_missing_paths);
        if let Ok(mut entries) = self.entries.write() {
            entries
                .entry(source.to_string())
                .or_insert_with(|| formula.clone());
        }
        formula
    }

    /// Resolves a raw JSON formula value: numbers pass through unchanged,
    /// strings are compiled and evaluated, anything else resolves to 0.
    pub fn resolve_value(&self, value: &Value, ctx: &Value) -> f64 {
        match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(source) => self.compile(source).resolve(ctx),
            other => {
                tracing::error!(
                    target: "ruleset::formula",
                    error = %FormulaError::NotAFormula(other.to_string()),
                    "Formula could not be resolved, using 0"
                );
                0.0
            }
        }
    }

    /// Number of distinct sources compiled so far.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FormulaCache {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn literal_sources_skip_the_parser() {
        let cache = FormulaCache::default();
        let formula = cache.compile(" 3 ");
        assert_eq!(formula.as_literal(), Some(3.0));
        assert_eq!(formula.resolve(&json!({})), 3.0);
    }

    #[test]
    fn identical_sources_share_one_entry() {
        let cache = FormulaCache::default();
        let a = cache.compile("@abilities.dex.mod");
        let b = cache.compile("@abilities.dex.mod");
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&a.compiled, &b.compiled));
    }

    #[test]
    fn invalid_formula_resolves_to_zero() {
        let cache = FormulaCache::default();
        let formula = cache.compile("2d20kh");
        assert!(!formula.is_valid());
        assert_eq!(formula.resolve(&json!({})), 0.0);
        assert!(formula.try_resolve(&json!({})).is_err());
    }

    #[test]
    fn pathological_nesting_resolves_to_zero() {
        let cache = FormulaCache::default();
        for depth in [1_000, 5_000, 200_000] {
            let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
            let formula = cache.compile(&source);
            assert!(!formula.is_valid());
            assert_eq!(formula.resolve(&json!({})), 0.0);
        }
        assert!(matches!(
            Formula::compile_strict(&format!("{}1{}", "(".repeat(100), ")".repeat(100))),
            Err(FormulaError::TooDeep { .. })
        ));
    }

    #[test]
    fn strict_compile_reports_errors() {
        assert!(Formula::compile_strict("@abilities.str.mod + 1").is_ok());
        assert!(matches!(
            Formula::compile_strict("1d8"),
            Err(FormulaError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn resolve_value_accepts_numbers_and_strings() {
        let cache = FormulaCache::default();
        let ctx = json!({ "prof": 3 });
        assert_eq!(cache.resolve_value(&json!(4), &ctx), 4.0);
        assert_eq!(cache.resolve_value(&json!("@prof * 2"), &ctx), 6.0);
        assert_eq!(cache.resolve_value(&json!([1]), &ctx), 0.0);
    }
}
