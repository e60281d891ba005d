//! Common error infrastructure for ruleset-core.
//!
//! This module provides shared types and traits used across all error types in
//! ruleset-core. Domain-specific errors (`FormulaError`, `PredicateError`,
//! `ModifierError`, `RuleError`) are defined in their respective modules
//! alongside the data they validate.
//!
//! # Design Principles
//!
//! - **Type Safety**: Each construction step has its own error type
//! - **Containment**: None of these errors ever escapes a preparation pass; the
//!   pipeline converts them into dropped rules, invalid predicates or zeroes
//! - **Severity Classification**: Errors are categorized so hosts can decide
//!   which ones to surface in authoring tools

/// Severity level of an error, used for categorization and logging.
///
/// - **Validation**: Malformed authored data (missing field, unknown tag)
/// - **Internal**: Unexpected state inconsistencies that require investigation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid authored data, should be fixed in the item/actor document.
    ///
    /// Examples: missing formula, unknown rule type, dice notation in a formula
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: non-finite arithmetic result, poisoned cache
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Where in the authored data an error originated.
///
/// Context is captured by the rule collection loop and attached to the
/// dropped-rule record so tooling can point authors at the offending entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ErrorContext {
    /// Owning item id (if applicable).
    pub item: Option<String>,

    /// Index of the rule inside the item's rule list (if applicable).
    pub rule_index: Option<usize>,

    /// Optional static message providing additional context.
    pub message: Option<&'static str>,
}

impl ErrorContext {
    /// Creates an empty error context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            item: None,
            rule_index: None,
            message: None,
        }
    }

    /// Attaches an item id to this context (builder pattern).
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Attaches a rule index to this context (builder pattern).
    #[must_use]
    pub const fn with_rule_index(mut self, index: usize) -> Self {
        self.rule_index = Some(index);
        self
    }

    /// Attaches a static message to this context (builder pattern).
    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Common trait for all ruleset-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on who has to fix it, not on impact
pub trait RulesetError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns the context information for this error, if available.
    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builder_collects_fields() {
        let ctx = ErrorContext::new()
            .with_item("belt-of-giant-strength")
            .with_rule_index(2)
            .with_message("rule dropped");

        assert_eq!(ctx.item.as_deref(), Some("belt-of-giant-strength"));
        assert_eq!(ctx.rule_index, Some(2));
        assert_eq!(ctx.message, Some("rule dropped"));
    }

    #[test]
    fn severity_labels() {
        assert_eq!(ErrorSeverity::Validation.as_str(), "validation");
        assert!(ErrorSeverity::Internal.is_internal());
        assert!(!ErrorSeverity::Validation.is_internal());
    }
}
