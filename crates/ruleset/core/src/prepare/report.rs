use crate::error::{ErrorContext, RulesetError};
use crate::rules::RuleError;

/// Summary of one preparation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreparationReport {
    /// Rules constructed successfully (including disabled ones).
    pub rules_built: usize,
    /// Hook invocations in which a rule acted.
    pub rules_applied: usize,
    /// Constructed rules discarded because they are disabled.
    pub disabled: usize,
    /// Raw rules skipped because they are ignored.
    pub ignored: usize,
    /// Raw rules that failed to construct.
    pub dropped: Vec<DroppedRule>,
}

impl PreparationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// A raw rule that could not be constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DroppedRule {
    pub item_id: String,
    pub index: usize,
    /// Authored type tag.
    pub kind: String,
    pub code: String,
    pub error: String,
}

impl DroppedRule {
    pub(crate) fn new(item_id: &str, index: usize, kind: &str, error: &RuleError) -> Self {
        Self {
            item_id: item_id.to_string(),
            index,
            kind: kind.to_string(),
            code: error.error_code().to_string(),
            error: error.to_string(),
        }
    }

    /// Location of the offending entry.
    pub fn context(&self) -> ErrorContext {
        ErrorContext::new()
            .with_item(self.item_id.clone())
            .with_rule_index(self.index)
            .with_message("rule dropped")
    }
}
