//! Rule syntax and matching for argument injection.
//!
//! A rule pairs an operation pattern with the arguments to inject when that
//! operation is invoked. Patterns match either the exact operation name or a
//! prefix of it, and rule sequences are evaluated first-match-wins: operators
//! are expected to order specific rules above generic ones. The resolver does
//! no longest-prefix or specificity scoring on purpose; that linear policy is
//! documented and tested, not an accident.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The on-disk shape of a single rule inside a custom tests document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSyntax {
    /// Exact operation name or prefix to match.
    pub pattern: String,

    /// Positional argument values, passed through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,

    /// Named argument values, passed through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kwargs: BTreeMap<String, Value>,
}

/// A compiled rule. Immutable once loading finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRule {
    syntax: RuleSyntax,
}

impl OperationRule {
    pub fn new(syntax: RuleSyntax) -> Self {
        Self { syntax }
    }

    pub fn pattern(&self) -> &str {
        &self.syntax.pattern
    }

    /// An exact match is a prefix match of equal length, so one check covers
    /// both pattern kinds.
    pub fn matches(&self, operation: &str) -> bool {
        operation.starts_with(self.syntax.pattern.as_str())
    }

    pub fn arguments(&self) -> ResolvedArgs {
        ResolvedArgs {
            positional: self.syntax.args.clone(),
            named: self.syntax.kwargs.clone(),
        }
    }

    pub fn syntax(&self) -> &RuleSyntax {
        &self.syntax
    }
}

/// The effective argument set for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArgs {
    pub positional: Vec<Value>,
    pub named: BTreeMap<String, Value>,
}

impl ResolvedArgs {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Scans the rule sequence in order and returns the first rule matching the
/// operation name, if any.
pub fn resolve<'r>(rules: &'r [OperationRule], operation: &str) -> Option<&'r OperationRule> {
    rules.iter().find(|rule| rule.matches(operation))
}
