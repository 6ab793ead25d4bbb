//! Argument-injection rules, keyed by service.

pub mod rule;

use std::collections::BTreeMap;

use rule::{OperationRule, ResolvedArgs, RuleSyntax};

/// A parsed custom tests document: service identifier to ordered rule list.
pub type RuleDocument = BTreeMap<String, Vec<RuleSyntax>>;

/// The merged rule state for a whole scan run. Mutated only while sources are
/// being merged at load time; frozen before dispatch begins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    by_service: BTreeMap<String, Vec<OperationRule>>,
}

impl RuleSet {
    /// Applies one rule source on top of the current state. A rule whose
    /// pattern is identical to an existing rule's pattern replaces it in
    /// place (the later source fully wins, arguments are not unioned);
    /// anything else is appended, preserving insertion order.
    pub fn merge(&mut self, document: RuleDocument) {
        for (service, syntaxes) in document {
            let rules = self.by_service.entry(service).or_default();
            for syntax in syntaxes {
                match rules.iter_mut().find(|r| r.pattern() == syntax.pattern) {
                    Some(existing) => *existing = OperationRule::new(syntax),
                    None => rules.push(OperationRule::new(syntax)),
                }
            }
        }
    }

    pub fn rules_for(&self, service: &str) -> &[OperationRule] {
        self.by_service.get(service).map(Vec::as_slice).unwrap_or_default()
    }

    /// The effective arguments for one operation: the first matching rule's
    /// arguments verbatim, or the empty set when nothing matches.
    pub fn arguments_for(&self, service: &str, operation: &str) -> ResolvedArgs {
        rule::resolve(self.rules_for(service), operation)
            .map(OperationRule::arguments)
            .unwrap_or_default()
    }

    pub fn num_rules(&self) -> usize {
        self.by_service.values().map(Vec::len).sum()
    }

    pub fn num_services(&self) -> usize {
        self.by_service.len()
    }
}
