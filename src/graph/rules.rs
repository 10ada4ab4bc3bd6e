//! Inclusion and exclusion rules.
//!
//! Rules decide, once per node, whether deep resolution proceeds. Exclusion rules
//! are OR-combined with short-circuit: the first matching exclusion settles the
//! question. Inclusion rules are AND-combined: every inclusion rule must accept the
//! node. A node excluded once is permanently excluded (the result is cached in the
//! node's state, see [`crate::graph::NodeState::included_with`]).
//!
//! # Examples
//!
//! ```rust
//! use dotlink::graph::{NodeKind, Rules};
//!
//! let rules = Rules::new()
//!     .exclude(|target| target.module == Some("corelib"))
//!     .include(|target| !target.name.starts_with("<"));
//! ```

use crate::graph::node::NodeKind;

/// The facts about a node a rule predicate may consult.
#[derive(Debug, Clone, Copy)]
pub struct RuleTarget<'a> {
    /// Kind of the node under evaluation.
    pub kind: NodeKind,
    /// Simple declared name.
    pub name: &'a str,
    /// Full identity key.
    pub key: &'a str,
    /// Name of the owning module, when the node has one.
    pub module: Option<&'a str>,
}

/// A rule predicate.
pub type RuleFn = dyn Fn(&RuleTarget<'_>) -> bool + Send + Sync;

/// The rule engine: an ordered list of exclusions and inclusions.
#[derive(Default)]
pub struct Rules {
    excludes: Vec<Box<RuleFn>>,
    includes: Vec<Box<RuleFn>>,
}

impl Rules {
    /// Create an engine with no rules; every node is included.
    #[must_use]
    pub fn new() -> Self {
        Rules {
            excludes: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// Add an exclusion rule. A node matching any exclusion is excluded.
    #[must_use]
    pub fn exclude(mut self, rule: impl Fn(&RuleTarget<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.excludes.push(Box::new(rule));
        self
    }

    /// Add an inclusion rule. A node must match every inclusion rule to be
    /// included.
    #[must_use]
    pub fn include(mut self, rule: impl Fn(&RuleTarget<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.includes.push(Box::new(rule));
        self
    }

    /// Evaluate the rules for one node. Exclusions first, short-circuit on the
    /// first match; then all inclusions must accept.
    #[must_use]
    pub fn evaluate(&self, target: &RuleTarget<'_>) -> bool {
        if self.excludes.iter().any(|rule| rule(target)) {
            return false;
        }
        self.includes.iter().all(|rule| rule(target))
    }

    /// Number of registered rules, exclusions plus inclusions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.excludes.len() + self.includes.len()
    }

    /// Returns `true` when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty() && self.includes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target<'a>(kind: NodeKind, name: &'a str, module: Option<&'a str>) -> RuleTarget<'a> {
        RuleTarget {
            kind,
            name,
            key: name,
            module,
        }
    }

    #[test]
    fn test_empty_rules_include_everything() {
        let rules = Rules::new();
        assert!(rules.evaluate(&target(NodeKind::Type, "Widget", Some("app"))));
    }

    #[test]
    fn test_exclusion_short_circuits() {
        let rules = Rules::new()
            .exclude(|t| t.module == Some("corelib"))
            .exclude(|_| panic!("second exclusion must not run"));

        assert!(!rules.evaluate(&target(NodeKind::Type, "Object", Some("corelib"))));
    }

    #[test]
    fn test_inclusions_are_and_combined() {
        let rules = Rules::new()
            .include(|t| t.kind == NodeKind::Type)
            .include(|t| !t.name.is_empty());

        assert!(rules.evaluate(&target(NodeKind::Type, "Widget", None)));
        assert!(!rules.evaluate(&target(NodeKind::Method, "Widget", None)));
        assert!(!rules.evaluate(&target(NodeKind::Type, "", None)));
    }

    #[test]
    fn test_exclusion_beats_inclusion() {
        let rules = Rules::new()
            .include(|_| true)
            .exclude(|t| t.name == "Hidden");

        assert!(!rules.evaluate(&target(NodeKind::Type, "Hidden", None)));
        assert!(rules.evaluate(&target(NodeKind::Type, "Visible", None)));
    }
}
