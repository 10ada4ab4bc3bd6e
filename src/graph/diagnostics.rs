//! Fault collection for graph construction.
//!
//! Resolution over external binary data fails in many recoverable ways: referenced
//! modules that cannot be located, members that should match but do not, source data
//! that contradicts itself. The engine never lets such conditions unwind across a
//! node's build step; it records them as severity-tagged [`Fault`] entries in a
//! shared [`Faults`] sink and continues with sentinels or empty collections.
//!
//! # Key Components
//!
//! - [`Faults`] - Thread-safe container for fault entries
//! - [`Fault`] - Individual entry with severity, category and the affected node
//! - [`FaultSeverity`] - Debug, Information, Warning, Error, Critical
//! - [`FaultCategory`] - The area of the graph that raised the entry
//!
//! # Severity Semantics
//!
//! - **Debug/Information**: benign or expected conditions, e.g. re-registering an
//!   identical link.
//! - **Warning**: recoverable absence; a sentinel was substituted.
//! - **Error**: a resolution that should have succeeded but did not; the graph
//!   remains usable but is known-incomplete at that node.
//! - **Critical**: the resolution algorithm found contradictory source data
//!   (ambiguous match, disagreeing accessors, double-assigned singular link).
//!
//! # Thread Safety
//!
//! The container uses `boxcar::Vec` internally, providing lock-free concurrent
//! append operations. Multiple pool workers record faults simultaneously without
//! coordination.

use std::fmt::{self, Write};

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::graph::identity::NodeKey;

/// Severity level of a fault entry, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumCount)]
pub enum FaultSeverity {
    /// Trace-level record of an expected condition.
    Debug,

    /// Informational message, not indicating a problem.
    Information,

    /// Recoverable absence; a Missing or Null sentinel was substituted and
    /// resolution continued.
    Warning,

    /// A resolution that should have succeeded but did not. The graph stays
    /// usable but is known-incomplete at the affected node.
    Error,

    /// An internal-contract violation: the source data is contradictory
    /// (ambiguous implementation, mismatched accessor overrides, double
    /// assignment of a singular link).
    Critical,
}

/// Category indicating the area of the graph that raised a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FaultCategory {
    /// Module loading and inter-module reference resolution.
    Module,
    /// Type resolution: base types, interfaces, nesting, attributes, matching.
    Type,
    /// Method resolution: signatures, overrides, body-derived usage edges.
    Method,
    /// Field resolution.
    Field,
    /// Property resolution and accessor linkage.
    Property,
    /// Event resolution and accessor linkage.
    Event,
    /// Parameter resolution.
    Parameter,
    /// Inclusion/exclusion rule evaluation.
    Rules,
    /// Anything not fitting the other categories.
    General,
}

/// A single fault entry.
///
/// Carries the severity, the category, the identity of the node the fault is
/// attached to (when there is one) and a human-readable message.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Severity level of this fault.
    pub severity: FaultSeverity,

    /// Category indicating the source of this fault.
    pub category: FaultCategory,

    /// Identity key of the node this fault is attached to.
    pub node: Option<NodeKey>,

    /// Human-readable description of the condition.
    pub message: String,
}

impl Fault {
    /// Creates a new fault entry.
    pub fn new(
        severity: FaultSeverity,
        category: FaultCategory,
        message: impl Into<String>,
    ) -> Self {
        Fault {
            severity,
            category,
            node: None,
            message: message.into(),
        }
    }

    /// Attaches the affected node's identity key.
    #[must_use]
    pub fn on_node(mut self, node: NodeKey) -> Self {
        self.node = Some(node);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;
        if let Some(node) = &self.node {
            write!(f, " (node: {node})")?;
        }
        Ok(())
    }
}

/// Thread-safe sink collecting every fault raised during one analysis session.
///
/// The registry owns one sink and hands a shared reference to every node it
/// creates. Entries of Warning severity and above are reported through
/// [`Faults::faults`]; Debug and Information entries through [`Faults::messages`].
#[derive(Debug, Default)]
pub struct Faults {
    entries: boxcar::Vec<Fault>,
}

impl Faults {
    /// Creates a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Faults {
            entries: boxcar::Vec::new(),
        }
    }

    /// Records a fault entry.
    pub fn raise(&self, fault: Fault) {
        self.entries.push(fault);
    }

    /// Returns all entries of Warning severity and above.
    pub fn faults(&self) -> Vec<Fault> {
        self.entries
            .iter()
            .filter(|(_, f)| f.severity >= FaultSeverity::Warning)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Returns all Debug and Information entries.
    pub fn messages(&self) -> Vec<Fault> {
        self.entries
            .iter()
            .filter(|(_, f)| f.severity < FaultSeverity::Warning)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Returns every entry regardless of severity.
    pub fn all(&self) -> Vec<Fault> {
        self.entries.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Returns entries of exactly the given severity.
    pub fn by_severity(&self, severity: FaultSeverity) -> Vec<Fault> {
        self.entries
            .iter()
            .filter(|(_, f)| f.severity == severity)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Returns entries of the given category.
    pub fn by_category(&self, category: FaultCategory) -> Vec<Fault> {
        self.entries
            .iter()
            .filter(|(_, f)| f.category == category)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Returns the entries attached to one node.
    pub fn by_node(&self, node: &NodeKey) -> Vec<Fault> {
        self.entries
            .iter()
            .filter(|(_, f)| f.node.as_ref() == Some(node))
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Total number of entries.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Number of entries with the given severity.
    pub fn count_of(&self, severity: FaultSeverity) -> usize {
        self.entries
            .iter()
            .filter(|(_, f)| f.severity == severity)
            .count()
    }

    /// Returns `true` if any Error or Critical entries were recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, f)| f.severity >= FaultSeverity::Error)
    }

    /// Returns `true` if any Critical entries were recorded.
    pub fn has_criticals(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, f)| f.severity == FaultSeverity::Critical)
    }

    /// Formats a per-severity summary followed by every entry of Warning severity
    /// and above.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let counts: Vec<String> = FaultSeverity::iter()
            .map(|severity| format!("{} {}", self.count_of(severity), severity))
            .collect();
        let _ = writeln!(output, "Faults: {}", counts.join(", "));

        for fault in self.faults() {
            let _ = writeln!(output, "  {fault}");
        }

        output
    }
}

impl fmt::Display for Faults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fault_creation() {
        let fault = Fault::new(
            FaultSeverity::Warning,
            FaultCategory::Module,
            "referenced module not found",
        )
        .on_node(NodeKey::new("corelib"));

        assert_eq!(fault.severity, FaultSeverity::Warning);
        assert_eq!(fault.category, FaultCategory::Module);
        assert_eq!(fault.node.as_ref().map(NodeKey::as_str), Some("corelib"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(FaultSeverity::Debug < FaultSeverity::Information);
        assert!(FaultSeverity::Information < FaultSeverity::Warning);
        assert!(FaultSeverity::Warning < FaultSeverity::Error);
        assert!(FaultSeverity::Error < FaultSeverity::Critical);
    }

    #[test]
    fn test_faults_and_messages_split() {
        let sink = Faults::new();
        sink.raise(Fault::new(FaultSeverity::Debug, FaultCategory::Type, "dup link"));
        sink.raise(Fault::new(
            FaultSeverity::Information,
            FaultCategory::Type,
            "upgraded missing node",
        ));
        sink.raise(Fault::new(
            FaultSeverity::Warning,
            FaultCategory::Module,
            "module not found",
        ));
        sink.raise(Fault::new(
            FaultSeverity::Error,
            FaultCategory::Method,
            "unmatched interface member",
        ));
        sink.raise(Fault::new(
            FaultSeverity::Critical,
            FaultCategory::Property,
            "accessors disagree",
        ));

        assert_eq!(sink.count(), 5);
        assert_eq!(sink.messages().len(), 2);
        assert_eq!(sink.faults().len(), 3);
        assert!(sink.has_errors());
        assert!(sink.has_criticals());
    }

    #[test]
    fn test_by_node_filter() {
        let sink = Faults::new();
        let key = NodeKey::new("[app]App.Widget");
        sink.raise(
            Fault::new(FaultSeverity::Error, FaultCategory::Type, "no base").on_node(key.clone()),
        );
        sink.raise(Fault::new(FaultSeverity::Error, FaultCategory::Type, "other"));

        assert_eq!(sink.by_node(&key).len(), 1);
    }

    #[test]
    fn test_thread_safety() {
        let sink = Arc::new(Faults::new());
        let mut handles = vec![];

        for i in 0..10 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                sink.raise(Fault::new(
                    FaultSeverity::Warning,
                    FaultCategory::General,
                    format!("worker {i}"),
                ));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.count(), 10);
    }

    #[test]
    fn test_summary_contains_counts() {
        let sink = Faults::new();
        sink.raise(Fault::new(
            FaultSeverity::Warning,
            FaultCategory::Module,
            "module not found",
        ));

        let summary = sink.summary();
        assert!(summary.contains("1 Warning"));
        assert!(summary.contains("module not found"));
    }
}
