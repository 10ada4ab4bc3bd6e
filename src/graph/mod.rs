//! The cross-reference graph engine.
//!
//! Everything the loaded modules declare and reference becomes one node in a
//! deduplicated, cross-linked graph: modules, types in every flavor, methods,
//! fields, properties, events and parameters. The [`NodeRegistry`] is the entry
//! point - it owns the caches, guarantees one node per identity, resolves
//! reference signatures and drives batch processing.
//!
//! # Architecture
//!
//! ```text
//! NodeRegistry
//!   |- per-kind caches (identity key -> Arc<node>)
//!   |- Faults sink (shared by every node)
//!   |- Rules (inclusion/exclusion, evaluated once per node)
//!   `- worker pool (bounded, for parallel batches)
//!
//! ModuleNode --declares--> TypeNode --declares--> Method/Field/Property/Event
//!                              |                        |
//!                         base/interfaces/...      result/params/usage
//!                         (+ back edges)           (+ dependent back edges)
//! ```
//!
//! Nodes hold their edges as weak references; the registry caches hold the
//! strong ones. Dropping the registry tears the whole graph down regardless of
//! reference cycles between nodes.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotlink::graph::NodeRegistry;
//! use dotlink::source::{MemoryModule, MemorySource, TypeDecl, TypeRefSig};
//!
//! let source = MemorySource::new().with_module(
//!     MemoryModule::new("app")
//!         .with_type(TypeDecl::new("App", "Widget").with_base(TypeRefSig::named("App.Base")))
//!         .with_type(TypeDecl::new("App", "Base")),
//! );
//!
//! let registry = NodeRegistry::new(Arc::new(source));
//! registry.load_module_by_name("app");
//! registry.process_all(true, false);
//!
//! let widget = registry.get_module("app").unwrap().type_by_name("App.Widget", &registry).unwrap();
//! assert_eq!(widget.base().unwrap().full_name(), "App.Base");
//! ```

pub(crate) mod diagnostics;
pub(crate) mod event;
pub(crate) mod field;
pub(crate) mod identity;
pub(crate) mod method;
pub(crate) mod module;
pub(crate) mod node;
pub(crate) mod property;
pub(crate) mod refset;
pub(crate) mod registry;
pub(crate) mod rules;
pub(crate) mod types;

use std::sync::Arc;

pub use diagnostics::{Fault, FaultCategory, FaultSeverity, Faults};
pub use event::EventNode;
pub use field::FieldNode;
pub use identity::{
    array_key, generic_instance_key, generic_param_key, member_key, method_key, module_key,
    param_key, type_key, NodeKey, NULL_TYPE_KEY,
};
pub use method::{MethodNode, ParamNode};
pub use module::ModuleNode;
pub use node::{BuildClaim, BuildState, GraphNode, NodeKind, NodeState};
pub use property::{Association, AssociationTarget, PropertyNode};
pub use refset::NodeSet;
pub use registry::NodeRegistry;
pub use rules::{RuleFn, RuleTarget, Rules};
pub use types::{TypeFlavor, TypeNode};

/// Reference-counted module node handle.
pub type ModuleNodeRc = Arc<ModuleNode>;
/// Reference-counted type node handle.
pub type TypeNodeRc = Arc<TypeNode>;
/// Reference-counted method node handle.
pub type MethodNodeRc = Arc<MethodNode>;
/// Reference-counted field node handle.
pub type FieldNodeRc = Arc<FieldNode>;
/// Reference-counted property node handle.
pub type PropertyNodeRc = Arc<PropertyNode>;
/// Reference-counted event node handle.
pub type EventNodeRc = Arc<EventNode>;
/// Reference-counted parameter node handle.
pub type ParamNodeRc = Arc<ParamNode>;
