//! # dotlink Prelude
//!
//! Convenient re-exports of the types nearly every user of the library touches.
//! Import this module to get the registry, node handles, declaration builders
//! and diagnostics in one line.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotlink operations
pub use crate::Error;

/// The result type used throughout dotlink
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The node registry: identity, resolution and batch processing
pub use crate::graph::NodeRegistry;

/// Inclusion/exclusion rules evaluated once per node
pub use crate::graph::{RuleTarget, Rules};

// ================================================================================================
// Graph Nodes
// ================================================================================================

/// The node contract batch processing works against
pub use crate::graph::GraphNode;

/// Node handles, one per entity kind
pub use crate::graph::{
    EventNode, FieldNode, MethodNode, ModuleNode, ParamNode, PropertyNode, TypeNode,
};

/// Reference-counted node aliases
pub use crate::graph::{
    EventNodeRc, FieldNodeRc, MethodNodeRc, ModuleNodeRc, ParamNodeRc, PropertyNodeRc, TypeNodeRc,
};

/// Type flavor and node kind tags
pub use crate::graph::{NodeKind, TypeFlavor};

// ================================================================================================
// Identity
// ================================================================================================

/// Identity keys and their constructors
pub use crate::graph::{
    array_key, generic_instance_key, generic_param_key, member_key, method_key, module_key,
    param_key, type_key, NodeKey, NULL_TYPE_KEY,
};

// ================================================================================================
// Diagnostics
// ================================================================================================

/// Fault entries and the session sink
pub use crate::graph::{Fault, FaultCategory, FaultSeverity, Faults};

// ================================================================================================
// Reader Boundary
// ================================================================================================

/// The reader traits a module source implements
pub use crate::source::{ModuleLocator, ModuleReader};

/// Declaration values and signature builders
pub use crate::source::{
    AccessorRef, EventDecl, FieldDecl, GenericParamDecl, MemberRefSig, MethodDecl, ParamDecl,
    PropertyDecl, TypeDecl, TypeRefSig,
};

/// Attribute flag sets carried on declarations
pub use crate::source::{
    GenericParamAttributes, MethodAttributes, ParamFlags, TypeAttributes,
};

/// In-memory module source for programmatic graphs and fixtures
pub use crate::source::{MemoryModule, MemorySource};
