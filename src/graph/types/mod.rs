//! Type nodes and their flavors.
//!
//! A [`TypeNode`] represents one type identity in the cross-reference graph. One
//! concrete representation covers every flavor - ordinary types, arrays, generic
//! instantiations, generic parameters and the Missing/Null sentinels - with a
//! closed [`TypeFlavor`] tag deciding which accessors are meaningful and which
//! build step runs. The set of flavors is deliberately closed; variants differ
//! only in the handful of behaviors their build steps override.
//!
//! # Sentinels
//!
//! - **Missing**: identity is known but no declaration is available (the defining
//!   module could not be located, or the type is not declared where the reference
//!   claims). Every mutating registration on a missing node raises a fault instead
//!   of updating state.
//! - **Null**: the absence of a reference. The Null node is permanently excluded
//!   and its base-type edge points to itself, so base-chain walks terminate on it
//!   without looping.
//!
//! # Edges
//!
//! All forward edges have a matching back edge registered through a single code
//! path: interfaces gain `implementations` entries, base types gain `subtypes`,
//! declaring types gain `nested_in`, attribute types gain `decorates`, and used
//! types gain `dependents`. The graph is bidirectionally walkable without
//! re-scanning declarations.

mod build;
pub(crate) mod matching;

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::{
    graph::{
        diagnostics::{Fault, FaultCategory, FaultSeverity},
        identity::NodeKey,
        module::ModuleNode,
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        EventNodeRc, FieldNodeRc, MethodNodeRc, ModuleNodeRc, PropertyNodeRc, TypeNodeRc,
    },
    source::{GenericParamAttributes, GenericParamDecl, TypeAttributes, TypeDecl},
};

use super::{event::EventNode, field::FieldNode, method::MethodNode, property::PropertyNode};

/// The closed set of type node flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFlavor {
    /// A plain declared or referenced type.
    Ordinary,
    /// An array over an element type.
    Array {
        /// Number of dimensions, 1 for a vector
        rank: u8,
    },
    /// A generic instantiation of an open generic definition.
    GenericInstance,
    /// A generic parameter of a declaring type.
    GenericParameter,
    /// Identity known, declaration unavailable.
    Missing,
    /// The absence of a reference.
    Null,
}

/// One type in the cross-reference graph.
///
/// Requesting the same identity key from the registry twice always returns the
/// same `TypeNode` instance; all edges below are therefore shared, append-only
/// state mutated under per-node synchronization.
pub struct TypeNode {
    key: NodeKey,
    namespace: String,
    name: String,
    /// Full dotted name, nested segments separated by `/`.
    path: String,
    flavor: RwLock<TypeFlavor>,
    this: OnceLock<Weak<TypeNode>>,
    module: OnceLock<Weak<ModuleNode>>,
    decl: RwLock<Option<Arc<TypeDecl>>>,
    generic_decl: OnceLock<Arc<GenericParamDecl>>,
    flags: OnceLock<TypeAttributes>,
    pub(crate) state: NodeState,

    base: RwLock<Option<Weak<TypeNode>>>,
    subtypes: NodeSet<TypeNode>,
    interfaces: NodeSet<TypeNode>,
    implementations: NodeSet<TypeNode>,
    nested: NodeSet<TypeNode>,
    nested_in: RwLock<Option<Weak<TypeNode>>>,
    fields: NodeSet<FieldNode>,
    methods: NodeSet<MethodNode>,
    properties: NodeSet<PropertyNode>,
    events: NodeSet<EventNode>,
    generic_params: NodeSet<TypeNode>,
    generic_args: boxcar::Vec<Weak<TypeNode>>,
    element: OnceLock<Weak<TypeNode>>,
    definition: OnceLock<Weak<TypeNode>>,
    generic_owner: OnceLock<Weak<TypeNode>>,
    constraints: NodeSet<TypeNode>,
    attributes: NodeSet<TypeNode>,
    decorates: NodeSet<dyn GraphNode>,
    dependents: NodeSet<dyn GraphNode>,
}

impl TypeNode {
    /// Create a type node. The node registers a weak self-reference so edge
    /// registration can hand out back edges.
    pub(crate) fn new(
        key: NodeKey,
        path: impl Into<String>,
        flavor: TypeFlavor,
        state: NodeState,
    ) -> TypeNodeRc {
        let path = path.into();
        let (namespace, name) = split_path(&path);
        let node = Arc::new(TypeNode {
            key,
            namespace,
            name,
            path,
            flavor: RwLock::new(flavor),
            this: OnceLock::new(),
            module: OnceLock::new(),
            decl: RwLock::new(None),
            generic_decl: OnceLock::new(),
            flags: OnceLock::new(),
            state,
            base: RwLock::new(None),
            subtypes: NodeSet::new(),
            interfaces: NodeSet::new(),
            implementations: NodeSet::new(),
            nested: NodeSet::new(),
            nested_in: RwLock::new(None),
            fields: NodeSet::new(),
            methods: NodeSet::new(),
            properties: NodeSet::new(),
            events: NodeSet::new(),
            generic_params: NodeSet::new(),
            generic_args: boxcar::Vec::new(),
            element: OnceLock::new(),
            definition: OnceLock::new(),
            generic_owner: OnceLock::new(),
            constraints: NodeSet::new(),
            attributes: NodeSet::new(),
            decorates: NodeSet::new(),
            dependents: NodeSet::new(),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    /// Create the Null sentinel: permanently excluded, base edge pointing to
    /// itself so base-chain walks terminate.
    pub(crate) fn new_null(key: NodeKey, state: NodeState) -> TypeNodeRc {
        let node = TypeNode::new(key, "<null>", TypeFlavor::Null, state);
        *write_lock!(node.base) = Some(Arc::downgrade(&node));
        node
    }

    /// The strong handle to this node, while the owning registry is alive.
    pub(crate) fn rc(&self) -> Option<TypeNodeRc> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// Simple declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, empty for the global namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full dotted name (`Namespace.Name`), nested segments separated by `/`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.path
    }

    /// Current flavor of this node. A Missing node is upgraded to Ordinary when
    /// its declaration becomes available through a later module load.
    #[must_use]
    pub fn flavor(&self) -> TypeFlavor {
        *read_lock!(self.flavor)
    }

    /// Returns `true` for the Missing sentinel flavor.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.flavor() == TypeFlavor::Missing
    }

    /// Returns `true` for the Null sentinel flavor.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.flavor() == TypeFlavor::Null
    }

    /// Whether this type is an interface: `Some(true)`/`Some(false)` when known
    /// definitively, `None` when no declaration is available.
    #[must_use]
    pub fn is_interface(&self) -> Option<bool> {
        match self.flavor() {
            TypeFlavor::Ordinary => self
                .flags
                .get()
                .map(|flags| flags.contains(TypeAttributes::INTERFACE)),
            TypeFlavor::GenericInstance => self.definition().and_then(|def| def.is_interface()),
            TypeFlavor::Array { .. } | TypeFlavor::GenericParameter | TypeFlavor::Null => {
                Some(false)
            }
            TypeFlavor::Missing => None,
        }
    }

    /// Declared attribute flags, when a declaration is available.
    #[must_use]
    pub fn type_flags(&self) -> Option<TypeAttributes> {
        self.flags.get().copied()
    }

    /// The module this type belongs to.
    #[must_use]
    pub fn module(&self) -> Option<ModuleNodeRc> {
        self.module.get().and_then(Weak::upgrade)
    }

    /// The base-type edge. Never `None` after the build step: unresolved bases
    /// point to the Null or a Missing sentinel.
    #[must_use]
    pub fn base(&self) -> Option<TypeNodeRc> {
        read_lock!(self.base).as_ref().and_then(Weak::upgrade)
    }

    /// Types deriving from this one (back edges of `base`).
    #[must_use]
    pub fn subtypes(&self) -> Vec<TypeNodeRc> {
        self.subtypes.snapshot()
    }

    /// Interfaces this type implements.
    #[must_use]
    pub fn interfaces(&self) -> Vec<TypeNodeRc> {
        self.interfaces.snapshot()
    }

    /// Types implementing this interface (back edges of `interfaces`).
    #[must_use]
    pub fn implementations(&self) -> Vec<TypeNodeRc> {
        self.implementations.snapshot()
    }

    /// Types nested inside this one.
    #[must_use]
    pub fn nested_types(&self) -> Vec<TypeNodeRc> {
        self.nested.snapshot()
    }

    /// The type this one is nested in, when it is a nested type.
    #[must_use]
    pub fn nested_in(&self) -> Option<TypeNodeRc> {
        read_lock!(self.nested_in).as_ref().and_then(Weak::upgrade)
    }

    /// Field nodes declared by (or copied onto) this type.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldNodeRc> {
        self.fields.snapshot()
    }

    /// Method nodes declared by (or copied onto) this type.
    #[must_use]
    pub fn methods(&self) -> Vec<MethodNodeRc> {
        self.methods.snapshot()
    }

    /// Property nodes declared by (or copied onto) this type.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyNodeRc> {
        self.properties.snapshot()
    }

    /// Event nodes declared by (or copied onto) this type.
    #[must_use]
    pub fn events(&self) -> Vec<EventNodeRc> {
        self.events.snapshot()
    }

    /// Generic parameter nodes this type declares.
    #[must_use]
    pub fn generic_params(&self) -> Vec<TypeNodeRc> {
        self.generic_params.snapshot()
    }

    /// Concrete type arguments, for a generic instantiation.
    #[must_use]
    pub fn generic_args(&self) -> Vec<TypeNodeRc> {
        self.generic_args
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    /// The element type, for an array.
    #[must_use]
    pub fn element(&self) -> Option<TypeNodeRc> {
        self.element.get().and_then(Weak::upgrade)
    }

    /// The open generic definition, for a generic instantiation.
    #[must_use]
    pub fn definition(&self) -> Option<TypeNodeRc> {
        self.definition.get().and_then(Weak::upgrade)
    }

    /// The type declaring this generic parameter, for a generic parameter.
    #[must_use]
    pub fn generic_owner(&self) -> Option<TypeNodeRc> {
        self.generic_owner.get().and_then(Weak::upgrade)
    }

    /// Constraint types, for a generic parameter.
    #[must_use]
    pub fn constraints(&self) -> Vec<TypeNodeRc> {
        self.constraints.snapshot()
    }

    /// Whether a generic parameter carries the default-constructor constraint.
    #[must_use]
    pub fn has_default_constructor_constraint(&self) -> bool {
        self.generic_decl
            .get()
            .map(|decl| {
                decl.flags
                    .contains(GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT)
            })
            .unwrap_or(false)
    }

    /// Attribute types decorating this type.
    #[must_use]
    pub fn attributes(&self) -> Vec<TypeNodeRc> {
        self.attributes.snapshot()
    }

    /// Nodes this attribute type decorates (back edges of attribute resolution).
    #[must_use]
    pub fn decorates(&self) -> Vec<Arc<dyn GraphNode>> {
        self.decorates.snapshot()
    }

    /// Nodes whose fields, results, parameters, locals or caught exceptions use
    /// this type.
    #[must_use]
    pub fn dependents(&self) -> Vec<Arc<dyn GraphNode>> {
        self.dependents.snapshot()
    }

    /// All methods with the given declared name.
    #[must_use]
    pub fn methods_by_name(&self, name: &str) -> Vec<MethodNodeRc> {
        self.methods
            .snapshot()
            .into_iter()
            .filter(|m| m.name() == name)
            .collect()
    }

    /// The single method with the given name whose resolved parameter type
    /// identities match `param_type_keys` exactly, in order. Parameter types are
    /// resolved through the registry, so two references spelling the same type
    /// differently still compare equal.
    #[must_use]
    pub fn method_with_params(
        &self,
        name: &str,
        param_type_keys: &[NodeKey],
        registry: &NodeRegistry,
    ) -> Option<MethodNodeRc> {
        self.methods_by_name(name).into_iter().find(|m| {
            let keys = m.resolved_param_keys(registry);
            keys.len() == param_type_keys.len()
                && keys.iter().zip(param_type_keys).all(|(a, b)| a == b)
        })
    }

    /// Walk the base-type chain starting at this node, ending at (and including)
    /// the first sentinel or repeated node.
    #[must_use]
    pub fn base_chain(&self) -> Vec<TypeNodeRc> {
        let mut chain = Vec::new();
        let mut current = self.base();
        while let Some(node) = current {
            let repeat = chain
                .iter()
                .any(|seen: &TypeNodeRc| seen.node_key() == node.node_key());
            let stop = repeat || node.is_null() || node.is_missing();
            if !repeat {
                chain.push(node.clone());
            }
            if stop {
                break;
            }
            current = node.base();
        }
        chain
    }

    // -- registration-time wiring ------------------------------------------------

    /// Attach the declaration of this type, set once per module registration.
    /// A Missing node gains its declaration this way when the defining module is
    /// loaded later; the caller is expected to force a rebuild afterwards.
    pub(crate) fn attach_decl(&self, decl: Arc<TypeDecl>, module: &ModuleNodeRc) {
        if self.is_missing() {
            *write_lock!(self.flavor) = TypeFlavor::Ordinary;
            self.state.raise(
                Fault::new(
                    FaultSeverity::Information,
                    FaultCategory::Type,
                    format!("declaration for missing type became available in '{}'", module.name()),
                )
                .on_node(self.key.clone()),
            );
        }
        self.flags.set(decl.flags).ok();
        self.module.set(Arc::downgrade(module)).ok();
        let mut slot = write_lock!(self.decl);
        if slot.is_some() {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Debug,
                    FaultCategory::Type,
                    "duplicate declaration ignored",
                )
                .on_node(self.key.clone()),
            );
            return;
        }
        *slot = Some(decl);
    }

    /// Attach the declaration of a generic parameter node.
    pub(crate) fn attach_generic_decl(&self, decl: Arc<GenericParamDecl>, module: &ModuleNodeRc) {
        self.generic_decl.set(decl).ok();
        self.module.set(Arc::downgrade(module)).ok();
    }

    /// Set the owning module without a declaration (sentinels, constructed types).
    pub(crate) fn set_module(&self, module: &ModuleNodeRc) {
        self.module.set(Arc::downgrade(module)).ok();
    }

    pub(crate) fn set_element(&self, element: &TypeNodeRc) {
        self.element.set(Arc::downgrade(element)).ok();
    }

    pub(crate) fn set_definition(&self, definition: &TypeNodeRc) {
        self.definition.set(Arc::downgrade(definition)).ok();
    }

    pub(crate) fn push_generic_arg(&self, argument: &TypeNodeRc) {
        self.generic_args.push(Arc::downgrade(argument));
    }

    pub(crate) fn set_generic_owner(&self, owner: &TypeNodeRc) {
        self.generic_owner.set(Arc::downgrade(owner)).ok();
    }

    /// Set the base edge without a subtype back edge, for edges copied from an
    /// element or generic definition.
    pub(crate) fn copy_base(&self, base: &TypeNodeRc) {
        *write_lock!(self.base) = Some(Arc::downgrade(base));
    }

    pub(crate) fn add_field(&self, field: &FieldNodeRc) -> bool {
        self.fields.insert(field)
    }

    pub(crate) fn add_method(&self, method: &MethodNodeRc) -> bool {
        self.methods.insert(method)
    }

    pub(crate) fn add_property(&self, property: &PropertyNodeRc) -> bool {
        self.properties.insert(property)
    }

    pub(crate) fn add_event(&self, event: &EventNodeRc) -> bool {
        self.events.insert(event)
    }

    pub(crate) fn add_generic_param(&self, param: &TypeNodeRc) -> bool {
        self.generic_params.insert(param)
    }

    pub(crate) fn decl(&self) -> Option<Arc<TypeDecl>> {
        read_lock!(self.decl).clone()
    }

    pub(crate) fn generic_decl(&self) -> Option<Arc<GenericParamDecl>> {
        self.generic_decl.get().cloned()
    }

    // -- edge registration -------------------------------------------------------

    /// Raises a fault and returns `true` when this node is a sentinel that
    /// converts mutations into faults instead of updating state.
    fn reject_sentinel_mutation(&self, operation: &str) -> bool {
        match self.flavor() {
            TypeFlavor::Missing | TypeFlavor::Null => {
                self.state.raise(
                    Fault::new(
                        FaultSeverity::Information,
                        FaultCategory::Type,
                        format!("'{operation}' ignored on sentinel type"),
                    )
                    .on_node(self.key.clone()),
                );
                true
            }
            _ => false,
        }
    }

    /// Set the base edge and register the subtype back edge on the target.
    /// The single code path for base linkage.
    pub(crate) fn link_base(&self, base: &TypeNodeRc) {
        if self.reject_sentinel_mutation("set base") {
            return;
        }
        *write_lock!(self.base) = Some(Arc::downgrade(base));
        if !base.is_null() {
            if let Some(this) = self.rc() {
                base.add_subtype(&this);
            }
        }
    }

    /// Register a type deriving from this one.
    pub(crate) fn add_subtype(&self, subtype: &TypeNodeRc) {
        if self.reject_sentinel_mutation("add subtype") {
            return;
        }
        if !self.subtypes.insert(subtype) {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Debug,
                    FaultCategory::Type,
                    format!("subtype '{}' already registered", subtype.node_key()),
                )
                .on_node(self.key.clone()),
            );
        }
    }

    /// Record an interface edge and its reverse implementation edge. The single
    /// code path for interface linkage: the reverse direction is never
    /// independently settable.
    pub(crate) fn link_interface(&self, interface: &TypeNodeRc) {
        if self.reject_sentinel_mutation("add interface") {
            return;
        }
        self.interfaces.insert(interface);
        if let Some(this) = self.rc() {
            interface.add_implementation(&this);
        }
    }

    /// Register a type implementing this interface.
    ///
    /// # Panics
    /// Panics when this type is definitively known not to be an interface; that is
    /// caller misuse, not a data error, and is allowed to propagate.
    pub(crate) fn add_implementation(&self, implementor: &TypeNodeRc) {
        if self.reject_sentinel_mutation("add implementation") {
            return;
        }
        assert!(
            self.is_interface() != Some(false),
            "implementation registered on non-interface type '{}'",
            self.key
        );
        if !self.implementations.insert(implementor) {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Debug,
                    FaultCategory::Type,
                    format!("implementation '{}' already registered", implementor.node_key()),
                )
                .on_node(self.key.clone()),
            );
        }
    }

    /// Record a nesting edge and its reverse. The single code path for nesting.
    pub(crate) fn link_nested(&self, nested: &TypeNodeRc) {
        if self.reject_sentinel_mutation("add nested type") {
            return;
        }
        self.nested.insert(nested);
        if let Some(this) = self.rc() {
            *write_lock!(nested.nested_in) = Some(Arc::downgrade(&this));
        }
    }

    /// Register an interface edge copied from an element or generic definition.
    pub(crate) fn copy_interface(&self, interface: &TypeNodeRc) {
        self.interfaces.insert(interface);
    }

    /// Record that this attribute type decorates `target`.
    pub(crate) fn add_decoration(&self, target: &Arc<dyn GraphNode>) {
        if self.reject_sentinel_mutation("add decoration") {
            return;
        }
        if !self.decorates.insert(target) {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Debug,
                    FaultCategory::Type,
                    format!("decoration target '{}' already registered", target.node_key()),
                )
                .on_node(self.key.clone()),
            );
        }
    }

    /// Record an attribute edge on the decorated side.
    pub(crate) fn add_attribute(&self, attribute: &TypeNodeRc) {
        self.attributes.insert(attribute);
    }

    /// Register a node that uses this type (field/result/parameter/local/caught
    /// exception).
    pub(crate) fn add_dependent(&self, dependent: &Arc<dyn GraphNode>) {
        if self.reject_sentinel_mutation("add dependent") {
            return;
        }
        self.dependents.insert(dependent);
    }

    /// Record a constraint edge, for a generic parameter.
    pub(crate) fn add_constraint(&self, constraint: &TypeNodeRc) {
        self.constraints.insert(constraint);
    }

    fn rule_target_included(&self, registry: &NodeRegistry) -> bool {
        self.state.included_with(|| {
            let module = self.module();
            let module_name = module.as_ref().map(|m| m.name().to_string());
            registry.rules().evaluate(&RuleTarget {
                kind: NodeKind::Type,
                name: &self.name,
                key: self.key.as_str(),
                module: module_name.as_deref(),
            })
        })
    }

    /// Re-run the build step outside the idempotence guard, refreshing edges after
    /// upstream data became available (e.g. a sibling module loaded later).
    pub fn force_rebuild(&self, registry: &NodeRegistry) {
        self.state.force();
        if self.rule_target_included(registry) {
            self.resolve(registry);
        }
        self.state.finish();
    }
}

impl GraphNode for TypeNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Type
    }

    fn state(&self) -> &NodeState {
        &self.state
    }

    fn build(&self, registry: &NodeRegistry) {
        match self.state.begin() {
            BuildClaim::Claimed => {}
            BuildClaim::InProgress | BuildClaim::Done => return,
        }
        if self.rule_target_included(registry) {
            self.resolve(registry);
        }
        self.state.finish();
    }

    fn is_system(&self) -> bool {
        self.module().map(|m| m.is_system()).unwrap_or(false)
    }
}

/// Split a full dotted path into namespace and simple name.
pub(crate) fn split_path(path: &str) -> (String, String) {
    let tail = path.rsplit('/').next().unwrap_or(path);
    match tail.rsplit_once('.') {
        Some((namespace, name)) if path.rsplit('/').count() == 1 => {
            (namespace.to_string(), name.to_string())
        }
        _ => (String::new(), tail.to_string()),
    }
}
