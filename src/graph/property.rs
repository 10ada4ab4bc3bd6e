//! Property nodes and accessor associations.
//!
//! A property is a declaration-level bundle over one or two accessor methods. The
//! accessor linkage is set at registration time (accessors are declared on the
//! same type), while the value type and the derived override edges resolve in the
//! build step. Overrides are not matched directly: a property overrides a base
//! property exactly when its accessors override that property's accessors, see
//! [`crate::graph::types::TypeNode`]'s build step.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::{
    graph::{
        identity::NodeKey,
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        types::TypeNode,
        EventNodeRc, MethodNodeRc, PropertyNodeRc, TypeNodeRc,
    },
    source::PropertyDecl,
};

use super::{event::EventNode, method::MethodNode};

/// The member an accessor method belongs to.
pub enum AssociationTarget {
    /// The accessor is a property getter or setter.
    Property(Weak<PropertyNode>),
    /// The accessor is an event adder, remover or raiser.
    Event(Weak<EventNode>),
}

/// An accessor method's back reference to its property or event.
pub struct Association {
    key: NodeKey,
    target: AssociationTarget,
}

impl Association {
    pub(crate) fn of_property(property: &PropertyNodeRc) -> Self {
        Association {
            key: property.node_key().clone(),
            target: AssociationTarget::Property(Arc::downgrade(property)),
        }
    }

    pub(crate) fn of_event(event: &EventNodeRc) -> Self {
        Association {
            key: event.node_key().clone(),
            target: AssociationTarget::Event(Arc::downgrade(event)),
        }
    }

    /// Identity of the associated member.
    #[must_use]
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// The associated property, when the accessor belongs to one.
    #[must_use]
    pub fn property(&self) -> Option<PropertyNodeRc> {
        match &self.target {
            AssociationTarget::Property(weak) => weak.upgrade(),
            AssociationTarget::Event(_) => None,
        }
    }

    /// The associated event, when the accessor belongs to one.
    #[must_use]
    pub fn event(&self) -> Option<EventNodeRc> {
        match &self.target {
            AssociationTarget::Event(weak) => weak.upgrade(),
            AssociationTarget::Property(_) => None,
        }
    }
}

/// One property in the graph.
pub struct PropertyNode {
    key: NodeKey,
    decl: Arc<PropertyDecl>,
    this: OnceLock<Weak<PropertyNode>>,
    declaring: Weak<TypeNode>,
    pub(crate) state: NodeState,
    property_type: RwLock<Option<Weak<TypeNode>>>,
    getter: OnceLock<Weak<MethodNode>>,
    setter: OnceLock<Weak<MethodNode>>,
    overrides: NodeSet<PropertyNode>,
    overridden_by: NodeSet<PropertyNode>,
    implementation_for: NodeSet<PropertyNode>,
    implemented_by: NodeSet<PropertyNode>,
    attributes: NodeSet<TypeNode>,
}

impl PropertyNode {
    pub(crate) fn new(
        key: NodeKey,
        decl: Arc<PropertyDecl>,
        declaring: &TypeNodeRc,
        state: NodeState,
    ) -> PropertyNodeRc {
        let node = Arc::new(PropertyNode {
            key,
            decl,
            this: OnceLock::new(),
            declaring: Arc::downgrade(declaring),
            state,
            property_type: RwLock::new(None),
            getter: OnceLock::new(),
            setter: OnceLock::new(),
            overrides: NodeSet::new(),
            overridden_by: NodeSet::new(),
            implementation_for: NodeSet::new(),
            implemented_by: NodeSet::new(),
            attributes: NodeSet::new(),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    fn rc(&self) -> Option<PropertyNodeRc> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// Declared property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// The type declaring this property.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeNodeRc> {
        self.declaring.upgrade()
    }

    /// The resolved value type.
    #[must_use]
    pub fn property_type(&self) -> Option<TypeNodeRc> {
        read_lock!(self.property_type)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// The getter accessor, when declared.
    #[must_use]
    pub fn getter(&self) -> Option<MethodNodeRc> {
        self.getter.get().and_then(Weak::upgrade)
    }

    /// The setter accessor, when declared.
    #[must_use]
    pub fn setter(&self) -> Option<MethodNodeRc> {
        self.setter.get().and_then(Weak::upgrade)
    }

    /// Properties this one overrides, derived from accessor override agreement.
    #[must_use]
    pub fn overrides(&self) -> Vec<PropertyNodeRc> {
        self.overrides.snapshot()
    }

    /// Properties overriding this one (back edges of `overrides`).
    #[must_use]
    pub fn overridden_by(&self) -> Vec<PropertyNodeRc> {
        self.overridden_by.snapshot()
    }

    /// Interface properties this property implements.
    #[must_use]
    pub fn implementation_for(&self) -> Vec<PropertyNodeRc> {
        self.implementation_for.snapshot()
    }

    /// Properties implementing this interface property (back edges).
    #[must_use]
    pub fn implemented_by(&self) -> Vec<PropertyNodeRc> {
        self.implemented_by.snapshot()
    }

    /// Attribute types decorating this property.
    #[must_use]
    pub fn attributes(&self) -> Vec<TypeNodeRc> {
        self.attributes.snapshot()
    }

    pub(crate) fn decl(&self) -> &Arc<PropertyDecl> {
        &self.decl
    }

    pub(crate) fn set_getter(&self, getter: &MethodNodeRc) {
        self.getter.set(Arc::downgrade(getter)).ok();
    }

    pub(crate) fn set_setter(&self, setter: &MethodNodeRc) {
        self.setter.set(Arc::downgrade(setter)).ok();
    }

    /// Record an override edge and its back edge. The single code path for
    /// property override linkage.
    pub(crate) fn link_override(&self, target: &PropertyNodeRc) {
        self.overrides.insert(target);
        if let Some(this) = self.rc() {
            target.overridden_by.insert(&this);
        }
    }

    /// Record an interface-implementation edge and its back edge.
    pub(crate) fn link_implementation(&self, interface_property: &PropertyNodeRc) {
        self.implementation_for.insert(interface_property);
        if let Some(this) = self.rc() {
            interface_property.implemented_by.insert(&this);
        }
    }

    fn resolve(&self, registry: &NodeRegistry) {
        let Some(this) = self.rc() else { return };
        let Some(declaring) = self.declaring_type() else {
            return;
        };
        let Some(module) = declaring.module() else {
            return;
        };
        let dependent: Arc<dyn GraphNode> = this;

        let resolved = registry.load_type(&self.decl.property_type, &module, Some(&declaring));
        *write_lock!(self.property_type) = Some(Arc::downgrade(&resolved));
        if !resolved.is_null() {
            resolved.add_dependent(&dependent);
        }

        for sig in &self.decl.attributes {
            let attribute = registry.load_type(sig, &module, Some(&declaring));
            if !attribute.is_null() {
                attribute.add_decoration(&dependent);
                self.attributes.insert(&attribute);
            }
        }
    }

    fn included(&self, registry: &NodeRegistry) -> bool {
        self.state.included_with(|| {
            let module = self.declaring_type().and_then(|t| t.module());
            let module_name = module.as_ref().map(|m| m.name().to_string());
            registry.rules().evaluate(&RuleTarget {
                kind: NodeKind::Property,
                name: &self.decl.name,
                key: self.key.as_str(),
                module: module_name.as_deref(),
            })
        })
    }

    /// Re-run type resolution outside the idempotence guard.
    pub fn force_rebuild(&self, registry: &NodeRegistry) {
        self.state.force();
        if self.included(registry) {
            self.resolve(registry);
        }
        self.state.finish();
    }
}

impl GraphNode for PropertyNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Property
    }

    fn state(&self) -> &NodeState {
        &self.state
    }

    fn build(&self, registry: &NodeRegistry) {
        match self.state.begin() {
            BuildClaim::Claimed => {}
            BuildClaim::InProgress | BuildClaim::Done => return,
        }
        if self.included(registry) {
            self.resolve(registry);
        }
        self.state.finish();
    }

    fn is_system(&self) -> bool {
        self.declaring_type()
            .and_then(|t| t.module())
            .map(|m| m.is_system())
            .unwrap_or(false)
    }
}
