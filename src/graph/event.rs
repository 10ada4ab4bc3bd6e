//! Event nodes.
//!
//! Events mirror properties: a declaration-level bundle over up to three accessor
//! methods (adder, remover, raiser), with the handler type and derived override
//! edges resolved in the build step.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::{
    graph::{
        identity::NodeKey,
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        types::TypeNode,
        EventNodeRc, MethodNodeRc, TypeNodeRc,
    },
    source::EventDecl,
};

use super::method::MethodNode;

/// One event in the graph.
pub struct EventNode {
    key: NodeKey,
    decl: Arc<EventDecl>,
    this: OnceLock<Weak<EventNode>>,
    declaring: Weak<TypeNode>,
    pub(crate) state: NodeState,
    event_type: RwLock<Option<Weak<TypeNode>>>,
    adder: OnceLock<Weak<MethodNode>>,
    remover: OnceLock<Weak<MethodNode>>,
    raiser: OnceLock<Weak<MethodNode>>,
    overrides: NodeSet<EventNode>,
    overridden_by: NodeSet<EventNode>,
    implementation_for: NodeSet<EventNode>,
    implemented_by: NodeSet<EventNode>,
    attributes: NodeSet<TypeNode>,
}

impl EventNode {
    pub(crate) fn new(
        key: NodeKey,
        decl: Arc<EventDecl>,
        declaring: &TypeNodeRc,
        state: NodeState,
    ) -> EventNodeRc {
        let node = Arc::new(EventNode {
            key,
            decl,
            this: OnceLock::new(),
            declaring: Arc::downgrade(declaring),
            state,
            event_type: RwLock::new(None),
            adder: OnceLock::new(),
            remover: OnceLock::new(),
            raiser: OnceLock::new(),
            overrides: NodeSet::new(),
            overridden_by: NodeSet::new(),
            implementation_for: NodeSet::new(),
            implemented_by: NodeSet::new(),
            attributes: NodeSet::new(),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    fn rc(&self) -> Option<EventNodeRc> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// Declared event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// The type declaring this event.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeNodeRc> {
        self.declaring.upgrade()
    }

    /// The resolved handler type.
    #[must_use]
    pub fn event_type(&self) -> Option<TypeNodeRc> {
        read_lock!(self.event_type).as_ref().and_then(Weak::upgrade)
    }

    /// The adder accessor, when declared.
    #[must_use]
    pub fn adder(&self) -> Option<MethodNodeRc> {
        self.adder.get().and_then(Weak::upgrade)
    }

    /// The remover accessor, when declared.
    #[must_use]
    pub fn remover(&self) -> Option<MethodNodeRc> {
        self.remover.get().and_then(Weak::upgrade)
    }

    /// The raiser accessor, when declared.
    #[must_use]
    pub fn raiser(&self) -> Option<MethodNodeRc> {
        self.raiser.get().and_then(Weak::upgrade)
    }

    /// Events this one overrides, derived from accessor override agreement.
    #[must_use]
    pub fn overrides(&self) -> Vec<EventNodeRc> {
        self.overrides.snapshot()
    }

    /// Events overriding this one (back edges of `overrides`).
    #[must_use]
    pub fn overridden_by(&self) -> Vec<EventNodeRc> {
        self.overridden_by.snapshot()
    }

    /// Interface events this event implements.
    #[must_use]
    pub fn implementation_for(&self) -> Vec<EventNodeRc> {
        self.implementation_for.snapshot()
    }

    /// Events implementing this interface event (back edges).
    #[must_use]
    pub fn implemented_by(&self) -> Vec<EventNodeRc> {
        self.implemented_by.snapshot()
    }

    /// Attribute types decorating this event.
    #[must_use]
    pub fn attributes(&self) -> Vec<TypeNodeRc> {
        self.attributes.snapshot()
    }

    pub(crate) fn decl(&self) -> &Arc<EventDecl> {
        &self.decl
    }

    pub(crate) fn set_adder(&self, adder: &MethodNodeRc) {
        self.adder.set(Arc::downgrade(adder)).ok();
    }

    pub(crate) fn set_remover(&self, remover: &MethodNodeRc) {
        self.remover.set(Arc::downgrade(remover)).ok();
    }

    pub(crate) fn set_raiser(&self, raiser: &MethodNodeRc) {
        self.raiser.set(Arc::downgrade(raiser)).ok();
    }

    /// Record an override edge and its back edge. The single code path for event
    /// override linkage.
    pub(crate) fn link_override(&self, target: &EventNodeRc) {
        self.overrides.insert(target);
        if let Some(this) = self.rc() {
            target.overridden_by.insert(&this);
        }
    }

    /// Record an interface-implementation edge and its back edge.
    pub(crate) fn link_implementation(&self, interface_event: &EventNodeRc) {
        self.implementation_for.insert(interface_event);
        if let Some(this) = self.rc() {
            interface_event.implemented_by.insert(&this);
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

        let resolved = registry.load_type(&self.decl.event_type, &module, Some(&declaring));
        *write_lock!(self.event_type) = Some(Arc::downgrade(&resolved));
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
                kind: NodeKind::Event,
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

impl GraphNode for EventNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Event
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
