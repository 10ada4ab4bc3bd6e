//! Field nodes.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::{
    graph::{
        identity::NodeKey,
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        types::TypeNode,
        FieldNodeRc, TypeNodeRc,
    },
    source::FieldDecl,
};

/// One field in the graph: its resolved type and attribute decorations.
pub struct FieldNode {
    key: NodeKey,
    decl: Arc<FieldDecl>,
    this: OnceLock<Weak<FieldNode>>,
    declaring: Weak<TypeNode>,
    pub(crate) state: NodeState,
    field_type: RwLock<Option<Weak<TypeNode>>>,
    attributes: NodeSet<TypeNode>,
}

impl FieldNode {
    pub(crate) fn new(
        key: NodeKey,
        decl: Arc<FieldDecl>,
        declaring: &TypeNodeRc,
        state: NodeState,
    ) -> FieldNodeRc {
        let node = Arc::new(FieldNode {
            key,
            decl,
            this: OnceLock::new(),
            declaring: Arc::downgrade(declaring),
            state,
            field_type: RwLock::new(None),
            attributes: NodeSet::new(),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    /// Declared field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// The type declaring this field.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeNodeRc> {
        self.declaring.upgrade()
    }

    /// The resolved field type. Unresolvable types resolve to a Missing sentinel,
    /// so this is never `None` after the build step.
    #[must_use]
    pub fn field_type(&self) -> Option<TypeNodeRc> {
        read_lock!(self.field_type).as_ref().and_then(Weak::upgrade)
    }

    /// Attribute types decorating this field.
    #[must_use]
    pub fn attributes(&self) -> Vec<TypeNodeRc> {
        self.attributes.snapshot()
    }

    fn resolve(&self, registry: &NodeRegistry) {
        let Some(this) = self.this.get().and_then(Weak::upgrade) else {
            return;
        };
        let Some(declaring) = self.declaring_type() else {
            return;
        };
        let Some(module) = declaring.module() else {
            return;
        };
        let dependent: Arc<dyn GraphNode> = this;

        let resolved = registry.load_type(&self.decl.field_type, &module, Some(&declaring));
        *write_lock!(self.field_type) = Some(Arc::downgrade(&resolved));
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
                kind: NodeKind::Field,
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

impl GraphNode for FieldNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Field
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
