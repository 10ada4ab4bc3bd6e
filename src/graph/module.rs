//! Module nodes and declaration registration.
//!
//! A [`ModuleNode`] represents one binary module. Its central job is
//! *registration*: a blocking, idempotent pass that walks the module's
//! declarations once and interns every type, member and parameter node they
//! describe. Registration deliberately performs no type resolution - member
//! identity keys embed textual signatures - so it never loads another module and
//! cannot deadlock on cyclic module references. Edge resolution happens later in
//! each node's build step.
//!
//! A module the locator cannot find still gets a node (the Missing-module
//! sentinel, no reader attached) so that every reference edge has a target. When
//! the module becomes available later, [`ModuleNode::attach_reader`] upgrades the
//! sentinel and re-opens registration.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::{
    graph::{
        diagnostics::{Fault, FaultCategory, FaultSeverity},
        identity::{self, NodeKey},
        method::{MethodNode, ParamNode},
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        types::{TypeFlavor, TypeNode},
        MethodNodeRc, ModuleNodeRc, TypeNodeRc,
    },
    source::{AccessorRef, ModuleReader, TypeDecl},
};

use super::{
    event::EventNode,
    field::FieldNode,
    property::{Association, PropertyNode},
};

/// One binary module in the graph: the set of types it declares and the modules
/// it references.
pub struct ModuleNode {
    key: NodeKey,
    name: String,
    this: OnceLock<Weak<ModuleNode>>,
    reader: OnceLock<Box<dyn ModuleReader>>,
    pub(crate) state: NodeState,
    registration: Mutex<bool>,
    references_done: Mutex<bool>,
    types: NodeSet<TypeNode>,
    references: NodeSet<ModuleNode>,
}

impl ModuleNode {
    /// Create a module node. `reader` is `None` for the Missing-module sentinel.
    pub(crate) fn new(
        name: impl Into<String>,
        reader: Option<Box<dyn ModuleReader>>,
        state: NodeState,
    ) -> ModuleNodeRc {
        let name = name.into();
        let node = Arc::new(ModuleNode {
            key: identity::module_key(&name),
            name,
            this: OnceLock::new(),
            reader: OnceLock::new(),
            state,
            registration: Mutex::new(false),
            references_done: Mutex::new(false),
            types: NodeSet::new(),
            references: NodeSet::new(),
        });
        if let Some(reader) = reader {
            node.reader.set(reader).ok();
        }
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    fn rc(&self) -> Option<ModuleNodeRc> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// The module's session-unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when this is the Missing-module sentinel: identity known,
    /// contents unavailable.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.reader.get().is_none()
    }

    /// Attach a reader to a Missing-module sentinel, upgrading it to a real
    /// module. Registration re-opens so the next access (or a forced rebuild)
    /// picks up the declarations. Returns `false` when a reader was already
    /// attached.
    pub fn attach_reader(&self, reader: Box<dyn ModuleReader>) -> bool {
        if self.reader.set(reader).is_err() {
            return false;
        }
        *lock!(self.registration) = false;
        *lock!(self.references_done) = false;
        self.state.raise(
            Fault::new(
                FaultSeverity::Information,
                FaultCategory::Module,
                format!("module '{}' became available", self.name),
            )
            .on_node(self.key.clone()),
        );
        true
    }

    /// The types this module declares, registering them on first access.
    #[must_use]
    pub fn types(&self, registry: &NodeRegistry) -> Vec<TypeNodeRc> {
        self.register(registry);
        self.types.snapshot()
    }

    /// Find a declared type by its full dotted name, registering on first access.
    #[must_use]
    pub fn type_by_name(&self, full_name: &str, registry: &NodeRegistry) -> Option<TypeNodeRc> {
        self.register(registry);
        self.types.get(&identity::type_key(&self.name, full_name))
    }

    /// The modules this module references, resolving them on first access. Every
    /// entry is a real node; unlocatable references resolve to Missing-module
    /// sentinels.
    #[must_use]
    pub fn referenced_modules(&self, registry: &NodeRegistry) -> Vec<ModuleNodeRc> {
        self.resolve_references(registry);
        self.references.snapshot()
    }

    /// Register every declaration of this module: intern all type, member and
    /// parameter nodes and wire the registration-time edges (members onto their
    /// declaring type, nesting, accessor associations).
    ///
    /// Blocking and idempotent: concurrent callers wait on the first, and later
    /// calls return immediately. Registration resolves no type references, so it
    /// never loads another module.
    pub(crate) fn register(&self, registry: &NodeRegistry) {
        let mut done = lock!(self.registration);
        if *done {
            return;
        }
        let (Some(reader), Some(this)) = (self.reader.get(), self.rc()) else {
            *done = true;
            return;
        };
        let decls = match reader.declared_types() {
            Ok(decls) => decls,
            Err(err) => {
                self.state.raise(
                    Fault::new(
                        FaultSeverity::Error,
                        FaultCategory::Module,
                        format!("failed to enumerate types of '{}': {err}", self.name),
                    )
                    .on_node(self.key.clone()),
                );
                Vec::new()
            }
        };
        for decl in decls {
            self.register_type_tree(registry, &this, decl, None);
        }
        *done = true;
    }

    /// Intern one type declaration and everything it contains, recursing into
    /// nested declarations.
    fn register_type_tree(
        &self,
        registry: &NodeRegistry,
        this: &ModuleNodeRc,
        decl: TypeDecl,
        parent: Option<&TypeNodeRc>,
    ) -> TypeNodeRc {
        let path = match parent {
            Some(outer) => format!("{}/{}", outer.full_name(), decl.name),
            None => decl.full_name(),
        };
        let type_key = identity::type_key(&self.name, &path);
        let (node, _) = registry.intern_type(&type_key, &path, TypeFlavor::Ordinary);

        let nested = decl.nested.clone();
        let decl = Arc::new(decl);
        node.attach_decl(decl.clone(), this);
        self.types.insert(&node);
        if let Some(outer) = parent {
            outer.link_nested(&node);
        }

        for gp in &decl.generic_params {
            let gp_key = identity::generic_param_key(&type_key, &gp.name);
            let (gp_node, created) =
                registry.intern_type(&gp_key, &gp.name, TypeFlavor::GenericParameter);
            if created {
                gp_node.attach_generic_decl(Arc::new(gp.clone()), this);
                gp_node.set_generic_owner(&node);
            }
            node.add_generic_param(&gp_node);
        }

        for field in &decl.fields {
            let field_key = identity::member_key(&type_key, &field.name);
            let (field_node, _) = registry.intern_field(&field_key, || {
                FieldNode::new(
                    field_key.clone(),
                    Arc::new(field.clone()),
                    &node,
                    registry.node_state(),
                )
            });
            if !node.add_field(&field_node) {
                self.duplicate(FaultCategory::Field, &field_key);
            }
        }

        for method in &decl.methods {
            let sigs: Vec<String> = method
                .params
                .iter()
                .map(|p| p.param_type.to_string())
                .collect();
            let method_key =
                identity::method_key(&type_key, &method.name, method.generic_arity, &sigs);
            let method_decl = Arc::new(method.clone());
            let (method_node, created) = registry.intern_method(&method_key, || {
                MethodNode::new(
                    method_key.clone(),
                    method_decl.clone(),
                    &node,
                    registry.node_state(),
                )
            });
            if !node.add_method(&method_node) {
                self.duplicate(FaultCategory::Method, &method_key);
            }
            if created {
                for (index, param) in method.params.iter().enumerate() {
                    let param_key = identity::param_key(&method_key, index);
                    let (param_node, _) = registry.intern_param(&param_key, || {
                        ParamNode::new(
                            param_key.clone(),
                            index,
                            param.clone(),
                            &method_node,
                            registry.node_state(),
                        )
                    });
                    method_node.add_param(&param_node);
                }
            }
        }

        for property in &decl.properties {
            let property_key = identity::member_key(&type_key, &property.name);
            let (property_node, created) = registry.intern_property(&property_key, || {
                PropertyNode::new(
                    property_key.clone(),
                    Arc::new(property.clone()),
                    &node,
                    registry.node_state(),
                )
            });
            if !node.add_property(&property_node) {
                self.duplicate(FaultCategory::Property, &property_key);
            }
            if created {
                if let Some(getter) = &property.getter {
                    match self.find_accessor(&node, &type_key, getter) {
                        Some(method) => {
                            property_node.set_getter(&method);
                            method.associate(Association::of_property(&property_node));
                        }
                        None => self.accessor_missing(FaultCategory::Property, &property_key, getter),
                    }
                }
                if let Some(setter) = &property.setter {
                    match self.find_accessor(&node, &type_key, setter) {
                        Some(method) => {
                            property_node.set_setter(&method);
                            method.associate(Association::of_property(&property_node));
                        }
                        None => self.accessor_missing(FaultCategory::Property, &property_key, setter),
                    }
                }
            }
        }

        for event in &decl.events {
            let event_key = identity::member_key(&type_key, &event.name);
            let (event_node, created) = registry.intern_event(&event_key, || {
                EventNode::new(
                    event_key.clone(),
                    Arc::new(event.clone()),
                    &node,
                    registry.node_state(),
                )
            });
            if !node.add_event(&event_node) {
                self.duplicate(FaultCategory::Event, &event_key);
            }
            if created {
                let accessors = [
                    (&event.adder, EventNode::set_adder as fn(&EventNode, &MethodNodeRc)),
                    (&event.remover, EventNode::set_remover),
                    (&event.raiser, EventNode::set_raiser),
                ];
                for (accessor, attach) in accessors {
                    if let Some(accessor) = accessor {
                        match self.find_accessor(&node, &type_key, accessor) {
                            Some(method) => {
                                attach(&event_node, &method);
                                method.associate(Association::of_event(&event_node));
                            }
                            None => {
                                self.accessor_missing(FaultCategory::Event, &event_key, accessor);
                            }
                        }
                    }
                }
            }
        }

        for child in nested {
            self.register_type_tree(registry, this, child, Some(&node));
        }

        node
    }

    /// Find an accessor method on the declaring type by name and textual
    /// parameter signatures. Accessors are never generic, so the arity is zero.
    fn find_accessor(
        &self,
        declaring: &TypeNodeRc,
        type_key: &NodeKey,
        accessor: &AccessorRef,
    ) -> Option<MethodNodeRc> {
        let sigs: Vec<String> = accessor.params.iter().map(ToString::to_string).collect();
        let method_key = identity::method_key(type_key, &accessor.name, 0, &sigs);
        declaring
            .methods()
            .into_iter()
            .find(|m| m.node_key() == &method_key)
    }

    fn duplicate(&self, category: FaultCategory, key: &NodeKey) {
        self.state.raise(
            Fault::new(
                FaultSeverity::Debug,
                category,
                "duplicate declaration ignored",
            )
            .on_node(key.clone()),
        );
    }

    fn accessor_missing(&self, category: FaultCategory, key: &NodeKey, accessor: &AccessorRef) {
        self.state.raise(
            Fault::new(
                FaultSeverity::Warning,
                category,
                format!("accessor method '{}' not declared on the same type", accessor.name),
            )
            .on_node(key.clone()),
        );
    }

    /// Resolve the module references, interning a node per referenced name.
    /// Blocking and idempotent, like registration.
    pub(crate) fn resolve_references(&self, registry: &NodeRegistry) {
        let mut done = lock!(self.references_done);
        if *done {
            return;
        }
        if let Some(reader) = self.reader.get() {
            match reader.referenced_modules() {
                Ok(names) => {
                    for name in names {
                        let module = registry.load_module_by_name(&name);
                        self.references.insert(&module);
                    }
                }
                Err(err) => {
                    self.state.raise(
                        Fault::new(
                            FaultSeverity::Error,
                            FaultCategory::Module,
                            format!("failed to enumerate references of '{}': {err}", self.name),
                        )
                        .on_node(self.key.clone()),
                    );
                }
            }
        }
        *done = true;
    }

    fn included(&self, registry: &NodeRegistry) -> bool {
        self.state.included_with(|| {
            registry.rules().evaluate(&RuleTarget {
                kind: NodeKind::Module,
                name: &self.name,
                key: self.key.as_str(),
                module: Some(&self.name),
            })
        })
    }

    /// Re-run registration and reference resolution outside the idempotence
    /// guard, after a reader was attached to a former sentinel.
    pub fn force_rebuild(&self, registry: &NodeRegistry) {
        self.state.force();
        if self.included(registry) {
            self.register(registry);
            self.resolve_references(registry);
        }
        self.state.finish();
    }
}

impl GraphNode for ModuleNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Module
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
            self.register(registry);
            self.resolve_references(registry);
        }
        self.state.finish();
    }

    fn is_system(&self) -> bool {
        self.reader.get().map(|r| r.is_system()).unwrap_or(false)
    }
}
