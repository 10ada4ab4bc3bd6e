//! Method and parameter nodes.
//!
//! A [`MethodNode`] carries the richest edge set in the graph: its result type,
//! its parameters, the types used by its body (locals and caught exceptions),
//! explicit override directives, derived override and interface-implementation
//! edges, an optional accessor association back to a property or event, and
//! attribute decorations.
//!
//! Override and implementation edges come in pairs. [`MethodNode::link_override`]
//! and [`MethodNode::link_implementation`] are the only code paths that create
//! them, so the forward edge and its back edge can never disagree.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::{
    graph::{
        diagnostics::{Fault, FaultCategory, FaultSeverity},
        identity::NodeKey,
        node::{BuildClaim, GraphNode, NodeKind, NodeState},
        property::Association,
        refset::NodeSet,
        registry::NodeRegistry,
        rules::RuleTarget,
        types::{matching, TypeNode},
        MethodNodeRc, ParamNodeRc, TypeNodeRc,
    },
    source::{MemberRefSig, MethodAttributes, MethodDecl, ParamDecl, ParamFlags},
};

use super::ModuleNodeRc;

/// One method in the graph.
pub struct MethodNode {
    key: NodeKey,
    decl: Arc<MethodDecl>,
    this: OnceLock<Weak<MethodNode>>,
    declaring: Weak<TypeNode>,
    pub(crate) state: NodeState,
    return_type: RwLock<Option<Weak<TypeNode>>>,
    params: NodeSet<ParamNode>,
    overrides: NodeSet<MethodNode>,
    overridden_by: NodeSet<MethodNode>,
    implementation_for: NodeSet<MethodNode>,
    implemented_by: NodeSet<MethodNode>,
    association: OnceLock<Association>,
    attributes: NodeSet<TypeNode>,
}

impl MethodNode {
    pub(crate) fn new(
        key: NodeKey,
        decl: Arc<MethodDecl>,
        declaring: &TypeNodeRc,
        state: NodeState,
    ) -> MethodNodeRc {
        let node = Arc::new(MethodNode {
            key,
            decl,
            this: OnceLock::new(),
            declaring: Arc::downgrade(declaring),
            state,
            return_type: RwLock::new(None),
            params: NodeSet::new(),
            overrides: NodeSet::new(),
            overridden_by: NodeSet::new(),
            implementation_for: NodeSet::new(),
            implemented_by: NodeSet::new(),
            association: OnceLock::new(),
            attributes: NodeSet::new(),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    fn rc(&self) -> Option<MethodNodeRc> {
        self.this.get().and_then(Weak::upgrade)
    }

    /// Declared name; explicitly-implemented members carry the interface full
    /// name as a prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Declared method flags.
    #[must_use]
    pub fn flags(&self) -> MethodAttributes {
        self.decl.flags
    }

    /// Number of generic parameters this method declares.
    #[must_use]
    pub fn generic_arity(&self) -> u16 {
        self.decl.generic_arity
    }

    /// Whether this method reuses a base vtable slot and thus participates in
    /// override matching.
    #[must_use]
    pub fn is_override_style(&self) -> bool {
        self.decl.flags.is_override_style()
    }

    /// The type declaring this method.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeNodeRc> {
        self.declaring.upgrade()
    }

    /// The resolved result type. Void results resolve to the Null sentinel, so
    /// this is never `None` after the build step.
    #[must_use]
    pub fn return_type(&self) -> Option<TypeNodeRc> {
        read_lock!(self.return_type).as_ref().and_then(Weak::upgrade)
    }

    /// Parameter nodes, in declaration order.
    #[must_use]
    pub fn params(&self) -> Vec<ParamNodeRc> {
        self.params.snapshot()
    }

    /// Methods this one overrides (explicit directives plus derived matches).
    #[must_use]
    pub fn overrides(&self) -> Vec<MethodNodeRc> {
        self.overrides.snapshot()
    }

    /// Methods overriding this one (back edges of `overrides`).
    #[must_use]
    pub fn overridden_by(&self) -> Vec<MethodNodeRc> {
        self.overridden_by.snapshot()
    }

    /// Interface methods this method implements.
    #[must_use]
    pub fn implementation_for(&self) -> Vec<MethodNodeRc> {
        self.implementation_for.snapshot()
    }

    /// Methods implementing this interface method (back edges).
    #[must_use]
    pub fn implemented_by(&self) -> Vec<MethodNodeRc> {
        self.implemented_by.snapshot()
    }

    /// The property or event this method is an accessor of, when it is one.
    #[must_use]
    pub fn association(&self) -> Option<&Association> {
        self.association.get()
    }

    /// Attribute types decorating this method.
    #[must_use]
    pub fn attributes(&self) -> Vec<TypeNodeRc> {
        self.attributes.snapshot()
    }

    /// Resolved parameter type identities, in order. Resolution goes through the
    /// registry, so two references spelling the same type differently yield the
    /// same key.
    #[must_use]
    pub fn resolved_param_keys(&self, registry: &NodeRegistry) -> Vec<NodeKey> {
        self.resolved_param_types(registry)
            .iter()
            .map(|t| t.node_key().clone())
            .collect()
    }

    /// Resolved parameter type nodes, in order.
    pub(crate) fn resolved_param_types(&self, registry: &NodeRegistry) -> Vec<TypeNodeRc> {
        self.resolved_params(registry)
            .into_iter()
            .map(|(ty, _)| ty)
            .collect()
    }

    /// Resolved parameter types paired with their declared flags, in order.
    /// Matching compares both: a `Write(out Size)` slot is not satisfied by a
    /// `Write(Size)` declaration.
    pub(crate) fn resolved_params(
        &self,
        registry: &NodeRegistry,
    ) -> Vec<(TypeNodeRc, ParamFlags)> {
        let Some(declaring) = self.declaring_type() else {
            return Vec::new();
        };
        let Some(module) = declaring.module() else {
            return Vec::new();
        };
        self.decl
            .params
            .iter()
            .map(|p| {
                (
                    registry.load_type(&p.param_type, &module, Some(&declaring)),
                    p.flags,
                )
            })
            .collect()
    }

    pub(crate) fn decl(&self) -> &Arc<MethodDecl> {
        &self.decl
    }

    pub(crate) fn add_param(&self, param: &ParamNodeRc) {
        self.params.insert(param);
    }

    /// Tie this accessor method to its property or event. Set once; re-association
    /// with the same member is a duplicate registration (Debug fault), with a
    /// different member a Critical fault.
    pub(crate) fn associate(&self, association: Association) {
        let incoming = association.key().clone();
        if self.association.set(association).is_err() {
            let existing = self.association.get().map(Association::key);
            if existing == Some(&incoming) {
                self.state.raise(
                    Fault::new(
                        FaultSeverity::Debug,
                        FaultCategory::Method,
                        "duplicate accessor association ignored",
                    )
                    .on_node(self.key.clone()),
                );
            } else {
                self.state.raise(
                    Fault::new(
                        FaultSeverity::Critical,
                        FaultCategory::Method,
                        format!("accessor associated with two distinct members, second was '{incoming}'"),
                    )
                    .on_node(self.key.clone()),
                );
            }
        }
    }

    /// Record an override edge and its back edge. The single code path for
    /// override linkage.
    pub(crate) fn link_override(&self, target: &MethodNodeRc) {
        self.overrides.insert(target);
        if let Some(this) = self.rc() {
            target.overridden_by.insert(&this);
        }
    }

    /// Record an interface-implementation edge and its back edge. The single code
    /// path for implementation linkage.
    pub(crate) fn link_implementation(&self, interface_method: &MethodNodeRc) {
        self.implementation_for.insert(interface_method);
        if let Some(this) = self.rc() {
            interface_method.implemented_by.insert(&this);
        }
    }

    fn context(&self) -> Option<(TypeNodeRc, ModuleNodeRc)> {
        let declaring = self.declaring_type()?;
        let module = declaring.module()?;
        Some((declaring, module))
    }

    fn resolve(&self, registry: &NodeRegistry) {
        let Some(this) = self.rc() else { return };
        let Some((declaring, module)) = self.context() else {
            return;
        };
        let dependent: Arc<dyn GraphNode> = this.clone();

        let result = registry.load_type(&self.decl.return_type, &module, Some(&declaring));
        *write_lock!(self.return_type) = Some(Arc::downgrade(&result));
        if !result.is_null() {
            result.add_dependent(&dependent);
        }

        for param in self.params.snapshot() {
            param.build(registry);
        }

        // Usage edges mined from the body.
        for sig in self.decl.locals.iter().chain(&self.decl.catches) {
            let used = registry.load_type(sig, &module, Some(&declaring));
            if !used.is_null() {
                used.add_dependent(&dependent);
            }
        }

        for target in &self.decl.overrides {
            self.resolve_explicit_override(registry, &declaring, &module, target);
        }

        for sig in &self.decl.attributes {
            let attribute = registry.load_type(sig, &module, Some(&declaring));
            if !attribute.is_null() {
                attribute.add_decoration(&dependent);
                self.attributes.insert(&attribute);
            }
        }
    }

    /// Resolve one explicit override directive to the unique matching method on
    /// the named target type.
    fn resolve_explicit_override(
        &self,
        registry: &NodeRegistry,
        declaring: &TypeNodeRc,
        module: &ModuleNodeRc,
        target: &MemberRefSig,
    ) {
        let target_type = registry.load_type(&target.declaring, module, Some(declaring));
        if target_type.is_missing() || target_type.is_null() {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Warning,
                    FaultCategory::Method,
                    format!("explicit override target type '{target_type}' is unavailable", target_type = target_type.node_key()),
                )
                .on_node(self.key.clone()),
            );
            return;
        }
        // The directive carries type signatures only; the flags of the
        // directing method's own parameter list complete each slot.
        let wanted: Vec<(TypeNodeRc, ParamFlags)> = target
            .params
            .iter()
            .enumerate()
            .map(|(index, sig)| {
                let flags = self
                    .decl
                    .params
                    .get(index)
                    .map(|p| p.flags)
                    .unwrap_or(ParamFlags::INPUT);
                (registry.load_type(sig, module, Some(declaring)), flags)
            })
            .collect();
        let candidates: Vec<MethodNodeRc> = target_type
            .methods_by_name(&target.name)
            .into_iter()
            .filter(|m| m.generic_arity() == self.generic_arity())
            .filter(|m| matching::params_match(&m.resolved_params(registry), &wanted))
            .collect();
        match candidates.as_slice() {
            [] => self.state.raise(
                Fault::new(
                    FaultSeverity::Error,
                    FaultCategory::Method,
                    format!(
                        "explicit override target '{}::{}' not found",
                        target_type.node_key(),
                        target.name
                    ),
                )
                .on_node(self.key.clone()),
            ),
            [single] => self.link_override(single),
            _ => self.state.raise(
                Fault::new(
                    FaultSeverity::Critical,
                    FaultCategory::Method,
                    format!(
                        "explicit override target '{}::{}' is ambiguous ({} candidates)",
                        target_type.node_key(),
                        target.name,
                        candidates.len()
                    ),
                )
                .on_node(self.key.clone()),
            ),
        }
    }

    fn included(&self, registry: &NodeRegistry) -> bool {
        self.state.included_with(|| {
            let module = self.declaring_type().and_then(|t| t.module());
            let module_name = module.as_ref().map(|m| m.name().to_string());
            registry.rules().evaluate(&RuleTarget {
                kind: NodeKind::Method,
                name: &self.decl.name,
                key: self.key.as_str(),
                module: module_name.as_deref(),
            })
        })
    }

    /// Re-run edge resolution outside the idempotence guard.
    pub fn force_rebuild(&self, registry: &NodeRegistry) {
        self.state.force();
        if self.included(registry) {
            self.resolve(registry);
        }
        self.state.finish();
    }
}

impl GraphNode for MethodNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Method
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

/// One parameter of a method.
pub struct ParamNode {
    key: NodeKey,
    index: usize,
    decl: ParamDecl,
    this: OnceLock<Weak<ParamNode>>,
    declaring: Weak<MethodNode>,
    pub(crate) state: NodeState,
    param_type: RwLock<Option<Weak<TypeNode>>>,
}

impl ParamNode {
    pub(crate) fn new(
        key: NodeKey,
        index: usize,
        decl: ParamDecl,
        declaring: &MethodNodeRc,
        state: NodeState,
    ) -> ParamNodeRc {
        let node = Arc::new(ParamNode {
            key,
            index,
            decl,
            this: OnceLock::new(),
            declaring: Arc::downgrade(declaring),
            state,
            param_type: RwLock::new(None),
        });
        node.this.set(Arc::downgrade(&node)).ok();
        node
    }

    /// Declared parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Zero-based position in the parameter list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Input/output/variadic flags.
    #[must_use]
    pub fn flags(&self) -> ParamFlags {
        self.decl.flags
    }

    /// The method declaring this parameter.
    #[must_use]
    pub fn declaring_method(&self) -> Option<MethodNodeRc> {
        self.declaring.upgrade()
    }

    /// The resolved parameter type.
    #[must_use]
    pub fn param_type(&self) -> Option<TypeNodeRc> {
        read_lock!(self.param_type).as_ref().and_then(Weak::upgrade)
    }

    fn resolve(&self, registry: &NodeRegistry) {
        let Some(this) = self.this.get().and_then(Weak::upgrade) else {
            return;
        };
        let Some(declaring) = self.declaring_method().and_then(|m| m.declaring_type()) else {
            return;
        };
        let Some(module) = declaring.module() else {
            return;
        };
        let resolved = registry.load_type(&self.decl.param_type, &module, Some(&declaring));
        *write_lock!(self.param_type) = Some(Arc::downgrade(&resolved));
        if !resolved.is_null() {
            let dependent: Arc<dyn GraphNode> = this;
            resolved.add_dependent(&dependent);
        }
    }

    fn included(&self, registry: &NodeRegistry) -> bool {
        self.state.included_with(|| {
            let module = self
                .declaring_method()
                .and_then(|m| m.declaring_type())
                .and_then(|t| t.module());
            let module_name = module.as_ref().map(|m| m.name().to_string());
            registry.rules().evaluate(&RuleTarget {
                kind: NodeKind::Parameter,
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

impl GraphNode for ParamNode {
    fn node_key(&self) -> &NodeKey {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Parameter
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
        self.declaring_method().map(|m| m.is_system()).unwrap_or(false)
    }
}
