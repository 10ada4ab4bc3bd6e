//! The node registry: identity, memoization and batch processing.
//!
//! [`NodeRegistry`] owns one cache per node kind and guarantees, within one
//! analysis session, a bijection between identity key and node instance: asking
//! for the same entity twice always returns the same `Arc`. Everything else in
//! the graph leans on that guarantee - edges are weak references precisely
//! because the registry holds the strong ones.
//!
//! # Resolution
//!
//! [`NodeRegistry::load_type`] turns a [`TypeRefSig`] into exactly one type node,
//! constructing array, instantiation and generic-parameter nodes on demand and
//! substituting sentinels where resolution cannot complete: the Null node for
//! absent references, Missing nodes when a module or declaration cannot be
//! located. Resolution is deterministic: the node a signature resolves to does
//! not depend on load order or thread interleaving, only the *flavor* of an
//! already-interned node can improve when its module appears later.
//!
//! # Batch Processing
//!
//! [`NodeRegistry::process`] builds a node batch either inline or on a bounded
//! worker pool; [`NodeRegistry::process_all`] repeats that until resolution stops
//! discovering new nodes. Build steps are idempotent, so processing the same
//! nodes twice (or racing two workers onto one node) is harmless.

use std::sync::{Arc, OnceLock};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};
use rayon::prelude::*;

use crate::{
    graph::{
        diagnostics::{Fault, FaultCategory, FaultSeverity, Faults},
        event::EventNode,
        field::FieldNode,
        identity::{self, NodeKey, NULL_TYPE_KEY},
        method::{MethodNode, ParamNode},
        module::ModuleNode,
        node::{BuildState, GraphNode, NodeState},
        rules::Rules,
        types::{TypeFlavor, TypeNode},
        EventNodeRc, FieldNodeRc, MethodNodeRc, ModuleNodeRc, ParamNodeRc, PropertyNodeRc,
        TypeNodeRc,
    },
    source::{ModuleLocator, ModuleReader, TypeRefSig},
};

use super::property::PropertyNode;

/// Upper bound on worker threads for parallel batch processing.
const MAX_WORKERS: usize = 16;

/// One cache: a sharded map for get-or-create and an ordered index for stable
/// iteration.
struct NodeCache<T: GraphNode + 'static> {
    map: DashMap<NodeKey, Arc<T>>,
    ordered: SkipMap<NodeKey, Arc<T>>,
}

impl<T: GraphNode + 'static> NodeCache<T> {
    fn new() -> Self {
        NodeCache {
            map: DashMap::new(),
            ordered: SkipMap::new(),
        }
    }

    fn get(&self, key: &NodeKey) -> Option<Arc<T>> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Get the node for `key`, constructing and interning it when absent. The
    /// shard entry lock gives per-key mutual exclusion, so exactly one caller
    /// constructs and every caller receives the same instance.
    fn get_or_create(&self, key: &NodeKey, make: impl FnOnce() -> Arc<T>) -> (Arc<T>, bool) {
        if let Some(existing) = self.get(key) {
            return (existing, false);
        }
        match self.map.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(slot) => {
                let node = make();
                slot.insert(node.clone());
                self.ordered.insert(key.clone(), node.clone());
                (node, true)
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<T>> {
        self.ordered
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// The deduplicated graph over everything the loaded modules declare and
/// reference.
pub struct NodeRegistry {
    locator: Arc<dyn ModuleLocator>,
    rules: Rules,
    sink: Arc<Faults>,
    modules: NodeCache<ModuleNode>,
    types: NodeCache<TypeNode>,
    methods: NodeCache<MethodNode>,
    fields: NodeCache<FieldNode>,
    properties: NodeCache<PropertyNode>,
    events: NodeCache<EventNode>,
    params: NodeCache<ParamNode>,
    null_type: TypeNodeRc,
    pool: OnceLock<rayon::ThreadPool>,
}

impl NodeRegistry {
    /// Create a registry resolving referenced modules through `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn ModuleLocator>) -> Self {
        NodeRegistry::with_rules(locator, Rules::new())
    }

    /// Create a registry with inclusion/exclusion rules.
    #[must_use]
    pub fn with_rules(locator: Arc<dyn ModuleLocator>, rules: Rules) -> Self {
        let sink = Arc::new(Faults::new());
        let types = NodeCache::new();
        let null_type = TypeNode::new_null(
            NodeKey::new(NULL_TYPE_KEY),
            NodeState::excluded(sink.clone()),
        );
        types
            .map
            .insert(null_type.node_key().clone(), null_type.clone());
        types
            .ordered
            .insert(null_type.node_key().clone(), null_type.clone());
        NodeRegistry {
            locator,
            rules,
            sink,
            modules: NodeCache::new(),
            types,
            methods: NodeCache::new(),
            fields: NodeCache::new(),
            properties: NodeCache::new(),
            events: NodeCache::new(),
            params: NodeCache::new(),
            null_type,
            pool: OnceLock::new(),
        }
    }

    /// The session-wide fault sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Faults> {
        &self.sink
    }

    /// All entries of Warning severity and above.
    #[must_use]
    pub fn faults(&self) -> Vec<Fault> {
        self.sink.faults()
    }

    /// All Debug and Information entries.
    #[must_use]
    pub fn messages(&self) -> Vec<Fault> {
        self.sink.messages()
    }

    /// The Null sentinel type: the one node every absent reference resolves to.
    #[must_use]
    pub fn null_type(&self) -> TypeNodeRc {
        self.null_type.clone()
    }

    pub(crate) fn rules(&self) -> &Rules {
        &self.rules
    }

    pub(crate) fn node_state(&self) -> NodeState {
        NodeState::new(self.sink.clone())
    }

    // -- module loading ----------------------------------------------------------

    /// Load a module from a reader. When a Missing-module sentinel with the same
    /// name already exists, the reader upgrades it in place.
    pub fn load_module(&self, reader: Box<dyn ModuleReader>) -> ModuleNodeRc {
        let name = reader.name().to_string();
        let key = identity::module_key(&name);
        let mut reader = Some(reader);
        let (node, created) = self.modules.get_or_create(&key, || {
            ModuleNode::new(&name, reader.take(), self.node_state())
        });
        if !created {
            if let Some(reader) = reader.take() {
                if !node.attach_reader(reader) {
                    self.sink.raise(
                        Fault::new(
                            FaultSeverity::Debug,
                            FaultCategory::Module,
                            format!("module '{name}' was already loaded"),
                        )
                        .on_node(key),
                    );
                }
            }
        }
        node
    }

    /// Resolve a module by name: cached node, locator hit, or a Missing-module
    /// sentinel (with one Warning fault at creation) when the locator misses.
    pub fn load_module_by_name(&self, name: &str) -> ModuleNodeRc {
        let key = identity::module_key(name);
        if let Some(node) = self.modules.get(&key) {
            return node;
        }
        match self.locator.locate(name) {
            Some(reader) => self.load_module(reader),
            None => {
                let (node, created) = self
                    .modules
                    .get_or_create(&key, || ModuleNode::new(name, None, self.node_state()));
                if created {
                    self.sink.raise(
                        Fault::new(
                            FaultSeverity::Warning,
                            FaultCategory::Module,
                            format!("module '{name}' not found on the resolution path"),
                        )
                        .on_node(key),
                    );
                }
                node
            }
        }
    }

    // -- type resolution ---------------------------------------------------------

    /// Resolve a type reference signature to exactly one type node.
    ///
    /// `module` is the module the reference appears in; unqualified named
    /// references resolve against it. `generic_owner` scopes generic-parameter
    /// references. The result is never `None`-like: absent references resolve to
    /// the Null sentinel and unresolvable ones to Missing sentinels, each with a
    /// fault at first creation.
    pub fn load_type(
        &self,
        sig: &TypeRefSig,
        module: &ModuleNodeRc,
        generic_owner: Option<&TypeNodeRc>,
    ) -> TypeNodeRc {
        match sig {
            TypeRefSig::None => self.null_type.clone(),
            TypeRefSig::Named {
                module: target,
                full_name,
            } => {
                let target_module = match target {
                    Some(name) => self.load_module_by_name(name),
                    None => module.clone(),
                };
                let key = identity::type_key(target_module.name(), full_name);
                if target_module.is_missing() {
                    return self.missing_type(
                        &key,
                        full_name,
                        &target_module,
                        format!("defining module '{}' is missing", target_module.name()),
                    );
                }
                target_module.register(self);
                match self.types.get(&key) {
                    Some(node) => node,
                    None => self.missing_type(
                        &key,
                        full_name,
                        &target_module,
                        format!(
                            "type '{}' is not declared in module '{}'",
                            full_name,
                            target_module.name()
                        ),
                    ),
                }
            }
            TypeRefSig::Array { element, rank } => {
                let element = self.load_type(element, module, generic_owner);
                let key = identity::array_key(element.node_key(), *rank);
                let mut path = String::from(element.full_name());
                path.push('[');
                for _ in 1..(*rank).max(1) {
                    path.push(',');
                }
                path.push(']');
                let (node, created) =
                    self.intern_type(&key, &path, TypeFlavor::Array { rank: *rank });
                if created {
                    node.set_element(&element);
                    match element.module() {
                        Some(element_module) => node.set_module(&element_module),
                        None => node.set_module(module),
                    }
                }
                node
            }
            TypeRefSig::GenericInstance {
                definition,
                arguments,
            } => {
                let definition = self.load_type(definition, module, generic_owner);
                let args: Vec<TypeNodeRc> = arguments
                    .iter()
                    .map(|arg| self.load_type(arg, module, generic_owner))
                    .collect();
                let arg_keys: Vec<NodeKey> =
                    args.iter().map(|arg| arg.node_key().clone()).collect();
                let key = identity::generic_instance_key(definition.node_key(), &arg_keys);
                let path = format!(
                    "{}<{}>",
                    definition.full_name(),
                    args.iter()
                        .map(|arg| arg.full_name().to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                );
                let (node, created) = self.intern_type(&key, &path, TypeFlavor::GenericInstance);
                if created {
                    node.set_definition(&definition);
                    for arg in &args {
                        node.push_generic_arg(arg);
                    }
                    match definition.module() {
                        Some(def_module) => node.set_module(&def_module),
                        None => node.set_module(module),
                    }
                }
                node
            }
            TypeRefSig::GenericParam { name } => match generic_owner {
                Some(owner) => {
                    let key = identity::generic_param_key(owner.node_key(), name);
                    if let Some(node) = self.types.get(&key) {
                        return node;
                    }
                    let (node, created) =
                        self.intern_type(&key, name, TypeFlavor::GenericParameter);
                    if created {
                        node.set_generic_owner(owner);
                        if let Some(owner_module) = owner.module() {
                            node.set_module(&owner_module);
                        }
                        self.sink.raise(
                            Fault::new(
                                FaultSeverity::Warning,
                                FaultCategory::Type,
                                format!(
                                    "generic parameter '!{name}' is not declared by '{}'",
                                    owner.node_key()
                                ),
                            )
                            .on_node(key),
                        );
                    }
                    node
                }
                None => {
                    let key = identity::type_key(module.name(), &format!("!{name}"));
                    let node = self.missing_type(
                        &key,
                        name,
                        module,
                        format!("generic parameter '!{name}' referenced without an owning type"),
                    );
                    node
                }
            },
        }
    }

    /// Intern a Missing type sentinel, raising one Warning fault at creation.
    fn missing_type(
        &self,
        key: &NodeKey,
        path: &str,
        module: &ModuleNodeRc,
        why: String,
    ) -> TypeNodeRc {
        let (node, created) = self.intern_type(key, path, TypeFlavor::Missing);
        if created {
            node.set_module(module);
            self.sink.raise(
                Fault::new(FaultSeverity::Warning, FaultCategory::Type, why).on_node(key.clone()),
            );
        }
        node
    }

    // -- interning (registration support) ---------------------------------------

    pub(crate) fn intern_type(
        &self,
        key: &NodeKey,
        path: &str,
        flavor: TypeFlavor,
    ) -> (TypeNodeRc, bool) {
        self.types.get_or_create(key, || {
            TypeNode::new(key.clone(), path, flavor, self.node_state())
        })
    }

    pub(crate) fn intern_field(
        &self,
        key: &NodeKey,
        make: impl FnOnce() -> FieldNodeRc,
    ) -> (FieldNodeRc, bool) {
        self.fields.get_or_create(key, make)
    }

    pub(crate) fn intern_method(
        &self,
        key: &NodeKey,
        make: impl FnOnce() -> MethodNodeRc,
    ) -> (MethodNodeRc, bool) {
        self.methods.get_or_create(key, make)
    }

    pub(crate) fn intern_property(
        &self,
        key: &NodeKey,
        make: impl FnOnce() -> PropertyNodeRc,
    ) -> (PropertyNodeRc, bool) {
        self.properties.get_or_create(key, make)
    }

    pub(crate) fn intern_event(
        &self,
        key: &NodeKey,
        make: impl FnOnce() -> EventNodeRc,
    ) -> (EventNodeRc, bool) {
        self.events.get_or_create(key, make)
    }

    pub(crate) fn intern_param(
        &self,
        key: &NodeKey,
        make: impl FnOnce() -> ParamNodeRc,
    ) -> (ParamNodeRc, bool) {
        self.params.get_or_create(key, make)
    }

    // -- batch processing --------------------------------------------------------

    fn pool(&self) -> &rayon::ThreadPool {
        self.pool.get_or_init(|| {
            let workers = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
                .min(MAX_WORKERS);
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("graph-worker-{i}"))
                .build()
                .expect("Failed to build worker pool")
        })
    }

    /// Build a batch of nodes, deduplicated by identity. System-module nodes are
    /// skipped unless `include_system` is set. With `parallel`, the batch runs on
    /// the bounded worker pool; builds are idempotent either way.
    pub fn process(&self, nodes: &[Arc<dyn GraphNode>], include_system: bool, parallel: bool) {
        let mut seen = std::collections::HashSet::new();
        let batch: Vec<&Arc<dyn GraphNode>> = nodes
            .iter()
            .filter(|node| include_system || !node.is_system())
            .filter(|node| seen.insert(node.node_key().clone()))
            .collect();
        if parallel {
            self.pool()
                .install(|| batch.par_iter().for_each(|node| node.build(self)));
        } else {
            for node in batch {
                node.build(self);
            }
        }
    }

    /// Build every node in the registry, repeating until resolution stops
    /// discovering new nodes. Each pass picks up the nodes the previous pass
    /// interned (member nodes from registration, sentinels and constructed types
    /// from resolution).
    pub fn process_all(&self, include_system: bool, parallel: bool) {
        loop {
            // Filter here, not in `process`: a skipped system node stays
            // NotStarted and must not keep the loop alive.
            let pending: Vec<Arc<dyn GraphNode>> = self
                .pending_nodes()
                .into_iter()
                .filter(|node| include_system || !node.is_system())
                .collect();
            if pending.is_empty() {
                break;
            }
            self.process(&pending, true, parallel);
        }
    }

    fn pending_nodes(&self) -> Vec<Arc<dyn GraphNode>> {
        let mut pending: Vec<Arc<dyn GraphNode>> = Vec::new();
        fn collect<T: GraphNode + 'static>(cache: &NodeCache<T>, into: &mut Vec<Arc<dyn GraphNode>>) {
            into.extend(
                cache
                    .snapshot()
                    .into_iter()
                    .filter(|node| node.state().build_state() == BuildState::NotStarted)
                    .map(|node| node as Arc<dyn GraphNode>),
            );
        }
        collect(&self.modules, &mut pending);
        collect(&self.types, &mut pending);
        collect(&self.methods, &mut pending);
        collect(&self.fields, &mut pending);
        collect(&self.properties, &mut pending);
        collect(&self.events, &mut pending);
        collect(&self.params, &mut pending);
        pending
    }

    // -- queries -----------------------------------------------------------------

    /// All module nodes, in key order.
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleNodeRc> {
        self.modules.snapshot()
    }

    /// All type nodes, in key order.
    #[must_use]
    pub fn types(&self) -> Vec<TypeNodeRc> {
        self.types.snapshot()
    }

    /// All method nodes, in key order.
    #[must_use]
    pub fn methods(&self) -> Vec<MethodNodeRc> {
        self.methods.snapshot()
    }

    /// All field nodes, in key order.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldNodeRc> {
        self.fields.snapshot()
    }

    /// All property nodes, in key order.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyNodeRc> {
        self.properties.snapshot()
    }

    /// All event nodes, in key order.
    #[must_use]
    pub fn events(&self) -> Vec<EventNodeRc> {
        self.events.snapshot()
    }

    /// All parameter nodes, in key order.
    #[must_use]
    pub fn params(&self) -> Vec<ParamNodeRc> {
        self.params.snapshot()
    }

    /// Find a module node by name.
    #[must_use]
    pub fn get_module(&self, name: &str) -> Option<ModuleNodeRc> {
        self.modules.get(&identity::module_key(name))
    }

    /// Find a type node by identity key.
    #[must_use]
    pub fn get_type(&self, key: &NodeKey) -> Option<TypeNodeRc> {
        self.types.get(key)
    }

    /// Find a method node by identity key.
    #[must_use]
    pub fn get_method(&self, key: &NodeKey) -> Option<MethodNodeRc> {
        self.methods.get(key)
    }

    /// Number of type nodes interned so far, sentinels included.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryModule, MemorySource, TypeDecl};

    fn registry(source: MemorySource) -> NodeRegistry {
        NodeRegistry::new(Arc::new(source))
    }

    #[test]
    fn test_same_key_same_instance() {
        let registry = registry(
            MemorySource::new()
                .with_module(MemoryModule::new("app").with_type(TypeDecl::new("App", "Widget"))),
        );
        let module = registry.load_module_by_name("app");

        let sig = TypeRefSig::named("App.Widget");
        let first = registry.load_type(&sig, &module, None);
        let second = registry.load_type(&sig, &module, None);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_locator_miss_creates_sentinel_once() {
        let registry = registry(MemorySource::new());
        let missing = registry.load_module_by_name("gone");
        assert!(missing.is_missing());
        assert_eq!(registry.faults().len(), 1);

        // A second resolution reuses the sentinel without a second fault.
        let again = registry.load_module_by_name("gone");
        assert!(Arc::ptr_eq(&missing, &again));
        assert_eq!(registry.faults().len(), 1);
    }

    #[test]
    fn test_none_resolves_to_null_sentinel() {
        let registry = registry(
            MemorySource::new().with_module(MemoryModule::new("app")),
        );
        let module = registry.load_module_by_name("app");

        let resolved = registry.load_type(&TypeRefSig::None, &module, None);
        assert!(resolved.is_null());
        assert!(Arc::ptr_eq(&resolved, &registry.null_type()));
    }

    #[test]
    fn test_undeclared_type_becomes_missing() {
        let registry = registry(
            MemorySource::new().with_module(MemoryModule::new("app")),
        );
        let module = registry.load_module_by_name("app");

        let resolved = registry.load_type(&TypeRefSig::named("App.Gone"), &module, None);
        assert!(resolved.is_missing());
        assert_eq!(registry.faults().len(), 1);
    }

    #[test]
    fn test_array_nodes_are_shared() {
        let registry = registry(
            MemorySource::new()
                .with_module(MemoryModule::new("app").with_type(TypeDecl::new("App", "Widget"))),
        );
        let module = registry.load_module_by_name("app");

        let sig = TypeRefSig::array(TypeRefSig::named("App.Widget"), 1);
        let first = registry.load_type(&sig, &module, None);
        let second = registry.load_type(&sig, &module, None);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.element().unwrap().full_name(), "App.Widget");
    }
}
