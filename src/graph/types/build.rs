//! Flavor-specific type build steps.
//!
//! The build step resolves everything a type's declaration references into graph
//! edges. Ordinary types run the full sequence: base, interfaces, members,
//! attribute decorations, then the matching passes. Constructed flavors replace
//! most of that with copies: an array presents its element's members, a generic
//! instantiation presents its definition's members, a generic parameter derives
//! its shape from its constraints. The sentinels do nothing.
//!
//! Member copies are plain collection inserts, deliberately without back edges:
//! `String[]` presenting `String`'s methods does not make the array a second
//! declaring type for them.

use std::sync::Arc;

use super::{matching, TypeFlavor, TypeNode};
use crate::graph::{
    diagnostics::{Fault, FaultCategory, FaultSeverity},
    node::GraphNode,
    registry::NodeRegistry,
};

impl TypeNode {
    /// Resolve this type's edges according to its flavor.
    pub(super) fn resolve(&self, registry: &NodeRegistry) {
        match self.flavor() {
            TypeFlavor::Ordinary => self.resolve_ordinary(registry),
            TypeFlavor::Array { .. } => self.resolve_array(registry),
            TypeFlavor::GenericInstance => self.resolve_generic_instance(registry),
            TypeFlavor::GenericParameter => self.resolve_generic_param(registry),
            TypeFlavor::Missing | TypeFlavor::Null => {}
        }
    }

    fn resolve_ordinary(&self, registry: &NodeRegistry) {
        let Some(this) = self.rc() else { return };
        let Some(module) = self.module() else {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Error,
                    FaultCategory::Type,
                    "type has no owning module",
                )
                .on_node(self.node_key().clone()),
            );
            return;
        };
        let Some(decl) = self.decl() else {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Error,
                    FaultCategory::Type,
                    "no declaration available",
                )
                .on_node(self.node_key().clone()),
            );
            return;
        };

        // Base first; the override pass below walks the chain.
        let base = registry.load_type(&decl.base, &module, Some(&this));
        self.link_base(&base);

        for sig in &decl.interfaces {
            let interface = registry.load_type(sig, &module, Some(&this));
            if !interface.is_null() {
                self.link_interface(&interface);
            }
        }

        for gp in self.generic_params() {
            gp.build(registry);
        }
        for field in self.fields() {
            field.build(registry);
        }
        for method in self.methods() {
            method.build(registry);
        }
        for property in self.properties() {
            property.build(registry);
        }
        for event in self.events() {
            event.build(registry);
        }

        let decorated: Arc<dyn GraphNode> = this.clone();
        for sig in &decl.attributes {
            let attribute = registry.load_type(sig, &module, Some(&this));
            if !attribute.is_null() {
                attribute.add_decoration(&decorated);
                self.add_attribute(&attribute);
            }
        }

        if self.is_interface() == Some(false) {
            matching::match_implementations(self, registry);
        }
        matching::match_overrides(self, registry);
    }

    /// An array presents its element's surface: same interfaces, nested types and
    /// members, no base (the base edge resolves to Null) and no attributes.
    fn resolve_array(&self, registry: &NodeRegistry) {
        let Some(element) = self.element() else {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Error,
                    FaultCategory::Type,
                    "array type lost its element",
                )
                .on_node(self.node_key().clone()),
            );
            return;
        };
        element.build(registry);

        self.link_base(&registry.null_type());
        for interface in element.interfaces() {
            self.copy_interface(&interface);
        }
        for nested in element.nested_types() {
            self.nested.insert(&nested);
        }
        for field in element.fields() {
            self.fields.insert(&field);
        }
        for method in element.methods() {
            self.methods.insert(&method);
        }
        for property in element.properties() {
            self.properties.insert(&property);
        }
        for event in element.events() {
            self.events.insert(&event);
        }
    }

    /// A generic instantiation presents its open definition's surface plus the
    /// concrete argument list resolved at creation. The base edge is copied from
    /// the definition.
    fn resolve_generic_instance(&self, registry: &NodeRegistry) {
        let Some(definition) = self.definition() else {
            self.state.raise(
                Fault::new(
                    FaultSeverity::Error,
                    FaultCategory::Type,
                    "generic instantiation lost its definition",
                )
                .on_node(self.node_key().clone()),
            );
            return;
        };
        definition.build(registry);

        match definition.base() {
            Some(base) if !base.is_null() => self.copy_base(&base),
            _ => self.link_base(&registry.null_type()),
        }
        for interface in definition.interfaces() {
            self.copy_interface(&interface);
        }
        for nested in definition.nested_types() {
            self.nested.insert(&nested);
        }
        for field in definition.fields() {
            self.fields.insert(&field);
        }
        for method in definition.methods() {
            self.methods.insert(&method);
        }
        for property in definition.properties() {
            self.properties.insert(&property);
        }
        for event in definition.events() {
            self.events.insert(&event);
        }
    }

    /// A generic parameter derives its shape from its constraints: the first
    /// class-type constraint becomes the base, every constraint is recorded.
    fn resolve_generic_param(&self, registry: &NodeRegistry) {
        let Some(module) = self.module() else { return };
        let owner = self.generic_owner();
        let mut base_candidate = None;
        if let Some(decl) = self.generic_decl() {
            for sig in &decl.constraints {
                let constraint = registry.load_type(sig, &module, owner.as_ref());
                if constraint.is_null() {
                    continue;
                }
                self.add_constraint(&constraint);
                if base_candidate.is_none() && constraint.is_interface() == Some(false) {
                    base_candidate = Some(constraint);
                }
            }
        }
        match base_candidate {
            Some(base) => self.link_base(&base),
            None => self.link_base(&registry.null_type()),
        }
    }
}
