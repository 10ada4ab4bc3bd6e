//! Interface-implementation and override matching.
//!
//! Both passes compare *resolved* type identities, never textual signatures, so
//! two references spelling the same type differently still match. Generic
//! parameters compare by declared name (an interface's `!T` and an implementing
//! type's `!T` are distinct nodes scoped to their owners), arrays by element and
//! rank, instantiations by definition and arguments.
//!
//! # Implementation matching
//!
//! For every member each implemented interface declares, the implementing type
//! must supply exactly one counterpart. Candidates are considered in tiers:
//! plain-name matches first, then explicitly-implemented members (declared name
//! `Ns.IFace.Member`). Parameter lists must match type-for-type with equal
//! input/output/variadic flags, and generic arity must agree. More than one
//! candidate in a tier is a Critical fault, no candidate in any tier an Error
//! fault. Properties and events try the same name tiers and fall back to
//! accessor identity: a property implements an interface property when one of
//! its accessors implements the corresponding interface accessor.
//!
//! # Override matching
//!
//! An override-style method without explicit directives walks the declaring
//! type's base chain, nearest level first, and binds to the first level that
//! declares a matching virtual method; levels above the first match are never
//! consulted. Two matches on the same level are a Critical fault. Property and
//! event overrides are derived from their accessors' override edges; accessors
//! disagreeing about the overridden member is a Critical fault.

use crate::graph::{
    diagnostics::{Fault, FaultCategory, FaultSeverity},
    node::GraphNode,
    property::Association,
    registry::NodeRegistry,
    EventNodeRc, MethodNodeRc, PropertyNodeRc, TypeNodeRc,
};
use crate::source::{MethodAttributes, ParamFlags};

use super::{TypeFlavor, TypeNode};

/// Structural equivalence of two resolved parameter types.
fn types_equivalent(a: &TypeNodeRc, b: &TypeNodeRc) -> bool {
    if a.node_key() == b.node_key() {
        return true;
    }
    match (a.flavor(), b.flavor()) {
        (TypeFlavor::GenericParameter, TypeFlavor::GenericParameter) => a.name() == b.name(),
        (TypeFlavor::Array { rank: ra }, TypeFlavor::Array { rank: rb }) => {
            ra == rb
                && match (a.element(), b.element()) {
                    (Some(ea), Some(eb)) => types_equivalent(&ea, &eb),
                    _ => false,
                }
        }
        (TypeFlavor::GenericInstance, TypeFlavor::GenericInstance) => {
            let defs = match (a.definition(), b.definition()) {
                (Some(da), Some(db)) => types_equivalent(&da, &db),
                _ => false,
            };
            let args_a = a.generic_args();
            let args_b = b.generic_args();
            defs && args_a.len() == args_b.len()
                && args_a
                    .iter()
                    .zip(&args_b)
                    .all(|(x, y)| types_equivalent(x, y))
        }
        _ => false,
    }
}

/// Positional equivalence of two resolved parameter lists, flags included.
pub(crate) fn params_match(
    actual: &[(TypeNodeRc, ParamFlags)],
    wanted: &[(TypeNodeRc, ParamFlags)],
) -> bool {
    actual.len() == wanted.len()
        && actual
            .iter()
            .zip(wanted)
            .all(|((at, af), (bt, bf))| af == bf && types_equivalent(at, bt))
}

/// Match every member of every implemented interface against the members this
/// type supplies.
pub(crate) fn match_implementations(ty: &TypeNode, registry: &NodeRegistry) {
    for interface in ty.interfaces() {
        if interface.is_missing() {
            continue;
        }
        // Constructed interfaces copy their member lists during their own build.
        interface.build(registry);
        let interface_name = interface
            .definition()
            .map(|d| d.full_name().to_string())
            .unwrap_or_else(|| interface.full_name().to_string());

        for method in interface.methods() {
            match_interface_method(ty, &interface_name, &method, registry);
        }
        for property in interface.properties() {
            match_interface_property(ty, &interface_name, &property);
        }
        for event in interface.events() {
            match_interface_event(ty, &interface_name, &event);
        }
    }
}

fn match_interface_method(
    ty: &TypeNode,
    interface_name: &str,
    target: &MethodNodeRc,
    registry: &NodeRegistry,
) {
    let wanted = target.resolved_params(registry);
    let explicit_name = format!("{interface_name}.{}", target.name());

    for name in [target.name(), explicit_name.as_str()] {
        let candidates: Vec<MethodNodeRc> = ty
            .methods_by_name(name)
            .into_iter()
            .filter(|m| m.generic_arity() == target.generic_arity())
            .filter(|m| params_match(&m.resolved_params(registry), &wanted))
            .collect();
        match candidates.as_slice() {
            [] => continue,
            [implementation] => {
                implementation.link_implementation(target);
                return;
            }
            _ => {
                ty.state.raise(
                    Fault::new(
                        FaultSeverity::Critical,
                        FaultCategory::Method,
                        format!(
                            "ambiguous implementation of '{}' ({} candidates named '{name}')",
                            target.node_key(),
                            candidates.len()
                        ),
                    )
                    .on_node(ty.node_key().clone()),
                );
                return;
            }
        }
    }
    ty.state.raise(
        Fault::new(
            FaultSeverity::Error,
            FaultCategory::Method,
            format!("no implementation found for '{}'", target.node_key()),
        )
        .on_node(ty.node_key().clone()),
    );
}

/// Properties match by plain name, then explicitly-qualified name, then
/// accessor identity: a property implements an interface property when one of
/// its accessors implements the corresponding interface accessor.
fn match_interface_property(ty: &TypeNode, interface_name: &str, target: &PropertyNodeRc) {
    let explicit_name = format!("{interface_name}.{}", target.name());
    let properties = ty.properties();
    let found = [target.name(), explicit_name.as_str()]
        .into_iter()
        .find_map(|name| properties.iter().find(|p| p.name() == name))
        .or_else(|| {
            properties.iter().find(|p| {
                accessor_implements(p.getter(), target.getter())
                    || accessor_implements(p.setter(), target.setter())
            })
        });
    match found {
        Some(property) => property.link_implementation(target),
        None => ty.state.raise(
            Fault::new(
                FaultSeverity::Error,
                FaultCategory::Property,
                format!("no implementation found for '{}'", target.node_key()),
            )
            .on_node(ty.node_key().clone()),
        ),
    }
}

fn match_interface_event(ty: &TypeNode, interface_name: &str, target: &EventNodeRc) {
    let explicit_name = format!("{interface_name}.{}", target.name());
    let events = ty.events();
    let found = [target.name(), explicit_name.as_str()]
        .into_iter()
        .find_map(|name| events.iter().find(|e| e.name() == name))
        .or_else(|| {
            events.iter().find(|e| {
                accessor_implements(e.adder(), target.adder())
                    || accessor_implements(e.remover(), target.remover())
            })
        });
    match found {
        Some(event) => event.link_implementation(target),
        None => ty.state.raise(
            Fault::new(
                FaultSeverity::Error,
                FaultCategory::Event,
                format!("no implementation found for '{}'", target.node_key()),
            )
            .on_node(ty.node_key().clone()),
        ),
    }
}

fn accessor_implements(accessor: Option<MethodNodeRc>, target: Option<MethodNodeRc>) -> bool {
    let (Some(accessor), Some(target)) = (accessor, target) else {
        return false;
    };
    accessor
        .implementation_for()
        .iter()
        .any(|m| m.node_key() == target.node_key())
}

/// Derive override edges for this type's override-style methods, then for its
/// properties and events.
pub(crate) fn match_overrides(ty: &TypeNode, registry: &NodeRegistry) {
    // The chain is walked lazily: a level's own base edge only exists once its
    // build step ran, so each level is built before the walk continues.
    let mut chain: Vec<TypeNodeRc> = Vec::new();
    let mut current = ty.base();
    while let Some(level) = current {
        if level.is_null() || level.is_missing() {
            break;
        }
        if chain
            .iter()
            .any(|seen| seen.node_key() == level.node_key())
        {
            break;
        }
        level.build(registry);
        current = level.base();
        chain.push(level);
    }

    for method in ty.methods() {
        if !method.is_override_style() || !method.decl().overrides.is_empty() {
            continue;
        }
        match_method_override(&method, &chain, registry);
    }
    for property in ty.properties() {
        derive_property_override(&property);
    }
    for event in ty.events() {
        derive_event_override(&event);
    }
}

fn match_method_override(method: &MethodNodeRc, chain: &[TypeNodeRc], registry: &NodeRegistry) {
    let wanted = method.resolved_params(registry);
    for level in chain {
        let candidates: Vec<MethodNodeRc> = level
            .methods_by_name(method.name())
            .into_iter()
            .filter(|m| m.flags().contains(MethodAttributes::VIRTUAL))
            .filter(|m| m.generic_arity() == method.generic_arity())
            .filter(|m| params_match(&m.resolved_params(registry), &wanted))
            .collect();
        match candidates.as_slice() {
            [] => continue,
            [overridden] => {
                method.link_override(overridden);
                return;
            }
            _ => {
                method.state.raise(
                    Fault::new(
                        FaultSeverity::Critical,
                        FaultCategory::Method,
                        format!(
                            "ambiguous override target on '{}' ({} candidates)",
                            level.node_key(),
                            candidates.len()
                        ),
                    )
                    .on_node(method.node_key().clone()),
                );
                return;
            }
        }
    }
    method.state.raise(
        Fault::new(
            FaultSeverity::Warning,
            FaultCategory::Method,
            "override-style method matches nothing in the base chain",
        )
        .on_node(method.node_key().clone()),
    );
}

/// The property overridden by the given accessor, when the accessor overrides
/// another property's accessor.
fn overridden_property(accessor: Option<MethodNodeRc>) -> Option<PropertyNodeRc> {
    accessor?.overrides().into_iter().find_map(|overridden| {
        overridden.association().and_then(Association::property)
    })
}

fn overridden_event(accessor: Option<MethodNodeRc>) -> Option<EventNodeRc> {
    accessor?.overrides().into_iter().find_map(|overridden| {
        overridden.association().and_then(Association::event)
    })
}

fn derive_property_override(property: &PropertyNodeRc) {
    let via_getter = overridden_property(property.getter());
    let via_setter = overridden_property(property.setter());
    match (via_getter, via_setter) {
        (Some(a), Some(b)) if a.node_key() != b.node_key() => {
            property.state.raise(
                Fault::new(
                    FaultSeverity::Critical,
                    FaultCategory::Property,
                    format!(
                        "accessors override accessors of different properties ('{}' vs '{}')",
                        a.node_key(),
                        b.node_key()
                    ),
                )
                .on_node(property.node_key().clone()),
            );
        }
        (Some(target), _) | (None, Some(target)) => property.link_override(&target),
        (None, None) => {}
    }
}

fn derive_event_override(event: &EventNodeRc) {
    let via_adder = overridden_event(event.adder());
    let via_remover = overridden_event(event.remover());
    match (via_adder, via_remover) {
        (Some(a), Some(b)) if a.node_key() != b.node_key() => {
            event.state.raise(
                Fault::new(
                    FaultSeverity::Critical,
                    FaultCategory::Event,
                    format!(
                        "accessors override accessors of different events ('{}' vs '{}')",
                        a.node_key(),
                        b.node_key()
                    ),
                )
                .on_node(event.node_key().clone()),
            );
        }
        (Some(target), _) | (None, Some(target)) => event.link_override(&target),
        (None, None) => {}
    }
}
