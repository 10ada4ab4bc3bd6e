//! Structural linkage tests: base chains, interface implementation, override
//! matching and accessor-derived member relationships.

use std::sync::Arc;

use dotlink::prelude::*;

fn build(source: MemorySource, entry: &str) -> NodeRegistry {
    let registry = NodeRegistry::new(Arc::new(source));
    registry.load_module_by_name(entry);
    registry.process_all(true, false);
    registry
}

fn virtual_slot() -> MethodAttributes {
    MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG | MethodAttributes::NEW_SLOT
}

fn override_slot() -> MethodAttributes {
    MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG
}

#[test]
fn base_and_subtype_edges_are_paired() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Base"))
                .with_type(TypeDecl::new("App", "Widget").with_base(TypeRefSig::named("App.Base"))),
        ),
        "app",
    );

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let base = registry.get_type(&type_key("app", "App.Base")).unwrap();

    assert_eq!(widget.base().unwrap().node_key(), base.node_key());
    assert_eq!(base.subtypes().len(), 1);
    assert_eq!(base.subtypes()[0].node_key(), widget.node_key());

    // A type without a declared base terminates the chain at the Null sentinel.
    assert!(base.base().unwrap().is_null());
    assert_eq!(widget.base_chain().len(), 2);
}

#[test]
fn interface_linkage_is_bidirectional() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(
                    TypeDecl::interface("App", "IWidget").with_method(
                        MethodDecl::new("Draw", TypeRefSig::None)
                            .with_flags(virtual_slot() | MethodAttributes::ABSTRACT),
                    ),
                )
                .with_type(
                    TypeDecl::new("App", "Widget")
                        .with_interface(TypeRefSig::named("App.IWidget"))
                        .with_method(
                            MethodDecl::new("Draw", TypeRefSig::None).with_flags(virtual_slot()),
                        ),
                ),
        ),
        "app",
    );

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let iface = registry.get_type(&type_key("app", "App.IWidget")).unwrap();

    assert_eq!(widget.interfaces()[0].node_key(), iface.node_key());
    assert_eq!(iface.implementations()[0].node_key(), widget.node_key());

    // The method-level match is paired as well.
    let draw = registry
        .get_method(&method_key(&type_key("app", "App.Widget"), "Draw", 0, &[]))
        .unwrap();
    let iface_draw = registry
        .get_method(&method_key(&type_key("app", "App.IWidget"), "Draw", 0, &[]))
        .unwrap();
    assert_eq!(draw.implementation_for()[0].node_key(), iface_draw.node_key());
    assert_eq!(iface_draw.implemented_by()[0].node_key(), draw.node_key());
}

#[test]
fn plain_name_match_precedes_explicit_implementation() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(
                    TypeDecl::interface("App", "IWidget").with_method(
                        MethodDecl::new("Draw", TypeRefSig::None)
                            .with_flags(virtual_slot() | MethodAttributes::ABSTRACT),
                    ),
                )
                .with_type(
                    TypeDecl::new("App", "Widget")
                        .with_interface(TypeRefSig::named("App.IWidget"))
                        // Both forms declared; the plain name is the first tier.
                        .with_method(MethodDecl::new("Draw", TypeRefSig::None))
                        .with_method(
                            MethodDecl::new("App.IWidget.Draw", TypeRefSig::None).with_flags(
                                virtual_slot() | MethodAttributes::FINAL,
                            ),
                        ),
                ),
        ),
        "app",
    );

    let explicit = registry
        .get_method(&method_key(
            &type_key("app", "App.Widget"),
            "App.IWidget.Draw",
            0,
            &[],
        ))
        .unwrap();
    let plain = registry
        .get_method(&method_key(&type_key("app", "App.Widget"), "Draw", 0, &[]))
        .unwrap();

    assert_eq!(plain.implementation_for().len(), 1);
    assert!(explicit.implementation_for().is_empty());
}

#[test]
fn explicit_implementation_matches_without_plain_name() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(
                    TypeDecl::interface("App", "IWidget").with_method(
                        MethodDecl::new("Draw", TypeRefSig::None)
                            .with_flags(virtual_slot() | MethodAttributes::ABSTRACT),
                    ),
                )
                .with_type(
                    TypeDecl::new("App", "Widget")
                        .with_interface(TypeRefSig::named("App.IWidget"))
                        .with_method(
                            MethodDecl::new("App.IWidget.Draw", TypeRefSig::None).with_flags(
                                virtual_slot() | MethodAttributes::FINAL,
                            ),
                        ),
                ),
        ),
        "app",
    );

    let explicit = registry
        .get_method(&method_key(
            &type_key("app", "App.Widget"),
            "App.IWidget.Draw",
            0,
            &[],
        ))
        .unwrap();

    assert_eq!(explicit.implementation_for().len(), 1);
    assert!(!registry.diagnostics().has_errors());
}

#[test]
fn output_flag_mismatch_blocks_implementation_match() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(
                    TypeDecl::interface("App", "IWriter").with_method(
                        MethodDecl::new("Write", TypeRefSig::None)
                            .with_flags(virtual_slot() | MethodAttributes::ABSTRACT)
                            .with_param(
                                ParamDecl::new("result", TypeRefSig::named("App.Size")).output(),
                            ),
                    ),
                )
                .with_type(
                    TypeDecl::new("App", "Writer")
                        .with_interface(TypeRefSig::named("App.IWriter"))
                        // Same name, same type, but the parameter is an input.
                        .with_method(
                            MethodDecl::new("Write", TypeRefSig::None)
                                .with_flags(virtual_slot())
                                .with_param(ParamDecl::new(
                                    "result",
                                    TypeRefSig::named("App.Size"),
                                )),
                        ),
                ),
        ),
        "app",
    );

    let sigs = vec!["App.Size".to_string()];
    let write = registry
        .get_method(&method_key(&type_key("app", "App.Writer"), "Write", 0, &sigs))
        .unwrap();

    assert!(write.implementation_for().is_empty());
    assert!(registry.diagnostics().has_errors());
}

#[test]
fn override_matching_skips_intermediate_levels() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(
                    TypeDecl::new("App", "Base").with_method(
                        MethodDecl::new("Render", TypeRefSig::None)
                            .with_flags(virtual_slot())
                            .with_param(ParamDecl::new("size", TypeRefSig::named("App.Size"))),
                    ),
                )
                .with_type(TypeDecl::new("App", "Mid").with_base(TypeRefSig::named("App.Base")))
                .with_type(
                    TypeDecl::new("App", "Grandchild")
                        .with_base(TypeRefSig::named("App.Mid"))
                        .with_method(
                            MethodDecl::new("Render", TypeRefSig::None)
                                .with_flags(override_slot())
                                .with_param(ParamDecl::new("size", TypeRefSig::named("App.Size"))),
                        ),
                ),
        ),
        "app",
    );

    let sigs = vec!["App.Size".to_string()];
    let overriding = registry
        .get_method(&method_key(
            &type_key("app", "App.Grandchild"),
            "Render",
            0,
            &sigs,
        ))
        .unwrap();
    let overridden = registry
        .get_method(&method_key(&type_key("app", "App.Base"), "Render", 0, &sigs))
        .unwrap();

    // The match binds to App.Base even though App.Mid sits between them.
    assert_eq!(overriding.overrides().len(), 1);
    assert_eq!(overriding.overrides()[0].node_key(), overridden.node_key());
    assert_eq!(overridden.overridden_by()[0].node_key(), overriding.node_key());
}

#[test]
fn override_matching_distinguishes_overloads() {
    let base = TypeDecl::new("App", "Base")
        .with_method(MethodDecl::new("F", TypeRefSig::None).with_flags(virtual_slot()))
        .with_method(
            MethodDecl::new("F", TypeRefSig::None)
                .with_flags(virtual_slot())
                .with_param(ParamDecl::new("a", TypeRefSig::named("App.Size"))),
        )
        .with_method(
            MethodDecl::new("F", TypeRefSig::None)
                .with_flags(virtual_slot())
                .with_param(ParamDecl::new("a", TypeRefSig::named("App.Size")))
                .with_param(ParamDecl::new("b", TypeRefSig::named("App.Size"))),
        )
        .with_method(
            MethodDecl::new("F", TypeRefSig::None)
                .with_flags(virtual_slot())
                .with_generic_arity(1)
                .with_param(ParamDecl::new("a", TypeRefSig::param("T"))),
        );
    let derived = TypeDecl::new("App", "Derived")
        .with_base(TypeRefSig::named("App.Base"))
        .with_method(
            MethodDecl::new("F", TypeRefSig::None)
                .with_flags(override_slot())
                .with_param(ParamDecl::new("a", TypeRefSig::named("App.Size"))),
        );

    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(base)
                .with_type(derived),
        ),
        "app",
    );

    let sigs = vec!["App.Size".to_string()];
    let overriding = registry
        .get_method(&method_key(&type_key("app", "App.Derived"), "F", 0, &sigs))
        .unwrap();
    let expected = registry
        .get_method(&method_key(&type_key("app", "App.Base"), "F", 0, &sigs))
        .unwrap();

    assert_eq!(overriding.overrides().len(), 1);
    assert_eq!(overriding.overrides()[0].node_key(), expected.node_key());
    // None of the sibling overloads picked up a back edge.
    assert!(registry
        .get_method(&method_key(&type_key("app", "App.Base"), "F", 0, &[]))
        .unwrap()
        .overridden_by()
        .is_empty());
}

#[test]
fn property_override_derives_from_accessors() {
    let getter = || AccessorRef::new("get_Count", vec![]);
    let base = TypeDecl::new("App", "Base")
        .with_method(
            MethodDecl::new("get_Count", TypeRefSig::named("App.Size"))
                .with_flags(virtual_slot() | MethodAttributes::SPECIAL_NAME),
        )
        .with_property(
            PropertyDecl::new("Count", TypeRefSig::named("App.Size")).with_getter(getter()),
        );
    let derived = TypeDecl::new("App", "Derived")
        .with_base(TypeRefSig::named("App.Base"))
        .with_method(
            MethodDecl::new("get_Count", TypeRefSig::named("App.Size"))
                .with_flags(override_slot() | MethodAttributes::SPECIAL_NAME),
        )
        .with_property(
            PropertyDecl::new("Count", TypeRefSig::named("App.Size")).with_getter(getter()),
        );

    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(base)
                .with_type(derived),
        ),
        "app",
    );

    let derived_count = registry.get_type(&type_key("app", "App.Derived")).unwrap();
    let property = &derived_count.properties()[0];

    assert_eq!(property.overrides().len(), 1);
    assert_eq!(
        property.overrides()[0].node_key(),
        &member_key(&type_key("app", "App.Base"), "Count")
    );
    assert_eq!(property.overrides()[0].overridden_by().len(), 1);

    // The accessor knows which property it belongs to.
    let accessor = property.getter().unwrap();
    assert_eq!(
        accessor.association().unwrap().key(),
        property.node_key()
    );
}

#[test]
fn interface_property_matched_through_accessor_identity() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(
                    TypeDecl::interface("App", "ICounted")
                        .with_method(
                            MethodDecl::new("get_Count", TypeRefSig::named("App.Size")).with_flags(
                                virtual_slot()
                                    | MethodAttributes::ABSTRACT
                                    | MethodAttributes::SPECIAL_NAME,
                            ),
                        )
                        .with_property(
                            PropertyDecl::new("Count", TypeRefSig::named("App.Size"))
                                .with_getter(AccessorRef::new("get_Count", vec![])),
                        ),
                )
                .with_type(
                    TypeDecl::new("App", "Bag")
                        .with_interface(TypeRefSig::named("App.ICounted"))
                        .with_method(
                            MethodDecl::new("get_Count", TypeRefSig::named("App.Size"))
                                .with_flags(virtual_slot() | MethodAttributes::SPECIAL_NAME),
                        )
                        // Deliberately differently named: only the accessor tier
                        // can tie this property to the interface one.
                        .with_property(
                            PropertyDecl::new("Tally", TypeRefSig::named("App.Size"))
                                .with_getter(AccessorRef::new("get_Count", vec![])),
                        ),
                ),
        ),
        "app",
    );

    let bag = registry.get_type(&type_key("app", "App.Bag")).unwrap();
    let property = &bag.properties()[0];

    assert_eq!(property.implementation_for().len(), 1);
    assert_eq!(
        property.implementation_for()[0].node_key(),
        &member_key(&type_key("app", "App.ICounted"), "Count")
    );
    assert_eq!(property.implementation_for()[0].implemented_by().len(), 1);
}

#[test]
fn interface_property_matched_by_plain_name() {
    // Neither side declares accessor methods; the name tier alone links them.
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(
                    TypeDecl::interface("App", "ICounted")
                        .with_property(PropertyDecl::new("Count", TypeRefSig::named("App.Size"))),
                )
                .with_type(
                    TypeDecl::new("App", "Bag")
                        .with_interface(TypeRefSig::named("App.ICounted"))
                        .with_property(PropertyDecl::new("Count", TypeRefSig::named("App.Size"))),
                ),
        ),
        "app",
    );

    let bag = registry.get_type(&type_key("app", "App.Bag")).unwrap();
    assert_eq!(bag.properties()[0].implementation_for().len(), 1);
    assert!(!registry.diagnostics().has_errors());
}

#[test]
fn overload_lookup_distinguishes_shapes() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Size"))
                .with_type(
                    TypeDecl::new("App", "Base")
                        .with_method(MethodDecl::new("F", TypeRefSig::None))
                        .with_method(
                            MethodDecl::new("F", TypeRefSig::None)
                                .with_param(ParamDecl::new("a", TypeRefSig::named("App.Size"))),
                        )
                        .with_method(
                            MethodDecl::new("F", TypeRefSig::None)
                                .with_param(ParamDecl::new("a", TypeRefSig::named("App.Size")))
                                .with_param(ParamDecl::new("b", TypeRefSig::named("App.Size"))),
                        )
                        .with_method(
                            MethodDecl::new("F", TypeRefSig::None)
                                .with_generic_arity(1)
                                .with_param(ParamDecl::new("a", TypeRefSig::param("T"))),
                        ),
                ),
        ),
        "app",
    );

    let base = registry.get_type(&type_key("app", "App.Base")).unwrap();
    let overloads = base.methods_by_name("F");
    assert_eq!(overloads.len(), 4);
    for (i, left) in overloads.iter().enumerate() {
        for right in overloads.iter().skip(i + 1) {
            assert_ne!(left.node_key(), right.node_key());
        }
    }

    let size = type_key("app", "App.Size");
    let sigs = vec!["App.Size".to_string()];

    let nullary = base.method_with_params("F", &[], &registry).unwrap();
    assert_eq!(
        nullary.node_key(),
        &method_key(base.node_key(), "F", 0, &[])
    );
    let unary = base
        .method_with_params("F", &[size.clone()], &registry)
        .unwrap();
    assert_eq!(unary.node_key(), &method_key(base.node_key(), "F", 0, &sigs));
    let binary = base
        .method_with_params("F", &[size.clone(), size.clone()], &registry)
        .unwrap();
    assert_eq!(binary.params().len(), 2);
    // The generic overload's parameter resolves to the owner-scoped parameter
    // node, not to any named type.
    let generic = base
        .method_with_params("F", &[generic_param_key(base.node_key(), "T")], &registry)
        .unwrap();
    assert_eq!(generic.generic_arity(), 1);
}

#[test]
fn nested_types_link_both_directions() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app").with_type(
                TypeDecl::new("App", "Outer").with_nested(TypeDecl::new("", "Inner")),
            ),
        ),
        "app",
    );

    let outer = registry.get_type(&type_key("app", "App.Outer")).unwrap();
    let inner = registry
        .get_type(&type_key("app", "App.Outer/Inner"))
        .unwrap();

    assert_eq!(outer.nested_types()[0].node_key(), inner.node_key());
    assert_eq!(inner.nested_in().unwrap().node_key(), outer.node_key());
    assert_eq!(inner.name(), "Inner");
}

#[test]
fn attribute_decoration_links_both_directions() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(
                    TypeDecl::new("App", "MarkerAttribute")
                        .with_flags(TypeAttributes::PUBLIC | TypeAttributes::ATTRIBUTE),
                )
                .with_type(
                    TypeDecl::new("App", "Widget")
                        .with_attribute(TypeRefSig::named("App.MarkerAttribute")),
                ),
        ),
        "app",
    );

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let marker = registry
        .get_type(&type_key("app", "App.MarkerAttribute"))
        .unwrap();

    assert_eq!(widget.attributes()[0].node_key(), marker.node_key());
    assert_eq!(marker.decorates().len(), 1);
    assert_eq!(marker.decorates()[0].node_key(), widget.node_key());
}

#[test]
fn usage_edges_register_dependents() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Widget"))
                .with_type(
                    TypeDecl::new("App", "Holder")
                        .with_field(FieldDecl::new("widget", TypeRefSig::named("App.Widget")))
                        .with_method(
                            MethodDecl::new("Scratch", TypeRefSig::None)
                                .with_local(TypeRefSig::named("App.Widget")),
                        ),
                ),
        ),
        "app",
    );

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let dependents = widget.dependents();

    let field_key = member_key(&type_key("app", "App.Holder"), "widget");
    let method = method_key(&type_key("app", "App.Holder"), "Scratch", 0, &[]);
    assert!(dependents.iter().any(|n| n.node_key() == &field_key));
    assert!(dependents.iter().any(|n| n.node_key() == &method));
}
