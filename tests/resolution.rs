//! Resolution tests: sentinel substitution, constructed type flavors, generic
//! parameters and late module availability.

use std::sync::Arc;

use dotlink::prelude::*;

fn build(source: MemorySource, entry: &str) -> NodeRegistry {
    let registry = NodeRegistry::new(Arc::new(source));
    registry.load_module_by_name(entry);
    registry.process_all(true, false);
    registry
}

#[test]
fn unlocatable_module_degrades_to_missing_sentinel() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app").with_type(
                TypeDecl::new("App", "Widget")
                    .with_base(TypeRefSig::in_module("gone", "Ext.Base")),
            ),
        ),
        "app",
    );

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let base = widget.base().unwrap();

    assert!(base.is_missing());
    assert!(base.is_interface().is_none());
    assert!(registry.get_module("gone").unwrap().is_missing());

    // One Warning per missing identity, raised at creation only.
    let warnings = registry.diagnostics().by_severity(FaultSeverity::Warning);
    assert_eq!(warnings.len(), 2, "one for the module, one for the type");

    // The subtype registration attempted during Widget's build was converted
    // into a fault on the sentinel instead of an edge.
    assert!(base.subtypes().is_empty());
    assert!(registry
        .diagnostics()
        .by_node(base.node_key())
        .iter()
        .any(|f| f.severity == FaultSeverity::Information));
}

#[test]
fn undeclared_type_in_present_module_is_missing() {
    let registry = build(
        MemorySource::new()
            .with_module(MemoryModule::new("lib").with_type(TypeDecl::new("Lib", "Real")))
            .with_module(
                MemoryModule::new("app").with_type(
                    TypeDecl::new("App", "Widget")
                        .with_field(FieldDecl::new("f", TypeRefSig::in_module("lib", "Lib.Imagined"))),
                ),
            ),
        "app",
    );

    let field_type = registry
        .get_type(&type_key("lib", "Lib.Imagined"))
        .unwrap();
    assert!(field_type.is_missing());
    assert!(!registry.get_module("lib").unwrap().is_missing());
}

#[test]
fn absent_reference_resolves_to_null() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app").with_type(
                TypeDecl::new("App", "Widget")
                    .with_method(MethodDecl::new("Reset", TypeRefSig::None)),
            ),
        ),
        "app",
    );

    let reset = registry
        .get_method(&method_key(&type_key("app", "App.Widget"), "Reset", 0, &[]))
        .unwrap();
    let result = reset.return_type().unwrap();

    assert!(result.is_null());
    // The Null node is terminal: its base is itself and it is permanently excluded.
    assert_eq!(result.base().unwrap().node_key(), result.node_key());
    assert!(result.dependents().is_empty());
}

#[test]
fn array_presents_element_members() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(
                    TypeDecl::new("App", "Widget")
                        .with_method(MethodDecl::new("Draw", TypeRefSig::None)),
                )
                .with_type(
                    TypeDecl::new("App", "Holder").with_field(FieldDecl::new(
                        "widgets",
                        TypeRefSig::array(TypeRefSig::named("App.Widget"), 1),
                    )),
                ),
        ),
        "app",
    );

    let holder = registry.get_type(&type_key("app", "App.Holder")).unwrap();
    let array = holder.fields()[0].field_type().unwrap();

    assert!(matches!(array.flavor(), TypeFlavor::Array { rank: 1 }));
    assert_eq!(array.element().unwrap().full_name(), "App.Widget");
    assert!(array.base().unwrap().is_null());
    // The element's methods show through; the array declares nothing itself.
    assert_eq!(array.methods().len(), 1);
    assert_eq!(array.methods()[0].name(), "Draw");
}

#[test]
fn generic_instance_presents_definition_members() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Base"))
                .with_type(
                    TypeDecl::new("App", "Box")
                        .with_base(TypeRefSig::named("App.Base"))
                        .with_generic_param(GenericParamDecl::new("T"))
                        .with_method(MethodDecl::new("Get", TypeRefSig::param("T"))),
                )
                .with_type(TypeDecl::new("App", "Widget"))
                .with_type(
                    TypeDecl::new("App", "Holder").with_field(FieldDecl::new(
                        "boxed",
                        TypeRefSig::generic(
                            TypeRefSig::named("App.Box"),
                            vec![TypeRefSig::named("App.Widget")],
                        ),
                    )),
                ),
        ),
        "app",
    );

    let holder = registry.get_type(&type_key("app", "App.Holder")).unwrap();
    let instance = holder.fields()[0].field_type().unwrap();

    assert_eq!(instance.flavor(), TypeFlavor::GenericInstance);
    assert_eq!(instance.definition().unwrap().full_name(), "App.Box");
    assert_eq!(instance.generic_args().len(), 1);
    assert_eq!(instance.generic_args()[0].full_name(), "App.Widget");
    // Definition surface shows through, base included.
    assert_eq!(instance.methods().len(), 1);
    assert_eq!(instance.base().unwrap().full_name(), "App.Base");

    // Same signature, same node.
    let module = registry.get_module("app").unwrap();
    let again = registry.load_type(
        &TypeRefSig::generic(
            TypeRefSig::named("App.Box"),
            vec![TypeRefSig::named("App.Widget")],
        ),
        &module,
        None,
    );
    assert!(Arc::ptr_eq(&instance, &again));
}

#[test]
fn generic_parameter_derives_shape_from_constraints() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app")
                .with_type(TypeDecl::new("App", "Base"))
                .with_type(TypeDecl::interface("App", "IWidget"))
                .with_type(
                    TypeDecl::new("App", "Box").with_generic_param(
                        GenericParamDecl::new("T")
                            .with_constraint(TypeRefSig::named("App.Base"))
                            .with_constraint(TypeRefSig::named("App.IWidget"))
                            .with_flags(GenericParamAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT),
                    ),
                ),
        ),
        "app",
    );

    let boxed = registry.get_type(&type_key("app", "App.Box")).unwrap();
    let param = &boxed.generic_params()[0];

    assert_eq!(param.flavor(), TypeFlavor::GenericParameter);
    assert_eq!(param.generic_owner().unwrap().node_key(), boxed.node_key());
    assert_eq!(param.constraints().len(), 2);
    // The class-type constraint becomes the base; the interface one does not.
    assert_eq!(param.base().unwrap().full_name(), "App.Base");
    assert!(param.has_default_constructor_constraint());
}

#[test]
fn missing_type_upgrades_when_module_arrives() {
    let source = MemorySource::new().with_module(
        MemoryModule::new("app").with_type(
            TypeDecl::new("App", "Widget").with_base(TypeRefSig::in_module("lib", "Lib.Base")),
        ),
    );
    let registry = NodeRegistry::new(Arc::new(source));
    registry.load_module_by_name("app");
    registry.process_all(true, false);

    let widget = registry.get_type(&type_key("app", "App.Widget")).unwrap();
    let base = widget.base().unwrap();
    assert!(base.is_missing());

    // The module shows up later; same identity, upgraded in place.
    let lib = registry.load_module(Box::new(
        MemoryModule::new("lib").with_type(TypeDecl::new("Lib", "Base")),
    ));
    assert!(!lib.is_missing());
    registry.process_all(true, false);

    let base_again = widget.base().unwrap();
    assert!(Arc::ptr_eq(&base, &base_again));
    assert!(!base_again.is_missing());
    assert_eq!(base_again.flavor(), TypeFlavor::Ordinary);

    // Rebuilding the dependent refreshes edges that were withheld from the sentinel.
    widget.force_rebuild(&registry);
    assert!(base_again
        .subtypes()
        .iter()
        .any(|t| t.node_key() == widget.node_key()));
}

#[test]
fn cyclic_module_references_resolve() {
    let registry = build(
        MemorySource::new()
            .with_module(
                MemoryModule::new("a")
                    .with_reference("b")
                    .with_type(
                        TypeDecl::new("A", "Left")
                            .with_field(FieldDecl::new("r", TypeRefSig::in_module("b", "B.Right"))),
                    ),
            )
            .with_module(
                MemoryModule::new("b")
                    .with_reference("a")
                    .with_type(
                        TypeDecl::new("B", "Right")
                            .with_field(FieldDecl::new("l", TypeRefSig::in_module("a", "A.Left"))),
                    ),
            ),
        "a",
    );

    let left = registry.get_type(&type_key("a", "A.Left")).unwrap();
    let right = registry.get_type(&type_key("b", "B.Right")).unwrap();

    assert_eq!(
        left.fields()[0].field_type().unwrap().node_key(),
        right.node_key()
    );
    assert_eq!(
        right.fields()[0].field_type().unwrap().node_key(),
        left.node_key()
    );
    assert!(!registry.diagnostics().has_errors());
}

#[test]
fn self_referential_type_resolves() {
    let registry = build(
        MemorySource::new().with_module(
            MemoryModule::new("app").with_type(
                TypeDecl::new("App", "Node")
                    .with_field(FieldDecl::new("next", TypeRefSig::named("App.Node"))),
            ),
        ),
        "app",
    );

    let node = registry.get_type(&type_key("app", "App.Node")).unwrap();
    assert_eq!(
        node.fields()[0].field_type().unwrap().node_key(),
        node.node_key()
    );
    assert!(!registry.diagnostics().has_errors());
}
