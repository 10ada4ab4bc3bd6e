//! Benchmarks for graph construction and resolution.
//!
//! Measures the hot paths of a resolution session:
//! - Identity key construction
//! - Cached type lookup through the registry
//! - Full batch processing of a synthetic module set, sequential and parallel

extern crate dotlink;

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use dotlink::prelude::*;

/// A synthetic module with a base-chain hierarchy, one interface and a handful
/// of members per type. Shaped like a typical application module rather than a
/// degenerate best case.
fn synthetic_module(name: &str, types: usize) -> MemoryModule {
    let virtual_slot =
        MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG | MethodAttributes::NEW_SLOT;
    let override_slot = MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG;

    let mut module = MemoryModule::new(name).with_type(
        TypeDecl::interface("Bench", "IRender")
            .with_method(MethodDecl::new("Render", TypeRefSig::None).with_flags(virtual_slot)),
    );
    for i in 0..types {
        let mut decl = TypeDecl::new("Bench", format!("Type{i}"))
            .with_interface(TypeRefSig::named("Bench.IRender"))
            .with_field(FieldDecl::new("next", TypeRefSig::named("Bench.Type0")))
            .with_field(FieldDecl::new(
                "items",
                TypeRefSig::array(TypeRefSig::named("Bench.Type0"), 1),
            ))
            .with_method(
                MethodDecl::new("Render", TypeRefSig::None).with_flags(if i == 0 {
                    virtual_slot
                } else {
                    override_slot
                }),
            )
            .with_method(
                MethodDecl::new("Compare", TypeRefSig::named("Bench.Type0"))
                    .with_param(ParamDecl::new("other", TypeRefSig::named(format!("Bench.Type{i}")))),
            );
        if i > 0 {
            decl = decl.with_base(TypeRefSig::named(format!("Bench.Type{}", i - 1)));
        }
        module = module.with_type(decl);
    }
    module
}

fn bench_key_construction(c: &mut Criterion) {
    let declaring = type_key("app", "App.Collections.Widget");
    let params = [
        "App.Widget".to_string(),
        "App.Widget[]".to_string(),
        "!T".to_string(),
    ];

    c.bench_function("key_method", |b| {
        b.iter(|| {
            let key = method_key(black_box(&declaring), black_box("Accept"), 1, &params);
            black_box(key)
        });
    });
}

fn bench_cached_type_lookup(c: &mut Criterion) {
    let source = MemorySource::new().with_module(synthetic_module("app", 64));
    let registry = NodeRegistry::new(Arc::new(source));
    registry.load_module_by_name("app");
    registry.process_all(true, false);

    let module = registry.get_module("app").unwrap();
    let sig = TypeRefSig::named("Bench.Type32");

    c.bench_function("registry_load_type_cached", |b| {
        b.iter(|| {
            let node = registry.load_type(black_box(&sig), &module, None);
            black_box(node)
        });
    });
}

fn bench_process_all_sequential(c: &mut Criterion) {
    c.bench_function("process_all_sequential_128", |b| {
        b.iter(|| {
            let source = MemorySource::new().with_module(synthetic_module("app", 128));
            let registry = NodeRegistry::new(Arc::new(source));
            registry.load_module_by_name("app");
            registry.process_all(true, false);
            black_box(registry.type_count())
        });
    });
}

fn bench_process_all_parallel(c: &mut Criterion) {
    c.bench_function("process_all_parallel_128", |b| {
        b.iter(|| {
            let source = MemorySource::new().with_module(synthetic_module("app", 128));
            let registry = NodeRegistry::new(Arc::new(source));
            registry.load_module_by_name("app");
            registry.process_all(true, true);
            black_box(registry.type_count())
        });
    });
}

fn bench_cross_module_resolution(c: &mut Criterion) {
    c.bench_function("process_all_cross_module", |b| {
        b.iter(|| {
            let source = MemorySource::new()
                .with_module(synthetic_module("core", 32))
                .with_module(
                    MemoryModule::new("app")
                        .with_reference("core")
                        .with_type(
                            TypeDecl::new("App", "Program")
                                .with_base(TypeRefSig::in_module("core", "Bench.Type31"))
                                .with_field(FieldDecl::new(
                                    "pool",
                                    TypeRefSig::array(
                                        TypeRefSig::in_module("core", "Bench.Type0"),
                                        1,
                                    ),
                                )),
                        ),
                );
            let registry = NodeRegistry::new(Arc::new(source));
            registry.load_module_by_name("app");
            registry.process_all(true, false);
            black_box(registry.type_count())
        });
    });
}

criterion_group!(
    benches,
    bench_key_construction,
    bench_cached_type_lookup,
    bench_process_all_sequential,
    bench_process_all_parallel,
    bench_cross_module_resolution,
);
criterion_main!(benches);
