use criterion::{black_box, criterion_group, criterion_main, Criterion};
use modlink::{LinkAssembler, Registry, Resolver};
use std::path::Path;
use tempfile::TempDir;

fn register(registry: &mut Registry, root: &Path, name: &str, deps: Vec<String>) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    registry.register(name, &dir, deps).unwrap();
}

/// One top unit depending on `width` leaves
fn wide_registry(root: &Path, width: usize) -> Registry {
    let mut registry = Registry::new();
    let leaves: Vec<String> = (0..width).map(|i| format!("Leaf{}", i)).collect();
    for leaf in &leaves {
        register(&mut registry, root, leaf, Vec::new());
    }
    register(&mut registry, root, "Top", leaves);
    registry
}

/// A chain of `depth` units, each also depending on every fifth unit below it
fn deep_registry(root: &Path, depth: usize) -> Registry {
    let mut registry = Registry::new();
    for i in 0..depth {
        let mut deps = Vec::new();
        if i > 0 {
            deps.push(format!("U{}", i - 1));
        }
        deps.extend((0..i).step_by(5).map(|j| format!("U{}", j)));
        register(&mut registry, root, &format!("U{}", i), deps);
    }
    registry
}

fn benchmark_resolve_wide(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let registry = wide_registry(temp_dir.path(), 1000);

    c.bench_function("resolve_wide_1000", |b| {
        b.iter(|| {
            black_box(Resolver::new(&registry).resolve(black_box("Top"))).unwrap();
        })
    });
}

fn benchmark_resolve_deep(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let registry = deep_registry(temp_dir.path(), 300);

    c.bench_function("resolve_deep_300", |b| {
        b.iter(|| {
            black_box(Resolver::new(&registry).resolve(black_box("U299"))).unwrap();
        })
    });
}

fn benchmark_assemble(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let registry = wide_registry(temp_dir.path(), 1000);
    let order = Resolver::new(&registry).resolve("Top").unwrap();
    let layout = modlink::ArtifactLayout::new(temp_dir.path().join("build"));

    c.bench_function("assemble_1000", |b| {
        b.iter(|| {
            let assembler = LinkAssembler::new(&registry).with_layout(layout.clone());
            black_box(assembler.assemble(black_box(&order))).unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_resolve_wide,
    benchmark_resolve_deep,
    benchmark_assemble
);
criterion_main!(benches);
