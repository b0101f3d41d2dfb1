// Benchmark Java analysis, classification and import resolution throughput.

use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rayon::prelude::*;

use scribe_core::config::CollisionPolicy;
use scribe_core::imports;
use scribe_core::strategy::classify;
use scribe_core::symbols::SymbolIndex;
use scribe_java::{DeclKind, TypeDeclaration};

fn generate_service_source(methods: usize) -> String {
    use std::fmt::Write;
    let mut src = String::from(
        "package com.bench.service;\n\n@Service\npublic class BenchService {\n    private final OrderRepository orders;\n    private final PaymentGateway gateway;\n    private int retries;\n\n",
    );
    for i in 0..methods {
        let _ = write!(
            src,
            "    public Optional<Order> find{i}(Long id) {{\n        return orders.findById(id + {i});\n    }}\n\n"
        );
    }
    src.push_str("}\n");
    src
}

fn generate_test_body(tests: usize) -> String {
    use std::fmt::Write;
    let mut src = String::from(
        "@ExtendWith(MockitoExtension.class)\nclass BenchServiceTest {\n    @Mock OrderRepository orders;\n    @InjectMocks BenchService service;\n\n",
    );
    for i in 0..tests {
        let _ = write!(
            src,
            "    @Test\n    void find{i}() {{\n        when(orders.findById(anyLong())).thenReturn(Optional.of(new Order()));\n        List<Order> all = new ArrayList<>();\n        assertTrue(service.find{i}(1L).isPresent());\n    }}\n\n"
        );
    }
    src.push_str("}\n");
    src
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_single_file");

    for method_count in [10, 50, 200] {
        let source = generate_service_source(method_count);
        group.bench_with_input(
            BenchmarkId::new("service_methods", method_count),
            &source,
            |b, src| {
                b.iter(|| {
                    let facts = scribe_java::analyze(src).unwrap();
                    classify(&facts)
                });
            },
        );
    }
    group.finish();
}

fn bench_analyze_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_parallel");
    let files: Vec<String> = (0..100).map(|_| generate_service_source(20)).collect();

    group.bench_function("100_files_sequential", |b| {
        b.iter(|| {
            for src in &files {
                scribe_java::analyze(src).unwrap();
            }
        });
    });

    group.bench_function("100_files_rayon", |b| {
        b.iter(|| {
            files.par_iter().for_each(|src| {
                scribe_java::analyze(src).unwrap();
            });
        });
    });

    group.finish();
}

fn bench_resolve_imports(c: &mut Criterion) {
    let index = SymbolIndex::from_declarations(
        ["Order", "OrderRepository", "PaymentGateway", "BenchService"]
            .into_iter()
            .map(|name| {
                (
                    PathBuf::from(format!("{name}.java")),
                    TypeDeclaration {
                        package: Some("com.bench.service".to_string()),
                        name: name.to_string(),
                        kind: DeclKind::Class,
                    },
                )
            }),
        CollisionPolicy::LastWins,
    )
    .unwrap();

    let mut group = c.benchmark_group("resolve_imports");
    for test_count in [5, 25, 100] {
        let body = generate_test_body(test_count);
        group.bench_with_input(BenchmarkId::new("tests", test_count), &body, |b, body| {
            b.iter(|| imports::resolve(body, "com.bench.service", "BenchService", &index).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_analyze,
    bench_analyze_parallel,
    bench_resolve_imports
);
criterion_main!(benches);
