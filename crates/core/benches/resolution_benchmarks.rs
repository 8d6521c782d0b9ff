//! Resolution benchmarks
//!
//! Measures cached and uncached resolution paths against registration lists
//! of growing size, where lookup scans from the most recent registration.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use taskpilot_core::container::{
    Implementation, Resolve, ServiceCollection, ServiceLifetime, ServiceProvider,
};

#[derive(Default)]
struct Target;

/// Provider with `filler` named registrations in front of the target
fn provider_with(filler: usize, lifetime: ServiceLifetime) -> ServiceProvider {
    let mut services = ServiceCollection::new();
    for i in 0..filler {
        services.add_named(
            format!("filler{}", i),
            ServiceLifetime::Transient,
            Implementation::constructor(move || Arc::new(i)),
        );
    }
    services.add_with(lifetime, Implementation::<Target>::self_constructed());
    services.build()
}

fn benchmark_lifetimes(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_by_lifetime");

    for filler in [0usize, 100, 1000].iter() {
        let singleton = provider_with(*filler, ServiceLifetime::Singleton);
        group.bench_with_input(BenchmarkId::new("singleton", filler), filler, |b, _| {
            b.iter(|| black_box(singleton.get_required_service::<Target>().unwrap()))
        });

        let transient = provider_with(*filler, ServiceLifetime::Transient);
        group.bench_with_input(BenchmarkId::new("transient", filler), filler, |b, _| {
            b.iter(|| black_box(transient.get_required_service::<Target>().unwrap()))
        });

        let scoped = provider_with(*filler, ServiceLifetime::Scoped);
        let scope = scoped.create_scope();
        group.bench_with_input(BenchmarkId::new("scoped", filler), filler, |b, _| {
            b.iter(|| black_box(scope.get_required_service::<Target>().unwrap()))
        });
    }

    group.finish();
}

fn benchmark_scope_lifecycle(c: &mut Criterion) {
    let provider = provider_with(10, ServiceLifetime::Scoped);

    c.bench_function("scope_create_resolve_dispose", |b| {
        b.iter(|| {
            let scope = provider.create_scope();
            black_box(scope.get_required_service::<Target>().unwrap());
            scope.dispose();
        })
    });
}

criterion_group!(benches, benchmark_lifetimes, benchmark_scope_lifecycle);
criterion_main!(benches);
