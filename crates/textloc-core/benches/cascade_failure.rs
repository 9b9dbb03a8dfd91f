use criterion::{criterion_group, criterion_main, Criterion};
use textloc_core::restorer::{ContainerConfig, Restorer};
use textloc_memtree::MemTreeAdapter;

mod common;

/// The worst case on the §8.4 envelope: the target tree shares nothing
/// with the descriptor, so all four layers are attempted and all four
/// fail before `restore()` returns.
fn bench_cascade_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascade_failure");
    group.sample_size(20);

    let descriptor = common::descriptor_for_last_paragraph_no_ids(5_000);
    let tree = common::build_unrelated_tree(5_000);
    let adapter = MemTreeAdapter::new(tree);

    group.bench_function("all_layers_fail_5000_elements", |b| {
        let mut restorer = Restorer::default();
        b.iter(|| {
            let result = restorer.restore(
                std::hint::black_box(&descriptor),
                std::hint::black_box(&adapter),
                &ContainerConfig::default(),
            );
            std::hint::black_box(result.success);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cascade_failure);
criterion_main!(benches);
