use criterion::{criterion_group, criterion_main, Criterion};
use textloc_core::restorer::{ContainerConfig, Restorer};
use textloc_memtree::MemTreeAdapter;

mod common;

fn bench_l2_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_path");
    group.sample_size(20);

    let descriptor = common::descriptor_for_last_paragraph_no_ids(5_000);
    let (tree, _) = common::build_paragraph_tree_no_ids(5_000);
    let adapter = MemTreeAdapter::new(tree);

    group.bench_function("restore_by_path_5000_elements", |b| {
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

criterion_group!(benches, bench_l2_restore);
criterion_main!(benches);
