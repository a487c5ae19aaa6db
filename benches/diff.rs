use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use foldersync::core::{classify_dir, DirListing, EntryNameSet, DEFAULT_SET_SWITCH_THRESHOLD};

/// 阈值两侧的名称查找开销对比
fn bench_name_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_set_contains");
    for &size in &[10usize, 20, 200, 2000] {
        let names: Vec<String> = (0..size).map(|i| format!("file-{:05}.dat", i)).collect();
        let set = EntryNameSet::new(names.clone(), DEFAULT_SET_SWITCH_THRESHOLD);
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                for name in &names {
                    black_box(set.contains(name));
                }
            })
        });
    }
    group.finish();
}

/// 单层目录差异分类
fn bench_classify(c: &mut Criterion) {
    let source = DirListing {
        files: (0..500).map(|i| format!("f{:04}.dat", i)).collect(),
        dirs: (0..30).map(|i| format!("d{:02}", i)).collect(),
    };
    let mut replica = source.clone();
    replica.files.truncate(400);
    replica
        .files
        .extend((0..50).map(|i| format!("stale{:03}.dat", i)));
    replica.dirs.push("dead".to_string());

    c.bench_function("classify_dir_500", |b| {
        b.iter(|| {
            black_box(classify_dir(
                black_box(&source),
                black_box(&replica),
                DEFAULT_SET_SWITCH_THRESHOLD,
            ))
        })
    });
}

criterion_group!(benches, bench_name_set, bench_classify);
criterion_main!(benches);
