use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fixed_collections::{FixedMap, FixedSet};
use std::collections::{BTreeMap, BTreeSet};

fn bench_map(c: &mut Criterion) {
    let n = 8;
    {
        let mut group = c.benchmark_group("BTreeMap vs FixedMap (Insert 8)");
        group.bench_function("std::collections::BTreeMap", |b| {
            b.iter(|| {
                let mut m = BTreeMap::new();
                for i in 0..n {
                    m.insert(black_box(i as i32), black_box(i as i32));
                }
                m
            })
        });

        group.bench_function("FixedMap<i32, i32, 8>", |b| {
            b.iter(|| {
                let mut m: FixedMap<i32, i32, 8> = FixedMap::new();
                for i in 0..n {
                    m.insert(black_box(i as i32), black_box(i as i32));
                }
                m
            })
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("BTreeMap vs FixedMap (Get 8)");
        let m_std: BTreeMap<i32, i32> = (0..n as i32).map(|i| (i, i)).collect();
        let m_fixed: FixedMap<i32, i32, 8> = (0..n as i32).map(|i| (i, i)).collect();

        group.bench_function("std::collections::BTreeMap", |b| {
            b.iter(|| {
                for i in 0..n {
                    black_box(m_std.get(&black_box(i as i32)));
                }
            })
        });

        group.bench_function("FixedMap<i32, i32, 8>", |b| {
            b.iter(|| {
                for i in 0..n {
                    black_box(m_fixed.get(&black_box(i as i32)));
                }
            })
        });
        group.finish();
    }
}

fn bench_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("FixedMap Overflow (N=8 -> 16)");
    group.bench_function("FixedMap<i32, i32, 8>", |b| {
        b.iter(|| {
            let mut m: FixedMap<i32, i32, 8> = FixedMap::new();
            for i in 0..16 {
                m.insert(black_box(i), black_box(i));
            }
            m
        })
    });
    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let n = 16;
    let mut group = c.benchmark_group("BTreeSet vs FixedSet (Insert/Remove 16)");
    group.bench_function("std::collections::BTreeSet", |b| {
        b.iter(|| {
            let mut s = BTreeSet::new();
            for i in 0..n {
                s.insert(black_box(i));
            }
            for i in (0..n).step_by(2) {
                s.remove(&black_box(i));
            }
            s
        })
    });

    group.bench_function("FixedSet<i32, 16>", |b| {
        b.iter(|| {
            let mut s: FixedSet<i32, 16> = FixedSet::new();
            for i in 0..n {
                s.insert(black_box(i));
            }
            for i in (0..n).step_by(2) {
                s.remove(&black_box(i));
            }
            s
        })
    });
    group.finish();
}

criterion_group!(benches, bench_map, bench_overflow, bench_set);
criterion_main!(benches);
