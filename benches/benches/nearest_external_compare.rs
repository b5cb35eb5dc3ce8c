// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use keyscope_partition::{PartitionTree, Quad};

use rstar::RTree;

const EXTENT: f64 = 5000.0;

fn gen_grid_points(n: usize, cell: f64) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            out.push([x as f64 * cell + 1.5, y as f64 * cell + 0.5]);
        }
    }
    out
}

fn bench_nearest_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_external_compare");
    for &n in &[32usize, 64] {
        let points = gen_grid_points(n, 12.0);
        let probe = [200.0, 200.0];
        let radius = 6.0;
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("keyscope_build_pick_n{}", n), |b| {
            b.iter_batched(
                || PartitionTree::<u32>::new(Quad::from_origin_size(0.0, 0.0, EXTENT, EXTENT)),
                |mut tree| {
                    for (i, p) in points.iter().enumerate() {
                        let _ = tree.insert(p[0], p[1], i as u32);
                    }
                    let hit = tree.closest(probe[0], probe[1], radius, 1.0, 1.0);
                    black_box(hit);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rstar_build_pick_bulk_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let hit = tree
                        .nearest_neighbor(&probe)
                        .filter(|p| (p[0] - probe[0]).hypot(p[1] - probe[1]) <= radius);
                    black_box(hit.copied());
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("rstar_build_pick_incremental_n{}", n), |b| {
            b.iter_batched(
                RTree::<[f64; 2]>::new,
                |mut tree| {
                    for p in &points {
                        tree.insert(*p);
                    }
                    let hit = tree
                        .nearest_neighbor(&probe)
                        .filter(|p| (p[0] - probe[0]).hypot(p[1] - probe[1]) <= radius);
                    black_box(hit.copied());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_nearest_external_compare);
criterion_main!(benches);
