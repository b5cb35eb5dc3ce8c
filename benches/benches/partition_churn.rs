// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use keyscope_partition::{ElementKey, PartitionTree, Quad};
use keyscope_sequence::{AnimSequence, Channel, IndexedSequence, Keyframe, Property, Viewport};
use kurbo::Point;

const EXTENT: f64 = 5000.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_points(count: usize, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| (rng.next_f64() * EXTENT, rng.next_f64() * EXTENT))
        .collect()
}

/// Points packed along timeline lanes, the shape keyframe markers take.
fn gen_lane_points(lanes: usize, per_lane: usize) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(lanes * per_lane);
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    for lane in 1..=lanes {
        for _ in 0..per_lane {
            out.push((rng.next_f64() * EXTENT, lane as f64 * 20.0));
        }
    }
    out
}

fn build(points: &[(f64, f64)]) -> (PartitionTree<u32>, Vec<ElementKey>) {
    let mut tree = PartitionTree::new(Quad::from_origin_size(0.0, 0.0, EXTENT, EXTENT));
    let keys = points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| tree.insert(x, y, i as u32).unwrap())
        .collect();
    (tree, keys)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[100usize, 1_000, 10_000] {
        let points = gen_random_points(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("insert_random_n{}", n), |b| {
            b.iter(|| black_box(build(&points).0.node_count()));
        });
    }
    let lanes = gen_lane_points(40, 50);
    group.bench_function("insert_lanes_40x50", |b| {
        b.iter(|| black_box(build(&lanes).0.node_count()));
    });
    group.finish();
}

fn bench_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick");
    for &n in &[100usize, 1_000, 10_000] {
        let (tree, _) = build(&gen_random_points(n, 0xCAFE_F00D_DEAD_BEEF));
        let probes = gen_random_points(256, 0xFACE_FEED_CAFE_BABE);
        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("closest_r6_n{}", n), |b| {
            b.iter(|| {
                let hits = probes
                    .iter()
                    .filter(|&&(x, y)| tree.closest(x * 0.2, y, 6.0, 0.2, 1.0).is_some())
                    .count();
                black_box(hits);
            });
        });
    }
    group.finish();
}

fn bench_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag");
    let points = gen_random_points(1_000, 0xC1A5_7E55_9999_ABCD);
    group.bench_function("evict_move_reinsert_n1000", |b| {
        b.iter_batched(
            || build(&points),
            |(mut tree, keys)| {
                // Sixty frames of a small horizontal drag on one element.
                let key = keys[keys.len() / 2];
                let (x, y) = tree.position(key).unwrap();
                tree.evict(key).unwrap();
                for frame in 0..60 {
                    tree.set_position(key, (x + frame as f64).min(EXTENT), y)
                        .unwrap();
                }
                tree.reinsert(key).unwrap();
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("set_position_in_place_n1000", |b| {
        b.iter_batched(
            || build(&points),
            |(mut tree, keys)| {
                let mut rng = Rng::new(7);
                for &key in keys.iter().take(100) {
                    let (x, y) = (rng.next_f64() * EXTENT, rng.next_f64() * EXTENT);
                    tree.set_position(key, x, y).unwrap();
                }
                black_box(tree.reclaimed_nodes());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn sample_sequence(properties: usize, keys: usize) -> AnimSequence {
    let mut rng = Rng::new(0xDEC0_DE00_0000_0001);
    let mut seq = AnimSequence::new();
    for p in 0..properties {
        let channel = Channel::new((0..keys).map(|k| {
            let t = k as f64 * 100.0;
            let v = rng.next_f64() * 200.0 - 100.0;
            if k % 2 == 0 {
                Keyframe::new(t, v)
            } else {
                Keyframe::new(t, v).with_cubic(Point::new(0.3, 0.0), Point::new(0.7, 1.0))
            }
        }));
        seq.push_property(format!("p{p}"), Property::Scalar(channel));
    }
    seq
}

fn bench_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");
    let anim = sample_sequence(20, 40);
    group.bench_function("rebuild_20x40", |b| {
        b.iter_batched(
            || anim.clone(),
            |anim| black_box(IndexedSequence::new(anim).unwrap().element_count()),
            BatchSize::SmallInput,
        );
    });
    let view = Viewport::default();
    group.bench_function("drag_session_20x40", |b| {
        b.iter_batched(
            || IndexedSequence::new(anim.clone()).unwrap(),
            |mut seq| {
                let hit = seq
                    .pick(Point::new(200.0 * view.scale_x, 0.0), 1e6, &view)
                    .unwrap();
                seq.begin_edit(hit).unwrap();
                for _ in 0..60 {
                    seq.apply_offset(hit, 0.5, 0.25).unwrap();
                }
                seq.end_edit(hit).unwrap();
                black_box(seq.sequence().duration());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_pick, bench_drag, bench_sequence);
criterion_main!(benches);
