//! Benchmarks for the hot rotation paths used inside control loops.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use icon_math::Rotation;
use nalgebra::Vector3;

fn bench_compose(c: &mut Criterion) {
    let a = Rotation::from_rpy(0.1, 0.2, 0.3);
    let b = Rotation::from_rpy(-0.4, 0.5, -0.6);
    c.bench_function("rotation_compose", |bencher| {
        bencher.iter(|| black_box(a) * black_box(b))
    });
}

fn bench_rotate_point(c: &mut Criterion) {
    let rotation = Rotation::from_rpy(0.1, 0.2, 0.3);
    let point = Vector3::new(1.0, -2.0, 0.5);
    c.bench_function("rotation_rotate_point", |bencher| {
        bencher.iter(|| black_box(&rotation).rotate(black_box(&point)))
    });
}

fn bench_rpy_roundtrip(c: &mut Criterion) {
    c.bench_function("rotation_rpy_roundtrip", |bencher| {
        bencher.iter(|| Rotation::from_rpy(black_box(0.1), black_box(0.2), black_box(0.3)).to_rpy())
    });
}

criterion_group!(benches, bench_compose, bench_rotate_point, bench_rpy_roundtrip);
criterion_main!(benches);
