#![deny(warnings)]

use blaze_mask::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::{f64::consts::PI, hint::black_box, time::Duration};

const SIZE: Scalar = 1024.0;

fn circle() -> Path {
    Path::builder()
        .move_to((SIZE / 2.0, SIZE / 2.0))
        .circle(SIZE / 2.0 - 8.0)
        .build()
}

/// Self-intersecting star, so fill rules produce different masks
fn star(points: usize) -> Path {
    let mut builder = Path::builder();
    let center = SIZE / 2.0;
    let radius = SIZE / 2.0 - 8.0;
    for index in 0..points {
        let angle = 2.0 * PI * ((index * 2) % points) as Scalar / points as Scalar;
        let point = (center + radius * angle.cos(), center + radius * angle.sin());
        if index == 0 {
            builder.move_to(point);
        } else {
            builder.line_to(point);
        }
    }
    builder.close().build()
}

fn rasterizers() -> impl Iterator<Item = (&'static str, Rasterizer)> {
    let tiled = RasterizerConfig {
        layout: Some(LineLayout::Tiled),
        ..RasterizerConfig::default()
    };
    let wide = RasterizerConfig {
        layout: Some(LineLayout::Wide),
        ..RasterizerConfig::default()
    };
    [
        ("single", Rasterizer::new(RasterizerConfig::single_threaded())),
        ("tiled", Rasterizer::new(tiled)),
        ("wide", Rasterizer::new(wide)),
    ]
    .into_iter()
}

fn rasterize_benchmark(c: &mut Criterion) {
    let clip = BBox::new((0.0, 0.0), (SIZE, SIZE));
    let paths = [("circle", circle(), FillRule::NonZero), ("star", star(17), FillRule::EvenOdd)];

    let mut group = c.benchmark_group("rasterize");
    group.throughput(Throughput::Elements((SIZE * SIZE) as u64));
    for (name, rasterizer) in rasterizers() {
        for (path_name, path, fill_rule) in paths.iter() {
            group.bench_with_input(BenchmarkId::new(*path_name, name), &rasterizer, |b, r| {
                b.iter_with_large_drop(|| {
                    r.rasterize_path(black_box(path), Matrix::identity(), *fill_rule, clip)
                })
            });
        }
    }
    group.finish()
}

fn sparse_benchmark(c: &mut Criterion) {
    let rasterizer = Rasterizer::default();
    let clip = BBox::new((0.0, 0.0), (SIZE, SIZE));
    let circle = rasterizer
        .rasterize_path(&circle(), Matrix::identity(), FillRule::NonZero, clip)
        .expect("failed to rasterize circle");
    let star = rasterizer
        .rasterize_path(&star(17), Matrix::identity(), FillRule::EvenOdd, clip)
        .expect("failed to rasterize star");
    let sparse_circle = sparse_mask_from_dense(&circle).expect("failed to convert circle");
    let sparse_star = sparse_mask_from_dense(&star).expect("failed to convert star");

    let mut group = c.benchmark_group("sparse");
    group.throughput(Throughput::Elements((SIZE * SIZE) as u64));
    group.bench_function("from dense", |b| {
        b.iter_with_large_drop(|| sparse_mask_from_dense(black_box(&circle)))
    });
    for op in [MaskOp::And, MaskOp::Or, MaskOp::Xor, MaskOp::AndNot] {
        group.bench_with_input(
            BenchmarkId::new("mask_op", format!("{:?}", op)),
            &op,
            |b, op| b.iter_with_large_drop(|| mask_op(*op, &sparse_circle, &sparse_star)),
        );
    }
    let rect = SparseMask::Rect(BBox::new((128.0, 128.0), (896.0, 896.0)));
    group.bench_function("mask_op rect", |b| {
        b.iter_with_large_drop(|| mask_op(MaskOp::And, black_box(&rect), &sparse_circle))
    });
    group.finish()
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::new(2, 0))
        .measurement_time(Duration::new(10, 0));
    targets = rasterize_benchmark, sparse_benchmark
);
criterion_main!(benches);
