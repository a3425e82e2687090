//! Benchmarks for point gridding

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use surtgrid_algorithms::gridding::GridContext;
use surtgrid_algorithms::interpolation::{GridAlgorithm, PointSet, SamplePoint};
use surtgrid_core::{NoProgress, PixelBuffer, PixelType};

fn create_points(count: usize) -> PointSet {
    let samples: Vec<SamplePoint> = (0..count)
        .map(|i| {
            // Spread points over a 1000 x 1000 square with a pseudo-random pattern
            let x = ((i * 7919) % 1000) as f64 + ((i * 13) % 10) as f64 / 10.0;
            let y = ((i * 104_729) % 1000) as f64 + ((i * 17) % 10) as f64 / 10.0;
            let z = (x / 50.0).sin() * 100.0 + y / 10.0;
            SamplePoint::new(x, y, z)
        })
        .collect();
    PointSet::from_samples(&samples)
}

fn grid(ctx: &GridContext, size: usize) -> PixelBuffer {
    let mut buf = PixelBuffer::try_zeroed(PixelType::Float32, size * size).unwrap();
    ctx.process(0.0, 1000.0, 1000.0, 0.0, size, size, &mut buf, &mut NoProgress)
        .unwrap();
    buf
}

fn bench_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("algorithms");
    group.sample_size(10);
    let points = Arc::new(create_points(5_000));

    for text in [
        "invdist:power=2:radius=60",
        "invdistnn:power=2:radius=60:max_points=12",
        "average:radius=60",
        "nearest",
        "count:radius=40",
        "linear",
    ] {
        let algorithm: GridAlgorithm = text.parse().unwrap();
        let ctx = GridContext::new(Arc::clone(&points), algorithm);

        group.bench_with_input(BenchmarkId::from_parameter(text), &ctx, |b, ctx| {
            b.iter(|| grid(black_box(ctx), 256))
        });
    }

    group.finish();
}

fn bench_point_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("invdistnn_points");
    group.sample_size(10);
    let algorithm: GridAlgorithm = "invdistnn:radius=50:max_points=12".parse().unwrap();

    for count in [1_000, 10_000, 100_000].iter() {
        let ctx = GridContext::new(create_points(*count), algorithm.clone());

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| grid(black_box(&ctx), 256))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_algorithms, bench_point_count);
criterion_main!(benches);
