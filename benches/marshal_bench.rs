//! Marshaling benchmarks: nested `Vec` -> descriptor -> nested `Vec`.
//!
//! Run with: cargo bench --bench marshal_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use halide_buffer::{
    col_major_strides, read_nested, with_cpu_buffer, with_nested_buffer, with_slice_buffer,
    BufferRef, HostBuffer,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::time::Duration;

fn random_matrix(rng: &mut StdRng, n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..n).map(|_| rng.sample(StandardNormal)).collect())
        .collect()
}

/// Copy-in plus copy-out of a square matrix.
fn bench_nested_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_roundtrip");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for n in [16, 64, 256, 1024] {
        group.throughput(Throughput::Elements((n * n) as u64));
        let mut rng = StdRng::seed_from_u64(42);
        let xs = random_matrix(&mut rng, n);

        group.bench_with_input(BenchmarkId::new("f64", n), &xs, |bench, xs| {
            bench.iter(|| {
                with_nested_buffer(black_box(xs), |buf: &mut BufferRef<'_, f64, 2>| {
                    read_nested::<Vec<Vec<f64>>, 2>(buf)
                })
                .unwrap()
                .unwrap()
            })
        });
    }
    group.finish();
}

/// Descriptor construction alone over existing storage.
fn bench_describe(c: &mut Criterion) {
    let mut group = c.benchmark_group("describe");
    group.sample_size(50);

    for rank in [1usize, 2, 4, 8] {
        let shape = vec![2usize; rank];
        let mut data = vec![0.0f32; 1 << rank];
        group.bench_with_input(BenchmarkId::new("slice", rank), &rank, |bench, _| {
            bench.iter(|| match rank {
                1 => with_slice_buffer(&mut data, &shape, &[1], |b: &mut BufferRef<'_, f32, 1>| {
                    b.len()
                }),
                2 => with_slice_buffer(&mut data, &shape, &[2, 1], |b: &mut BufferRef<'_, f32, 2>| {
                    b.len()
                }),
                4 => with_slice_buffer(
                    &mut data,
                    &shape,
                    &[8, 4, 2, 1],
                    |b: &mut BufferRef<'_, f32, 4>| b.len(),
                ),
                _ => with_slice_buffer(
                    &mut data,
                    &shape,
                    &[128, 64, 32, 16, 8, 4, 2, 1],
                    |b: &mut BufferRef<'_, f32, 8>| b.len(),
                ),
            })
        });
    }
    group.finish();
}

/// Strided read-back of a column-major layout vs a dense one.
fn bench_strided_readback(c: &mut Criterion) {
    let mut group = c.benchmark_group("strided_readback");
    group.sample_size(20);

    for n in [64, 512] {
        group.throughput(Throughput::Elements((n * n) as u64));
        let mut rng = StdRng::seed_from_u64(7);
        let mut data: Vec<f64> = (0..n * n).map(|_| rng.sample(StandardNormal)).collect();
        let shape = [n, n];
        let col = col_major_strides(&shape);

        group.bench_function(BenchmarkId::new("col_major", n), |bench| {
            bench.iter(|| {
                with_slice_buffer(&mut data, &shape, &col, |buf: &mut BufferRef<'_, f64, 2>| {
                    buf.to_vec()
                })
                .unwrap()
            })
        });

        let host = HostBuffer::<f64, 2>::from_fn(shape, |[i, j]| (i * n + j) as f64)
            .unwrap();
        group.bench_function(BenchmarkId::new("host_to_nested", n), |bench| {
            bench.iter(|| host.to_nested::<Vec<Vec<f64>>>().unwrap())
        });
    }
    group.finish();
}

/// Zero-filled output allocation.
fn bench_cpu_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_buffer");
    for n in [64, 1024] {
        group.bench_with_input(BenchmarkId::new("alloc", n), &n, |bench, &n| {
            bench.iter(|| {
                with_cpu_buffer(&[n, n], |buf: &mut BufferRef<'_, f32, 2>| {
                    buf.set([n - 1, n - 1], 1.0);
                    buf.get([0, 0])
                })
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_nested_roundtrip,
    bench_describe,
    bench_strided_readback,
    bench_cpu_buffer
);
criterion_main!(benches);
