use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strided_conv::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rand_tensor(shape: &[usize], seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let n: usize = shape.iter().product();
    let data: Vec<f32> = (0..n).map(|_| rng.random_range(-1.0..1.0)).collect();
    Tensor::from_slice(&data, shape)
}

fn client_with_threads(threads: usize) -> CpuClient {
    CpuClient::with_parallelism(ParallelismConfig::new().with_max_threads(threads))
        .expect("thread pool builds")
}

// ---------------------------------------------------------------------------
// Group 1: Forward conv2d by input layout
// ---------------------------------------------------------------------------

fn bench_conv2d_layouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv2d_layout");
    let client = CpuClient::new();
    let weight = rand_tensor(&[32, 16, 3, 3], 1);
    let bias = rand_tensor(&[32], 2);
    let opts = ConvOptions::new().with_padding(&[1]);

    for &size in &[32usize, 64] {
        let contiguous = rand_tensor(&[4, 16, size, size], 3);
        let channels_last = contiguous
            .to_dim_order(&[0, 2, 3, 1])
            .expect("valid dim order");

        for (label, input) in [("contiguous", &contiguous), ("channels_last", &channels_last)] {
            group.bench_with_input(BenchmarkId::new(label, size), input, |b, input| {
                b.iter(|| {
                    let out = client
                        .convolution(black_box(input), &weight, Some(&bias), &opts)
                        .expect("conv2d succeeds");
                    black_box(out)
                })
            });
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Group 2: Transposed conv2d thread scaling
// ---------------------------------------------------------------------------

fn bench_conv_transpose2d_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv_transpose2d_threads");
    let input = rand_tensor(&[4, 32, 16, 16], 4);
    let weight = rand_tensor(&[32, 16, 4, 4], 5);
    let opts = ConvOptions::new()
        .with_transposed(true)
        .with_stride(&[2])
        .with_padding(&[1]);

    for &threads in &[1usize, 2, 4] {
        let client = client_with_threads(threads);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &client, |b, client| {
            b.iter(|| {
                let out = client
                    .convolution(black_box(&input), &weight, None, &opts)
                    .expect("conv_transpose2d succeeds");
                black_box(out)
            })
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Group 3: conv1d through the lifted path
// ---------------------------------------------------------------------------

fn bench_conv1d(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv1d");
    let client = CpuClient::new();
    let weight = rand_tensor(&[64, 32, 5], 6);

    for &len in &[256usize, 1024] {
        let input = rand_tensor(&[8, 32, len], 7);
        group.bench_with_input(BenchmarkId::from_parameter(len), &input, |b, input| {
            b.iter(|| {
                let out = client
                    .conv1d(black_box(input), &weight, None, 1, 2, 1, 1)
                    .expect("conv1d succeeds");
                black_box(out)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_conv2d_layouts,
    bench_conv_transpose2d_threads,
    bench_conv1d
);
criterion_main!(benches);
