//! Criterion micro-benchmarks for one stencil application.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relax_bench::noisy_field;
use relax_core::kernel;
use relax_core::BufferHandle;
use relax_device::{
    ComputeDevice, KernelArg, KernelSource, LaunchGeometry, SequentialDevice, ThreadPoolDevice,
};

fn bench_host_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_apply");
    for len in [10_000usize, 1_000_000] {
        let input = noisy_field(len, 7);
        let mut output = vec![0.0; len];
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                kernel::apply(black_box(&input), &mut output);
                black_box(&output);
            });
        });
    }
    group.finish();
}

/// Upload a field and compile `relax(a, b, len)`.
fn prepare<D: ComputeDevice>(dev: &mut D, data: &[f64]) -> (BufferHandle, relax_core::KernelHandle) {
    let a = dev.allocate(data.len()).unwrap();
    let b = dev.allocate(data.len()).unwrap();
    dev.upload(a, data).unwrap();
    let k = dev
        .compile(
            &KernelSource::relax(),
            "relax",
            &[
                KernelArg::Buffer(a),
                KernelArg::Buffer(b),
                KernelArg::Uint(data.len() as u32),
            ],
        )
        .unwrap();
    (b, k)
}

fn bench_device_dispatch(c: &mut Criterion) {
    let len = 1_000_000;
    let data = noisy_field(len, 11);
    let mut group = c.benchmark_group("dispatch_1m");

    let mut seq = SequentialDevice::new();
    let (_, k) = prepare(&mut seq, &data);
    group.bench_function("sequential", |b| {
        b.iter(|| seq.dispatch(k, LaunchGeometry::new(len, 32)).unwrap());
    });

    for local in [32usize, 1024, 65_536] {
        let mut pool = ThreadPoolDevice::new();
        let (_, k) = prepare(&mut pool, &data);
        group.bench_with_input(BenchmarkId::new("thread_pool", local), &local, |b, &local| {
            b.iter(|| pool.dispatch(k, LaunchGeometry::new(len, local)).unwrap());
        });
    }
    group.finish();
}

fn bench_read_back(c: &mut Criterion) {
    let len = 1_000_000;
    let data = noisy_field(len, 13);
    let mut dev = SequentialDevice::new();
    let (b_buf, _) = prepare(&mut dev, &data);
    let mut host = vec![0.0; len];
    c.bench_function("read_back_1m", |b| {
        b.iter(|| {
            dev.read_back(b_buf, &mut host).unwrap();
            black_box(&host);
        });
    });
}

criterion_group!(benches, bench_host_apply, bench_device_dispatch, bench_read_back);
criterion_main!(benches);
