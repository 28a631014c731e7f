//! Benchmarks for the hot paths: commit fan-out, snapshots and export
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datamon_rs::config::{ExportSettings, SamplerConfig};
use datamon_rs::sampler::export::pack_column_blocks;
use datamon_rs::session::Trace;
use datamon_rs::signal::DerivativeSignalHandle;
use datamon_rs::{Sample, Sampler, SignalHandle};

fn filled_sampler(signals: usize, samples: usize) -> (Sampler, Vec<SignalHandle>) {
    let mut sampler = Sampler::new(SamplerConfig::live(samples));
    let handles: Vec<SignalHandle> = (0..signals)
        .map(|k| SignalHandle::with_name(format!("s{}", k)))
        .collect();
    for (k, handle) in handles.iter().enumerate() {
        sampler.add_signal(handle, format!("s{}", k));
        let batch: Vec<Sample> = (0..samples)
            .map(|i| Sample::scalar(i as f64 * 0.01, (i + k) as f64))
            .collect();
        handle.commit(&batch);
    }
    (sampler, handles)
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");

    for size in [1000, 10_000, 100_000].iter() {
        let handle = SignalHandle::new();
        let mut live = Sampler::new(SamplerConfig::live(*size));
        let mut record = Sampler::new(SamplerConfig::new(*size, true, true));
        live.add_signal(&handle, "x");
        record.add_signal(&handle, "x");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("two_buffers", size), size, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                handle.commit_sample(black_box(Sample::scalar(i as f64, i as f64)));
                i = i.wrapping_add(1);
            });
        });
    }

    let handle = SignalHandle::new();
    let derivative = DerivativeSignalHandle::new(&handle);
    let mut sampler = Sampler::new(SamplerConfig::live(10_000));
    sampler.add_signal(&handle, "x");
    sampler.add_signal(derivative.handle(), "dx");
    group.bench_function("with_derivative", |b| {
        let mut i = 0u64;
        b.iter(|| {
            handle.commit_sample(black_box(Sample::scalar(i as f64, i.wrapping_mul(i) as f64)));
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [1000, 10_000, 50_000].iter() {
        let (sampler, _handles) = filled_sampler(1, *size);
        let view = sampler.buffers()[0].view();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("matrix", size), &view, |b, view| {
            b.iter(|| black_box(view.snapshot()));
        });
        group.bench_with_input(BenchmarkId::new("plot_points", size), &view, |b, view| {
            b.iter(|| black_box(Trace::from_view(view).as_plot_points(0)));
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for signals in [2, 8].iter() {
        let (sampler, _handles) = filled_sampler(*signals, 10_000);
        let snapshots: Vec<_> = sampler.buffers().iter().map(|b| b.snapshot()).collect();

        group.throughput(Throughput::Elements((*signals * 10_000) as u64));
        group.bench_with_input(BenchmarkId::new("pack", signals), &snapshots, |b, s| {
            b.iter(|| black_box(pack_column_blocks(s)));
        });
        group.bench_with_input(BenchmarkId::new("merge", signals), &sampler, |b, s| {
            b.iter(|| black_box(s.export()));
        });
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    let (sampler, _handles) = filled_sampler(4, 10_000);
    let settings = ExportSettings::default();
    group.sample_size(10);
    group.bench_function("csv_4x10000", |b| {
        b.iter(|| black_box(sampler.export_to_csv(&path, &settings).is_ok()));
    });

    group.finish();
}

criterion_group!(benches, bench_commit, bench_snapshot, bench_export);
criterion_main!(benches);
