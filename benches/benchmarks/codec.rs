use criterion::{criterion_group, Criterion, SamplingMode, Throughput};

use pprof::criterion::{Output, PProfProfiler};

use bitknit2::{decode, encode};

use crate::benchmarks::{get_payload, PAYLOAD_LEN};

fn decode_benchmark(c: &mut Criterion) {
    let payload = get_payload();
    let compressed = encode(&payload).unwrap();

    let mut group = c.benchmark_group("decoder benchmark");
    group.sampling_mode(SamplingMode::Flat);
    group.throughput(Throughput::Bytes(PAYLOAD_LEN as u64));
    group.bench_function("decoding", |b| {
        b.iter(|| decode(&compressed, PAYLOAD_LEN).unwrap())
    });
    group.finish();
}

fn encode_benchmark(c: &mut Criterion) {
    let payload = get_payload();

    let mut group = c.benchmark_group("encoder benchmark");
    group.sampling_mode(SamplingMode::Flat);
    group.throughput(Throughput::Bytes(PAYLOAD_LEN as u64));
    group.bench_function("encoding", |b| b.iter(|| encode(&payload).unwrap()));
    group.finish();
}

criterion_group! {
    name = codec_benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = decode_benchmark, encode_benchmark
}
