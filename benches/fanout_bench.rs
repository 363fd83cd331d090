//! Benchmarks for Streamcast fan-out
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::time::Duration;
use streamcast::generators::{RandomGenerator, TranscriptGenerator};
use streamcast::hub::{channel, deliver, ClientStream, Cursor, EventGenerator, Frame, StreamEvent};

fn encode(generator: &dyn EventGenerator, cursor: Cursor) -> Frame {
    let generated = generator.next("bench", cursor);
    let event = StreamEvent::new(generated.payload.kind, "bench", generated.payload.fields);
    Frame::encode(&event).unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let transcript = TranscriptGenerator::default();
    let random = RandomGenerator::new();

    group.bench_function("transcript_line", |b| {
        b.iter(|| encode(black_box(&transcript), Cursor::new(3)))
    });

    group.bench_function("transcript_summary", |b| {
        b.iter(|| encode(black_box(&transcript), Cursor::new(12)))
    });

    group.bench_function("random", |b| {
        b.iter(|| encode(black_box(&random), Cursor::new(3)))
    });

    group.finish();
}

fn bench_deliver(c: &mut Criterion) {
    let mut group = c.benchmark_group("deliver");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let frame = encode(&RandomGenerator::new(), Cursor::default());

    for clients in [1, 100, 1000] {
        let (sinks, streams): (Vec<_>, Vec<ClientStream>) =
            (0..clients).map(|_| channel(1024)).unzip();

        // Keep every buffer draining so writes never wait on a full client
        for mut stream in streams {
            runtime.spawn(async move { while stream.recv().await.is_some() {} });
        }

        group.throughput(Throughput::Elements(clients as u64));

        group.bench_function(format!("clients_{}", clients), |b| {
            b.to_async(&runtime)
                .iter(|| deliver(black_box(&frame), &sinks, Duration::from_secs(1)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_deliver);
criterion_main!(benches);
