use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use echoprobe::common::spawn_test_server;
use echoprobe::{ClientConfig, EchoClient, Framing, HttpEchoClient, Payload, Submission};
use tokio::runtime::Runtime;

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    for framing in [Framing::Raw, Framing::LengthPrefixed] {
        let server = rt.block_on(spawn_test_server(framing)).unwrap();
        let client = rt
            .block_on(async {
                HttpEchoClient::new(
                    &format!("http://{}/", server.addr),
                    ClientConfig {
                        framing,
                        ..ClientConfig::default()
                    },
                )
            })
            .unwrap();

        let mut group = c.benchmark_group(format!("round_trip_{framing}"));

        // Test different payload sizes
        for size in [64, 1111, 16384] {
            let payload = Payload::filled(size, 1);
            group.throughput(Throughput::Bytes(size as u64));

            for submission in [Submission::Buffered, Submission::Deferred] {
                group.bench_with_input(
                    BenchmarkId::new(submission.to_string(), size),
                    &payload,
                    |b, payload| {
                        b.to_async(&rt).iter(|| async {
                            let echoed = client
                                .echo(black_box(payload.bytes()), submission)
                                .await
                                .unwrap();
                            assert_eq!(echoed.len(), payload.len());
                            echoed
                        });
                    },
                );
            }
        }

        group.finish();

        drop(client);
        rt.block_on(server.stop()).unwrap();
    }
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    let payload = Payload::default();

    group.bench_function("length_prefixed_encode_decode", |b| {
        b.iter(|| {
            let encoded = Framing::LengthPrefixed
                .encode(black_box(payload.bytes()))
                .unwrap();
            Framing::LengthPrefixed.decode(encoded).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_framing);
criterion_main!(benches);
