//! Benchmarks for the per-request validation path.
//!
//! Every request parses a freshly fetched certificate and verifies one RSA
//! signature, so these two steps bound gate latency once the network is
//! taken out.

use std::{hint::black_box, sync::Arc, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skillgate_core::{IncomingRequest, SystemClock, ValidatorConfig};
use skillgate_testing::{AllowAnyUrl, EnvelopeBuilder, StubFetcher, TestAuthority};
use skillgate_verify::{signature::verify_body_signature, RequestValidator, SigningCertificate};
use tokio::runtime::Runtime;

fn bench_certificate_parsing(c: &mut Criterion) {
    let authority = TestAuthority::new().unwrap();
    let pem = authority.certificate().pem().unwrap();

    c.bench_function("certificate/from_pem", |b| {
        b.iter(|| SigningCertificate::from_pem(black_box(pem.as_bytes())).unwrap());
    });
}

fn bench_signature_verification(c: &mut Criterion) {
    let authority = TestAuthority::new().unwrap();
    let pem = authority.certificate().pem().unwrap();
    let certificate = SigningCertificate::from_pem(pem.as_bytes()).unwrap();

    let mut group = c.benchmark_group("signature");

    for size in [512_usize, 8 * 1024, 64 * 1024] {
        let body = vec![b'a'; size];
        let signature = authority.sign_body(&body).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("verify", size), &body, |b, body| {
            b.iter(|| {
                verify_body_signature(certificate.public_key(), black_box(&signature), body)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_full_validation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let authority = TestAuthority::new().unwrap();
    let fetcher = Arc::new(StubFetcher::serving(authority.certificate().pem().unwrap()));
    let validator = RequestValidator::with_parts(
        ValidatorConfig::default(),
        Arc::new(AllowAnyUrl),
        fetcher,
        Arc::new(SystemClock),
    );

    let mut group = c.benchmark_group("validator");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("validate_signed_request", |b| {
        b.iter_batched(
            || {
                let body: Bytes = EnvelopeBuilder::new().body();
                authority.signed_request(body, Utc::now()).unwrap()
            },
            |request: IncomingRequest| {
                rt.block_on(async {
                    let verdict = validator.validate(&request).await;
                    assert!(verdict.is_accept());
                });
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_certificate_parsing,
    bench_signature_verification,
    bench_full_validation
);
criterion_main!(benches);
