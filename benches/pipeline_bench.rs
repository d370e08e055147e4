use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use study_pipeline_core::processor::fingerprint::fingerprint;
use study_pipeline_core::processor::mock::synthesize_summary;
use study_pipeline_core::security::{scrub_string, PiiScrubResult};

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let document = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, doc| {
            b.iter(|| fingerprint(black_box(doc)))
        });
    }
    group.finish();
}

fn bench_synthesize_summary(c: &mut Criterion) {
    let fp = fingerprint(b"benchmark study");
    c.bench_function("synthesize_summary", |b| {
        b.iter(|| synthesize_summary(black_box(&fp)))
    });
}

fn bench_scrub(c: &mut Criterion) {
    let clean = "type 2 diabetes, hba1c 6.1-6.4, ldl elevated";
    let dirty = "contact jane@clinic.org or 555-123-4567, MRN 00123456, seen 2023-04-01";

    c.bench_function("scrub_string_clean", |b| {
        b.iter(|| {
            let mut result = PiiScrubResult::default();
            scrub_string(black_box(clean), &mut result)
        })
    });
    c.bench_function("scrub_string_dirty", |b| {
        b.iter(|| {
            let mut result = PiiScrubResult::default();
            scrub_string(black_box(dirty), &mut result)
        })
    });
}

criterion_group!(benches, bench_fingerprint, bench_synthesize_summary, bench_scrub);
criterion_main!(benches);
