use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tenantsync_core::{JobId, JobKind, ResourceId, TenantContext};
use tenantsync_jobs::{BoundedCapture, JobOptions, RefreshRequest, build_args, parse_summary_line, truncate_log};

fn chatty_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("[crawler] fetched https://docs.example.com/page/{i} status=200 links=17"))
        .collect()
}

fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_capture");

    for lines in [1_000usize, 10_000, 100_000] {
        let input = chatty_lines(lines);
        let bytes: usize = input.iter().map(|l| l.len() + 1).sum();
        group.throughput(Throughput::Bytes(bytes as u64));

        // Cap well below the input so compaction runs repeatedly.
        group.bench_with_input(BenchmarkId::new("push_line_64k_cap", lines), &input, |b, input| {
            b.iter(|| {
                let mut capture = BoundedCapture::new(64 * 1024);
                for line in input {
                    capture.push_line(black_box(line));
                }
                black_box(capture.finish())
            })
        });
    }

    group.finish();
}

fn bench_summary_and_truncation(c: &mut Criterion) {
    let marker = r#"SUMMARY_JSON: {"pages": 412, "skipped": 3, "errors": [], "durationMs": 91234}"#;
    c.bench_function("parse_summary_line", |b| {
        b.iter(|| black_box(parse_summary_line(black_box(marker))))
    });

    let log = chatty_lines(2_000).join("\n");
    c.bench_function("truncate_log_8k", |b| {
        b.iter(|| black_box(truncate_log(black_box(&log), 8192)))
    });
}

fn bench_build_args(c: &mut Criterion) {
    let tenant = TenantContext::new("u1", "t1", "/data/t1").with_database_uri("mongodb://db/t1");
    let mut request = RefreshRequest::new("https://docs.example.com");
    request.start_url.push("https://blog.example.com".to_string());
    request.max_depth = Some(3);
    request.respect_robots = Some(false);
    request.collection_name = Some("docs".to_string());

    let options = JobOptions::for_tenant(
        &tenant,
        JobId::generate(JobKind::Ingestion, Some(&ResourceId::new("t1"))),
    )
    .with_request(&request);

    c.bench_function("build_args", |b| b.iter(|| black_box(build_args(black_box(&options)))));
}

criterion_group!(benches, bench_capture, bench_summary_and_truncation, bench_build_args);
criterion_main!(benches);
