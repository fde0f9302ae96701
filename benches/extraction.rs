//! Extraction and rendering throughput
//!
//! Producer logs grow by one progress line per reporting interval, so long
//! runs are benchmarked with a few thousand interim lines ahead of the final
//! summary.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kafka_perf_report::model::{ConfigEcho, RunIdentity};
use kafka_perf_report::{extract, render_html, render_text, ConsumerInput, HtmlStyle};

const SUMMARY: &str = "60000 records sent, 999.7 records/sec (0.98 MB/sec), 7.90 ms avg latency, \
                       307.00 ms max latency, 8 ms 50th, 14 ms 95th, 19 ms 99th, 44 ms 99.9th.";

const CONSUMER: &str = "\
start.time, end.time, data.consumed.in.MB, MB.sec, data.consumed.in.nMsg, nMsg.sec, rebalance.time.ms, fetch.time.ms, fetch.MB.sec, fetch.nMsg.sec
2026-02-03 15:01:02:575, 2026-02-03 15:02:03:100, 58.5938, 0.9681, 60000, 991.3, 3000, 57525, 1.0186, 1043.0
";

fn producer_log(progress_lines: usize) -> String {
    let mut log = String::new();
    for i in 0..progress_lines {
        log.push_str(&format!(
            "{} records sent, 999.{} records/sec (0.98 MB/sec), 7.{} ms avg latency, 41.0 ms max latency.\n",
            5000 + i,
            i % 10,
            i % 10
        ));
    }
    log.push_str(SUMMARY);
    log.push('\n');
    log
}

fn identity() -> RunIdentity {
    RunIdentity {
        name: "bench".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 2, 3, 15, 1, 2).unwrap(),
        config: ConfigEcho::new("orders", "localhost:9092", 1000, 1024, 60),
    }
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for lines in [0usize, 100, 1000] {
        let log = producer_log(lines);
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::new("producer_and_consumer", lines), &log, |b, log| {
            b.iter(|| {
                extract(
                    black_box(log),
                    ConsumerInput::Captured(black_box(CONSUMER)),
                    identity(),
                )
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let model = extract(SUMMARY, ConsumerInput::Captured(CONSUMER), identity());
    let style = HtmlStyle::default();

    group.bench_function("text", |b| b.iter(|| render_text(black_box(&model))));
    group.bench_function("html", |b| b.iter(|| render_html(black_box(&model), &style)));

    group.finish();
}

criterion_group!(benches, bench_extract, bench_render);
criterion_main!(benches);
