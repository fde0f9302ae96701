//! End-to-end: raw perf tool output through extraction to both reports.

use chrono::{TimeZone, Utc};
use kafka_perf_report::model::{
    ConfigEcho, ExtractionStatus, Field, Percentile, PhaseOutcome, RunIdentity,
};
use kafka_perf_report::{extract, render_html, render_text, ConsumerInput, HtmlStyle};

const PRODUCER_LOG: &str = "\
[2026-02-03 15:01:02,101] WARN [Producer clientId=perf-cli] Error while fetching metadata with correlation id 1 : {t=LEADER_NOT_AVAILABLE}
4999 records sent, 999.8 records/sec (0.98 MB/sec), 9.4 ms avg latency, 307.0 ms max latency.
5003 records sent, 1000.6 records/sec (0.98 MB/sec), 7.1 ms avg latency, 41.0 ms max latency.
60000 records sent, 999.7 records/sec (0.98 MB/sec), 7.90 ms avg latency, 307.00 ms max latency, 8 ms 50th, 14 ms 95th, 19 ms 99th, 44 ms 99.9th.
";

const CONSUMER_LOG: &str = "\
start.time, end.time, data.consumed.in.MB, MB.sec, data.consumed.in.nMsg, nMsg.sec, rebalance.time.ms, fetch.time.ms, fetch.MB.sec, fetch.nMsg.sec
2026-02-03 15:01:02:575, 2026-02-03 15:02:03:100, 58.5938, 0.9681, 60000, 991.3, 3000, 57525, 1.0186, 1043.0
";

fn identity(consumer_enabled: bool) -> RunIdentity {
    RunIdentity {
        name: "20260203-150102-t".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 2, 3, 15, 1, 2).unwrap(),
        config: ConfigEcho::new("t", "localhost:9092", 1000, 1024, 60)
            .with_consumer(consumer_enabled),
    }
}

#[test]
fn producer_only_run_reports_consumer_as_not_run() {
    let model = extract(PRODUCER_LOG, ConsumerInput::Disabled, identity(false));

    assert_eq!(model.extraction.producer, PhaseOutcome::Complete);
    assert_eq!(model.extraction.consumer, PhaseOutcome::Disabled);
    assert_eq!(model.extraction.status, ExtractionStatus::Complete);
    assert!(model.consumer.is_none());
    assert_eq!(model.producer.as_ref().unwrap().achieved_tps, Some(999.7));

    let text = render_text(&model).unwrap();
    assert!(text.contains("TPS:          999.70 msg/s\n"));
    assert!(text.contains("Records:      60000 | TPS: 1000 | Payload: 1024 bytes | Duration: 60s\n"));
    assert!(!text.contains("Consumer Results"));
    assert!(text.contains("Consumer:     not run (disabled by configuration)\n"));

    let html = render_html(&model, &HtmlStyle::default()).unwrap();
    assert!(html.contains("999.70"));
    assert!(html.contains("<strong>Not run</strong>: disabled by configuration."));
}

#[test]
fn full_run_renders_both_phases() {
    let model = extract(
        PRODUCER_LOG,
        ConsumerInput::Captured(CONSUMER_LOG),
        identity(true),
    );
    assert_eq!(model.extraction.status, ExtractionStatus::Complete);

    let text = render_text(&model).unwrap();
    assert!(text.contains("Consumer Results"));
    assert!(text.contains("Window:       2026-02-03 15:01:02.575 UTC -> 2026-02-03 15:02:03.100 UTC\n"));

    let html = render_html(&model, &HtmlStyle::default()).unwrap();
    assert!(!html.contains("Not run"));
    assert!(html.contains("991.30"));
}

#[test]
fn missing_percentile_is_absent_not_zero() {
    let raw = "60000 records sent, 999.7 records/sec (0.98 MB/sec), 7.90 ms avg latency, \
               307.00 ms max latency, 8 ms 50th, 14 ms 95th, 44 ms 99.9th.";
    let model = extract(raw, ConsumerInput::Disabled, identity(false));

    let producer = model.producer.as_ref().unwrap();
    assert_eq!(producer.percentile(Percentile::P99), None);
    assert_eq!(model.extraction.producer, PhaseOutcome::Partial);
    assert_eq!(model.extraction.status, ExtractionStatus::Partial);
    assert!(model
        .extraction
        .missing_fields()
        .any(|f| f == Field::LatencyP99));

    let text = render_text(&model).unwrap();
    assert!(text.contains("P99:          N/A\n"));
    assert!(!text.contains("P99:          0"));
    assert!(text.contains("producer.latency_p99_ms"));
}

#[test]
fn reported_zero_is_rendered_as_zero() {
    let raw = "0 records sent, 0.0 records/sec (0.00 MB/sec), 0.00 ms avg latency, \
               0.00 ms max latency, 0 ms 50th, 0 ms 95th, 0 ms 99th, 0 ms 99.9th.";
    let model = extract(raw, ConsumerInput::Disabled, identity(false));
    assert_eq!(model.extraction.producer, PhaseOutcome::Complete);

    let text = render_text(&model).unwrap();
    assert!(text.contains("Records Sent: 0\n"));
    assert!(text.contains("TPS:          0 msg/s\n"));
    assert!(!text.contains("N/A"));
}

#[test]
fn inverted_percentiles_are_flagged_not_corrected() {
    let raw = "60000 records sent, 999.7 records/sec (0.98 MB/sec), 7.90 ms avg latency, \
               307.00 ms max latency, 8 ms 50th, 20 ms 95th, 10 ms 99th, 44 ms 99.9th.";
    let model = extract(raw, ConsumerInput::Disabled, identity(false));

    let text = render_text(&model).unwrap();
    assert!(text.contains("P95:          20 ms\n"));
    assert!(text.contains("P99:          10 ms\n"));
    assert!(text.contains("WARNING: latency percentiles out of order"));
}

#[test]
fn output_without_labels_fails_extraction() {
    let raw = "Exception in thread \"main\" org.apache.kafka.common.errors.TimeoutException";
    let model = extract(raw, ConsumerInput::Captured(""), identity(true));

    assert_eq!(model.extraction.status, ExtractionStatus::Failed);
    assert!(model.producer.is_none());
    assert!(model.consumer.is_none());

    let text = render_text(&model).unwrap();
    assert!(!text.contains("Producer Results"));
    assert!(text.contains("Status:       failed\n"));
    assert!(text.contains("Producer results absent: no usable metrics were reported\n"));
}

#[test]
fn extraction_and_rendering_are_deterministic() {
    let render = || {
        let model = extract(
            PRODUCER_LOG,
            ConsumerInput::Captured(CONSUMER_LOG),
            identity(true),
        );
        (
            render_text(&model).unwrap(),
            render_html(&model, &HtmlStyle::default()).unwrap(),
        )
    };

    assert_eq!(render(), render());
}
