//! Plain text summary (`summary.txt`).
//!
//! Section order is fixed: header, test configuration, producer results,
//! consumer results, extraction footer. Each value line is `Label:` padded to
//! a fixed column so the document stays grep- and diff-friendly.

use super::{
    absence_reason, checked, data_volume, format_epoch_ms, has_fetch_stats, missing_list,
    outcome_label, unparseable_list, RenderError,
};
use crate::model::{
    Anomaly, ConsumerMetrics, MetricsModel, PayloadSource, Percentile, ProducerMetrics,
};
use crate::numeric::{format_count, format_opt, NumericKind, NOT_AVAILABLE};

const RULE: &str = "----------------------------------------------------------";
const BANNER: &str = "==========================================================";
const LABEL_WIDTH: usize = 14;

/// Render the plain text summary for a run.
pub fn render_text(model: &MetricsModel) -> Result<String, RenderError> {
    let model = checked(model)?;
    let anomalies = model.anomalies();
    let mut out = String::new();

    out.push_str(BANNER);
    out.push('\n');
    out.push_str(" Kafka Performance Report\n");
    out.push_str(BANNER);
    out.push('\n');
    line(&mut out, "Run", &model.run.name);
    line(
        &mut out,
        "Timestamp",
        &model.run.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    write_configuration(&mut out, model);

    if let Some(ref producer) = model.producer {
        write_producer(&mut out, producer, &anomalies);
    }
    if let Some(ref consumer) = model.consumer {
        write_consumer(&mut out, consumer, &anomalies);
    }

    write_footer(&mut out, model);
    Ok(out)
}

fn line(out: &mut String, label: &str, value: &str) {
    let label = format!("{}:", label);
    out.push_str(&format!("{:<width$}{}\n", label, value, width = LABEL_WIDTH));
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

fn with_unit(value: String, unit: &str) -> String {
    if value == NOT_AVAILABLE {
        value
    } else {
        format!("{} {}", value, unit)
    }
}

fn write_configuration(out: &mut String, model: &MetricsModel) {
    let config = &model.run.config;
    section(out, "Test Configuration");
    line(out, "Topic", &config.topic);
    line(out, "Bootstrap", &config.bootstrap);
    line(
        out,
        "Records",
        &format!(
            "{} | TPS: {} | Payload: {} bytes | Duration: {}s",
            config.num_records, config.target_tps, config.payload_bytes, config.duration_secs
        ),
    );
    if let PayloadSource::JsonFile { ref path } = config.payload_source {
        line(out, "Payload File", &format!("{} (minified JSON)", path));
    }
    if let Some(ref settings) = config.producer_settings {
        line(out, "Producer", &settings.to_string());
    }
    line(
        out,
        "Consumer",
        if config.consumer_enabled {
            "enabled"
        } else {
            "disabled"
        },
    );
}

fn write_producer(out: &mut String, producer: &ProducerMetrics, anomalies: &[Anomaly]) {
    section(out, "Producer Results");
    line(
        out,
        "TPS",
        &with_unit(format_opt(producer.achieved_tps, NumericKind::Rate), "msg/s"),
    );
    line(
        out,
        "Throughput",
        &with_unit(format_opt(producer.throughput_mb_s, NumericKind::Rate), "MB/s"),
    );
    line(out, "Records Sent", &format_count(producer.records_sent));
    line(
        out,
        "Latency Avg",
        &with_unit(format_opt(producer.latency_avg_ms, NumericKind::DurationMs), "ms"),
    );
    line(
        out,
        "Latency Max",
        &with_unit(format_opt(producer.latency_max_ms, NumericKind::DurationMs), "ms"),
    );
    for percentile in Percentile::ALL {
        line(
            out,
            &percentile.label().to_uppercase(),
            &with_unit(
                format_opt(producer.percentile(percentile), NumericKind::DurationMs),
                "ms",
            ),
        );
    }
    for anomaly in anomalies {
        if let Anomaly::InconsistentPercentiles { .. } = anomaly {
            out.push_str(&format!("WARNING: {}\n", anomaly));
        }
    }
}

fn write_consumer(out: &mut String, consumer: &ConsumerMetrics, anomalies: &[Anomaly]) {
    section(out, "Consumer Results");

    let start = consumer
        .window_start_ms
        .map(format_epoch_ms)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let end = consumer
        .window_end_ms
        .map(format_epoch_ms)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    line(out, "Window", &format!("{} -> {}", start, end));
    line(
        out,
        "Duration",
        &with_unit(
            format_opt(
                consumer.window_duration_ms().map(|ms| ms as f64 / 1000.0),
                NumericKind::Seconds,
            ),
            "s",
        ),
    );
    line(
        out,
        "Consumed",
        &format!(
            "{} msgs ({})",
            format_count(consumer.records_consumed),
            data_volume(consumer.data_volume_mb)
        ),
    );
    line(
        out,
        "TPS",
        &with_unit(format_opt(consumer.achieved_tps, NumericKind::Rate), "msg/s"),
    );
    line(
        out,
        "Throughput",
        &with_unit(format_opt(consumer.throughput_mb_s, NumericKind::Rate), "MB/s"),
    );

    if has_fetch_stats(consumer) {
        line(
            out,
            "Fetch Time",
            &with_unit(format_opt(consumer.fetch_time_ms, NumericKind::DurationMs), "ms"),
        );
        line(
            out,
            "Fetch Rate",
            &format!(
                "{} | {}",
                with_unit(format_opt(consumer.fetch_mb_s, NumericKind::Rate), "MB/s"),
                with_unit(format_opt(consumer.fetch_tps, NumericKind::Rate), "msg/s")
            ),
        );
        line(
            out,
            "Rebalance",
            &with_unit(
                format_opt(consumer.rebalance_time_ms, NumericKind::DurationMs),
                "ms",
            ),
        );
    }

    for anomaly in anomalies {
        if let Anomaly::InvertedConsumerWindow { .. } = anomaly {
            out.push_str(&format!("WARNING: {}\n", anomaly));
        }
    }
}

fn write_footer(out: &mut String, model: &MetricsModel) {
    let extraction = &model.extraction;
    section(out, "Extraction");
    line(out, "Producer", &outcome_label(extraction.producer));
    line(out, "Consumer", &outcome_label(extraction.consumer));
    line(out, "Status", &extraction.status.to_string());

    let missing = missing_list(&extraction.issues);
    if !missing.is_empty() {
        line(out, "Missing", &missing.join(", "));
    }
    let unparseable = unparseable_list(&extraction.issues);
    if !unparseable.is_empty() {
        line(out, "Unparseable", &unparseable.join(", "));
    }
    if model.producer.is_none() {
        out.push_str(&format!(
            "Producer results absent: {}\n",
            absence_reason(extraction.producer)
        ));
    }
    if model.consumer.is_none() {
        out.push_str(&format!(
            "Consumer results absent: {}\n",
            absence_reason(extraction.consumer)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_model;
    use crate::model::{ExtractionStatus, PhaseOutcome};

    #[test]
    fn test_section_order() {
        let text = render_text(&sample_model()).unwrap();
        let positions: Vec<usize> = [
            "Kafka Performance Report",
            "Test Configuration",
            "Producer Results",
            "Consumer Results",
            "Extraction",
        ]
        .iter()
        .map(|heading| text.find(heading).unwrap())
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_values_use_canonical_format() {
        let text = render_text(&sample_model()).unwrap();

        assert!(text.contains("TPS:          999.70 msg/s\n"));
        assert!(text.contains("Records Sent: 60000\n"));
        assert!(text.contains("Latency Avg:  7.90 ms\n"));
        assert!(text.contains("Latency Max:  307 ms\n"));
        assert!(text.contains("P99.9:        44 ms\n"));
        assert!(text.contains("Records:      60000 | TPS: 1000 | Payload: 1024 bytes | Duration: 60s\n"));
        assert!(text.contains("Window:       2026-02-03 15:01:02.575 UTC -> 2026-02-03 15:02:03.100 UTC\n"));
        assert!(text.contains("Consumed:     60000 msgs (58.59 MB)\n"));
        assert!(text.contains("Status:       complete\n"));
    }

    #[test]
    fn test_absent_consumer_is_named_not_zeroed() {
        let mut model = sample_model();
        model.run.config.consumer_enabled = false;
        model.consumer = None;
        model.extraction.consumer = PhaseOutcome::Disabled;

        let text = render_text(&model).unwrap();
        assert!(!text.contains("Consumer Results"));
        assert!(text.contains("Consumer:     not run (disabled by configuration)\n"));
        assert!(text.contains("Consumer results absent: disabled by configuration\n"));
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let mut model = sample_model();
        let producer = model.producer.as_mut().unwrap();
        producer.latency_percentiles.clear();
        model.extraction.producer = PhaseOutcome::Partial;
        model.extraction.status = ExtractionStatus::Partial;
        model.extraction.issues = Percentile::ALL
            .iter()
            .map(|p| crate::model::FieldIssue {
                field: p.field(),
                kind: crate::model::IssueKind::Missing,
            })
            .collect();

        let text = render_text(&model).unwrap();
        assert!(text.contains("P50:          N/A\n"));
        assert!(text.contains(
            "Missing:      producer.latency_p50_ms, producer.latency_p95_ms, \
             producer.latency_p99_ms, producer.latency_p99.9_ms\n"
        ));
        assert!(text.contains("Status:       partial\n"));
    }

    #[test]
    fn test_inverted_percentiles_are_flagged() {
        let mut model = sample_model();
        let producer = model.producer.as_mut().unwrap();
        producer.set_percentile(Percentile::P95, 20.0);
        producer.set_percentile(Percentile::P99, 10.0);

        let text = render_text(&model).unwrap();
        assert!(text.contains("P95:          20 ms\n"));
        assert!(text.contains("P99:          10 ms\n"));
        assert!(text.contains("WARNING: latency percentiles out of order: p95 (20 ms) > p99 (10 ms)"));
    }

    #[test]
    fn test_render_is_byte_stable() {
        let model = sample_model();
        assert_eq!(render_text(&model).unwrap(), render_text(&model).unwrap());
    }
}
