//! Self-contained HTML report (`report.html`).
//!
//! All CSS is inline; the only external reference allowed is the optional
//! stylesheet from [`HtmlStyle`]. The run timestamp is shown instead of a
//! generation time so that re-rendering a stored model is byte-identical.

use super::{
    absence_reason, checked, data_volume, format_epoch_ms, has_fetch_stats, missing_list,
    unparseable_list, HtmlStyle, RenderError,
};
use crate::model::{
    Anomaly, ConsumerMetrics, ExtractionSummary, MetricsModel, PayloadSource, Percentile,
    PhaseOutcome, ProducerMetrics,
};
use crate::numeric::{format_count, format_opt, NumericKind, NOT_AVAILABLE};

const INLINE_CSS: &str = r#"
  *, *::before, *::after { box-sizing: border-box; }
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
         margin: 0; padding: 2rem; background: #f9fafb; color: #111827; line-height: 1.5; }
  main { max-width: 72rem; margin: 0 auto; }
  h1 { font-size: 1.5rem; margin: 0 0 0.25rem; }
  h2 { font-size: 1.125rem; margin: 0 0 1rem; }
  .meta { color: #6b7280; font-size: 0.875rem; margin-bottom: 1.5rem; }
  .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr));
           gap: 1rem; margin-bottom: 1.5rem; }
  .card, .panel { background: #fff; border: 1px solid #e5e7eb; border-radius: 0.5rem; }
  .card { padding: 1rem 1.25rem; }
  .card .label { font-size: 0.75rem; text-transform: uppercase; color: #6b7280; }
  .card .value { font-size: 1.5rem; font-weight: 700; }
  .card .unit { font-size: 0.75rem; color: #6b7280; }
  .panel { padding: 1.25rem 1.5rem; margin-bottom: 1.5rem; }
  table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
  th { text-align: left; font-weight: 500; color: #4b5563; width: 40%; }
  th, td { padding: 0.5rem 0; border-bottom: 1px solid #f3f4f6; }
  td { font-family: ui-monospace, monospace; }
  .bar { background: #e5e7eb; border-radius: 9999px; height: 0.5rem; margin-bottom: 0.75rem; }
  .bar > div { background: #10b981; border-radius: 9999px; height: 0.5rem; }
  .not-run { border-style: dashed; color: #6b7280; }
  .warning { background: #fffbeb; border: 1px solid #f59e0b; color: #92400e;
             border-radius: 0.375rem; padding: 0.5rem 0.75rem; margin-top: 0.75rem; }
  .status-complete { color: #047857; }
  .status-partial { color: #b45309; }
  .status-failed { color: #b91c1c; }
"#;

/// Render the HTML report for a run.
pub fn render_html(model: &MetricsModel, style: &HtmlStyle) -> Result<String, RenderError> {
    let model = checked(model)?;
    let anomalies = model.anomalies();
    let config = &model.run.config;

    let stylesheet = style
        .stylesheet_href
        .as_deref()
        .map(|href| format!("\n<link rel=\"stylesheet\" href=\"{}\">", html_escape(href)))
        .unwrap_or_default();

    let cards = [
        card("Target TPS", &config.target_tps.to_string(), "msg/s"),
        card("Payload Size", &config.payload_bytes.to_string(), "bytes"),
        card("Duration", &config.duration_secs.to_string(), "seconds"),
        card("Total Records", &config.num_records.to_string(), "messages"),
    ]
    .join("\n");

    let producer_panel = match model.producer {
        Some(ref producer) => producer_section(producer, &anomalies),
        None => not_run_panel("Producer Performance", model.extraction.producer),
    };
    let consumer_panel = match model.consumer {
        Some(ref consumer) => consumer_section(consumer, &anomalies),
        None => not_run_panel("Consumer Performance", model.extraction.consumer),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{css}</style>{stylesheet}
</head>
<body>
<main>
<h1>{title}</h1>
<div class="meta">Run {run} &middot; {timestamp}</div>
<div class="cards">
{cards}
</div>
{configuration}
{producer_panel}
{consumer_panel}
{footer}
</main>
</body>
</html>
"#,
        title = html_escape(&style.title),
        css = INLINE_CSS,
        stylesheet = stylesheet,
        run = html_escape(&model.run.name),
        timestamp = model.run.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        cards = cards,
        configuration = configuration_section(model),
        producer_panel = producer_panel,
        consumer_panel = consumer_panel,
        footer = extraction_footer(&model.extraction),
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn card(label: &str, value: &str, unit: &str) -> String {
    format!(
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div>\
         <div class=\"unit\">{}</div></div>",
        label,
        html_escape(value),
        unit
    )
}

fn row(label: &str, value: &str) -> String {
    format!("<tr><th>{}</th><td>{}</td></tr>", label, html_escape(value))
}

fn with_unit(value: String, unit: &str) -> String {
    if value == NOT_AVAILABLE {
        value
    } else {
        format!("{} {}", value, unit)
    }
}

fn panel(title: &str, body: &str) -> String {
    format!(
        "<section class=\"panel\">\n<h2>{}</h2>\n{}\n</section>",
        title, body
    )
}

fn warnings(anomalies: &[&Anomaly]) -> String {
    anomalies
        .iter()
        .map(|a| format!("\n<div class=\"warning\">{}</div>", html_escape(&a.to_string())))
        .collect()
}

fn configuration_section(model: &MetricsModel) -> String {
    let config = &model.run.config;
    let mut rows = vec![
        row("Topic", &config.topic),
        row("Bootstrap Servers", &config.bootstrap),
    ];
    if let PayloadSource::JsonFile { ref path } = config.payload_source {
        rows.push(row("Payload File", &format!("{} (minified JSON)", path)));
    }
    if let Some(ref settings) = config.producer_settings {
        rows.push(row("Producer Configuration", &settings.to_string()));
    }
    rows.push(row(
        "Consumer Phase",
        if config.consumer_enabled {
            "enabled"
        } else {
            "disabled"
        },
    ));

    panel(
        "Test Configuration",
        &format!("<table>\n{}\n</table>", rows.join("\n")),
    )
}

fn producer_section(producer: &ProducerMetrics, anomalies: &[Anomaly]) -> String {
    let rows = [
        row(
            "Throughput (TPS)",
            &with_unit(format_opt(producer.achieved_tps, NumericKind::Rate), "msg/s"),
        ),
        row(
            "Data Rate",
            &with_unit(format_opt(producer.throughput_mb_s, NumericKind::Rate), "MB/s"),
        ),
        row(
            "Avg Latency",
            &with_unit(format_opt(producer.latency_avg_ms, NumericKind::DurationMs), "ms"),
        ),
        row(
            "Max Latency",
            &with_unit(format_opt(producer.latency_max_ms, NumericKind::DurationMs), "ms"),
        ),
        row("Total Records Sent", &format_count(producer.records_sent)),
    ]
    .join("\n");

    let flagged: Vec<&Anomaly> = anomalies
        .iter()
        .filter(|a| matches!(a, Anomaly::InconsistentPercentiles { .. }))
        .collect();

    panel(
        "Producer Performance",
        &format!(
            "<table>\n{}\n</table>\n<h3>Latency Distribution</h3>\n{}{}",
            rows,
            percentile_bars(producer),
            warnings(&flagged)
        ),
    )
}

/// One bar per percentile, scaled to the largest reported value
fn percentile_bars(producer: &ProducerMetrics) -> String {
    let max = producer
        .latency_percentiles
        .iter()
        .map(|p| p.value_ms)
        .fold(0.0_f64, f64::max);

    Percentile::ALL
        .iter()
        .map(|&percentile| {
            let value = producer.percentile(percentile);
            let width = match value {
                Some(v) if max > 0.0 => v / max * 100.0,
                _ => 0.0,
            };
            format!(
                "<div>{} <span>{}</span></div>\n<div class=\"bar\"><div style=\"width: {:.1}%\"></div></div>",
                percentile.label().to_uppercase(),
                with_unit(format_opt(value, NumericKind::DurationMs), "ms"),
                width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn consumer_section(consumer: &ConsumerMetrics, anomalies: &[Anomaly]) -> String {
    let window = |ms: Option<i64>| {
        ms.map(format_epoch_ms)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    let mut rows = vec![
        row("Window Start", &window(consumer.window_start_ms)),
        row("Window End", &window(consumer.window_end_ms)),
        row(
            "Duration",
            &with_unit(
                format_opt(
                    consumer.window_duration_ms().map(|ms| ms as f64 / 1000.0),
                    NumericKind::Seconds,
                ),
                "s",
            ),
        ),
        row("Messages Consumed", &format_count(consumer.records_consumed)),
        row("Data Consumed", &data_volume(consumer.data_volume_mb)),
        row(
            "Throughput (TPS)",
            &with_unit(format_opt(consumer.achieved_tps, NumericKind::Rate), "msg/s"),
        ),
        row(
            "Data Rate",
            &with_unit(format_opt(consumer.throughput_mb_s, NumericKind::Rate), "MB/s"),
        ),
    ];
    if has_fetch_stats(consumer) {
        rows.push(row(
            "Fetch Time",
            &with_unit(format_opt(consumer.fetch_time_ms, NumericKind::DurationMs), "ms"),
        ));
        rows.push(row(
            "Fetch Rate",
            &format!(
                "{} | {}",
                with_unit(format_opt(consumer.fetch_mb_s, NumericKind::Rate), "MB/s"),
                with_unit(format_opt(consumer.fetch_tps, NumericKind::Rate), "msg/s")
            ),
        ));
        rows.push(row(
            "Rebalance Time",
            &with_unit(
                format_opt(consumer.rebalance_time_ms, NumericKind::DurationMs),
                "ms",
            ),
        ));
    }

    let flagged: Vec<&Anomaly> = anomalies
        .iter()
        .filter(|a| matches!(a, Anomaly::InvertedConsumerWindow { .. }))
        .collect();

    panel(
        "Consumer Performance",
        &format!(
            "<table>\n{}\n</table>{}",
            rows.join("\n"),
            warnings(&flagged)
        ),
    )
}

fn not_run_panel(title: &str, outcome: PhaseOutcome) -> String {
    format!(
        "<section class=\"panel not-run\">\n<h2>{}</h2>\n<p><strong>Not run</strong>: {}.</p>\n</section>",
        title,
        absence_reason(outcome)
    )
}

fn extraction_footer(extraction: &ExtractionSummary) -> String {
    let mut rows = vec![
        row("Producer", &super::outcome_label(extraction.producer)),
        row("Consumer", &super::outcome_label(extraction.consumer)),
        format!(
            "<tr><th>Status</th><td class=\"status-{status}\">{status}</td></tr>",
            status = extraction.status
        ),
    ];

    let missing = missing_list(&extraction.issues);
    if !missing.is_empty() {
        rows.push(row("Missing Fields", &missing.join(", ")));
    }
    let unparseable = unparseable_list(&extraction.issues);
    if !unparseable.is_empty() {
        rows.push(row("Unparseable Fields", &unparseable.join(", ")));
    }

    format!(
        "<footer class=\"panel\">\n<h2>Extraction</h2>\n<table>\n{}\n</table>\n\
         <p class=\"meta\">kafka-perf-report {}</p>\n</footer>",
        rows.join("\n"),
        crate::VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_model;

    #[test]
    fn test_is_complete_document() {
        let html = render_html(&sample_model(), &HtmlStyle::default()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("<title>Kafka Performance Report</title>"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn test_values_match_text_renderer() {
        let html = render_html(&sample_model(), &HtmlStyle::default()).unwrap();
        assert!(html.contains("<td>999.70 msg/s</td>"));
        assert!(html.contains("<td>7.90 ms</td>"));
        assert!(html.contains("<td>307 ms</td>"));
        assert!(html.contains("<td>58.59 MB</td>"));
        assert!(html.contains("<td>2026-02-03 15:01:02.575 UTC</td>"));
    }

    #[test]
    fn test_percentile_bars_scale_to_largest() {
        let html = render_html(&sample_model(), &HtmlStyle::default()).unwrap();
        assert!(html.contains("P99.9 <span>44 ms</span></div>\n<div class=\"bar\"><div style=\"width: 100.0%\">"));
        assert!(html.contains("P50 <span>8 ms</span></div>\n<div class=\"bar\"><div style=\"width: 18.2%\">"));
    }

    #[test]
    fn test_disabled_consumer_renders_not_run_panel() {
        let mut model = sample_model();
        model.run.config.consumer_enabled = false;
        model.consumer = None;
        model.extraction.consumer = PhaseOutcome::Disabled;

        let html = render_html(&model, &HtmlStyle::default()).unwrap();
        assert!(html.contains("<section class=\"panel not-run\">\n<h2>Consumer Performance</h2>"));
        assert!(html.contains("<strong>Not run</strong>: disabled by configuration."));
        assert!(!html.contains("991.30"));
    }

    #[test]
    fn test_style_is_escaped_and_linked() {
        let style = HtmlStyle {
            title: "Orders <prod>".to_string(),
            stylesheet_href: Some("report.css".to_string()),
        };
        let html = render_html(&sample_model(), &style).unwrap();
        assert!(html.contains("<title>Orders &lt;prod&gt;</title>"));
        assert_eq!(html.matches("<link rel=\"stylesheet\"").count(), 1);
        assert!(html.contains("href=\"report.css\""));
    }

    #[test]
    fn test_anomaly_is_flagged() {
        let mut model = sample_model();
        let producer = model.producer.as_mut().unwrap();
        producer.set_percentile(Percentile::P95, 20.0);
        producer.set_percentile(Percentile::P99, 10.0);

        let html = render_html(&model, &HtmlStyle::default()).unwrap();
        assert!(html.contains("<div class=\"warning\">latency percentiles out of order: p95 (20 ms) &gt; p99 (10 ms)"));
    }

    #[test]
    fn test_render_is_byte_stable() {
        let model = sample_model();
        let style = HtmlStyle::default();
        assert_eq!(
            render_html(&model, &style).unwrap(),
            render_html(&model, &style).unwrap()
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<a href=\"url\">A & B</a>"),
            "&lt;a href=&quot;url&quot;&gt;A &amp; B&lt;/a&gt;"
        );
        assert_eq!(html_escape("plain text"), "plain text");
    }
}
