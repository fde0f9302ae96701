//! # Output Extractor
//!
//! Turns the raw text captured from the producer and consumer perf tools into
//! a [`MetricsModel`]. Extraction is a pure function of its inputs: it reads
//! no files, no clock and no environment, so the same raw text and identity
//! always produce the same model.
//!
//! ## Recognised Shapes
//!
//! Every field is looked up through a static table of label patterns. Three
//! shapes are understood for each field:
//!
//! - **Native summary fragments**: `999.7 records/sec`, `7.90 ms avg latency`,
//!   `8 ms 50th`
//! - **Label-first fragments**: `avg 7.9 ms`, `50th 8ms`
//! - **Labelled lines**: `Records Sent: 60,000`, `start.time: 2026-02-03 ...`
//!
//! ## Scan Order
//!
//! The producer tool prints interim progress windows before its final
//! cumulative line. The final summary line is scanned first, then every line
//! in order, and the first line that yields a field wins.
//!
//! The consumer tool prints a CSV header and one data row. When the header is
//! present the row is zipped into `column: value` lines; without a header the
//! first wide row is mapped onto the tool's default column order.
//!
//! ## Outcomes
//!
//! A field the text does not carry is absent. A labelled value that is not a
//! usable number is recorded as unparseable and treated the same as absent. A
//! phase with no usable field at all is `failed`; a phase missing some required
//! fields is `partial`.

use crate::model::{
    ConsumerMetrics, ExtractionSummary, Field, FieldIssue, IssueKind, MetricsModel, Percentile,
    PhaseOutcome, ProducerMetrics, RunIdentity, SCHEMA_VERSION,
};
use crate::numeric::{parse_count, parse_quantity, ValueError};
use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Consumer output as handed to the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerInput<'a> {
    /// The consumer phase was intentionally not run
    Disabled,
    /// Text captured from the consumer perf tool; may be empty
    Captured(&'a str),
}

/// Column order printed by the consumer perf tool
pub const CONSUMER_COLUMNS: [&str; 10] = [
    "start.time",
    "end.time",
    "data.consumed.in.MB",
    "MB.sec",
    "data.consumed.in.nMsg",
    "nMsg.sec",
    "rebalance.time.ms",
    "fetch.time.ms",
    "fetch.MB.sec",
    "fetch.nMsg.sec",
];

/// Rows narrower than this are not treated as a headerless consumer result.
const MIN_CONSUMER_CELLS: usize = 6;

/// A decimal number with optional thousands separators
const NUM: &str = r"(?P<value>[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)";

/// The value after `Label:`; separated thousands are taken whole, otherwise up to
/// the next fragment separator
const LABELLED_VALUE: &str = r"(?P<value>\d{1,3}(?:,\d{3})+(?:\.\d+)?(?:\s*[a-z/%.]+)?|[^,;|]+)";

/// How a matched value is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Count,
    Quantity,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Count(u64),
    Quantity(f64),
    Timestamp(i64),
}

struct FieldRule {
    field: Field,
    kind: ValueKind,
    patterns: Vec<Regex>,
}

fn value_first(suffix: &str) -> String {
    format!(r"(?i){}\s*{}", NUM, suffix)
}

fn label_first(labels: &str, unit: &str) -> String {
    format!(r"(?i)\b(?:{})\s+{}\s*{}\b", labels, NUM, unit)
}

fn labelled(labels: &str) -> String {
    format!(r"(?i)(?:^|[,;|])\s*(?:{})\s*[:=]\s*{}", labels, LABELLED_VALUE)
}

/// Pattern sources for every field, in table order
fn pattern_sources() -> Vec<(Field, ValueKind, Vec<String>)> {
    use Field::*;
    use ValueKind::*;

    vec![
        (
            RecordsSent,
            Count,
            vec![
                value_first(r"records\s+sent\b"),
                labelled(r"records\s+sent|records_sent|sent\s+records"),
            ],
        ),
        (
            ProducerTps,
            Quantity,
            vec![
                value_first(r"records/sec"),
                labelled(r"achieved\s+tps|producer\s+tps|tps|records/sec|throughput\s*\(records/sec\)"),
            ],
        ),
        (
            ProducerThroughput,
            Quantity,
            vec![
                value_first(r"MB/sec"),
                labelled(r"throughput\s*\(mb/sec\)|mb/sec|throughput"),
            ],
        ),
        (
            LatencyAvg,
            Quantity,
            vec![
                value_first(r"ms\s+avg\s+latency"),
                label_first(r"avg(?:\s+latency)?", "ms"),
                labelled(r"avg\s+latency|average\s+latency|latency\s+avg|avg"),
            ],
        ),
        (
            LatencyMax,
            Quantity,
            vec![
                value_first(r"ms\s+max\s+latency"),
                label_first(r"max(?:\s+latency)?", "ms"),
                labelled(r"max\s+latency|maximum\s+latency|latency\s+max|max"),
            ],
        ),
        (
            LatencyP50,
            Quantity,
            vec![
                value_first(r"ms\s+50th\b"),
                label_first(r"p50|50th", "ms"),
                labelled(r"p50|50th|latency\s+p50"),
            ],
        ),
        (
            LatencyP95,
            Quantity,
            vec![
                value_first(r"ms\s+95th\b"),
                label_first(r"p95|95th", "ms"),
                labelled(r"p95|95th|latency\s+p95"),
            ],
        ),
        (
            LatencyP99,
            Quantity,
            vec![
                value_first(r"ms\s+99th\b"),
                label_first(r"p99|99th", "ms"),
                labelled(r"p99|99th|latency\s+p99"),
            ],
        ),
        (
            LatencyP999,
            Quantity,
            vec![
                value_first(r"ms\s+99\.9th\b"),
                label_first(r"p99\.9|99\.9th", "ms"),
                labelled(r"p99\.9|99\.9th|latency\s+p99\.9"),
            ],
        ),
        (
            RecordsConsumed,
            Count,
            vec![
                labelled(r"data\.consumed\.in\.nmsg|records\s+consumed|messages\s+consumed"),
                value_first(r"(?:records|messages|msgs)\s+consumed\b"),
            ],
        ),
        (
            ConsumerTps,
            Quantity,
            vec![
                labelled(r"nmsg\.sec|consumer\s+tps|achieved\s+tps|tps|records/sec|msgs/sec"),
                value_first(r"(?:records|messages|msgs)/sec"),
            ],
        ),
        (
            ConsumerThroughput,
            Quantity,
            vec![
                labelled(r"mb\.sec|mb/sec|throughput"),
                value_first(r"MB/sec"),
            ],
        ),
        (
            DataVolume,
            Quantity,
            vec![labelled(
                r"data\.consumed\.in\.mb|data\s+consumed|data\s+volume",
            )],
        ),
        (
            WindowStart,
            Timestamp,
            vec![labelled(r"start\.time|window\s+start|start\s+time")],
        ),
        (
            WindowEnd,
            Timestamp,
            vec![labelled(r"end\.time|window\s+end|end\s+time")],
        ),
        (
            RebalanceTime,
            Quantity,
            vec![labelled(r"rebalance\.time\.ms|rebalance\s+time")],
        ),
        (
            FetchTime,
            Quantity,
            vec![labelled(r"fetch\.time\.ms|fetch\s+time")],
        ),
        (
            FetchThroughput,
            Quantity,
            vec![labelled(r"fetch\.mb\.sec|fetch\s+mb/sec|fetch\s+throughput")],
        ),
        (
            FetchTps,
            Quantity,
            vec![labelled(r"fetch\.nmsg\.sec|fetch\s+tps")],
        ),
    ]
}

fn rules() -> &'static [FieldRule] {
    static RULES: OnceLock<Vec<FieldRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        pattern_sources()
            .into_iter()
            .map(|(field, kind, sources)| FieldRule {
                field,
                kind,
                // Sources are fixed; test_every_pattern_compiles covers them.
                patterns: sources.iter().filter_map(|s| Regex::new(s).ok()).collect(),
            })
            .collect()
    })
}

fn rule_for(field: Field) -> Option<&'static FieldRule> {
    rules().iter().find(|r| r.field == field)
}

/// Build the metrics model for one run.
///
/// `identity` is carried through unchanged apart from `consumer_enabled`,
/// which always follows `consumer`. Extraction never reads the clock.
pub fn extract(
    producer_raw: &str,
    consumer: ConsumerInput<'_>,
    mut identity: RunIdentity,
) -> MetricsModel {
    let mut issues = Vec::new();

    let consumer_enabled = !matches!(consumer, ConsumerInput::Disabled);
    if identity.config.consumer_enabled != consumer_enabled {
        warn!(
            run = %identity.name,
            consumer_enabled,
            "Configured consumer state disagrees with the supplied output; following the output"
        );
        identity.config.consumer_enabled = consumer_enabled;
    }

    let producer_lines = producer_scan_order(producer_raw);
    let producer_scan = scan_phase(&producer_lines, &Field::PRODUCER, &mut issues);
    let producer = producer_scan.values.map(|v| build_producer(&v));

    let (consumer, consumer_outcome) = match consumer {
        ConsumerInput::Disabled => (None, PhaseOutcome::Disabled),
        ConsumerInput::Captured(text) => {
            let consumer_lines = consumer_scan_order(text);
            let scan = scan_phase(&consumer_lines, &Field::CONSUMER, &mut issues);
            (scan.values.map(|v| build_consumer(&v)), scan.outcome)
        }
    };

    let status = ExtractionSummary::overall(producer_scan.outcome, consumer_outcome);
    info!(
        run = %identity.name,
        %status,
        producer = %producer_scan.outcome,
        consumer = %consumer_outcome,
        issues = issues.len(),
        "Extraction finished"
    );

    MetricsModel {
        schema_version: SCHEMA_VERSION,
        run: identity,
        producer,
        consumer,
        extraction: ExtractionSummary {
            status,
            producer: producer_scan.outcome,
            consumer: consumer_outcome,
            issues,
        },
    }
}

struct PhaseScan {
    /// `None` when no field of the phase yielded a value
    values: Option<BTreeMap<Field, Value>>,
    outcome: PhaseOutcome,
}

fn scan_phase(lines: &[Cow<'_, str>], fields: &[Field], issues: &mut Vec<FieldIssue>) -> PhaseScan {
    let mut values = BTreeMap::new();
    let mut phase_issues = Vec::new();

    for &field in fields {
        let Some(rule) = rule_for(field) else {
            continue;
        };

        let issue = match find_raw(rule, lines) {
            None => {
                debug!(field = %field, "No label matched");
                Some(IssueKind::Missing)
            }
            Some(raw) => match convert(rule.kind, &raw) {
                Ok(value) => {
                    debug!(field = %field, raw = %raw, "Extracted value");
                    values.insert(field, value);
                    None
                }
                Err(e) => {
                    warn!(field = %field, error = %e, "Labelled value is not usable");
                    Some(IssueKind::Unparseable { raw })
                }
            },
        };

        if let Some(kind) = issue {
            if field.is_required() {
                phase_issues.push(FieldIssue { field, kind });
            }
        }
    }

    let outcome = if values.is_empty() {
        PhaseOutcome::Failed
    } else if phase_issues.is_empty() {
        PhaseOutcome::Complete
    } else {
        PhaseOutcome::Partial
    };
    issues.extend(phase_issues);

    PhaseScan {
        values: if values.is_empty() { None } else { Some(values) },
        outcome,
    }
}

/// First raw value for a rule, scanning lines in order and patterns per line
fn find_raw(rule: &FieldRule, lines: &[Cow<'_, str>]) -> Option<String> {
    lines.iter().find_map(|line| {
        rule.patterns.iter().find_map(|re| {
            re.captures(line)
                .and_then(|caps| caps.name("value"))
                .map(|m| m.as_str().trim().to_string())
        })
    })
}

fn convert(kind: ValueKind, raw: &str) -> Result<Value, ValueError> {
    match kind {
        ValueKind::Count => parse_count(raw).map(Value::Count),
        ValueKind::Quantity => parse_quantity(raw).map(Value::Quantity),
        ValueKind::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
    }
}

/// Parse a consumer timestamp into UTC epoch milliseconds.
///
/// Accepts the tool's `YYYY-MM-DD HH:MM:SS:mmm`, the same with `.mmm`, and a
/// bare integer taken as epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Result<i64, ValueError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ValueError::Empty);
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .map_err(|_| ValueError::NotTimestamp(s.to_string()));
    }

    let invalid = || ValueError::NotTimestamp(s.to_string());

    // The tool separates milliseconds with a fourth colon
    if s.matches(':').count() == 3 {
        let (base, millis) = s.rsplit_once(':').ok_or_else(invalid)?;
        if millis.is_empty() || millis.len() > 3 || !millis.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let millis: i64 = millis.parse().map_err(|_| invalid())?;
        let base = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S").map_err(|_| invalid())?;
        return Ok(Utc.from_utc_datetime(&base).timestamp_millis() + millis);
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map_err(|_| invalid())?;
    Ok(Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// Final summary line first, then every line in order
fn producer_scan_order(text: &str) -> Vec<Cow<'_, str>> {
    let lines: Vec<&str> = text.lines().collect();
    let summary = lines
        .iter()
        .rposition(|l| l.contains("99.9th"))
        .or_else(|| {
            lines
                .iter()
                .rposition(|l| l.to_ascii_lowercase().contains("records sent"))
        });

    let mut ordered = Vec::with_capacity(lines.len() + 1);
    if let Some(idx) = summary {
        ordered.push(Cow::Borrowed(lines[idx]));
    }
    ordered.extend(lines.iter().map(|l| Cow::Borrowed(*l)));
    ordered
}

/// Synthesized `column: value` lines from the CSV result first, then every line
fn consumer_scan_order(text: &str) -> Vec<Cow<'_, str>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut ordered: Vec<Cow<'_, str>> = Vec::new();

    let header_idx = lines
        .iter()
        .position(|l| l.contains("start.time") && l.contains(','));

    match header_idx {
        Some(idx) => {
            let header = split_cells(lines[idx]);
            let row = lines[idx + 1..]
                .iter()
                .map(|l| split_cells(l))
                .find(|cells| cells.len() == header.len());
            if let Some(row) = row {
                ordered.extend(zip_cells(&header, &row));
            }
        }
        None => {
            let row = lines
                .iter()
                .map(|l| split_cells(l))
                .find(|cells| cells.len() >= MIN_CONSUMER_CELLS);
            if let Some(row) = row {
                debug!(cells = row.len(), "Mapping headerless consumer row onto default columns");
                ordered.extend(zip_cells(&CONSUMER_COLUMNS, &row));
            }
        }
    }

    ordered.extend(lines.iter().map(|l| Cow::Borrowed(*l)));
    ordered
}

fn split_cells(line: &str) -> Vec<&str> {
    if line.trim().is_empty() {
        return Vec::new();
    }
    line.split(',').map(str::trim).collect()
}

fn zip_cells<'a, H: AsRef<str>>(header: &[H], row: &[&str]) -> Vec<Cow<'a, str>> {
    header
        .iter()
        .zip(row.iter())
        .filter(|(_, value)| !value.is_empty())
        .map(|(column, value)| Cow::Owned(format!("{}: {}", column.as_ref(), value)))
        .collect()
}

fn quantity(values: &BTreeMap<Field, Value>, field: Field) -> Option<f64> {
    match values.get(&field) {
        Some(Value::Quantity(v)) => Some(*v),
        _ => None,
    }
}

fn count(values: &BTreeMap<Field, Value>, field: Field) -> Option<u64> {
    match values.get(&field) {
        Some(Value::Count(v)) => Some(*v),
        _ => None,
    }
}

fn timestamp(values: &BTreeMap<Field, Value>, field: Field) -> Option<i64> {
    match values.get(&field) {
        Some(Value::Timestamp(v)) => Some(*v),
        _ => None,
    }
}

fn build_producer(values: &BTreeMap<Field, Value>) -> ProducerMetrics {
    let mut producer = ProducerMetrics {
        records_sent: count(values, Field::RecordsSent),
        achieved_tps: quantity(values, Field::ProducerTps),
        throughput_mb_s: quantity(values, Field::ProducerThroughput),
        latency_avg_ms: quantity(values, Field::LatencyAvg),
        latency_max_ms: quantity(values, Field::LatencyMax),
        latency_percentiles: Vec::new(),
    };
    for percentile in Percentile::ALL {
        if let Some(value) = quantity(values, percentile.field()) {
            producer.set_percentile(percentile, value);
        }
    }
    producer
}

fn build_consumer(values: &BTreeMap<Field, Value>) -> ConsumerMetrics {
    ConsumerMetrics {
        records_consumed: count(values, Field::RecordsConsumed),
        achieved_tps: quantity(values, Field::ConsumerTps),
        throughput_mb_s: quantity(values, Field::ConsumerThroughput),
        data_volume_mb: quantity(values, Field::DataVolume),
        window_start_ms: timestamp(values, Field::WindowStart),
        window_end_ms: timestamp(values, Field::WindowEnd),
        rebalance_time_ms: quantity(values, Field::RebalanceTime),
        fetch_time_ms: quantity(values, Field::FetchTime),
        fetch_mb_s: quantity(values, Field::FetchThroughput),
        fetch_tps: quantity(values, Field::FetchTps),
    }
}
