//! # Metrics Model
//!
//! The canonical, immutable record of one perf-test run. A model is produced
//! once by the extractor, persisted verbatim as `metrics.json`, and consumed any
//! number of times by the renderers.
//!
//! Absence is a first-class state everywhere in this module: a value the raw
//! output did not report is `None`, never `0`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Version of the persisted `metrics.json` layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Benchmark phase within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Producer,
    Consumer,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Producer => write!(f, "producer"),
            Phase::Consumer => write!(f, "consumer"),
        }
    }
}

/// Latency percentile labels reported by the producer perf tool
///
/// Declaration order is the percentile order, so the derived `Ord` sorts
/// p50 < p95 < p99 < p99.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Percentile {
    #[serde(rename = "p50")]
    P50,
    #[serde(rename = "p95")]
    P95,
    #[serde(rename = "p99")]
    P99,
    #[serde(rename = "p99.9")]
    P999,
}

impl Percentile {
    pub const ALL: [Percentile; 4] = [
        Percentile::P50,
        Percentile::P95,
        Percentile::P99,
        Percentile::P999,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Percentile::P50 => "p50",
            Percentile::P95 => "p95",
            Percentile::P99 => "p99",
            Percentile::P999 => "p99.9",
        }
    }

    /// The metric field that carries this percentile
    pub fn field(self) -> Field {
        match self {
            Percentile::P50 => Field::LatencyP50,
            Percentile::P95 => Field::LatencyP95,
            Percentile::P99 => Field::LatencyP99,
            Percentile::P999 => Field::LatencyP999,
        }
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every metric the extractor looks for, across both phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    RecordsSent,
    ProducerTps,
    ProducerThroughput,
    LatencyAvg,
    LatencyMax,
    LatencyP50,
    LatencyP95,
    LatencyP99,
    LatencyP999,
    RecordsConsumed,
    ConsumerTps,
    ConsumerThroughput,
    DataVolume,
    WindowStart,
    WindowEnd,
    RebalanceTime,
    FetchTime,
    FetchThroughput,
    FetchTps,
}

impl Field {
    pub const PRODUCER: [Field; 9] = [
        Field::RecordsSent,
        Field::ProducerTps,
        Field::ProducerThroughput,
        Field::LatencyAvg,
        Field::LatencyMax,
        Field::LatencyP50,
        Field::LatencyP95,
        Field::LatencyP99,
        Field::LatencyP999,
    ];

    pub const CONSUMER: [Field; 10] = [
        Field::RecordsConsumed,
        Field::ConsumerTps,
        Field::ConsumerThroughput,
        Field::DataVolume,
        Field::WindowStart,
        Field::WindowEnd,
        Field::RebalanceTime,
        Field::FetchTime,
        Field::FetchThroughput,
        Field::FetchTps,
    ];

    pub fn phase(self) -> Phase {
        match self {
            Field::RecordsSent
            | Field::ProducerTps
            | Field::ProducerThroughput
            | Field::LatencyAvg
            | Field::LatencyMax
            | Field::LatencyP50
            | Field::LatencyP95
            | Field::LatencyP99
            | Field::LatencyP999 => Phase::Producer,
            _ => Phase::Consumer,
        }
    }

    /// Whether a miss on this field makes its phase `partial`.
    ///
    /// The producer's record count and the consumer's rebalance and fetch
    /// columns are extras: summaries and older tool versions omit them.
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Field::RecordsSent
                | Field::RebalanceTime
                | Field::FetchTime
                | Field::FetchThroughput
                | Field::FetchTps
        )
    }

    /// Qualified name used in report footers, e.g. `producer.achieved_tps`
    pub fn name(self) -> &'static str {
        match self {
            Field::RecordsSent => "producer.records_sent",
            Field::ProducerTps => "producer.achieved_tps",
            Field::ProducerThroughput => "producer.throughput_mb_s",
            Field::LatencyAvg => "producer.latency_avg_ms",
            Field::LatencyMax => "producer.latency_max_ms",
            Field::LatencyP50 => "producer.latency_p50_ms",
            Field::LatencyP95 => "producer.latency_p95_ms",
            Field::LatencyP99 => "producer.latency_p99_ms",
            Field::LatencyP999 => "producer.latency_p99.9_ms",
            Field::RecordsConsumed => "consumer.records_consumed",
            Field::ConsumerTps => "consumer.achieved_tps",
            Field::ConsumerThroughput => "consumer.throughput_mb_s",
            Field::DataVolume => "consumer.data_volume_mb",
            Field::WindowStart => "consumer.window_start_ms",
            Field::WindowEnd => "consumer.window_end_ms",
            Field::RebalanceTime => "consumer.rebalance_time_ms",
            Field::FetchTime => "consumer.fetch_time_ms",
            Field::FetchThroughput => "consumer.fetch_mb_s",
            Field::FetchTps => "consumer.fetch_tps",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the producer payload was supplied to the perf tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PayloadSource {
    /// Fixed-size random records (`--record-size`)
    RecordSize,
    /// A JSON document, minified to a single line (`--payload-file`)
    JsonFile { path: String },
}

/// Producer client settings echoed into the reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSettings {
    pub acks: String,
    pub compression: String,
    pub linger_ms: u64,
    pub batch_size: u64,
}

impl fmt::Display for ProducerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acks={} compression={} linger_ms={} batch_size={}",
            self.acks, self.compression, self.linger_ms, self.batch_size
        )
    }
}

/// The test configuration as it was actually run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub topic: String,
    pub bootstrap: String,
    pub target_tps: u64,
    pub payload_bytes: u64,
    pub payload_source: PayloadSource,
    pub duration_secs: u64,
    pub num_records: u64,
    pub producer_settings: Option<ProducerSettings>,
    pub consumer_enabled: bool,
}

impl ConfigEcho {
    /// Minimal echo with `num_records` derived as `tps × duration`
    pub fn new(
        topic: impl Into<String>,
        bootstrap: impl Into<String>,
        target_tps: u64,
        payload_bytes: u64,
        duration_secs: u64,
    ) -> Self {
        Self {
            topic: topic.into(),
            bootstrap: bootstrap.into(),
            target_tps,
            payload_bytes,
            payload_source: PayloadSource::RecordSize,
            duration_secs,
            num_records: target_tps.saturating_mul(duration_secs),
            producer_settings: None,
            consumer_enabled: true,
        }
    }

    /// Record a JSON payload: the echoed size becomes the minified byte length.
    pub fn with_json_payload(mut self, path: impl Into<String>, minified_len: usize) -> Self {
        self.payload_bytes = minified_len as u64;
        self.payload_source = PayloadSource::JsonFile { path: path.into() };
        self
    }

    pub fn with_consumer(mut self, enabled: bool) -> Self {
        self.consumer_enabled = enabled;
        self
    }

    pub fn with_producer_settings(mut self, settings: ProducerSettings) -> Self {
        self.producer_settings = Some(settings);
        self
    }

    pub fn with_num_records(mut self, num_records: u64) -> Self {
        self.num_records = num_records;
        self
    }
}

/// Identity of a run; set once at extraction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub config: ConfigEcho,
}

/// Percentile value pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: Percentile,
    pub value_ms: f64,
}

/// Producer-side results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerMetrics {
    pub records_sent: Option<u64>,
    pub achieved_tps: Option<f64>,
    pub throughput_mb_s: Option<f64>,
    pub latency_avg_ms: Option<f64>,
    pub latency_max_ms: Option<f64>,
    /// Sorted by percentile label; values are kept exactly as reported.
    pub latency_percentiles: Vec<PercentileValue>,
}

impl ProducerMetrics {
    pub fn percentile(&self, percentile: Percentile) -> Option<f64> {
        self.latency_percentiles
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.value_ms)
    }

    /// Insert or replace a percentile, keeping the list ordered by label.
    pub fn set_percentile(&mut self, percentile: Percentile, value_ms: f64) {
        match self
            .latency_percentiles
            .binary_search_by(|p| p.percentile.cmp(&percentile))
        {
            Ok(idx) => self.latency_percentiles[idx].value_ms = value_ms,
            Err(idx) => self.latency_percentiles.insert(
                idx,
                PercentileValue {
                    percentile,
                    value_ms,
                },
            ),
        }
    }

    /// Adjacent reported percentiles whose values decrease.
    pub fn percentile_inversions(&self) -> Vec<(PercentileValue, PercentileValue)> {
        self.latency_percentiles
            .windows(2)
            .filter(|pair| pair[1].value_ms < pair[0].value_ms)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }
}

/// Consumer-side results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerMetrics {
    pub records_consumed: Option<u64>,
    pub achieved_tps: Option<f64>,
    pub throughput_mb_s: Option<f64>,
    pub data_volume_mb: Option<f64>,
    /// UTC epoch milliseconds
    pub window_start_ms: Option<i64>,
    /// UTC epoch milliseconds
    pub window_end_ms: Option<i64>,
    pub rebalance_time_ms: Option<f64>,
    pub fetch_time_ms: Option<f64>,
    pub fetch_mb_s: Option<f64>,
    pub fetch_tps: Option<f64>,
}

impl ConsumerMetrics {
    /// Length of the consumption window, if both ends were reported.
    pub fn window_duration_ms(&self) -> Option<i64> {
        match (self.window_start_ms, self.window_end_ms) {
            (Some(start), Some(end)) => end.checked_sub(start),
            _ => None,
        }
    }
}

/// Overall extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Complete,
    Partial,
    Failed,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStatus::Complete => write!(f, "complete"),
            ExtractionStatus::Partial => write!(f, "partial"),
            ExtractionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-phase extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    Complete,
    Partial,
    Failed,
    /// Intentionally not run; an expected absence rather than a miss.
    Disabled,
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseOutcome::Complete => write!(f, "complete"),
            PhaseOutcome::Partial => write!(f, "partial"),
            PhaseOutcome::Failed => write!(f, "failed"),
            PhaseOutcome::Disabled => write!(f, "disabled"),
        }
    }
}

/// Why a field has no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// No recognised label matched
    Missing,
    /// A label matched but the value was not a usable number
    Unparseable { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: Field,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub status: ExtractionStatus,
    pub producer: PhaseOutcome,
    pub consumer: PhaseOutcome,
    /// Required fields that could not be extracted, in field order.
    pub issues: Vec<FieldIssue>,
}

impl ExtractionSummary {
    pub fn missing_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::Missing)
            .map(|i| i.field)
    }

    pub fn unparseable_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.issues
            .iter()
            .filter(|i| matches!(i.kind, IssueKind::Unparseable { .. }))
            .map(|i| i.field)
    }

    /// Combine per-phase outcomes into the overall status.
    pub fn overall(producer: PhaseOutcome, consumer: PhaseOutcome) -> ExtractionStatus {
        let enabled: Vec<PhaseOutcome> = [producer, consumer]
            .into_iter()
            .filter(|o| *o != PhaseOutcome::Disabled)
            .collect();

        if enabled.is_empty() || enabled.iter().all(|o| *o == PhaseOutcome::Failed) {
            ExtractionStatus::Failed
        } else if enabled.iter().all(|o| *o == PhaseOutcome::Complete) {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::Partial
        }
    }
}

/// Measurement anomalies that are reported, never corrected
#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    InconsistentPercentiles {
        lower: PercentileValue,
        higher: PercentileValue,
    },
    InvertedConsumerWindow { start_ms: i64, end_ms: i64 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::InconsistentPercentiles { lower, higher } => write!(
                f,
                "latency percentiles out of order: {} ({} ms) > {} ({} ms); values shown as reported",
                lower.percentile,
                crate::numeric::format(lower.value_ms, crate::numeric::NumericKind::DurationMs),
                higher.percentile,
                crate::numeric::format(higher.value_ms, crate::numeric::NumericKind::DurationMs),
            ),
            Anomaly::InvertedConsumerWindow { start_ms, end_ms } => write!(
                f,
                "consumer window ends before it starts ({} ms < {} ms); values shown as reported",
                end_ms, start_ms
            ),
        }
    }
}

/// A persisted model that cannot be rendered faithfully
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("{field} is {value}, expected a finite non-negative number")]
    InvalidNumber { field: Field, value: f64 },
    #[error("latency percentiles are not stored in label order")]
    PercentileOrder,
    #[error("consumer metrics present but the consumer phase was disabled")]
    UnexpectedConsumer,
    #[error("consumer phase is {outcome} but the configuration has it {}", enabled_label(*.enabled))]
    ConsumerConfigMismatch { outcome: PhaseOutcome, enabled: bool },
    #[error("{field} is {value}, expected a non-negative epoch timestamp")]
    InvalidTimestamp { field: Field, value: i64 },
    #[error("{phase} phase is {outcome} but {detail}")]
    InconsistentOutcome {
        phase: Phase,
        outcome: PhaseOutcome,
        detail: &'static str,
    },
    #[error("status {stored} does not match phase outcomes (expected {expected})")]
    InconsistentStatus {
        stored: ExtractionStatus,
        expected: ExtractionStatus,
    },
}

/// Complete results of one perf-test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsModel {
    pub schema_version: u32,
    pub run: RunIdentity,
    pub producer: Option<ProducerMetrics>,
    pub consumer: Option<ConsumerMetrics>,
    pub extraction: ExtractionSummary,
}

impl MetricsModel {
    /// Anomalies derived from the stored values
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        if let Some(ref producer) = self.producer {
            for (lower, higher) in producer.percentile_inversions() {
                anomalies.push(Anomaly::InconsistentPercentiles { lower, higher });
            }
        }

        if let Some(ref consumer) = self.consumer {
            if let (Some(start_ms), Some(end_ms)) = (consumer.window_start_ms, consumer.window_end_ms)
            {
                if end_ms < start_ms {
                    anomalies.push(Anomaly::InvertedConsumerWindow { start_ms, end_ms });
                }
            }
        }

        anomalies
    }

    /// Check that a (possibly deserialized) model is internally consistent.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ModelError::SchemaVersion {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        if let Some(ref producer) = self.producer {
            check_number(Field::ProducerTps, producer.achieved_tps)?;
            check_number(Field::ProducerThroughput, producer.throughput_mb_s)?;
            check_number(Field::LatencyAvg, producer.latency_avg_ms)?;
            check_number(Field::LatencyMax, producer.latency_max_ms)?;
            for p in &producer.latency_percentiles {
                check_number(p.percentile.field(), Some(p.value_ms))?;
            }
            let ordered = producer
                .latency_percentiles
                .windows(2)
                .all(|pair| pair[0].percentile < pair[1].percentile);
            if !ordered {
                return Err(ModelError::PercentileOrder);
            }
        }

        if let Some(ref consumer) = self.consumer {
            if !self.run.config.consumer_enabled {
                return Err(ModelError::UnexpectedConsumer);
            }
            check_number(Field::ConsumerTps, consumer.achieved_tps)?;
            check_number(Field::ConsumerThroughput, consumer.throughput_mb_s)?;
            check_number(Field::DataVolume, consumer.data_volume_mb)?;
            check_number(Field::RebalanceTime, consumer.rebalance_time_ms)?;
            check_number(Field::FetchTime, consumer.fetch_time_ms)?;
            check_number(Field::FetchThroughput, consumer.fetch_mb_s)?;
            check_number(Field::FetchTps, consumer.fetch_tps)?;
            check_timestamp(Field::WindowStart, consumer.window_start_ms)?;
            check_timestamp(Field::WindowEnd, consumer.window_end_ms)?;
        }

        let enabled = self.run.config.consumer_enabled;
        if enabled == (self.extraction.consumer == PhaseOutcome::Disabled) {
            return Err(ModelError::ConsumerConfigMismatch {
                outcome: self.extraction.consumer,
                enabled,
            });
        }

        check_outcome(Phase::Producer, self.extraction.producer, self.producer.is_some())?;
        check_outcome(Phase::Consumer, self.extraction.consumer, self.consumer.is_some())?;

        let expected = ExtractionSummary::overall(self.extraction.producer, self.extraction.consumer);
        if expected != self.extraction.status {
            return Err(ModelError::InconsistentStatus {
                stored: self.extraction.status,
                expected,
            });
        }

        Ok(())
    }
}

fn check_number(field: Field, value: Option<f64>) -> Result<(), ModelError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ModelError::InvalidNumber { field, value: v }),
        _ => Ok(()),
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn check_timestamp(field: Field, value: Option<i64>) -> Result<(), ModelError> {
    match value {
        Some(v) if v < 0 => Err(ModelError::InvalidTimestamp { field, value: v }),
        _ => Ok(()),
    }
}

fn check_outcome(phase: Phase, outcome: PhaseOutcome, present: bool) -> Result<(), ModelError> {
    let detail = match (outcome, present) {
        (PhaseOutcome::Complete | PhaseOutcome::Partial, false) => "its metrics are absent",
        (PhaseOutcome::Failed | PhaseOutcome::Disabled, true) => "its metrics are present",
        _ => return Ok(()),
    };
    Err(ModelError::InconsistentOutcome {
        phase,
        outcome,
        detail,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Fully populated model used across the crate's unit tests
    pub(crate) fn sample_model() -> MetricsModel {
        let mut producer = ProducerMetrics {
            records_sent: Some(60000),
            achieved_tps: Some(999.7),
            throughput_mb_s: Some(0.98),
            latency_avg_ms: Some(7.9),
            latency_max_ms: Some(307.0),
            latency_percentiles: Vec::new(),
        };
        producer.set_percentile(Percentile::P50, 8.0);
        producer.set_percentile(Percentile::P95, 14.0);
        producer.set_percentile(Percentile::P99, 19.0);
        producer.set_percentile(Percentile::P999, 44.0);

        MetricsModel {
            schema_version: SCHEMA_VERSION,
            run: RunIdentity {
                name: "20260203-150102-orders".to_string(),
                timestamp: Utc.with_ymd_and_hms(2026, 2, 3, 15, 1, 2).unwrap(),
                config: ConfigEcho::new("orders", "localhost:9092", 1000, 1024, 60),
            },
            producer: Some(producer),
            consumer: Some(ConsumerMetrics {
                records_consumed: Some(60000),
                achieved_tps: Some(991.3),
                throughput_mb_s: Some(0.9681),
                data_volume_mb: Some(58.5938),
                window_start_ms: Some(1_770_130_862_575),
                window_end_ms: Some(1_770_130_923_100),
                rebalance_time_ms: Some(3000.0),
                fetch_time_ms: Some(57525.0),
                fetch_mb_s: Some(1.0186),
                fetch_tps: Some(1043.0),
            }),
            extraction: ExtractionSummary {
                status: ExtractionStatus::Complete,
                producer: PhaseOutcome::Complete,
                consumer: PhaseOutcome::Complete,
                issues: Vec::new(),
            },
        }
    }

    #[test]
    fn test_sample_model_is_valid() {
        assert_eq!(sample_model().validate(), Ok(()));
        assert!(sample_model().anomalies().is_empty());
    }

    #[test]
    fn test_set_percentile_keeps_label_order() {
        let mut producer = ProducerMetrics::default();
        producer.set_percentile(Percentile::P999, 44.0);
        producer.set_percentile(Percentile::P50, 8.0);
        producer.set_percentile(Percentile::P95, 14.0);
        producer.set_percentile(Percentile::P50, 9.0);

        let labels: Vec<Percentile> = producer
            .latency_percentiles
            .iter()
            .map(|p| p.percentile)
            .collect();
        assert_eq!(labels, vec![Percentile::P50, Percentile::P95, Percentile::P999]);
        assert_eq!(producer.percentile(Percentile::P50), Some(9.0));
        assert_eq!(producer.percentile(Percentile::P99), None);
    }

    #[test]
    fn test_out_of_order_percentiles_are_flagged_not_invalid() {
        let mut model = sample_model();
        let producer = model.producer.as_mut().unwrap();
        producer.set_percentile(Percentile::P95, 20.0);
        producer.set_percentile(Percentile::P99, 10.0);

        assert_eq!(model.validate(), Ok(()));
        let anomalies = model.anomalies();
        assert_eq!(anomalies.len(), 1);
        match &anomalies[0] {
            Anomaly::InconsistentPercentiles { lower, higher } => {
                assert_eq!(lower.value_ms, 20.0);
                assert_eq!(higher.value_ms, 10.0);
            }
            other => panic!("unexpected anomaly {:?}", other),
        }
    }

    #[test]
    fn test_inverted_window_is_an_anomaly() {
        let mut model = sample_model();
        let consumer = model.consumer.as_mut().unwrap();
        consumer.window_end_ms = Some(1000);
        consumer.window_start_ms = Some(2000);

        assert_eq!(
            model.anomalies(),
            vec![Anomaly::InvertedConsumerWindow {
                start_ms: 2000,
                end_ms: 1000
            }]
        );
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let mut model = sample_model();
        model.producer.as_mut().unwrap().achieved_tps = Some(-1.0);
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidNumber {
                field: Field::ProducerTps,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_consumer_when_disabled() {
        let mut model = sample_model();
        model.run.config.consumer_enabled = false;
        assert_eq!(model.validate(), Err(ModelError::UnexpectedConsumer));
    }

    #[test]
    fn test_validate_rejects_consumer_outcome_against_config() {
        let mut model = sample_model();
        model.consumer = None;
        model.extraction.consumer = PhaseOutcome::Disabled;
        assert_eq!(
            model.validate(),
            Err(ModelError::ConsumerConfigMismatch {
                outcome: PhaseOutcome::Disabled,
                enabled: true
            })
        );

        let mut model = sample_model();
        model.consumer = None;
        model.extraction.consumer = PhaseOutcome::Failed;
        model.extraction.status = ExtractionStatus::Partial;
        model.run.config.consumer_enabled = false;
        assert!(matches!(
            model.validate(),
            Err(ModelError::ConsumerConfigMismatch { enabled: false, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_window() {
        let mut model = sample_model();
        model.consumer.as_mut().unwrap().window_start_ms = Some(i64::MIN);
        assert_eq!(
            model.validate(),
            Err(ModelError::InvalidTimestamp {
                field: Field::WindowStart,
                value: i64::MIN
            })
        );
    }

    #[test]
    fn test_window_duration_does_not_overflow() {
        let consumer = ConsumerMetrics {
            window_start_ms: Some(i64::MIN),
            window_end_ms: Some(i64::MAX),
            ..ConsumerMetrics::default()
        };
        assert_eq!(consumer.window_duration_ms(), None);
        assert_eq!(
            sample_model().consumer.unwrap().window_duration_ms(),
            Some(60_525)
        );
    }

    #[test]
    fn test_validate_rejects_status_mismatch() {
        let mut model = sample_model();
        model.extraction.status = ExtractionStatus::Partial;
        assert!(matches!(
            model.validate(),
            Err(ModelError::InconsistentStatus { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_schema() {
        let mut model = sample_model();
        model.schema_version = 99;
        assert!(matches!(
            model.validate(),
            Err(ModelError::SchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_overall_status() {
        use PhaseOutcome::*;
        assert_eq!(ExtractionSummary::overall(Complete, Disabled), ExtractionStatus::Complete);
        assert_eq!(ExtractionSummary::overall(Complete, Complete), ExtractionStatus::Complete);
        assert_eq!(ExtractionSummary::overall(Complete, Failed), ExtractionStatus::Partial);
        assert_eq!(ExtractionSummary::overall(Partial, Disabled), ExtractionStatus::Partial);
        assert_eq!(ExtractionSummary::overall(Failed, Disabled), ExtractionStatus::Failed);
        assert_eq!(ExtractionSummary::overall(Failed, Failed), ExtractionStatus::Failed);
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let model = sample_model();
        let json = serde_json::to_string_pretty(&model).unwrap();
        let back: MetricsModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert!(json.contains("\"p99.9\""));
    }

    #[test]
    fn test_field_names_are_phase_qualified() {
        for field in Field::PRODUCER {
            assert_eq!(field.phase(), Phase::Producer);
            assert!(field.name().starts_with("producer."));
        }
        for field in Field::CONSUMER {
            assert_eq!(field.phase(), Phase::Consumer);
            assert!(field.name().starts_with("consumer."));
        }
    }
}
