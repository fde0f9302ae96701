//! # Kafka Perf Report Library
//!
//! Turns the console output of Kafka's producer and consumer perf tools into a
//! validated metrics model, and renders that model as a plain-text summary and
//! a self-contained HTML report.
//!
//! ## Pipeline
//!
//! Every run goes through the same stages:
//!
//! 1. **Execution** (`runner`): create the topic, run the producer perf test and
//!    optionally the consumer perf test inside a container, capturing output
//! 2. **Extraction** (`extract`): scan the captured output for labelled values
//!    and build a `MetricsModel`, recording which fields were missing
//! 3. **Publication** (`store`): write `metrics.json`, `summary.txt` and
//!    `report.html` into a per-run directory
//!
//! Rendering only ever reads the stored model, so `summary.txt` and
//! `report.html` can be regenerated from `metrics.json` without the raw logs.
//!
//! ## Architecture Overview
//!
//! - `cli`: Command-line interface parsing and configuration management
//! - `extract`: Log scanning and metrics model construction
//! - `model`: The metrics model, its invariants and its JSON form
//! - `numeric`: Number parsing and the single formatting rule for reports
//! - `payload`: JSON payload validation and minification
//! - `render`: Text and HTML renderers
//! - `runner`: Perf tool invocation and phase sequencing
//! - `store`: Run directories and atomic artifact writes
//!
//! ## Usage Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use kafka_perf_report::model::{ConfigEcho, RunIdentity};
//! use kafka_perf_report::{extract, render_text, ConsumerInput};
//!
//! let producer = "60000 records sent, 999.7 records/sec (0.98 MB/sec), \
//!     7.90 ms avg latency, 307.00 ms max latency, \
//!     8 ms 50th, 14 ms 95th, 19 ms 99th, 44 ms 99.9th.";
//! let identity = RunIdentity {
//!     name: "20260203-150102-orders".to_string(),
//!     timestamp: Utc.with_ymd_and_hms(2026, 2, 3, 15, 1, 2).unwrap(),
//!     config: ConfigEcho::new("orders", "localhost:9092", 1000, 1024, 60).with_consumer(false),
//! };
//!
//! let model = extract(producer, ConsumerInput::Disabled, identity);
//! let summary = render_text(&model).unwrap();
//! assert!(summary.contains("999.70"));
//! ```

/// Command-line interface and configuration
///
/// Provides argument parsing using clap and converts user-friendly CLI options
/// into the configuration echo and execution plan. Includes:
/// - Duration parsing with human-readable formats (e.g., "60s", "5m")
/// - Shared test, producer and report option groups across subcommands
pub mod cli;

/// Metric extraction from raw perf tool output
///
/// Scans producer and consumer console output for labelled values, tolerates
/// interleaved noise and reordering, and reports which required fields were
/// missing or unparseable.
pub mod extract;

pub mod logging;

/// The metrics model shared by extraction, storage and rendering
pub mod model;

pub mod numeric;

pub mod payload;

/// Text and HTML report rendering
///
/// Both renderers are pure functions of the model and never mutate it.
pub mod render;

/// Perf tool execution
///
/// Builds the Kafka CLI invocations for each phase and runs them through a
/// `PhaseExecutor`, by default `docker run` against a Kafka tools image.
pub mod runner;

/// Run directories and persisted artifacts
pub mod store;

pub mod utils;

// Re-export key types for convenient library usage

pub use cli::Args;
pub use extract::{extract, ConsumerInput};
pub use model::MetricsModel;
pub use render::{render_html, render_text, HtmlStyle};
pub use runner::{BenchmarkRunner, DockerExecutor, PhaseExecutor};
pub use store::{RunRecord, RunStore};

/// The current version of the report tool
///
/// Populated from Cargo.toml and shown in the HTML report footer.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Defaults for every configurable parameter. Duration defaults are strings so
/// they pass through the same parser as user input.
pub mod defaults {
    /// Directory that holds one subdirectory per run
    pub const REPORTS_DIR: &str = "reports";

    /// Kafka bootstrap servers
    pub const BOOTSTRAP: &str = "localhost:9092";

    /// Target producer throughput in records/sec
    pub const TARGET_TPS: u64 = 1000;

    /// Test duration
    ///
    /// Together with `TARGET_TPS` this yields 60,000 records when no explicit
    /// record count is given.
    pub const DURATION: &str = "60s";

    /// Record size in bytes for fixed-size payloads
    pub const PAYLOAD_BYTES: u64 = 1024;

    pub const ACKS: &str = "all";
    pub const COMPRESSION: &str = "none";
    pub const LINGER_MS: u64 = 5;
    pub const BATCH_SIZE: u64 = 16384;

    /// Title of the HTML report
    pub const REPORT_TITLE: &str = "Kafka Performance Report";

    /// Producer `client.id`
    pub const CLIENT_ID: &str = "perf-cli";

    /// How long the consumer waits for records before giving up
    ///
    /// Generous enough that a consumer started after a long producer phase
    /// still drains the whole topic.
    pub const CONSUMER_TIMEOUT: &str = "120s";

    pub const CONSUMER_GROUP: &str = "perf-cli-group";
    pub const REPORTING_INTERVAL: &str = "5s";

    /// Partitions for a newly created topic
    pub const PARTITIONS: u32 = 3;

    /// Replication factor for a newly created topic
    ///
    /// 1 matches a single-broker development cluster.
    pub const REPLICATION_FACTOR: u32 = 1;

    /// Container image providing `kafka-producer-perf-test` and friends
    pub const KAFKA_IMAGE: &str = "confluentinc/cp-kafka:7.6.0";

    /// Upper bound on any single tool invocation
    pub const PROCESS_TIMEOUT: &str = "15m";
}
