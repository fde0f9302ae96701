use crate::model::{ConfigEcho, ProducerSettings};
use crate::render::HtmlStyle;
use crate::runner::{BenchmarkPlan, ConsumerPlan, TopicPlan};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Kafka Perf Report - run Kafka perf tests and turn their output into reports
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[clap(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Directory holding one subdirectory per run
    #[clap(long, global = true, default_value = crate::defaults::REPORTS_DIR)]
    pub reports_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run producer/consumer perf tests and publish the reports
    Run(RunArgs),
    /// Build a run from raw perf tool output captured elsewhere
    Ingest(IngestArgs),
    /// Regenerate summary.txt and report.html from a stored metrics.json
    Render(RenderArgs),
    /// List published runs
    List(ListArgs),
}

/// What was (or will be) tested; shared by `run` and `ingest`
#[derive(ClapArgs, Debug, Clone)]
pub struct TestArgs {
    /// Topic under test
    #[clap(short = 't', long, help_heading = "Test Options")]
    pub topic: String,

    /// Kafka bootstrap servers
    #[clap(short = 'b', long, default_value = crate::defaults::BOOTSTRAP, help_heading = "Test Options")]
    pub bootstrap: String,

    /// Target producer throughput in records/sec
    #[clap(long, default_value_t = crate::defaults::TARGET_TPS, help_heading = "Test Options")]
    pub tps: u64,

    /// Test duration (e.g. 60s, 5m)
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = crate::defaults::DURATION, help_heading = "Test Options")]
    pub duration: Duration,

    /// Number of records to send (defaults to tps × duration)
    #[clap(short = 'n', long, help_heading = "Test Options")]
    pub num_records: Option<u64>,

    /// Record size in bytes when no payload file is given
    #[clap(short = 's', long, default_value_t = crate::defaults::PAYLOAD_BYTES, help_heading = "Test Options")]
    pub payload_bytes: u64,

    /// JSON document to send as the record payload
    #[clap(long, help_heading = "Test Options")]
    pub payload_file: Option<PathBuf>,

    /// Skip the consumer phase
    #[clap(long, default_value_t = false, help_heading = "Test Options")]
    pub no_consumer: bool,
}

impl TestArgs {
    pub fn num_records(&self) -> u64 {
        self.num_records
            .unwrap_or_else(|| self.tps.saturating_mul(self.duration.as_secs()))
    }
}

/// Producer client settings
#[derive(ClapArgs, Debug, Clone)]
pub struct ProducerArgs {
    #[clap(long, default_value = crate::defaults::ACKS, help_heading = "Producer Options")]
    pub acks: String,

    #[clap(long, default_value = crate::defaults::COMPRESSION, help_heading = "Producer Options")]
    pub compression: String,

    #[clap(long, default_value_t = crate::defaults::LINGER_MS, help_heading = "Producer Options")]
    pub linger_ms: u64,

    #[clap(long, default_value_t = crate::defaults::BATCH_SIZE, help_heading = "Producer Options")]
    pub batch_size: u64,
}

impl From<&ProducerArgs> for ProducerSettings {
    fn from(args: &ProducerArgs) -> Self {
        Self {
            acks: args.acks.clone(),
            compression: args.compression.clone(),
            linger_ms: args.linger_ms,
            batch_size: args.batch_size,
        }
    }
}

/// HTML presentation settings
#[derive(ClapArgs, Debug, Clone)]
pub struct StyleArgs {
    /// Title of the HTML report
    #[clap(long, default_value = crate::defaults::REPORT_TITLE, help_heading = "Report Options")]
    pub title: String,

    /// Stylesheet to link from the HTML report
    #[clap(long, help_heading = "Report Options")]
    pub stylesheet: Option<String>,
}

impl From<&StyleArgs> for HtmlStyle {
    fn from(args: &StyleArgs) -> Self {
        Self {
            title: args.title.clone(),
            stylesheet_href: args.stylesheet.clone(),
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    #[clap(flatten)]
    pub test: TestArgs,

    #[clap(flatten)]
    pub producer: ProducerArgs,

    #[clap(flatten)]
    pub style: StyleArgs,

    /// Producer client.id
    #[clap(long, default_value = crate::defaults::CLIENT_ID, help_heading = "Producer Options")]
    pub client_id: String,

    /// Consumer timeout (e.g. 120s)
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::CONSUMER_TIMEOUT, help_heading = "Consumer Options")]
    pub consumer_timeout: Duration,

    /// Consumer group id
    #[clap(long, default_value = crate::defaults::CONSUMER_GROUP, help_heading = "Consumer Options")]
    pub group: String,

    /// Consumer reporting interval
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::REPORTING_INTERVAL, help_heading = "Consumer Options")]
    pub reporting_interval: Duration,

    /// Start consuming from the latest offset
    #[clap(long, default_value_t = false, help_heading = "Consumer Options")]
    pub from_latest: bool,

    /// Do not create the topic before the producer phase
    #[clap(long, default_value_t = false, help_heading = "Topic Options")]
    pub no_create_topic: bool,

    #[clap(long, default_value_t = crate::defaults::PARTITIONS, help_heading = "Topic Options")]
    pub partitions: u32,

    #[clap(long, default_value_t = crate::defaults::REPLICATION_FACTOR, help_heading = "Topic Options")]
    pub replication_factor: u32,

    /// Container image providing the Kafka CLI tools
    #[clap(long, default_value = crate::defaults::KAFKA_IMAGE, help_heading = "Execution Options")]
    pub image: String,

    /// Upper bound on any single tool invocation
    #[clap(long, value_parser = parse_duration, default_value = crate::defaults::PROCESS_TIMEOUT, help_heading = "Execution Options")]
    pub process_timeout: Duration,
}

impl From<&RunArgs> for ConfigEcho {
    fn from(args: &RunArgs) -> Self {
        ConfigEcho::from(&args.test).with_producer_settings(ProducerSettings::from(&args.producer))
    }
}

impl From<&TestArgs> for ConfigEcho {
    fn from(args: &TestArgs) -> Self {
        ConfigEcho::new(
            args.topic.clone(),
            args.bootstrap.clone(),
            args.tps,
            args.payload_bytes,
            args.duration.as_secs(),
        )
        .with_num_records(args.num_records())
        .with_consumer(!args.no_consumer)
    }
}

impl From<&RunArgs> for BenchmarkPlan {
    fn from(args: &RunArgs) -> Self {
        Self {
            topic: args.test.topic.clone(),
            bootstrap: args.test.bootstrap.clone(),
            target_tps: args.test.tps,
            num_records: args.test.num_records(),
            record_size: args.test.payload_bytes,
            producer: ProducerSettings::from(&args.producer),
            client_id: args.client_id.clone(),
            create_topic: if args.no_create_topic {
                None
            } else {
                Some(TopicPlan {
                    partitions: args.partitions,
                    replication_factor: args.replication_factor,
                })
            },
            consumer: if args.test.no_consumer {
                None
            } else {
                Some(ConsumerPlan {
                    timeout_ms: args.consumer_timeout.as_millis() as u64,
                    group: args.group.clone(),
                    reporting_interval_ms: args.reporting_interval.as_millis() as u64,
                    from_latest: args.from_latest,
                })
            },
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct IngestArgs {
    /// Raw producer perf tool output
    #[clap(long)]
    pub producer_log: PathBuf,

    /// Raw consumer perf tool output (omit when the consumer did not run)
    #[clap(long)]
    pub consumer_log: Option<PathBuf>,

    /// Run name (defaults to <timestamp>-<topic>)
    #[clap(long)]
    pub name: Option<String>,

    #[clap(flatten)]
    pub test: TestArgs,

    #[clap(flatten)]
    pub style: StyleArgs,
}

#[derive(ClapArgs, Debug)]
pub struct RenderArgs {
    /// Run name under the reports directory, or a path to a run directory
    pub run: String,

    /// Print the text summary after rendering
    #[clap(long, default_value_t = false)]
    pub print: bool,

    /// Re-run extraction over the stored raw logs and compare with metrics.json
    #[clap(long, default_value_t = false)]
    pub verify: bool,

    #[clap(flatten)]
    pub style: StyleArgs,
}

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// Emit the listing as JSON
    #[clap(long, default_value_t = false)]
    pub json: bool,
}

/// Parse duration from string (e.g., "10s", "5m", "1h")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs(num as u64),
        "m" => Duration::from_secs((num * 60.0) as u64),
        "h" => Duration::from_secs((num * 3600.0) as u64),
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(duration)
}
