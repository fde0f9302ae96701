//! # Run Orchestration
//!
//! Drives one perf-test run end to end: create the run directory, execute the
//! Kafka tools, capture their raw output, extract the metrics model and publish
//! the rendered reports.
//!
//! ## Key Components
//!
//! - **[`PhaseExecutor`]**: "run an external benchmark process and capture its
//!   output". [`DockerExecutor`] runs the Kafka CLI tools inside a container;
//!   tests substitute a scripted executor.
//! - **[`BenchmarkPlan`]**: builds the argument vectors for `kafka-topics`,
//!   `kafka-producer-perf-test` and `kafka-consumer-perf-test`.
//! - **[`BenchmarkRunner`]**: sequences the phases and returns an explicit
//!   [`RunOutcome`] naming the run it produced.
//!
//! Timeouts belong here, at the process boundary. Extraction and rendering
//! are bounded pure computations and never time out.

use crate::extract::{extract, ConsumerInput};
use crate::model::{ConfigEcho, MetricsModel, ProducerSettings, RunIdentity};
use crate::payload::{PreparedPayload, PAYLOAD_FILE};
use crate::render::HtmlStyle;
use crate::store::{RunRecord, RunStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Path the payload file is mounted at inside the container
pub const CONTAINER_PAYLOAD_PATH: &str = "/tmp/payload.json";

/// Output captured from one external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CapturedOutput {
    /// stdout followed by stderr, as stored in the raw log
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// One Kafka CLI invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaCommand {
    pub args: Vec<String>,
    /// Host file that must be visible to the tool as [`CONTAINER_PAYLOAD_PATH`]
    pub payload_file: Option<PathBuf>,
}

impl KafkaCommand {
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Runs an external benchmark process and captures its output as text
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    async fn execute(&self, command: &KafkaCommand) -> Result<CapturedOutput>;
}

/// Executes Kafka CLI tools with `docker run --rm <image>`
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    image: String,
    host_network: bool,
    timeout: Duration,
}

impl DockerExecutor {
    pub fn new(image: impl Into<String>, bootstrap: &str, timeout: Duration) -> Self {
        Self {
            image: image.into(),
            host_network: bootstrap.contains("localhost") || bootstrap.contains("127.0.0.1"),
            timeout,
        }
    }

    /// Full `docker` argument vector for a command
    pub fn docker_args(&self, command: &KafkaCommand) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if self.host_network {
            args.push("--network=host".to_string());
        }
        if let Some(ref payload) = command.payload_file {
            args.push("-v".to_string());
            args.push(format!("{}:{}:ro", payload.display(), CONTAINER_PAYLOAD_PATH));
        }
        args.push(self.image.clone());
        args.extend(command.args.iter().cloned());
        args
    }
}

#[async_trait]
impl PhaseExecutor for DockerExecutor {
    async fn execute(&self, command: &KafkaCommand) -> Result<CapturedOutput> {
        let args = self.docker_args(command);
        debug!("docker {}", args.join(" "));

        let child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to start docker")?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!(
                    "{} did not finish within {:?}",
                    command.program(),
                    self.timeout
                )
            })?
            .with_context(|| format!("Failed to collect output of {}", command.program()))?;

        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

/// Topic creation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPlan {
    pub partitions: u32,
    pub replication_factor: u32,
}

/// Consumer phase settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerPlan {
    pub timeout_ms: u64,
    pub group: String,
    pub reporting_interval_ms: u64,
    pub from_latest: bool,
}

/// Everything needed to build the tool invocations of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkPlan {
    pub topic: String,
    pub bootstrap: String,
    pub target_tps: u64,
    pub num_records: u64,
    pub record_size: u64,
    pub producer: ProducerSettings,
    pub client_id: String,
    pub create_topic: Option<TopicPlan>,
    pub consumer: Option<ConsumerPlan>,
}

impl BenchmarkPlan {
    pub fn create_topic_command(&self) -> Option<KafkaCommand> {
        let topic = self.create_topic.as_ref()?;
        Some(KafkaCommand {
            args: strings(&[
                "kafka-topics",
                "--bootstrap-server",
                &self.bootstrap,
                "--create",
                "--if-not-exists",
                "--topic",
                &self.topic,
                "--partitions",
                &topic.partitions.to_string(),
                "--replication-factor",
                &topic.replication_factor.to_string(),
            ]),
            payload_file: None,
        })
    }

    /// Producer invocation; `payload_file` switches from `--record-size` to `--payload-file`.
    pub fn producer_command(&self, payload_file: Option<PathBuf>) -> KafkaCommand {
        let mut args = strings(&[
            "kafka-producer-perf-test",
            "--topic",
            &self.topic,
            "--num-records",
            &self.num_records.to_string(),
            "--throughput",
            &self.target_tps.to_string(),
            "--producer-props",
        ]);
        args.push(format!("bootstrap.servers={}", self.bootstrap));
        args.push(format!("acks={}", self.producer.acks));
        args.push(format!("compression.type={}", self.producer.compression));
        args.push(format!("linger.ms={}", self.producer.linger_ms));
        args.push(format!("batch.size={}", self.producer.batch_size));
        args.push(format!("client.id={}", self.client_id));
        args.push("--print-metrics".to_string());

        match payload_file {
            Some(_) => {
                args.push("--payload-file".to_string());
                args.push(CONTAINER_PAYLOAD_PATH.to_string());
            }
            None => {
                args.push("--record-size".to_string());
                args.push(self.record_size.to_string());
            }
        }

        KafkaCommand { args, payload_file }
    }

    pub fn consumer_command(&self) -> Option<KafkaCommand> {
        let consumer = self.consumer.as_ref()?;
        let mut args = strings(&[
            "kafka-consumer-perf-test",
            "--topic",
            &self.topic,
            "--messages",
            &self.num_records.to_string(),
            "--timeout",
            &consumer.timeout_ms.to_string(),
            "--group",
            &consumer.group,
            "--reporting-interval",
            &consumer.reporting_interval_ms.to_string(),
            "--bootstrap-server",
            &self.bootstrap,
        ]);
        if consumer.from_latest {
            args.push("--from-latest".to_string());
        }
        Some(KafkaCommand {
            args,
            payload_file: None,
        })
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Directory name for a run: `YYYYMMDD-HHMMSS-<topic>`
pub fn run_name(timestamp: DateTime<Utc>, topic: &str) -> String {
    let topic: String = topic
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}", timestamp.format("%Y%m%d-%H%M%S"), topic)
}

/// The run a [`BenchmarkRunner::run`] call produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub model: MetricsModel,
}

/// Sequences topic creation, producer and consumer phases, then publishes
pub struct BenchmarkRunner<E: PhaseExecutor> {
    executor: E,
    plan: BenchmarkPlan,
    config: ConfigEcho,
    payload: Option<PreparedPayload>,
    style: HtmlStyle,
}

impl<E: PhaseExecutor> BenchmarkRunner<E> {
    /// The echoed consumer state is taken from `plan`, not from `config`.
    pub fn new(executor: E, plan: BenchmarkPlan, config: ConfigEcho) -> Self {
        let config = config.with_consumer(plan.consumer.is_some());
        Self {
            executor,
            plan,
            config,
            payload: None,
            style: HtmlStyle::default(),
        }
    }

    /// Send a minified JSON document instead of fixed-size records.
    pub fn with_payload(mut self, payload: PreparedPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_style(mut self, style: HtmlStyle) -> Self {
        self.style = style;
        self
    }

    pub async fn run(&self, store: &RunStore, timestamp: DateTime<Utc>) -> Result<RunOutcome> {
        let name = run_name(timestamp, &self.plan.topic);
        let record = store
            .create_run(&name)
            .with_context(|| format!("Failed to create run {}", name))?;

        info!(
            "Kafka perf test: topic={} records={} tps={} payload={} bytes",
            self.config.topic,
            self.config.num_records,
            self.config.target_tps,
            self.config.payload_bytes
        );

        if let Some(command) = self.plan.create_topic_command() {
            let output = self.executor.execute(&command).await?;
            if !output.success {
                warn!("Topic creation reported an error: {}", output.stderr.trim());
            }
        }

        let payload_path = match self.payload {
            Some(ref payload) => {
                let path = record.artifact(PAYLOAD_FILE);
                payload
                    .write_to(&path)
                    .with_context(|| format!("Failed to write payload file {}", path.display()))?;
                let absolute = fs::canonicalize(&path).unwrap_or(path);
                Some(absolute)
            }
            None => None,
        };

        info!("[1/2] Running producer perf test...");
        let producer_command = self.plan.producer_command(payload_path.clone());
        let producer_result = self.executor.execute(&producer_command).await;
        if let Some(ref path) = payload_path {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove payload file {}: {}", path.display(), e);
            }
        }
        let producer = producer_result.context("Producer phase failed")?;
        if !producer.success {
            warn!("Producer perf test exited with an error");
        }

        let consumer = match self.plan.consumer_command() {
            Some(command) => {
                info!("[2/2] Running consumer perf test...");
                let output = self
                    .executor
                    .execute(&command)
                    .await
                    .context("Consumer phase failed")?;
                if !output.success {
                    warn!("Consumer perf test exited with an error");
                }
                Some(output)
            }
            None => {
                info!("[2/2] Consumer phase disabled");
                None
            }
        };

        let producer_raw = producer.combined();
        let consumer_raw = consumer.as_ref().map(CapturedOutput::combined);
        record
            .write_raw_logs(&producer_raw, consumer_raw.as_deref())
            .context("Failed to store raw logs")?;

        let identity = RunIdentity {
            name: name.clone(),
            timestamp,
            config: self.config.clone(),
        };
        let consumer_input = match consumer_raw {
            Some(ref text) => ConsumerInput::Captured(text),
            None => ConsumerInput::Disabled,
        };
        let model = extract(&producer_raw, consumer_input, identity);

        record
            .publish(&model, &self.style)
            .with_context(|| format!("Failed to publish run {}", name))?;

        Ok(RunOutcome { record, model })
    }
}
