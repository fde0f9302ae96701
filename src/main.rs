//! # Kafka Perf Report - Main Entry Point
//!
//! Dispatches the four subcommands:
//!
//! - `run`: execute the producer (and optionally consumer) perf tests in a
//!   container, then extract, store and render the results
//! - `ingest`: build a run from perf tool output captured elsewhere
//! - `render`: regenerate `summary.txt` and `report.html` from `metrics.json`
//! - `list`: tabulate published runs
//!
//! ## Error Handling
//!
//! The binary uses `anyhow::Result` throughout. A run whose extraction status
//! is `failed` is still published so the raw logs and reports can be
//! inspected, but the process exits with an error.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use kafka_perf_report::{
    cli::{Args, Commands, IngestArgs, ListArgs, RenderArgs, RunArgs},
    extract,
    model::{ConfigEcho, ExtractionStatus, MetricsModel, RunIdentity},
    numeric::{self, NumericKind},
    payload,
    runner::{self, BenchmarkPlan},
    store::{RunListing, RunRecord, RunStore, REPORT_FILE, SUMMARY_FILE},
    utils, BenchmarkRunner, ConsumerInput, DockerExecutor, HtmlStyle,
};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    kafka_perf_report::logging::init(args.verbose);

    debug!("Configuration: {:?}", args);
    let store = RunStore::new(&args.reports_dir);

    match args.command {
        Commands::Run(ref run) => run_benchmark(&store, run).await,
        Commands::Ingest(ref ingest) => ingest_logs(&store, ingest),
        Commands::Render(ref render) => render_run(&store, render),
        Commands::List(ref list) => list_runs(&store, list),
    }
}

async fn run_benchmark(store: &RunStore, args: &RunArgs) -> Result<()> {
    let mut config = ConfigEcho::from(args);
    let plan = BenchmarkPlan::from(args);

    let prepared = match args.test.payload_file {
        Some(ref path) => {
            let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
            let prepared = payload::load_json_payload(path, &cwd)
                .with_context(|| format!("Invalid payload file {}", path.display()))?;
            info!(
                "Using JSON payload {} ({} bytes minified)",
                path.display(),
                prepared.byte_len
            );
            config = config.with_json_payload(path.display().to_string(), prepared.byte_len);
            Some(prepared)
        }
        None => None,
    };

    let executor = DockerExecutor::new(&args.image, &args.test.bootstrap, args.process_timeout);
    let mut runner = BenchmarkRunner::new(executor, plan, config).with_style(HtmlStyle::from(&args.style));
    if let Some(prepared) = prepared {
        runner = runner.with_payload(prepared);
    }

    let outcome = runner.run(store, Utc::now()).await?;
    report_published(&outcome.record, &outcome.model)
}

fn ingest_logs(store: &RunStore, args: &IngestArgs) -> Result<()> {
    let producer_raw = fs::read_to_string(&args.producer_log)
        .with_context(|| format!("Failed to read {}", args.producer_log.display()))?;
    let consumer_raw = match args.consumer_log {
        Some(ref path) if !args.test.no_consumer => Some(
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        Some(_) => {
            warn!("--no-consumer given; ignoring the consumer log");
            None
        }
        None => None,
    };

    let mut config = ConfigEcho::from(&args.test).with_consumer(consumer_raw.is_some());
    if let Some(ref path) = args.test.payload_file {
        let base = args.producer_log.parent().unwrap_or_else(|| Path::new("."));
        let prepared = payload::load_json_payload(path, base)
            .with_context(|| format!("Invalid payload file {}", path.display()))?;
        config = config.with_json_payload(path.display().to_string(), prepared.byte_len);
    }

    let timestamp = Utc::now();
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| runner::run_name(timestamp, &args.test.topic));
    let identity = RunIdentity {
        name: name.clone(),
        timestamp,
        config,
    };

    let consumer = match consumer_raw {
        Some(ref text) => ConsumerInput::Captured(text),
        None => ConsumerInput::Disabled,
    };
    let model = extract(&producer_raw, consumer, identity);

    let record = store
        .create_run(&name)
        .with_context(|| format!("Failed to create run {}", name))?;
    record
        .write_raw_logs(&producer_raw, consumer_raw.as_deref())
        .context("Failed to store raw logs")?;
    record
        .publish(&model, &HtmlStyle::from(&args.style))
        .context("Failed to publish run")?;

    report_published(&record, &model)
}

fn render_run(store: &RunStore, args: &RenderArgs) -> Result<()> {
    // A run name under the reports root, else a path to a run directory.
    let record = match store.open_run(&args.run) {
        Ok(record) => record,
        Err(_) => RunRecord::open(&args.run)?,
    };

    let model = record
        .rerender(&HtmlStyle::from(&args.style))
        .with_context(|| format!("Failed to re-render {}", record.path().display()))?;

    if args.verify {
        let reextracted = record
            .reextract()
            .with_context(|| format!("Failed to re-extract {}", record.name()))?;
        if reextracted != model {
            bail!(
                "Re-extraction of {} does not match the stored metrics",
                record.name()
            );
        }
        info!("Re-extraction matches stored metrics");
    }

    if args.print {
        let summary = fs::read_to_string(record.artifact(SUMMARY_FILE))
            .context("Failed to read rendered summary")?;
        print!("{}", summary);
    }

    info!("Report: {}", record.artifact(REPORT_FILE).display());
    Ok(())
}

fn list_runs(store: &RunStore, args: &ListArgs) -> Result<()> {
    let runs = store.list_runs()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        info!("No published runs under {}", store.root().display());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = runs.iter().map(listing_row).collect();
    utils::print_table(
        &["Run", "Topic", "Status", "Producer TPS", "Consumer TPS"],
        &rows,
    );
    Ok(())
}

fn listing_row(run: &RunListing) -> Vec<String> {
    vec![
        run.name.clone(),
        run.topic.clone(),
        run.status.to_string(),
        numeric::format_opt(run.producer_tps, NumericKind::Rate),
        numeric::format_opt(run.consumer_tps, NumericKind::Rate),
    ]
}

fn report_published(record: &RunRecord, model: &MetricsModel) -> Result<()> {
    let summary = fs::read_to_string(record.artifact(SUMMARY_FILE))
        .context("Failed to read rendered summary")?;
    print!("{}", summary);

    info!("Summary: {}", record.artifact(SUMMARY_FILE).display());
    info!("Report:  {}", record.artifact(REPORT_FILE).display());

    if model.extraction.status == ExtractionStatus::Failed {
        bail!("No metrics could be extracted for run {}", record.name());
    }
    Ok(())
}
