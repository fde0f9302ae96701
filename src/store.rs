//! # Run Record Store
//!
//! On-disk contract for test runs. Every run is one directory under the
//! reports root, created exactly once, holding a fixed set of artifacts:
//!
//! | File | Contents |
//! |---|---|
//! | `producer.out` | raw producer tool output |
//! | `consumer.out` | raw consumer tool output (only when the phase ran) |
//! | `metrics.json` | the serialized [`MetricsModel`] |
//! | `summary.txt` | rendered text summary |
//! | `report.html` | rendered HTML report |
//!
//! ## Publication
//!
//! `metrics.json` is written last and marks the run as published. After that
//! the directory only ever changes through [`RunRecord::rerender`], which
//! rewrites the rendered documents with byte-identical content. Every artifact
//! is written to a temporary file and renamed into place, so a concurrent
//! reader sees either the old file or the new one, never a partial write.

use crate::extract::{extract, ConsumerInput};
use crate::model::{ExtractionStatus, MetricsModel};
use crate::render::{render_html, render_text, HtmlStyle, RenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const PRODUCER_LOG: &str = "producer.out";
pub const CONSUMER_LOG: &str = "consumer.out";
pub const METRICS_FILE: &str = "metrics.json";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const REPORT_FILE: &str = "report.html";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid run name {0:?}: must be a single path component")]
    InvalidRunName(String),
    #[error("run directory already exists: {0}")]
    RunExists(PathBuf),
    #[error("run directory not found: {0}")]
    RunNotFound(PathBuf),
    #[error("run is already published: {0}")]
    AlreadyPublished(PathBuf),
    #[error("missing artifact: {0}")]
    MissingArtifact(PathBuf),
    #[error("corrupt metrics model {path}: {reason}")]
    CorruptModel { path: PathBuf, reason: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to serialize metrics model: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Raw tool output captured for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogs {
    pub producer: String,
    pub consumer: Option<String>,
}

/// One row of the run listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListing {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub status: ExtractionStatus,
    pub producer_tps: Option<f64>,
    pub consumer_tps: Option<f64>,
}

impl RunListing {
    fn from_model(model: &MetricsModel) -> Self {
        Self {
            name: model.run.name.clone(),
            timestamp: model.run.timestamp,
            topic: model.run.config.topic.clone(),
            status: model.extraction.status,
            producer_tps: model.producer.as_ref().and_then(|p| p.achieved_tps),
            consumer_tps: model.consumer.as_ref().and_then(|c| c.achieved_tps),
        }
    }
}

/// Root directory holding one subdirectory per run
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new run directory. Fails if `name` already exists.
    pub fn create_run(&self, name: &str) -> Result<RunRecord, StoreError> {
        check_run_name(name)?;
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let dir = self.root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::RunExists(dir));
            }
            Err(e) => return Err(io_error(&dir)(e)),
        }

        info!("Created run directory {}", dir.display());
        Ok(RunRecord {
            dir,
            name: name.to_string(),
        })
    }

    pub fn open_run(&self, name: &str) -> Result<RunRecord, StoreError> {
        check_run_name(name)?;
        RunRecord::open(self.root.join(name))
    }

    /// Published runs, sorted by name. Unreadable runs are skipped with a warning.
    pub fn list_runs(&self) -> Result<Vec<RunListing>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut listings = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error(&self.root))? {
            let entry = entry.map_err(io_error(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }

            let record = RunRecord::open(entry.path())?;
            if !record.is_published() {
                debug!("Skipping unpublished run {}", record.name());
                continue;
            }
            match record.load_model() {
                Ok(model) => listings.push(RunListing::from_model(&model)),
                Err(e) => warn!("Skipping run {}: {}", record.name(), e),
            }
        }

        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }
}

/// Handle to one run directory
#[derive(Debug, Clone)]
pub struct RunRecord {
    dir: PathBuf,
    name: String,
}

impl RunRecord {
    /// Open an existing run directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::RunNotFound(dir));
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { dir, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn artifact(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn is_published(&self) -> bool {
        self.artifact(METRICS_FILE).exists()
    }

    /// Store the raw tool output. `consumer` is `None` when the phase did not run.
    pub fn write_raw_logs(&self, producer: &str, consumer: Option<&str>) -> Result<(), StoreError> {
        self.ensure_unpublished()?;
        write_atomic(&self.artifact(PRODUCER_LOG), producer.as_bytes())?;
        if let Some(consumer) = consumer {
            write_atomic(&self.artifact(CONSUMER_LOG), consumer.as_bytes())?;
        }
        Ok(())
    }

    pub fn read_raw_logs(&self) -> Result<RawLogs, StoreError> {
        let producer = read_artifact(&self.artifact(PRODUCER_LOG))?;
        let consumer_path = self.artifact(CONSUMER_LOG);
        let consumer = if consumer_path.exists() {
            Some(read_artifact(&consumer_path)?)
        } else {
            None
        };
        Ok(RawLogs { producer, consumer })
    }

    /// Persist the model and both rendered documents.
    ///
    /// Both documents are rendered before anything is written, so a model that
    /// cannot be rendered leaves the directory unpublished.
    pub fn publish(&self, model: &MetricsModel, style: &HtmlStyle) -> Result<(), StoreError> {
        self.ensure_unpublished()?;

        let text = render_text(model)?;
        let html = render_html(model, style)?;
        let json = serde_json::to_string_pretty(model)?;

        write_atomic(&self.artifact(SUMMARY_FILE), text.as_bytes())?;
        write_atomic(&self.artifact(REPORT_FILE), html.as_bytes())?;
        write_atomic(&self.artifact(METRICS_FILE), json.as_bytes())?;

        info!(
            run = %self.name,
            status = %model.extraction.status,
            "Published run to {}",
            self.dir.display()
        );
        Ok(())
    }

    /// Load and validate the stored model.
    pub fn load_model(&self) -> Result<MetricsModel, StoreError> {
        let path = self.artifact(METRICS_FILE);
        let json = read_artifact(&path)?;

        let model: MetricsModel =
            serde_json::from_str(&json).map_err(|e| StoreError::CorruptModel {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        model.validate().map_err(|e| StoreError::CorruptModel {
            path,
            reason: e.to_string(),
        })?;
        Ok(model)
    }

    /// Regenerate `summary.txt` and `report.html` from `metrics.json` alone.
    pub fn rerender(&self, style: &HtmlStyle) -> Result<MetricsModel, StoreError> {
        let model = self.load_model()?;
        let text = render_text(&model)?;
        let html = render_html(&model, style)?;

        write_atomic(&self.artifact(SUMMARY_FILE), text.as_bytes())?;
        write_atomic(&self.artifact(REPORT_FILE), html.as_bytes())?;

        info!("Re-rendered reports for {}", self.name);
        Ok(model)
    }

    /// Run the extractor again over the stored raw logs with the stored identity.
    pub fn reextract(&self) -> Result<MetricsModel, StoreError> {
        let stored = self.load_model()?;
        let logs = self.read_raw_logs()?;

        let consumer = if stored.run.config.consumer_enabled {
            ConsumerInput::Captured(logs.consumer.as_deref().unwrap_or(""))
        } else {
            ConsumerInput::Disabled
        };
        Ok(extract(&logs.producer, consumer, stored.run))
    }

    fn ensure_unpublished(&self) -> Result<(), StoreError> {
        if self.is_published() {
            return Err(StoreError::AlreadyPublished(self.dir.clone()));
        }
        Ok(())
    }
}

/// Run names stay inside the reports root.
fn check_run_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if invalid {
        return Err(StoreError::InvalidRunName(name.to_string()));
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Result<String, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StoreError::MissingArtifact(path.to_path_buf()))
        }
        Err(e) => Err(io_error(path)(e)),
    }
}

/// Write through a uniquely named temp file in the same directory, then rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    fs::write(&tmp, contents).map_err(io_error(&tmp))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_error(path)(e));
    }
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
