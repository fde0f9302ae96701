//! # Report Renderer
//!
//! Two independent renderers over a [`MetricsModel`]: a fixed-layout plain
//! text summary and a single self-contained HTML document. Both are pure
//! functions of the model (plus static [`HtmlStyle`] for HTML), so the same
//! model always renders to the same bytes and a stored run can be re-rendered
//! without re-running any test.
//!
//! ## Key Rules
//!
//! - Every number goes through [`crate::numeric`], so the two documents agree
//! - Absent values render as `N/A`, absent phases as an explicit "not run"
//! - Anomalies are flagged next to the values they concern, never corrected
//! - A model that fails [`MetricsModel::validate`] is a hard error
//!
//! [`MetricsModel`]: crate::model::MetricsModel
//! [`MetricsModel::validate`]: crate::model::MetricsModel::validate

mod html;
mod text;

pub use html::render_html;
pub use text::render_text;

use crate::model::{ConsumerMetrics, FieldIssue, IssueKind, MetricsModel, ModelError, PhaseOutcome};
use crate::numeric::{human_size_mb, NOT_AVAILABLE};
use chrono::{TimeZone, Utc};
use thiserror::Error;

/// A model that cannot be rendered
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("cannot render metrics model: {0}")]
    InvalidModel(#[from] ModelError),
}

/// Static presentation settings for the HTML report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlStyle {
    /// Document title and page heading
    pub title: String,
    /// Optional single external stylesheet, linked after the inline CSS
    pub stylesheet_href: Option<String>,
}

impl Default for HtmlStyle {
    fn default() -> Self {
        Self {
            title: crate::defaults::REPORT_TITLE.to_string(),
            stylesheet_href: None,
        }
    }
}

/// Validate before rendering; shared by both renderers.
fn checked(model: &MetricsModel) -> Result<&MetricsModel, RenderError> {
    model.validate()?;
    Ok(model)
}

/// Why a phase has no results section
fn absence_reason(outcome: PhaseOutcome) -> &'static str {
    match outcome {
        PhaseOutcome::Disabled => "disabled by configuration",
        PhaseOutcome::Failed => "no usable metrics were reported",
        PhaseOutcome::Complete | PhaseOutcome::Partial => "no metrics recorded",
    }
}

/// Footer wording for a phase outcome
fn outcome_label(outcome: PhaseOutcome) -> String {
    match outcome {
        PhaseOutcome::Complete | PhaseOutcome::Partial => outcome.to_string(),
        PhaseOutcome::Disabled | PhaseOutcome::Failed => {
            format!("not run ({})", absence_reason(outcome))
        }
    }
}

fn missing_list(issues: &[FieldIssue]) -> Vec<String> {
    issues
        .iter()
        .filter(|i| i.kind == IssueKind::Missing)
        .map(|i| i.field.name().to_string())
        .collect()
}

fn unparseable_list(issues: &[FieldIssue]) -> Vec<String> {
    issues
        .iter()
        .filter_map(|i| match &i.kind {
            IssueKind::Unparseable { raw } => Some(format!("{} (\"{}\")", i.field.name(), raw)),
            IssueKind::Missing => None,
        })
        .collect()
}

/// Epoch milliseconds as `YYYY-MM-DD HH:MM:SS.mmm UTC`
fn format_epoch_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{} ms", ms),
    }
}

/// Consumed data volume in the unit that suits its magnitude
fn data_volume(mb: Option<f64>) -> String {
    mb.map(human_size_mb)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn has_fetch_stats(consumer: &ConsumerMetrics) -> bool {
    consumer.fetch_time_ms.is_some()
        || consumer.fetch_mb_s.is_some()
        || consumer.fetch_tps.is_some()
        || consumer.rebalance_time_ms.is_some()
}
