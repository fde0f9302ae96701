//! JSON payload preparation for the producer phase.
//!
//! The producer perf tool reads `--payload-file` line by line and sends each
//! line as one record, so a pretty-printed document must be collapsed onto a
//! single line first. The minified byte length is what actually goes over the
//! wire and is echoed into the run configuration as the payload size.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name of the minified payload inside a run directory
pub const PAYLOAD_FILE: &str = "payload.json";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read payload file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A payload minified to a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayload {
    pub minified: String,
    /// UTF-8 byte length of `minified`
    pub byte_len: usize,
}

impl PreparedPayload {
    /// Write the minified payload to `path`, returning the path.
    pub fn write_to(&self, path: &Path) -> std::io::Result<PathBuf> {
        fs::write(path, self.minified.as_bytes())?;
        Ok(path.to_path_buf())
    }
}

/// Minify a JSON document.
pub fn prepare_json_payload(raw: &str) -> Result<PreparedPayload, PayloadError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let minified = serde_json::to_string(&value)?;
    let byte_len = minified.len();
    debug!(byte_len, "Minified JSON payload");
    Ok(PreparedPayload { minified, byte_len })
}

/// Read and minify a payload file.
///
/// Relative paths are resolved against `base_dir`.
pub fn load_json_payload(path: &Path, base_dir: &Path) -> Result<PreparedPayload, PayloadError> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    if !resolved.exists() {
        return Err(PayloadError::NotFound(resolved));
    }

    let raw = fs::read_to_string(&resolved).map_err(|source| PayloadError::Read {
        path: resolved.clone(),
        source,
    })?;
    prepare_json_payload(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_minifies_to_single_line() {
        let raw = "{\n  \"items\": [\n    \"a\",\n    \"b\"\n  ],\n  \"order_id\": 42\n}\n";
        let payload = prepare_json_payload(raw).unwrap();

        assert!(!payload.minified.contains('\n'));
        assert!(!payload.minified.contains(' '));
        assert_eq!(payload.byte_len, payload.minified.len());
        assert_eq!(payload.byte_len, r#"{"items":["a","b"],"order_id":42}"#.len());
    }

    #[test]
    fn test_byte_len_counts_utf8_bytes() {
        let payload = prepare_json_payload(r#"{"city": "Zürich"}"#).unwrap();
        assert_eq!(payload.minified, r#"{"city":"Zürich"}"#);
        assert_eq!(payload.byte_len, 18);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            prepare_json_payload("{ not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("order.json"), "{ \"id\": 1 }").unwrap();

        let payload = load_json_payload(Path::new("order.json"), dir.path()).unwrap();
        assert_eq!(payload.minified, r#"{"id":1}"#);

        let written = payload.write_to(&dir.path().join(PAYLOAD_FILE)).unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), r#"{"id":1}"#);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_json_payload(Path::new("absent.json"), dir.path()),
            Err(PayloadError::NotFound(_))
        ));
    }
}
