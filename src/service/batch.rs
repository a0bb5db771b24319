//! Batch normalization and validation over incident JSON directories
//!
//! Applies the coercion engine across every `*.json` file in a directory and
//! writes normalized copies, or validates a whole corpus. Files are processed
//! in filename order and independently: a file that fails to decode is logged
//! and skipped without affecting the rest of the batch, and re-running over
//! the same inputs produces byte-for-byte identical outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::model::incident::IncidentRecord;
use crate::service::schema::coercion::{CoercionTally, coerce_payload};
use crate::service::schema::validation::validate_incident;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Incident directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a directory-wide coercion run
#[derive(Debug, Default)]
pub struct ConvertSummary {
    /// Files normalized and written
    pub converted: usize,
    /// Files skipped because they failed to decode
    pub skipped: usize,
    /// Aggregate coercion counts across the corpus
    pub tally: CoercionTally,
}

/// Outcome of a directory-wide validation run
#[derive(Debug, Default)]
pub struct CheckSummary {
    /// Files examined
    pub total: usize,
    /// Invalid files with their error messages, in filename order
    pub invalid: Vec<(PathBuf, Vec<String>)>,
}

impl CheckSummary {
    pub fn valid_count(&self) -> usize {
        self.total - self.invalid.len()
    }

    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Corpus quality metrics over structured incident JSON
#[derive(Debug, Serialize)]
pub struct GateSummary {
    pub total: usize,
    pub has_controls: usize,
    pub has_summary: usize,
    pub has_controls_pct: f64,
    pub has_summary_pct: f64,
}

/// Coerce every `*.json` file in `incident_dir` and write normalized copies
/// to `out_dir`, mirroring filenames
///
/// Input is read as BOM-tolerant UTF-8; output is pretty-printed UTF-8 with
/// non-ASCII preserved. Undecodable files are logged and skipped.
pub fn convert_directory(incident_dir: &Path, out_dir: &Path) -> Result<ConvertSummary, BatchError> {
    if !incident_dir.is_dir() {
        return Err(BatchError::MissingDir(incident_dir.to_path_buf()));
    }
    fs::create_dir_all(out_dir).map_err(|source| BatchError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut summary = ConvertSummary::default();
    for path in json_files(incident_dir) {
        let mut payload = match read_json_lenient(&path) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Skipping undecodable file");
                summary.skipped += 1;
                continue;
            }
        };

        summary.tally.merge(coerce_payload(&mut payload));

        let dst = out_dir.join(path.file_name().unwrap_or_default());
        write_pretty(&dst, &payload)?;
        summary.converted += 1;
    }
    Ok(summary)
}

/// Validate every `*.json` file in `incident_dir` against Schema v2.3
///
/// Files that fail to decode count as invalid with a decode-error message,
/// mirroring what a strict downstream consumer would see.
pub fn check_directory(incident_dir: &Path) -> Result<CheckSummary, BatchError> {
    if !incident_dir.is_dir() {
        return Err(BatchError::MissingDir(incident_dir.to_path_buf()));
    }

    let files = json_files(incident_dir);
    let mut summary = CheckSummary {
        total: files.len(),
        invalid: Vec::new(),
    };

    for path in files {
        match read_json_strict(&path) {
            Ok(payload) => {
                let report = validate_incident(&payload);
                if !report.is_valid {
                    summary.invalid.push((path, report.errors));
                }
            }
            Err(e) => {
                summary
                    .invalid
                    .push((path, vec![format!("JSON decode error: {e}")]));
            }
        }
    }
    Ok(summary)
}

/// Compute corpus quality metrics over every decodable `*.json` file
pub fn quality_gate(incident_dir: &Path) -> Result<GateSummary, BatchError> {
    if !incident_dir.is_dir() {
        return Err(BatchError::MissingDir(incident_dir.to_path_buf()));
    }

    let mut total = 0usize;
    let mut has_controls = 0usize;
    let mut has_summary = 0usize;

    for path in json_files(incident_dir) {
        let payload = match read_json_lenient(&path) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Skipping undecodable file");
                continue;
            }
        };
        total += 1;

        let controls_present = payload
            .pointer("/bowtie/controls")
            .and_then(Value::as_array)
            .is_some_and(|controls| !controls.is_empty());
        if controls_present {
            has_controls += 1;
        }

        let summary_present = payload
            .pointer("/event/summary")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if summary_present {
            has_summary += 1;
        }
    }

    Ok(GateSummary {
        total,
        has_controls,
        has_summary,
        has_controls_pct: percentage(has_controls, total),
        has_summary_pct: percentage(has_summary, total),
    })
}

/// Persist a canonical record as `<incident_id>.json` under `dir`
pub fn write_incident(record: &IncidentRecord, dir: &Path) -> Result<PathBuf, BatchError> {
    fs::create_dir_all(dir).map_err(|source| BatchError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format!("{}.json", record.incident_id));
    let text = serde_json::to_string_pretty(record).map_err(|source| BatchError::Encode {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, text).map_err(|source| BatchError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = count as f64 * 100.0 / total as f64;
    (pct * 10.0).round() / 10.0
}

/// All `*.json` paths in the directory, sorted by filename
fn json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect(),
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to list directory");
            Vec::new()
        }
    };
    files.sort();
    files
}

fn read_json_lenient(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let stripped = text.strip_prefix('\u{feff}').unwrap_or(&text);
    serde_json::from_str(stripped).map_err(|e| e.to_string())
}

fn read_json_strict(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn write_pretty(path: &Path, payload: &Value) -> Result<(), BatchError> {
    let text = serde_json::to_string_pretty(payload).map_err(|source| BatchError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| BatchError::Write {
        path: path.to_path_buf(),
        source,
    })
}
