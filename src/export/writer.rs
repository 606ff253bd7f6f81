//! Durable JSON persistence for run artifacts

use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::bundle::TrainedModelBundle;
use super::metrics::MetricsRecord;

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Writes the model bundle and metrics record into an artifacts directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    artifacts_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join(MODEL_FILE)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.artifacts_dir.join(METRICS_FILE)
    }

    /// Write the bundle and metrics of one run as a pair.
    ///
    /// Both files are staged before either is renamed into place. If the
    /// metrics cannot be committed the fresh bundle is removed, so a failed
    /// run never leaves a new `model.json` beside stale metrics.
    pub fn write_run(
        &self,
        bundle: &TrainedModelBundle,
        record: &MetricsRecord,
    ) -> Result<(PathBuf, PathBuf)> {
        let model_path = self.model_path();
        let metrics_path = self.metrics_path();

        let model_tmp = stage_json(&model_path, bundle)?;
        let metrics_tmp = match stage_json(&metrics_path, record) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&model_tmp);
                return Err(e);
            }
        };

        if let Err(e) = commit(&model_tmp, &model_path) {
            let _ = fs::remove_file(&metrics_tmp);
            return Err(e);
        }
        if let Err(e) = commit(&metrics_tmp, &metrics_path) {
            warn!(path = %model_path.display(), "metrics not written; removing model bundle");
            let _ = fs::remove_file(&model_path);
            return Err(e);
        }

        info!(
            model = %model_path.display(),
            metrics = %metrics_path.display(),
            kind = bundle.model_name(),
            "run artifacts written"
        );
        Ok((model_path, metrics_path))
    }
}

/// Pretty-print `value` to a sibling temp file, then rename it over `path`.
///
/// Parent directories are created as needed. A failure leaves `path` untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = stage_json(path, value)?;
    commit(&tmp_path, path)
}

/// Serialize `value` into the temp sibling of `path` and return the temp path
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ForecastError::write(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ForecastError::ConfigError(format!("not a file path: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    match write_json(&tmp_path, value) {
        Ok(()) => Ok(tmp_path),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Rename a staged file over `path`; the temp file is removed on failure
fn commit(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        ForecastError::write(path, e)
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| ForecastError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(|e| ForecastError::write(path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| ForecastError::write(path, e.into_error()))?;
    file.sync_all().map_err(|e| ForecastError::write(path, e))?;
    Ok(())
}
