//! Batch export: many request files, one independent export each, on a
//! bounded worker pool.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use log::{info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use officekit_io_xlsx::{ExportError, SpecCancelToken};

use crate::service::ExportService;
use crate::spec::{EnumDocumentKind, ExportRequest, ServiceError};

/// Request files picked up from the input directory.
const C_REQUEST_GLOB: &str = "*.json";

////////////////////////////////////////////////////////////////////////////////
// #region BatchReport

/// One failed request file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchError {
    pub path: PathBuf,
    pub exception: String,
}

/// Aggregate counters and diagnostics for one batch run.
#[derive(Debug, Default, Clone)]
pub struct ReportBatch {
    /// Request files found.
    pub cnt_scanned: u64,
    /// Documents written.
    pub cnt_exported: u64,
    /// Output bytes written.
    pub cnt_bytes: u64,
    /// Export warnings, prefixed with the request file name.
    pub warnings: Vec<String>,
    /// Per-request failures.
    pub errors: Vec<SpecBatchError>,
}

impl ReportBatch {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_exported".to_string(), self.cnt_exported);
        dict_counts.insert("cnt_bytes".to_string(), self.cnt_bytes);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// One-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} exported={} bytes={} errors={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_exported"],
            dict_counts["cnt_bytes"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BATCH]"))
    }
}

/// Mutable accumulator for batch statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportBatchBuilder {
    pub cnt_scanned: u64,
    pub cnt_exported: u64,
    pub cnt_bytes: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<SpecBatchError>,
}

impl ReportBatchBuilder {
    pub fn add_scanned(&mut self, n: u64) {
        self.cnt_scanned += n;
    }

    pub fn add_exported(&mut self, n_bytes: usize) {
        self.cnt_exported += 1;
        self.cnt_bytes += n_bytes as u64;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecBatchError { path, exception });
    }

    pub fn build(self) -> ReportBatch {
        ReportBatch {
            cnt_scanned: self.cnt_scanned,
            cnt_exported: self.cnt_exported,
            cnt_bytes: self.cnt_bytes,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchExport

#[derive(Debug, Clone)]
struct SpecBatchTask {
    path_file_request: PathBuf,
    path_file_out: PathBuf,
}

/// Outcome of one task: bytes written and export warnings.
type TypeTaskResult = Result<(usize, Vec<String>), String>;

/// Worker count: `num_workers_max` capped by available parallelism, or up to
/// 8 workers when unset.
pub fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

/// Export every `*.json` request in `path_dir_requests` as `kind` into
/// `path_dir_out`, one file per request named after the request file.
///
/// One failing request never affects the others; its error is recorded in
/// the report. Only setup problems (unreadable input dir, uncreatable output
/// dir) fail the whole run.
pub fn export_batch(
    service: &ExportService,
    kind: EnumDocumentKind,
    path_dir_requests: &Path,
    path_dir_out: &Path,
    num_workers_max: Option<usize>,
    cancel: &SpecCancelToken,
) -> Result<ReportBatch, ServiceError> {
    let l_tasks = plan_batch_tasks(kind, path_dir_requests, path_dir_out)?;
    fs::create_dir_all(path_dir_out)
        .map_err(|e| ServiceError::Io(format!("{}: {e}", path_dir_out.display())))?;

    let mut builder = ReportBatchBuilder::default();
    builder.add_scanned(l_tasks.len() as u64);

    let n_workers = calculate_worker_limit(num_workers_max);
    info!(
        "batch export of {} {kind} requests with {n_workers} workers",
        l_tasks.len()
    );

    let run_task = |task: SpecBatchTask| {
        let res = run_batch_task(service, kind, &task, cancel);
        (task.path_file_request, res)
    };

    let thread_pool = ThreadPoolBuilder::new().num_threads(n_workers).build();
    let l_results = match thread_pool {
        Ok(thread_pool) => thread_pool.install(|| {
            l_tasks
                .into_par_iter()
                .map(run_task)
                .collect::<Vec<_>>()
        }),
        Err(_) => {
            builder.add_warning(format!(
                "Failed to initialize thread pool (workers={n_workers}); fallback to serial export."
            ));
            l_tasks.into_iter().map(run_task).collect::<Vec<_>>()
        }
    };
    apply_results(l_results, &mut builder);

    let report = builder.build();
    info!("{report}");
    Ok(report)
}

fn plan_batch_tasks(
    kind: EnumDocumentKind,
    path_dir_requests: &Path,
    path_dir_out: &Path,
) -> Result<Vec<SpecBatchTask>, ServiceError> {
    let matcher = Glob::new(C_REQUEST_GLOB)
        .map_err(|e| ServiceError::Io(e.to_string()))?
        .compile_matcher();
    let iter_entries = fs::read_dir(path_dir_requests)
        .map_err(|e| ServiceError::Io(format!("{}: {e}", path_dir_requests.display())))?;

    let mut l_tasks = Vec::new();
    for entry in iter_entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(c_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !matcher.is_match(c_name) {
            continue;
        }
        let Some(c_stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        l_tasks.push(SpecBatchTask {
            path_file_out: path_dir_out.join(format!("{c_stem}{}", kind.extension())),
            path_file_request: path,
        });
    }
    l_tasks.sort_by(|a, b| a.path_file_request.cmp(&b.path_file_request));
    Ok(l_tasks)
}

fn run_batch_task(
    service: &ExportService,
    kind: EnumDocumentKind,
    task: &SpecBatchTask,
    cancel: &SpecCancelToken,
) -> TypeTaskResult {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled.to_string());
    }
    let text = fs::read_to_string(&task.path_file_request).map_err(|e| e.to_string())?;
    let request: ExportRequest = serde_json::from_str(&text)
        .map_err(|e| ExportError::Validation(format!("malformed request json: {e}")).to_string())?;
    let output = service
        .export_as(kind, &request, cancel)
        .map_err(|e| e.to_string())?;
    fs::write(&task.path_file_out, &output.bytes).map_err(|e| e.to_string())?;
    let l_warnings = output
        .report
        .warnings()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    Ok((output.bytes.len(), l_warnings))
}

fn apply_results(l_results: Vec<(PathBuf, TypeTaskResult)>, builder: &mut ReportBatchBuilder) {
    for (path_file_request, res) in l_results {
        match res {
            Ok((n_bytes, l_warnings)) => {
                builder.add_exported(n_bytes);
                let c_name = path_file_request
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                for c_warning in l_warnings {
                    builder.add_warning(format!("{c_name}: {c_warning}"));
                }
            }
            Err(exception) => {
                warn!("{}: {exception}", path_file_request.display());
                builder.add_error(path_file_request, exception);
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
