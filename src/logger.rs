use crate::error::BuildWarning;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

const LOG_PREFIX: &str = "lookup-";
const REPORT_PREFIX: &str = "report-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub session_id: String,
    pub timestamp: String,
    pub summary: ReportSummary,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    pub stats: LookupStats,
}

/// What the session loaded and how many queries it answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub dataset: Option<String>,
    pub dataset_sha256: Option<String>,
    pub rows: usize,
    pub skipped_rows: usize,
    pub overlaps: usize,
    pub verses_mapped: usize,
    pub queries: usize,
    pub failures: usize,
}

/// Session logger. Entries go to an optional JSONL file, warnings and
/// errors are always echoed to stderr, info only when verbose.
#[derive(Clone)]
pub struct DiagnosticLogger {
    log_dir: Option<PathBuf>,
    log_file: Arc<Mutex<Option<BufWriter<File>>>>,
    session_id: String,
    verbose: bool,
    entries: Arc<Mutex<Vec<LogEntry>>>,
    error_count: Arc<Mutex<usize>>,
    warning_count: Arc<Mutex<usize>>,
}

impl DiagnosticLogger {
    pub fn new(log_dir: &Path, verbose: bool) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

        let session_id = new_session_id();
        let log_file_path = log_dir.join(format!("{}{}.jsonl", LOG_PREFIX, session_id));

        let log_file = Some(BufWriter::new(
            File::create(&log_file_path)
                .with_context(|| format!("Failed to create log file: {:?}", log_file_path))?,
        ));

        Ok(Self::with_sink(Some(log_dir.to_path_buf()), log_file, session_id, verbose))
    }

    /// Logger without a log directory: stderr echo and in-memory entries only.
    pub fn console_only(verbose: bool) -> Self {
        Self::with_sink(None, None, new_session_id(), verbose)
    }

    fn with_sink(
        log_dir: Option<PathBuf>,
        log_file: Option<BufWriter<File>>,
        session_id: String,
        verbose: bool,
    ) -> Self {
        DiagnosticLogger {
            log_dir,
            log_file: Arc::new(Mutex::new(log_file)),
            session_id,
            verbose,
            entries: Arc::new(Mutex::new(Vec::new())),
            error_count: Arc::new(Mutex::new(0)),
            warning_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn log(&self, level: LogLevel, message: String, context: Option<serde_json::Value>) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            level,
            message,
            context,
        };

        match level {
            LogLevel::Error => {
                bump(&self.error_count);
                eprintln!("Error: {}", entry.message);
            }
            LogLevel::Warning => {
                bump(&self.warning_count);
                eprintln!("Warning: {}", entry.message);
            }
            LogLevel::Info if self.verbose => eprintln!("{}", entry.message),
            LogLevel::Info => {}
        }

        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                if let Ok(json) = serde_json::to_string(&entry) {
                    let _ = writeln!(file, "{}", json);
                }
            }
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    pub fn info(&self, message: String) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warning(&self, message: String, context: Option<serde_json::Value>) {
        self.log(LogLevel::Warning, message, context);
    }

    pub fn error(&self, message: String, context: Option<serde_json::Value>) {
        self.log(LogLevel::Error, message, context);
    }

    /// One warning entry per dataset problem.
    pub fn build_warnings(&self, warnings: &[BuildWarning]) {
        for warning in warnings {
            self.warning(warning.to_string(), Some(warning.context()));
        }
    }

    pub fn generate_report(&self, stats: LookupStats) -> Result<DiagnosticReport> {
        self.flush()?;

        Ok(DiagnosticReport {
            session_id: self.session_id.clone(),
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            summary: ReportSummary {
                errors: count(&self.error_count),
                warnings: count(&self.warning_count),
                stats,
            },
            entries: self
                .entries
                .lock()
                .map(|entries| entries.clone())
                .unwrap_or_default(),
        })
    }

    /// Writes `report-<session>.json` next to the session log. Returns the
    /// path written, or `None` for a console-only logger.
    pub fn write_report(&self, report: &DiagnosticReport) -> Result<Option<PathBuf>> {
        let log_dir = match &self.log_dir {
            Some(dir) => dir,
            None => return Ok(None),
        };

        let path = log_dir.join(format!("{}{}.json", REPORT_PREFIX, report.session_id));
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(Some(path))
    }

    /// Keeps the `max_sessions` most recent session logs and reports.
    pub fn rotate_logs(&self, max_sessions: usize) -> Result<()> {
        let log_dir = match &self.log_dir {
            Some(dir) => dir,
            None => return Ok(()),
        };

        for (prefix, extension) in [(LOG_PREFIX, ".jsonl"), (REPORT_PREFIX, ".json")] {
            let mut session_files: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();

            for entry in WalkDir::new(log_dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if let Some(file_name) = entry.file_name().to_str() {
                    if file_name.starts_with(prefix) && file_name.ends_with(extension) {
                        if let Ok(metadata) = entry.metadata() {
                            if let Ok(modified) = metadata.modified() {
                                let datetime: DateTime<Utc> = modified.into();
                                session_files.push((entry.path().to_path_buf(), datetime));
                            }
                        }
                    }
                }
            }

            if session_files.len() > max_sessions {
                session_files.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

                let to_delete = session_files.len() - max_sessions;
                for (path, _) in session_files.iter().take(to_delete) {
                    fs::remove_file(path)
                        .with_context(|| format!("Failed to delete old log file: {:?}", path))?;
                }
            }
        }

        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    fn flush(&self) -> Result<()> {
        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                file.flush().context("Failed to flush log file")?;
            }
        }
        Ok(())
    }
}

impl Drop for DiagnosticLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn new_session_id() -> String {
    Utc::now().format("%Y%m%d-%H%M%S").to_string()
}

fn bump(counter: &Mutex<usize>) {
    if let Ok(mut value) = counter.lock() {
        *value += 1;
    }
}

fn count(counter: &Mutex<usize>) -> usize {
    counter.lock().map(|value| *value).unwrap_or(0)
}
