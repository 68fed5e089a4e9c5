//! Synthesis history and reporting.
//!
//! Stores one record per speak call in JSONL files at <dir>/{date}.jsonl.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRecord {
    pub timestamp: String,
    /// "speak", "speak_as" or "speak_mixed".
    pub mode: String,
    pub input_text_chars: usize,
    pub runs: usize,
    pub backends: Vec<String>,
    pub output: Option<String>,
    pub latency_ms: i64,
    pub error: Option<String>,
}

pub struct History {
    dir: Option<PathBuf>,
}

impl History {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    fn file(dir: &Path, date: &str) -> PathBuf {
        dir.join(format!("{date}.jsonl"))
    }

    pub fn save(&self, record: &SynthesisRecord) {
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Failed to create history dir: {e}");
            return;
        }

        let date = Local::now().format("%Y-%m-%d").to_string();
        let path = Self::file(dir, &date);

        let mut file = match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open history file: {e}");
                return;
            }
        };

        match serde_json::to_string(record) {
            Ok(line) => {
                if let Err(e) = writeln!(file, "{line}") {
                    warn!("Failed to write history record: {e}");
                }
            }
            Err(e) => warn!("Failed to serialize history record: {e}"),
        }
    }

    pub fn load(&self, date: &str) -> Vec<SynthesisRecord> {
        let Some(dir) = &self.dir else {
            return Vec::new();
        };
        let contents = match fs::read_to_string(Self::file(dir, date)) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn report(&self, date: &str) -> String {
        let records = self.load(date);
        if records.is_empty() {
            return format!("No synthesis records for {date}.");
        }

        let total = records.len();
        let failed = records.iter().filter(|r| r.error.is_some()).count();
        let avg_latency: f64 =
            records.iter().map(|r| r.latency_ms as f64).sum::<f64>() / total as f64;

        let mut backend_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for backend in records.iter().flat_map(|r| r.backends.iter()) {
            *backend_counts.entry(backend.as_str()).or_insert(0) += 1;
        }

        let mut report = format!(
            "# Synthesis Report for {date}\n\n\
            - Total calls: {total}\n\
            - Failed: {failed}\n\
            - Avg latency: {avg_latency:.0}ms\n\n\
            ## Backends\n"
        );

        for (backend, count) in &backend_counts {
            report.push_str(&format!("- {backend}: {count}\n"));
        }

        report
    }
}

pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
