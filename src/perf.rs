//! Startup and interaction timing events.
//!
//! Each event is one JSON object (`name`, `ms` since process start, plus flat
//! metadata). Events go to the debug log and, when `MDREADER_PERF_FILE` is
//! set, are appended to that file.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

pub const PERF_FILE_ENV: &str = "MDREADER_PERF_FILE";

/// A metadata value. Only flat strings, numbers and booleans are allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PerfValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl From<&str> for PerfValue {
    fn from(value: &str) -> Self {
        PerfValue::Text(value.to_string())
    }
}

impl From<String> for PerfValue {
    fn from(value: String) -> Self {
        PerfValue::Text(value)
    }
}

impl From<f64> for PerfValue {
    fn from(value: f64) -> Self {
        PerfValue::Number(value)
    }
}

impl From<usize> for PerfValue {
    fn from(value: usize) -> Self {
        PerfValue::Number(value as f64)
    }
}

impl From<u64> for PerfValue {
    fn from(value: u64) -> Self {
        PerfValue::Number(value as f64)
    }
}

impl From<bool> for PerfValue {
    fn from(value: bool) -> Self {
        PerfValue::Flag(value)
    }
}

pub type PerfMeta = BTreeMap<String, PerfValue>;

/// Build metadata from `(key, value)` pairs.
pub fn perf_meta<I, K, V>(pairs: I) -> PerfMeta
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<PerfValue>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[derive(Serialize)]
struct PerfRecord<'a> {
    name: &'a str,
    ms: u64,
    #[serde(flatten)]
    meta: &'a PerfMeta,
}

#[derive(Debug)]
pub struct PerfLog {
    origin: Instant,
    file: Option<PathBuf>,
}

impl PerfLog {
    pub fn new(origin: Instant, file: Option<PathBuf>) -> Self {
        Self { origin, file }
    }

    /// Uses `MDREADER_PERF_FILE` for the output file when set.
    pub fn from_env(origin: Instant) -> Self {
        let file = std::env::var_os(PERF_FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .map(|path| match std::env::current_dir() {
                Ok(cwd) if path.is_relative() => cwd.join(path),
                _ => path,
            });
        Self::new(origin, file)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u64::MAX as u128) as u64
    }

    /// Record an event and return the JSON line that was written.
    pub fn record(&self, name: &str, meta: &PerfMeta) -> String {
        let record = PerfRecord {
            name,
            ms: self.elapsed_ms(),
            meta,
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                log::debug!("perf event {name} not serializable: {err}");
                return String::new();
            }
        };
        log::debug!("[perf] {line}");
        if let Some(path) = &self.file {
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| writeln!(file, "{line}"));
            if let Err(err) = written {
                log::debug!("perf file {} not writable: {err}", path.display());
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_flattens_meta() {
        let log = PerfLog::new(Instant::now(), None);
        let line = log.record(
            "file-loaded",
            &perf_meta([
                ("bytes", PerfValue::from(42usize)),
                ("cached", PerfValue::from(false)),
                ("path", PerfValue::from("a.md")),
            ]),
        );
        let value: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["name"], "file-loaded");
        assert!(value["ms"].is_u64());
        assert_eq!(value["bytes"], 42.0);
        assert_eq!(value["cached"], false);
        assert_eq!(value["path"], "a.md");
    }

    #[test]
    fn test_record_appends_to_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("perf.jsonl");
        let log = PerfLog::new(Instant::now(), Some(path.clone()));
        log.record("one", &PerfMeta::new());
        log.record("two", &PerfMeta::new());

        let contents = std::fs::read_to_string(&path).expect("perf file");
        let names: Vec<String> = contents
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).expect("json line");
                value["name"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_unwritable_file_is_ignored() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("missing-dir").join("perf.jsonl");
        let log = PerfLog::new(Instant::now(), Some(path.clone()));
        let line = log.record("still-logged", &PerfMeta::new());
        assert!(line.contains("still-logged"));
        assert!(!path.exists());
    }
}
