/// Process-wide logger: env_logger filtering and stderr output, plus an
/// in-memory ring buffer and broadcast channel behind `/api/logs` and
/// `/api/logs/stream`, plus an append-only log file.
use env_logger::{Logger, Target};
use log::{Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, OnceLock};
use tokio::sync::broadcast;

const MAX_LOG_ENTRIES: usize = 2000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
}

struct LogHub {
    entries: Mutex<VecDeque<LogEntry>>,
    tx: broadcast::Sender<LogEntry>,
}

impl LogHub {
    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry.clone());
            while entries.len() > MAX_LOG_ENTRIES {
                entries.pop_front();
            }
        }
        let _ = self.tx.send(entry);
    }

    fn recent_entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

static LOG_HUB: LazyLock<LogHub> = LazyLock::new(|| {
    let (tx, _) = broadcast::channel(512);
    LogHub {
        entries: Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES)),
        tx,
    }
});

struct LogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl LogFile {
    fn new(path: PathBuf) -> Self {
        let file = Self::open(&path).ok();
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append_entry(&self, entry: &LogEntry) {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if guard.is_none() {
            if let Ok(file) = Self::open(&self.path) {
                *guard = Some(file);
            } else {
                return;
            }
        }
        if let Some(file) = guard.as_mut() {
            let line = format_log_line(entry);
            let _ = file.write_all(line.as_bytes());
            let _ = file.write_all(b"\n");
            let _ = file.flush();
        }
    }
}

static LOG_FILE: OnceLock<LogFile> = OnceLock::new();

fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{} [{}] [{}] {}",
        entry.timestamp_ms,
        entry.level.to_uppercase(),
        entry.target,
        entry.message.replace('\n', "\\n")
    )
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

struct BroadcastLogger {
    inner: Logger,
}

impl Log for BroadcastLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.inner.log(record);

        let entry = LogEntry {
            timestamp_ms: now_ms(),
            level: record.level().to_string().to_lowercase(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };

        LOG_HUB.push(entry.clone());
        if let Some(file) = LOG_FILE.get() {
            file.append_entry(&entry);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the logger. `RUST_LOG` controls filtering and defaults to `info`.
/// Entries are also appended to `log_file` when one is given.
pub fn init(log_file: Option<PathBuf>) -> Result<(), SetLoggerError> {
    if let Some(path) = log_file {
        let _ = LOG_FILE.set(LogFile::new(path));
    }
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.target(Target::Stderr);
    let inner = builder.build();
    let max_level = inner.filter();
    let logger = Box::leak(Box::new(BroadcastLogger { inner }));
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn recent_entries() -> Vec<LogEntry> {
    LOG_HUB.recent_entries()
}

pub fn subscribe() -> broadcast::Receiver<LogEntry> {
    LOG_HUB.tx.subscribe()
}

pub fn log_file_path() -> Option<String> {
    LOG_FILE.get().map(|f| f.path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_log_line_escapes_newlines() {
        let entry = LogEntry {
            timestamp_ms: 42,
            level: "warn".to_string(),
            target: "lanes.api.cards".to_string(),
            message: "first\nsecond".to_string(),
        };
        assert_eq!(
            format_log_line(&entry),
            "42 [WARN] [lanes.api.cards] first\\nsecond"
        );
    }

    #[test]
    fn test_hub_is_bounded() {
        let (tx, _) = broadcast::channel(4);
        let hub = LogHub {
            entries: Mutex::new(VecDeque::new()),
            tx,
        };
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            hub.push(LogEntry {
                timestamp_ms: i as u64,
                level: "info".to_string(),
                target: "t".to_string(),
                message: String::new(),
            });
        }
        let entries = hub.recent_entries();
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        assert_eq!(entries[0].timestamp_ms, 10);
    }
}
