//! Rolling Logger
//!
//! A file logger with size-based rotation and a circular buffer of the most
//! recent lines. Installs a global `tracing` subscriber; records emitted through
//! the `log` facade are bridged into it.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

pub use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Default size of a single log file before it is rotated (1 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
/// Default number of rotated files kept next to the active one
pub const DEFAULT_MAX_FILES: usize = 3;
/// Default number of lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

/// Logger settings
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Directory holding the log files (created if missing)
    pub log_dir: PathBuf,
    /// Base name of the log files: `<app_name>.log`, `<app_name>.log.1`, ...
    pub app_name: String,
    pub level: LevelFilter,
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
}

impl LoggerOptions {
    pub fn new(log_dir: impl Into<PathBuf>, app_name: &str) -> Self {
        Self {
            log_dir: log_dir.into(),
            app_name: app_name.to_string(),
            level: LevelFilter::INFO,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

struct RollingState {
    dir: PathBuf,
    base_name: String,
    max_file_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
    recent: VecDeque<String>,
    buffer_lines: usize,
}

impl RollingState {
    fn open(options: &LoggerOptions) -> io::Result<Self> {
        fs::create_dir_all(&options.log_dir)?;
        let path = active_path(&options.log_dir, &options.app_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            dir: options.log_dir.clone(),
            base_name: options.app_name.clone(),
            max_file_bytes: options.max_file_bytes,
            max_files: options.max_files,
            file,
            written,
            recent: VecDeque::with_capacity(options.buffer_lines),
            buffer_lines: options.buffer_lines,
        })
    }

    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = buf.len() as u64;
        if self.written > 0 && self.written + len > self.max_file_bytes {
            self.rotate()?;
        }

        self.file.write_all(buf)?;
        self.written += len;
        self.remember(buf);
        Ok(())
    }

    /// Shift `name.log.N` to `name.log.N+1`, dropping the oldest, then start a
    /// fresh active file.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let active = active_path(&self.dir, &self.base_name);

        if self.max_files > 0 {
            let oldest = self.rotated_path(self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.max_files).rev() {
                let from = self.rotated_path(n);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(n + 1))?;
                }
            }
            fs::rename(&active, self.rotated_path(1))?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&active)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        if self.buffer_lines == 0 {
            return;
        }
        for line in String::from_utf8_lossy(buf).lines() {
            if line.is_empty() {
                continue;
            }
            if self.recent.len() == self.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_string());
        }
    }

    fn rotated_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, n))
    }
}

fn active_path(dir: &Path, base_name: &str) -> PathBuf {
    dir.join(format!("{}.log", base_name))
}

/// Shared handle to the rolling file; one is handed to the subscriber per event
#[derive(Clone)]
pub struct RollingWriter {
    state: Arc<Mutex<RollingState>>,
}

impl RollingWriter {
    fn with_state<T>(&self, f: impl FnOnce(&mut RollingState) -> io::Result<T>) -> io::Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log state poisoned"))?;
        f(&mut state)
    }

    fn recent_lines(&self) -> Vec<String> {
        self.with_state(|state| Ok(state.recent.iter().cloned().collect()))
            .unwrap_or_default()
    }

    fn active_path(&self) -> Option<PathBuf> {
        self.with_state(|state| Ok(active_path(&state.dir, &state.base_name)))
            .ok()
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_state(|state| state.append(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_state(|state| state.file.flush())
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Initialize the global logger with default rotation settings
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    init_logger_with(LoggerOptions::new(log_dir, app_name))
}

/// Initialize the global logger. Fails if a logger is already installed.
pub fn init_logger_with(options: LoggerOptions) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Err("Logger already initialized".to_string());
    }

    let state = RollingState::open(&options)
        .map_err(|e| format!("Failed to open log file in {}: {}", options.log_dir.display(), e))?;
    let mut writer = RollingWriter {
        state: Arc::new(Mutex::new(state)),
    };

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_target(true)
        .with_max_level(options.level)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    let header = format!(
        "=== {} session started {} ===\n",
        options.app_name,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
    );
    writer
        .write_all(header.as_bytes())
        .map_err(|e| format!("Failed to write log header: {}", e))?;

    LOGGER
        .set(writer)
        .map_err(|_| "Logger already initialized".to_string())
}

/// Log an info message through the installed logger
pub fn info(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::info!("{}", message);
    Ok(())
}

/// Log an error message through the installed logger
pub fn error(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::error!("{}", message);
    Ok(())
}

/// Most recent log lines, oldest first. Empty before initialization.
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(RollingWriter::recent_lines).unwrap_or_default()
}

/// Path of the active log file, if the logger is installed
pub fn log_file_path() -> Option<PathBuf> {
    LOGGER.get().and_then(RollingWriter::active_path)
}

fn ensure_initialized() -> Result<(), String> {
    if LOGGER.get().is_none() {
        return Err("Logger not initialized".to_string());
    }
    Ok(())
}
