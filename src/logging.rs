//! logging
//!
//! Process-wide logging context.
//!
//! # Design
//!
//! [`init`] installs one `tracing` subscriber for the whole process and is
//! idempotent: the first call wins, later calls return the same
//! [`LogHandle`]. Library code only emits `tracing` events and never touches
//! the subscriber.
//!
//! Two layers:
//! - stderr, filtered by `RUST_LOG` (default `info`, `debug` with `--debug`,
//!   `warn` with `--quiet`)
//! - a log file under the configured directory, named after the time it was
//!   created, starting with a `# Log created at <time>` header
//!
//! The file is append-only. Each event is written under an exclusive lock on
//! a sibling `.lock` file, so several processes sharing one log never
//! interleave partial lines.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use fs2::FileExt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// How the logging context should be set up.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    /// Directory for the log file; no file is written when `None`.
    pub dir: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

/// The installed logging context.
#[derive(Debug)]
pub struct LogHandle {
    file: Option<PathBuf>,
}

impl LogHandle {
    /// Path of this process's log file, if one is being written.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

static HANDLE: OnceLock<LogHandle> = OnceLock::new();

/// Install the process-wide subscriber once and return its handle.
pub fn init(settings: &LogSettings) -> &'static LogHandle {
    HANDLE.get_or_init(|| install(settings))
}

fn install(settings: &LogSettings) -> LogHandle {
    let default_level = if settings.debug {
        "debug"
    } else if settings.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = if settings.debug {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter);

    let file = match settings.dir.as_deref().map(LogFile::create) {
        Some(Ok(file)) => Some(file),
        Some(Err(e)) => {
            eprintln!("warning: cannot create log file: {}", e);
            None
        }
        None => None,
    };
    let path = file.as_ref().map(|f| f.path().to_path_buf());

    let file_level = if settings.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(false)
            .with_filter(file_level)
    });

    // Another subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    LogHandle { file: path }
}

/// An append-only log file shared through an advisory lock.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl LogFile {
    /// Create `<dir>/<timestamp>.log` and write its header.
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let now = Local::now();
        let stem = now.format("%Y-%m-%dT%H-%M-%S-%6f").to_string();
        let file = Self {
            path: dir.join(format!("{}.log", stem)),
            lock_path: dir.join(format!("{}.lock", stem)),
        };
        file.append(format!("# Log created at {}\n", now.format("%Y-%m-%d %H:%M:%S%.3f %:z")).as_bytes())?;
        Ok(file)
    }

    /// Open an existing log file at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `bytes` in one write while holding the exclusive lock.
    pub fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        lock.lock_exclusive()?;

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file: File| file.write_all(bytes));

        FileExt::unlock(&lock)?;
        result
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LockedAppend<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedAppend {
            file: self,
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted event and appends it to the log file on drop.
#[derive(Debug)]
pub struct LockedAppend<'a> {
    file: &'a LogFile,
    buf: Vec<u8>,
}

impl Write for LockedAppend<'_> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LockedAppend<'_> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if let Err(e) = self.file.append(&self.buf) {
            eprintln!(
                "warning: failed to write log file {}: {}",
                self.file.path.display(),
                e
            );
        }
    }
}
