//! Central log loop.
//!
//! Every session, the listener and startup code push [`LogRecord`]s into
//! one unbounded channel through a cloned [`LogHandle`]. A single consumer
//! on the blocking pool owns the receiving end and the [`LogWriter`], so
//! console output from many concurrent sessions never interleaves
//! mid-line, and console and error-file writes never stall a runtime
//! worker.
//!
//! Ordering: each record gets a sequence number under the same lock that
//! enqueues it, so `seq` order, channel order and render order agree.
//!
//! Shutdown: the consumer runs until every `LogHandle` clone is dropped,
//! then renders whatever is still queued and returns. Stopping the
//! listener does not stop the sink, so sessions that outlive the stop
//! signal keep logging.

use std::fs::OpenOptions;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Severity, which also picks the console color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn color(self) -> Color {
        match self {
            Level::Info => Color::White,
            Level::Success => Color::Green,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

/// One line of console output. Immutable once enqueued.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Enqueue position, starting at 1.
    pub seq: u64,
    pub level: Level,
    pub timestamp: DateTime<Local>,
    pub message: String,
    /// Rendered uncolored after the message, e.g. a remote endpoint.
    pub context: Option<String>,
    /// Long form (error chain) written to the error file only.
    pub detail: Option<String>,
}

impl LogRecord {
    /// `[HH:MM:SS] >> message`
    pub fn headline(&self) -> String {
        format!("[{}] >> {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Where rendered records go.
pub trait LogWriter: Send + 'static {
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()>;
}

/// Colored headline, uncolored context, one line per record.
pub struct ConsoleWriter {
    out: Stdout,
    colored: bool,
}

impl ConsoleWriter {
    pub fn stdout(colored: bool) -> Self {
        ConsoleWriter {
            out: io::stdout(),
            colored,
        }
    }
}

impl LogWriter for ConsoleWriter {
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
        let mut out = self.out.lock();
        if self.colored {
            queue!(
                out,
                SetForegroundColor(record.level.color()),
                Print(record.headline()),
                ResetColor
            )?;
        } else {
            queue!(out, Print(record.headline()))?;
        }
        if let Some(context) = &record.context {
            queue!(out, Print(context))?;
        }
        queue!(out, Print("\n"))?;
        out.flush()
    }
}

/// Keeps every record in memory. Used by tests and embedders that want
/// to inspect output.
#[derive(Debug, Clone, Default)]
pub struct CapturingWriter {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CapturingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogWriter for CapturingWriter {
    fn write_record(&mut self, record: &LogRecord) -> io::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

pub type LogTx = mpsc::UnboundedSender<LogRecord>;
pub type LogRx = mpsc::UnboundedReceiver<LogRecord>;

/// Producer side of the log channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LogHandle {
    inner: Arc<Producer>,
}

#[derive(Debug)]
struct Producer {
    // Next sequence number; the lock also orders the sends.
    next_seq: Mutex<u64>,
    tx: LogTx,
}

impl LogHandle {
    fn new(tx: LogTx) -> Self {
        LogHandle {
            inner: Arc::new(Producer {
                next_seq: Mutex::new(1),
                tx,
            }),
        }
    }

    /// Enqueue a record. Returns its sequence number, or `None` if the
    /// consumer is gone (it panicked).
    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        context: Option<String>,
        detail: Option<String>,
    ) -> Option<u64> {
        let mut next = self
            .inner
            .next_seq
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let seq = *next;
        let record = LogRecord {
            seq,
            level,
            timestamp: Local::now(),
            message: message.into(),
            context,
            detail,
        };
        if self.inner.tx.send(record).is_err() {
            return None;
        }
        *next += 1;
        Some(seq)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message, None, None);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(Level::Success, message, None, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message, None, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message, None, None);
    }

    /// Error line on the console plus `detail` appended to the error file.
    pub fn report_failure(&self, message: impl Into<String>, context: String, detail: String) {
        self.log(Level::Error, message, Some(context), Some(detail));
    }
}

/// Start the consumer on the blocking pool.
///
/// Records at `Level::Error` that carry a `detail` are also appended to
/// `error_file`. Failing to write that file is ignored.
///
/// The task resolves to the number of records it rendered, once every
/// clone of the returned handle has been dropped.
pub fn spawn(writer: Box<dyn LogWriter>, error_file: Option<PathBuf>) -> (LogHandle, JoinHandle<u64>) {
    let (tx, rx): (LogTx, LogRx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || run_log_loop(rx, writer, error_file));
    (LogHandle::new(tx), handle)
}

fn run_log_loop(mut rx: LogRx, mut writer: Box<dyn LogWriter>, error_file: Option<PathBuf>) -> u64 {
    let mut rendered = 0u64;

    // `None` only once the last producer is gone and the queue is empty.
    while let Some(record) = rx.blocking_recv() {
        render(&mut *writer, error_file.as_ref(), &record);
        rendered += 1;
    }

    tracing::debug!(rendered, "log sink drained");
    rendered
}

fn render(writer: &mut dyn LogWriter, error_file: Option<&PathBuf>, record: &LogRecord) {
    if let Err(e) = writer.write_record(record) {
        tracing::warn!("log writer failed: {}", e);
    }

    if record.level != Level::Error {
        return;
    }
    if let (Some(path), Some(detail)) = (error_file, &record.detail) {
        if let Err(e) = append_error(path, record, detail) {
            tracing::debug!("could not append to {}: {}", path.display(), e);
        }
    }
}

fn append_error(path: &PathBuf, record: &LogRecord, detail: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let context = record.context.as_deref().unwrap_or("");
    write!(file, "{}{} \n{}\n", record.headline(), context, detail)
}
