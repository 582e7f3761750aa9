//! Ordered asynchronous disk writer
//!
//! Producers push lines into a FIFO and return immediately. A single drain
//! task empties the queue, appending one line at a time, so lines for a file
//! land in exactly the order they were submitted. The `draining` flag lives
//! under the same mutex as the queue and is only cleared by the drain task
//! when it observes the queue empty, so no item is ever left behind and no
//! second drain can start.
//!
//! Inside a tokio runtime the drain runs on the blocking pool; without one it
//! runs on a short-lived `log-writer` thread.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::clock::{Clock, LogZone};
use crate::console::Reporter;
use crate::error::LoggerError;
use crate::format::strip_colors;

use super::retention::RetentionHandle;
use super::{day_filename, LINE_ENDING};

/// A line waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueItem {
    line: String,
    filename: String,
}

#[derive(Debug, Default)]
struct WriterState {
    queue: VecDeque<QueueItem>,
    draining: bool,
    drains_started: u64,
}

struct WriterInner {
    dir: PathBuf,
    zone: LogZone,
    clock: Arc<dyn Clock>,
    state: Mutex<WriterState>,
    idle: Notify,
    idle_blocking: Condvar,
    reporter: Arc<dyn Reporter>,
    retention: Option<RetentionHandle>,
    runtime: Option<Handle>,
}

/// Appends rendered lines to day files in submission order
#[derive(Clone)]
pub struct DiskWriter {
    inner: Arc<WriterInner>,
}

impl DiskWriter {
    /// Create a writer for an existing directory
    ///
    /// With `runtime` set, drains run on its blocking pool; otherwise each
    /// drain gets its own thread.
    pub fn new(
        dir: PathBuf,
        zone: LogZone,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
        retention: Option<RetentionHandle>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            inner: Arc::new(WriterInner {
                dir,
                zone,
                clock,
                state: Mutex::new(WriterState::default()),
                idle: Notify::new(),
                idle_blocking: Condvar::new(),
                reporter,
                retention,
                runtime,
            }),
        }
    }

    /// Directory the day files are written to
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Name of today's file in the configured zone
    pub fn current_filename(&self) -> String {
        day_filename(self.inner.zone.date_of(self.inner.clock.now()))
    }

    /// Queue a line for today's file
    pub fn write(&self, line: &str) {
        self.enqueue(line, self.current_filename());
    }

    /// Queue a line for `filename`
    ///
    /// Colors are stripped here. Never blocks on disk I/O; failures surface
    /// through the reporter.
    pub fn enqueue(&self, line: &str, filename: String) {
        let item = QueueItem {
            line: strip_colors(line),
            filename,
        };

        let mut state = self.inner.lock_state();
        state.queue.push_back(item);
        if state.draining {
            return;
        }
        state.draining = true;
        state.drains_started += 1;
        drop(state);

        self.start_drain();
    }

    fn start_drain(&self) {
        let inner = Arc::clone(&self.inner);
        if let Some(runtime) = &self.inner.runtime {
            runtime.spawn_blocking(move || inner.drain());
            return;
        }

        let spawned = thread::Builder::new().name("log-writer".to_string()).spawn({
            let inner = Arc::clone(&inner);
            move || inner.drain()
        });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not spawn log writer thread, draining inline");
            inner.drain();
        }
    }

    /// Wait until every queued line has been handled
    pub async fn flush(&self) {
        loop {
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Blocking variant of [`flush`](Self::flush) for code outside a runtime
    ///
    /// Must not be called from an async context.
    pub fn flush_blocking(&self) {
        let mut state = self.inner.lock_state();
        while state.draining || !state.queue.is_empty() {
            state = self
                .inner
                .idle_blocking
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Nothing queued and no drain running
    pub fn is_idle(&self) -> bool {
        let state = self.inner.lock_state();
        !state.draining && state.queue.is_empty()
    }

    /// Number of lines waiting to be appended
    pub fn pending(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// How many drain loops have been started so far
    pub fn drains_started(&self) -> u64 {
        self.inner.lock_state().drains_started
    }
}

impl WriterInner {
    fn lock_state(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a failure to the reporter; a panicking reporter must not stop the drain
    fn report(&self, error: LoggerError) {
        if panic::catch_unwind(AssertUnwindSafe(|| self.reporter.error(error))).is_err() {
            tracing::warn!(dir = %self.dir.display(), "log error reporter panicked");
        }
    }

    fn drain(&self) {
        // Last file known to exist; skips the existence check for runs of
        // lines going to the same day file
        let mut known_file: Option<String> = None;

        loop {
            let item = {
                let mut state = self.lock_state();
                match state.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        state.draining = false;
                        drop(state);
                        self.idle.notify_waiters();
                        self.idle_blocking.notify_all();
                        return;
                    }
                }
            };

            let path = self.dir.join(&item.filename);
            let is_new = known_file.as_deref() != Some(item.filename.as_str()) && !path.exists();

            match append_line(&path, &item.line) {
                Ok(()) => {
                    if is_new {
                        if let Some(retention) = &self.retention {
                            retention.notify_new_file(&item.filename);
                        }
                    }
                    known_file = Some(item.filename);
                }
                Err(source) => {
                    known_file = None;
                    self.report(LoggerError::WriteLog {
                        filename: item.filename,
                        source,
                    });
                }
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = String::with_capacity(line.len() + LINE_ENDING.len());
    buf.push_str(line);
    buf.push_str(LINE_ENDING);
    file.write_all(buf.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::console::CollectingReporter;
    use chrono::{TimeZone, Utc};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn writer(dir: &Path, reporter: Arc<dyn Reporter>) -> DiskWriter {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap());
        DiskWriter::new(
            dir.to_path_buf(),
            LogZone::Named(chrono_tz::UTC),
            Arc::new(clock),
            reporter,
            None,
            Some(Handle::current()),
        )
    }

    fn threaded_writer(dir: &Path, reporter: Arc<dyn Reporter>) -> DiskWriter {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap());
        DiskWriter::new(
            dir.to_path_buf(),
            LogZone::Named(chrono_tz::UTC),
            Arc::new(clock),
            reporter,
            None,
            None,
        )
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Parks the drain inside the error callback until released
    struct ParkingReporter {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Reporter for ParkingReporter {
        fn error(&self, _error: LoggerError) {
            if let Ok(entered) = self.entered.lock() {
                let _ = entered.send(());
            }
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
        }

        fn message(&self, _message: &str) {}
    }

    struct PanickingReporter;

    impl Reporter for PanickingReporter {
        fn error(&self, error: LoggerError) {
            panic!("reporter failed on: {}", error);
        }

        fn message(&self, _message: &str) {}
    }

    #[tokio::test]
    async fn test_sequential_writes_keep_order() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let writer = writer(temp_dir.path(), Arc::new(reporter.clone()));

        for i in 0..10_000 {
            writer.write(&format!("line {}", i));
        }
        writer.flush().await;

        let lines = read_lines(&temp_dir.path().join("09-03-2024.log"));
        assert_eq!(lines.len(), 10_000);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line, &format!("line {}", i));
        }
        assert!(reporter.errors().is_empty());
        assert!(writer.is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let writer = writer(temp_dir.path(), Arc::new(reporter.clone()));

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        writer.write(&format!("producer {} item {:04} {}", p, i, "x".repeat(64)));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        writer.flush().await;

        let lines = read_lines(&temp_dir.path().join("09-03-2024.log"));
        assert_eq!(lines.len(), 4_000);
        for p in 0..4 {
            let prefix = format!("producer {} item ", p);
            let own: Vec<&String> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
            assert_eq!(own.len(), 1_000);
            for (i, line) in own.iter().enumerate() {
                assert_eq!(**line, format!("{}{:04} {}", prefix, i, "x".repeat(64)));
            }
        }
        assert!(reporter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_while_draining_does_not_start_second_drain() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("broken.log")).unwrap();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let reporter = ParkingReporter {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let writer = writer(temp_dir.path(), Arc::new(reporter));

        writer.enqueue("lost", "broken.log".to_string());
        entered_rx.recv().unwrap();

        // The drain is parked in the error callback and still owns the queue
        for i in 0..50 {
            writer.enqueue(&format!("{}", i), "ok.log".to_string());
        }
        assert_eq!(writer.drains_started(), 1);
        assert_eq!(writer.pending(), 50);
        assert!(!writer.is_idle());

        release_tx.send(()).unwrap();
        writer.flush().await;

        let lines = read_lines(&temp_dir.path().join("ok.log"));
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(lines, expected);
        assert_eq!(writer.drains_started(), 1);

        writer.enqueue("after", "ok.log".to_string());
        writer.flush().await;
        assert_eq!(writer.drains_started(), 2);
    }

    #[tokio::test]
    async fn test_colors_are_stripped() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let writer = writer(temp_dir.path(), Arc::new(reporter));

        writer.write("\u{1b}[31mERROR\u{1b}[0m hello");
        writer.flush().await;

        let path = temp_dir.path().join("09-03-2024.log");
        let content = std::fs::read(&path).unwrap();
        assert!(!content.contains(&0x1b));
        assert_eq!(read_lines(&path), vec!["ERROR hello"]);
    }

    #[tokio::test]
    async fn test_failed_append_is_reported_and_loop_continues() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let writer = writer(temp_dir.path(), Arc::new(reporter.clone()));

        // A directory with the target name makes the append fail
        std::fs::create_dir(temp_dir.path().join("broken.log")).unwrap();

        writer.enqueue("first", "ok.log".to_string());
        writer.enqueue("lost", "broken.log".to_string());
        writer.enqueue("second", "ok.log".to_string());
        writer.flush().await;

        assert_eq!(
            read_lines(&temp_dir.path().join("ok.log")),
            vec!["first", "second"]
        );
        let errors = reporter.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("could not write log to file \"broken.log\""));
    }

    #[tokio::test]
    async fn test_flush_on_idle_writer_returns() {
        let temp_dir = TempDir::new().unwrap();
        let writer = writer(temp_dir.path(), Arc::new(CollectingReporter::new()));
        writer.flush().await;
        assert_eq!(writer.drains_started(), 0);
        assert_eq!(writer.current_filename(), "09-03-2024.log");
    }

    #[tokio::test]
    async fn test_panicking_reporter_does_not_stop_writer() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("broken.log")).unwrap();
        let writer = writer(temp_dir.path(), Arc::new(PanickingReporter));

        writer.enqueue("lost", "broken.log".to_string());
        writer.enqueue("after", "ok.log".to_string());
        tokio::time::timeout(std::time::Duration::from_secs(5), writer.flush())
            .await
            .unwrap();

        assert!(writer.is_idle());
        assert_eq!(read_lines(&temp_dir.path().join("ok.log")), vec!["after"]);

        writer.enqueue("later", "ok.log".to_string());
        tokio::time::timeout(std::time::Duration::from_secs(5), writer.flush())
            .await
            .unwrap();
        assert_eq!(
            read_lines(&temp_dir.path().join("ok.log")),
            vec!["after", "later"]
        );
    }

    #[test]
    fn test_writes_without_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = CollectingReporter::new();
        let writer = threaded_writer(temp_dir.path(), Arc::new(reporter.clone()));

        for i in 0..1_000 {
            writer.write(&format!("line {}", i));
        }
        writer.flush_blocking();

        let lines = read_lines(&temp_dir.path().join("09-03-2024.log"));
        let expected: Vec<String> = (0..1_000).map(|i| format!("line {}", i)).collect();
        assert_eq!(lines, expected);
        assert!(writer.is_idle());
        assert!(reporter.errors().is_empty());
    }
}
