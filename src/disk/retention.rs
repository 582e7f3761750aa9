//! Age-based retention of day files
//!
//! The manager owns the index of known day files. It is rebuilt by a full
//! directory scan when the manager starts and grows through
//! [`RetentionHandle::notify_new_file`] whenever the writer creates a new day
//! file. A periodic sweep removes every entry whose age reached the limit and
//! archives or deletes the file in the background.
//!
//! Inside a tokio runtime the timer is a task and each expired file is handled
//! on the blocking pool. Without one, a `log-retention` thread runs the timer
//! and handles expired files itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, LogZone};
use crate::console::Reporter;
use crate::error::LoggerError;

use super::archive::{archive_path, compress_file};
use super::parse_day_filename;

/// Default period between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Where and when day files expire
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Directory holding day files
    pub dir: PathBuf,
    /// Directory receiving `.gz` archives
    pub archive_dir: PathBuf,
    /// Age in whole days at which a file expires
    pub max_age: i64,
    /// Archive instead of deleting
    pub archive: bool,
    /// Period between sweeps
    pub interval: Duration,
}

/// A day file known to the retention manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLogFile {
    pub filename: String,
    pub date: NaiveDate,
}

impl TrackedLogFile {
    /// Track a file if its name is a valid day key
    pub fn from_filename(filename: &str) -> Option<Self> {
        parse_day_filename(filename).map(|date| Self {
            filename: filename.to_string(),
            date,
        })
    }

    /// Whole days between the file's date and `today`
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }
}

/// What to do with an expired file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Archive,
    Delete,
}

struct RetentionInner {
    dir: PathBuf,
    archive_dir: PathBuf,
    max_age: i64,
    action: Action,
    zone: LogZone,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
    index: Mutex<Vec<TrackedLogFile>>,
    runtime: Option<Handle>,
}

/// Stop flag shared with the timer thread
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    /// Sleep for `period`; false once stopped
    fn wait(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            stopped = self
                .wake
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        false
    }
}

enum Timer {
    Task(JoinHandle<()>),
    Thread {
        stop: Arc<StopSignal>,
        thread: thread::JoinHandle<()>,
    },
}

impl Timer {
    fn is_finished(&self) -> bool {
        match self {
            Timer::Task(task) => task.is_finished(),
            Timer::Thread { thread, .. } => thread.is_finished(),
        }
    }

    fn stop(self) {
        match self {
            Timer::Task(task) => task.abort(),
            Timer::Thread { stop, thread } => {
                stop.stop();
                let _ = thread.join();
            }
        }
    }
}

/// Background manager deleting or archiving old day files
pub struct RetentionManager {
    inner: Arc<RetentionInner>,
    timer: Mutex<Option<Timer>>,
}

/// Cheap handle the writer uses to announce new files
#[derive(Clone)]
pub struct RetentionHandle {
    inner: Arc<RetentionInner>,
}

impl RetentionHandle {
    /// Start tracking a freshly created day file
    pub fn notify_new_file(&self, filename: &str) {
        self.inner.track(filename);
    }
}

impl RetentionManager {
    /// Scan the log directory and start sweeping every `policy.interval`
    ///
    /// Without a `runtime` the timer runs on its own thread.
    pub fn activate(
        policy: RetentionPolicy,
        zone: LogZone,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
        runtime: Option<Handle>,
    ) -> Self {
        let RetentionPolicy {
            dir,
            archive_dir,
            max_age,
            archive,
            interval,
        } = policy;
        let inner = Arc::new(RetentionInner {
            dir,
            archive_dir,
            max_age,
            action: if archive {
                Action::Archive
            } else {
                Action::Delete
            },
            zone,
            clock,
            reporter,
            index: Mutex::new(Vec::new()),
            runtime,
        });
        inner.rescan();

        tracing::debug!(
            dir = %inner.dir.display(),
            tracked = inner.lock_index().len(),
            max_age,
            "log retention activated"
        );

        let timer = start_timer(&inner, interval);
        Self {
            inner,
            timer: Mutex::new(timer),
        }
    }

    /// Handle for new-file notifications
    pub fn handle(&self) -> RetentionHandle {
        RetentionHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Run one sweep now
    ///
    /// Returns the spawned archive/delete tasks so callers can await them.
    /// Without a runtime the files are handled before this returns and the
    /// list is empty.
    pub fn sweep(&self) -> Vec<JoinHandle<()>> {
        self.inner.sweep()
    }

    /// Rebuild the index from the directory
    pub fn rescan(&self) {
        self.inner.rescan();
    }

    /// Files currently tracked, sorted by date
    pub fn tracked_files(&self) -> Vec<TrackedLogFile> {
        let mut files = self.inner.lock_index().clone();
        files.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.filename.cmp(&b.filename)));
        files
    }

    /// Whether the periodic sweep is still scheduled
    pub fn is_running(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }

    /// Stop the periodic sweep; in-flight archive/delete tasks finish on their own
    pub fn shutdown(&self) {
        let timer = self.lock_timer().take();
        if let Some(timer) = timer {
            timer.stop();
            tracing::debug!(dir = %self.inner.dir.display(), "log retention stopped");
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RetentionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_timer(inner: &Arc<RetentionInner>, interval: Duration) -> Option<Timer> {
    let inner = Arc::clone(inner);
    if let Some(runtime) = inner.runtime.clone() {
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let _ = inner.sweep();
            }
        });
        return Some(Timer::Task(task));
    }

    let stop = Arc::new(StopSignal::default());
    let spawned = thread::Builder::new()
        .name("log-retention".to_string())
        .spawn({
            let stop = Arc::clone(&stop);
            move || {
                while stop.wait(interval) {
                    let _ = inner.sweep();
                }
            }
        });
    match spawned {
        Ok(thread) => Some(Timer::Thread { stop, thread }),
        Err(e) => {
            tracing::warn!(error = %e, "could not spawn log retention thread");
            None
        }
    }
}

impl RetentionInner {
    fn lock_index(&self) -> MutexGuard<'_, Vec<TrackedLogFile>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, filename: &str) {
        let Some(file) = TrackedLogFile::from_filename(filename) else {
            return;
        };
        let mut index = self.lock_index();
        if !index.iter().any(|f| f.filename == file.filename) {
            index.push(file);
        }
    }

    fn rescan(&self) {
        match scan_day_files(&self.dir) {
            Ok(files) => *self.lock_index() = files,
            Err(source) => self.reporter.error(LoggerError::ReadLogDirectory {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    fn sweep(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let today = self.zone.date_of(self.clock.now());

        let expired: Vec<TrackedLogFile> = {
            let mut index = self.lock_index();
            let (expired, kept): (Vec<_>, Vec<_>) = index
                .drain(..)
                .partition(|file| file.age_days(today) >= self.max_age);
            *index = kept;
            expired
        };

        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), action = ?self.action, "expiring log files");
        }

        let Some(runtime) = &self.runtime else {
            for file in expired {
                self.expire(file.filename);
            }
            return Vec::new();
        };

        expired
            .into_iter()
            .map(|file| {
                let inner = Arc::clone(self);
                runtime.spawn_blocking(move || inner.expire(file.filename))
            })
            .collect()
    }

    fn expire(&self, filename: String) {
        match self.action {
            Action::Archive => match self.archive(&filename) {
                Ok(()) => self
                    .reporter
                    .message(&format!("Log file \"{}\" was archived", filename)),
                Err(source) => self
                    .reporter
                    .error(LoggerError::Archive { filename, source }),
            },
            Action::Delete => match fs::remove_file(self.dir.join(&filename)) {
                Ok(()) => self
                    .reporter
                    .message(&format!("Log file \"{}\" was deleted", filename)),
                Err(source) => self.reporter.error(LoggerError::Delete { filename, source }),
            },
        }
    }

    fn archive(&self, filename: &str) -> io::Result<()> {
        fs::create_dir_all(&self.archive_dir)?;

        let source = self.dir.join(filename);
        compress_file(&source, &archive_path(&self.archive_dir, filename))?;

        // Only reached once the archive is complete
        fs::remove_file(&source)
    }
}

/// Day files directly inside `dir`; names that are not day keys are skipped
fn scan_day_files(dir: &Path) -> io::Result<Vec<TrackedLogFile>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(file) = entry
            .file_name()
            .to_str()
            .and_then(TrackedLogFile::from_filename)
        {
            files.push(file);
        }
    }
    Ok(files)
}
