//! Asynchronous collection of terminated background children.
//!
//! The launcher hands every background [`Child`] to a dedicated reaper thread,
//! which owns the wait-for-termination responsibility from then on. The thread
//! is woken either by new handles arriving on its channel or by `SIGCHLD`
//! latched into an atomic flag, and each wakeup performs a single non-blocking
//! drain over everything it holds: `try_wait` each pending child, and append a
//! termination record for each one that has exited. The main loop is never
//! blocked by any of this.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long the reaper sleeps waiting for new handles before re-checking the
/// termination flag. Short enough that records appear promptly even if a
/// signal is missed.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default location of the termination log: `$HOME/.minishell_log`, falling
/// back to the system temp directory when `HOME` is unset.
pub fn default_log_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join(".minishell_log"),
        _ => std::env::temp_dir().join("minishell_log"),
    }
}

/// Handle to the reaper thread.
///
/// Dropping the `Reaper` closes the channel; the thread performs one final
/// non-blocking drain and exits without waiting on still-running children
/// (background commands are fire-and-forget).
pub struct Reaper {
    tx: Option<Sender<Child>>,
    thread: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Start the reaper thread, appending termination records to `log_path`.
    pub fn spawn(log_path: PathBuf) -> Result<Self> {
        let sigchld = Arc::new(AtomicBool::new(false));
        #[cfg(unix)]
        signal_hook::flag::register(signal_hook::consts::SIGCHLD, Arc::clone(&sigchld))?;

        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("reaper".to_string())
            .spawn(move || run(rx, sigchld, log_path))?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Transfer ownership of a background child to the reaper.
    pub fn adopt(&self, child: Child) {
        let pid = child.id();
        if let Some(tx) = &self.tx
            && tx.send(child).is_err()
        {
            tracing::warn!(pid, "reaper thread gone; termination will not be recorded");
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(rx: Receiver<Child>, sigchld: Arc<AtomicBool>, log_path: PathBuf) {
    let mut pending: Vec<Child> = Vec::new();
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(child) => {
                pending.push(child);
                while let Ok(more) = rx.try_recv() {
                    pending.push(more);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                reap_terminated(&mut pending, &log_path);
                return;
            }
        }

        if sigchld.swap(false, Ordering::Relaxed) || !pending.is_empty() {
            reap_terminated(&mut pending, &log_path);
        }
    }
}

/// Drain every currently-terminated child in one pass.
///
/// `try_wait` never blocks; children that are still running stay pending, and
/// each terminated child is removed and recorded exactly once.
fn reap_terminated(pending: &mut Vec<Child>, log_path: &Path) {
    let mut i = 0;
    while i < pending.len() {
        let pid = pending[i].id();
        match pending[i].try_wait() {
            Ok(Some(status)) => {
                pending.swap_remove(i);
                tracing::debug!(pid, ?status, "background child terminated");
                record_termination(log_path, pid);
            }
            Ok(None) => i += 1,
            Err(err) => {
                // Handle is unusable (e.g. already collected elsewhere); drop it.
                pending.swap_remove(i);
                tracing::warn!(pid, %err, "could not query background child");
            }
        }
    }
}

/// Append one termination record. Logging is best-effort diagnostics: failure
/// to open or write the file is silently ignored.
fn record_termination(log_path: &Path, pid: u32) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
        let _ = writeln!(file, "Child process {} terminated", pid);
    }
}
