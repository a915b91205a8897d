//! Boundary between the document viewer and the host process.
//!
//! The viewer never touches the filesystem, dialogs, clipboard or file
//! manager directly. It goes through [`HostBridge`], which keeps the viewer
//! testable with a recording fake. File reads run on a dedicated worker
//! thread ([`FileLoader`]) so a slow disk never stalls a frame.

use crate::perf::PerfMeta;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capabilities the host exposes to the viewer.
pub trait HostBridge: Send + Sync {
    /// Show the native open dialog. `None` when the user cancels.
    fn open_dialog(&self) -> Option<PathBuf>;
    /// Read a file as UTF-8 text.
    fn read_file(&self, path: &Path) -> std::io::Result<String>;
    /// Show the file in the system file manager. Empty paths are ignored.
    fn reveal_in_folder(&self, path: &Path);
    /// Put the path text on the clipboard. Empty paths are ignored.
    fn copy_path(&self, path: &Path);
    /// Record a viewer timing event.
    fn perf_event(&self, name: &str, meta: PerfMeta);
}

/// Requests that arrive from outside the window: startup arguments, a second
/// launch forwarding its file, or the OS asking us to come to the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    OpenFile(PathBuf),
    Activate,
}

/// Outcome of one file read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub path: PathBuf,
    pub result: Result<String, String>,
    pub elapsed: Duration,
}

/// Read `path` through the bridge, turning I/O errors into display text.
pub fn read_for_load(bridge: &dyn HostBridge, path: PathBuf) -> LoadResult {
    let started = Instant::now();
    let result = bridge.read_file(&path).map_err(|err| err.to_string());
    LoadResult {
        path,
        result,
        elapsed: started.elapsed(),
    }
}

/// Background file reader.
///
/// Requests are answered in the order they were made. Every request produces
/// exactly one [`LoadResult`]; the caller decides what to do with results
/// that arrive after a newer request. Both queues are unbounded: a new load
/// is never refused, and finished reads wait until the UI drains them.
pub struct FileLoader {
    job_tx: Option<Sender<PathBuf>>,
    result_rx: Receiver<LoadResult>,
    worker_handle: Option<std::thread::JoinHandle<()>>,
    in_flight: usize,
}

impl FileLoader {
    pub fn spawn(bridge: Arc<dyn HostBridge>) -> anyhow::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<LoadResult>();

        let worker_handle = std::thread::Builder::new()
            .name("file-loader".into())
            .spawn(move || Self::worker_loop(bridge, job_rx, result_tx))?;

        Ok(Self {
            job_tx: Some(job_tx),
            result_rx,
            worker_handle: Some(worker_handle),
            in_flight: 0,
        })
    }

    fn worker_loop(
        bridge: Arc<dyn HostBridge>,
        job_rx: Receiver<PathBuf>,
        result_tx: Sender<LoadResult>,
    ) {
        while let Ok(path) = job_rx.recv() {
            let result = read_for_load(bridge.as_ref(), path);
            if result_tx.send(result).is_err() {
                // Loader dropped; nobody is listening.
                break;
            }
        }
    }

    /// Queue a read.
    pub fn request(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let Some(job_tx) = self.job_tx.as_ref() else {
            anyhow::bail!("File loader is shut down");
        };
        if job_tx.send(path).is_err() {
            self.job_tx = None;
            anyhow::bail!("File loader stopped unexpectedly");
        }
        self.in_flight += 1;
        Ok(())
    }

    /// Drain finished reads. Called once per frame.
    pub fn poll(&mut self) -> Vec<LoadResult> {
        let mut finished = Vec::new();
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    finished.push(result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Worker died; nothing else is coming.
                    self.in_flight = 0;
                    self.job_tx = None;
                    break;
                }
            }
        }
        finished
    }

    /// Block until the next result arrives or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadResult> {
        let result = self.result_rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }

    pub fn has_pending(&self) -> bool {
        self.in_flight > 0
    }
}

impl Drop for FileLoader {
    fn drop(&mut self) {
        self.job_tx.take();
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory bridge that records every host call.
    #[derive(Default)]
    pub(crate) struct RecordingBridge {
        pub dialog_result: Mutex<Option<PathBuf>>,
        pub dialogs_shown: Mutex<usize>,
        pub revealed: Mutex<Vec<PathBuf>>,
        pub copied: Mutex<Vec<PathBuf>>,
        pub perf: Mutex<Vec<String>>,
    }

    impl RecordingBridge {
        pub(crate) fn with_dialog_result(path: Option<PathBuf>) -> Self {
            Self {
                dialog_result: Mutex::new(path),
                ..Default::default()
            }
        }

        pub(crate) fn perf_names(&self) -> Vec<String> {
            self.perf.lock().expect("perf lock").clone()
        }
    }

    impl HostBridge for RecordingBridge {
        fn open_dialog(&self) -> Option<PathBuf> {
            *self.dialogs_shown.lock().expect("dialog lock") += 1;
            self.dialog_result.lock().expect("dialog lock").clone()
        }

        fn read_file(&self, path: &Path) -> std::io::Result<String> {
            std::fs::read_to_string(path)
        }

        fn reveal_in_folder(&self, path: &Path) {
            if path.as_os_str().is_empty() {
                return;
            }
            self.revealed
                .lock()
                .expect("reveal lock")
                .push(path.to_path_buf());
        }

        fn copy_path(&self, path: &Path) {
            if path.as_os_str().is_empty() {
                return;
            }
            self.copied.lock().expect("copy lock").push(path.to_path_buf());
        }

        fn perf_event(&self, name: &str, _meta: PerfMeta) {
            self.perf.lock().expect("perf lock").push(name.to_string());
        }
    }
}
