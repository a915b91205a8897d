//! Host shell: the native side of the bridge plus the plumbing that gets a
//! file path from the command line or a second launch into the viewer.

use crate::bridge::HostBridge;
use crate::perf::{PerfLog, PerfMeta};
use crate::shell_integration;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pick the file to open from launch arguments.
///
/// Returns the first argument that is not flag-like (does not start with
/// `-`) and names an existing regular file. Everything else is skipped.
pub fn resolve_file_argument<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().find_map(|arg| {
        let arg = arg.as_ref();
        if arg.is_empty() || arg.starts_with('-') {
            return None;
        }
        let path = PathBuf::from(arg);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    })
}

/// Holds the single most recent open request until the window can show it.
///
/// Before the first frame, paths are buffered and later requests replace
/// earlier ones. After [`PendingOpen::mark_ready`] they pass straight through.
#[derive(Debug, Default)]
pub struct PendingOpen {
    ready: bool,
    pending: Option<PathBuf>,
}

impl PendingOpen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the path to open now, or `None` if it was buffered (or empty).
    pub fn notify(&mut self, path: PathBuf) -> Option<PathBuf> {
        if path.as_os_str().is_empty() {
            return None;
        }
        if self.ready {
            Some(path)
        } else {
            self.pending = Some(path);
            None
        }
    }

    /// Flush the buffered path once. Later calls return `None`.
    pub fn mark_ready(&mut self) -> Option<PathBuf> {
        self.ready = true;
        self.pending.take()
    }
}

/// Bridge implementation backed by the real OS.
pub struct NativeHost {
    perf: Arc<PerfLog>,
}

impl NativeHost {
    pub fn new(perf: Arc<PerfLog>) -> Self {
        Self { perf }
    }
}

impl HostBridge for NativeHost {
    fn open_dialog(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title("Open Markdown File")
            .add_filter("Markdown", &["md", "markdown"])
            .pick_file()
    }

    fn read_file(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn reveal_in_folder(&self, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        if let Err(err) = shell_integration::reveal_in_file_manager(path) {
            log::warn!("Reveal in folder failed for {}: {err:#}", path.display());
        }
    }

    fn copy_path(&self, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        let text = shell_integration::display_path(path);
        if let Err(err) = shell_integration::clipboard_copy_text(&text) {
            log::warn!("Copy path failed: {err:#}");
        }
    }

    fn perf_event(&self, name: &str, meta: PerfMeta) {
        self.perf.record(&format!("renderer:{name}"), &meta);
    }
}
