//! Document viewer session state.
//!
//! Owns the current file, the rendered document, the load/error status line,
//! search state and reading preferences. Everything here runs on the UI
//! thread; file reads happen elsewhere and come back through
//! [`DocumentViewer::complete_load`].

use crate::bridge::HostBridge;
use crate::document::Document;
use crate::perf::{perf_meta, PerfValue};
use crate::preferences::ReadingPreferences;
use crate::renderer::LazyRenderer;
use crate::search::{Direction, MatchLocation, SearchState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const BRIDGE_UNAVAILABLE: &str = "Host bridge not available.";
pub const ERROR_TITLE: &str = "Couldn't open that file";
pub const RETRY_LABEL: &str = "Open another file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Loading,
    Error,
}

impl StatusLevel {
    /// Text of the status pill.
    pub fn pill(self) -> &'static str {
        match self {
            StatusLevel::Info => "Ready",
            StatusLevel::Loading => "Loading",
            StatusLevel::Error => "Error",
        }
    }
}

/// Last segment of `path`, splitting on both separator styles.
pub fn file_name_of(path: &Path) -> String {
    let text = path.to_string_lossy();
    text.rsplit(['/', '\\']).next().unwrap_or_default().to_string()
}

pub struct DocumentViewer {
    bridge: Option<Arc<dyn HostBridge>>,
    renderer: LazyRenderer,
    prefs: ReadingPreferences,
    status: LoadStatus,
    status_level: StatusLevel,
    status_message: String,
    current_path: Option<PathBuf>,
    file_name: String,
    file_actions_enabled: bool,
    document: Document,
    error: Option<String>,
    search: SearchState,
}

impl DocumentViewer {
    /// Without a bridge the viewer starts, and stays, in the error state.
    pub fn new(
        bridge: Option<Arc<dyn HostBridge>>,
        renderer: LazyRenderer,
        prefs: ReadingPreferences,
    ) -> Self {
        let mut viewer = Self {
            bridge,
            renderer,
            prefs,
            status: LoadStatus::Idle,
            status_level: StatusLevel::Info,
            status_message: "Ready".to_string(),
            current_path: None,
            file_name: String::new(),
            file_actions_enabled: false,
            document: Document::default(),
            error: None,
            search: SearchState::new(),
        };
        if viewer.bridge.is_none() {
            viewer.set_error_state(BRIDGE_UNAVAILABLE.to_string());
        }
        viewer
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn status_level(&self) -> StatusLevel {
        self.status_level
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_actions_enabled(&self) -> bool {
        self.file_actions_enabled
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The error panel offers "Open another file".
    pub fn has_retry(&self) -> bool {
        self.status == LoadStatus::Error
    }

    pub fn bridge_available(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn prefs(&self) -> &ReadingPreferences {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut ReadingPreferences {
        &mut self.prefs
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status_level = level;
        self.status_message = message.into();
    }

    fn set_error_state(&mut self, message: String) {
        self.status = LoadStatus::Error;
        self.set_status(StatusLevel::Error, message.clone());
        self.error = Some(message);
        self.document = Document::default();
        self.search.detach();
        self.file_actions_enabled = false;
    }

    /// Enter `Loading` for `path`. Returns false when there is no bridge to
    /// read through.
    pub fn begin_load(&mut self, path: &Path) -> bool {
        if self.bridge.is_none() {
            self.set_error_state(BRIDGE_UNAVAILABLE.to_string());
            return false;
        }
        log::info!("Loading {}", path.display());
        self.status = LoadStatus::Loading;
        self.set_status(StatusLevel::Loading, "Loading file...");
        self.file_actions_enabled = false;
        true
    }

    /// Apply a finished read. The most recent completion wins, whichever
    /// request it belonged to.
    pub fn complete_load(&mut self, path: PathBuf, result: Result<String, String>) {
        self.complete_load_timed(path, result, Duration::ZERO);
    }

    pub fn complete_load_timed(
        &mut self,
        path: PathBuf,
        result: Result<String, String>,
        read_time: Duration,
    ) {
        let text = match result {
            Ok(text) => text,
            Err(message) => {
                log::warn!("Failed to load {}: {message}", path.display());
                self.set_error_state(message);
                return;
            }
        };

        self.document = self.renderer.render(&text);
        self.search.detach();
        let query = self.search.query().to_string();
        if !query.is_empty() {
            self.search.highlight(&mut self.document, &query);
        }

        self.file_name = file_name_of(&path);
        self.status = LoadStatus::Ready;
        self.error = None;
        self.file_actions_enabled = true;
        self.set_status(StatusLevel::Info, format!("Loaded {}", path.display()));
        self.emit_perf(
            "file-loaded",
            [
                ("bytes", PerfValue::from(text.len())),
                ("blocks", PerfValue::from(self.document.blocks.len())),
                ("readMs", PerfValue::from(read_time.as_secs_f64() * 1000.0)),
            ],
        );
        self.current_path = Some(path);
    }

    /// Show the open dialog. Returns the chosen path for the caller to load.
    pub fn open_dialog(&mut self) -> Option<PathBuf> {
        let bridge = match &self.bridge {
            Some(bridge) => Arc::clone(bridge),
            None => {
                self.set_error_state(BRIDGE_UNAVAILABLE.to_string());
                return None;
            }
        };
        self.set_status(StatusLevel::Loading, "Opening...");
        match bridge.open_dialog() {
            Some(path) => Some(path),
            None => {
                self.set_status(StatusLevel::Info, "Open cancelled.");
                None
            }
        }
    }

    /// Pick the path from a drop. Drops without a filesystem path only
    /// update the status line.
    pub fn accept_drop(&mut self, path: Option<PathBuf>) -> Option<PathBuf> {
        match path {
            Some(path) if !path.as_os_str().is_empty() => Some(path),
            _ => {
                self.set_status(StatusLevel::Info, "Drop from file explorer to open.");
                None
            }
        }
    }

    pub fn copy_path(&mut self) {
        if !self.file_actions_enabled {
            return;
        }
        if let (Some(bridge), Some(path)) = (&self.bridge, &self.current_path) {
            bridge.copy_path(path);
            self.set_status(StatusLevel::Info, "Path copied");
        }
    }

    pub fn reveal_in_folder(&mut self) {
        if !self.file_actions_enabled {
            return;
        }
        if let (Some(bridge), Some(path)) = (&self.bridge, &self.current_path) {
            bridge.reveal_in_folder(path);
        }
    }

    /// Re-highlight for `query` (already trimmed). Returns the match count.
    pub fn run_search(&mut self, query: &str) -> usize {
        let count = self.search.highlight(&mut self.document, query);
        if !query.is_empty() {
            self.emit_perf(
                "search",
                [
                    ("queryLength", PerfValue::from(query.chars().count())),
                    ("matches", PerfValue::from(count)),
                ],
            );
        }
        count
    }

    pub fn clear_search(&mut self) {
        self.search.clear(&mut self.document);
    }

    pub fn advance_search(&mut self, direction: Direction) -> Option<usize> {
        self.search.advance(&mut self.document, direction)
    }

    pub fn take_scroll_request(&mut self) -> Option<MatchLocation> {
        self.search.take_scroll_request()
    }

    fn emit_perf<const N: usize>(&self, name: &str, meta: [(&str, PerfValue); N]) {
        if let Some(bridge) = &self.bridge {
            bridge.perf_event(name, perf_meta(meta));
        }
    }
}
