//! Single-window markdown reader built with Rust and egui.
//!
//! The host side resolves launch arguments, keeps one window per session and
//! performs OS actions. The viewer side renders markdown into a styled
//! document model, searches it with incremental highlighting, and remembers
//! theme, text size and reading width between runs.

pub mod app;
pub mod bridge;
pub mod document;
pub mod host;
pub mod perf;
pub mod preferences;
pub mod renderer;
pub mod search;
pub mod shell_integration;
pub mod single_instance;
pub mod theme;
pub mod view;
pub mod viewer;

pub use app::{MarkdownReaderApp, StartupOptions, APP_TITLE};
pub use bridge::{FileLoader, HostBridge, LoadResult, ShellEvent};
pub use document::{Block, BlockKind, Document, InlineStyle, Mark, Run};
pub use host::{resolve_file_argument, NativeHost, PendingOpen};
pub use perf::{PerfLog, PerfMeta, PerfValue};
pub use preferences::{ReadingPreferences, SettingsFile, Theme, WidthMode};
pub use renderer::{LazyRenderer, MarkdownEngine, PulldownEngine};
pub use search::{Direction, SearchDebounce, SearchState};
pub use single_instance::{instance_port, InstanceLock, InstanceRole};
pub use viewer::{DocumentViewer, LoadStatus, StatusLevel};
