//! Main window for the reader.
//!
//! Owns the document viewer, the background file loader and the queue of
//! shell events, and lays out the toolbar, status bar and reading column.

use crate::bridge::{FileLoader, HostBridge, ShellEvent};
use crate::host::{NativeHost, PendingOpen};
use crate::perf::{perf_meta, PerfLog, PerfValue};
use crate::preferences::{ReadingPreferences, Theme, FONT_SCALE_STEP};
use crate::renderer::LazyRenderer;
use crate::search::{Direction, SearchDebounce};
use crate::theme::{apply_dark_mode_visuals, ThemeColors};
use crate::view::{drop_overlay, DocumentView};
use crate::viewer::{DocumentViewer, LoadStatus, ERROR_TITLE, RETRY_LABEL};
use crossbeam_channel::Receiver;
use egui::{Button, CentralPanel, Color32, Context, RichText, TopBottomPanel};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const APP_TITLE: &str = "MD Reader";

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(16);
const PERF_EXIT_DELAY: Duration = Duration::from_millis(120);

/// Launch settings resolved from the command line.
#[derive(Debug, Default)]
pub struct StartupOptions {
    pub initial_file: Option<PathBuf>,
    /// Session-only theme; not written to preferences.
    pub theme_override: Option<Theme>,
    /// Close shortly after the first frame (startup timing runs).
    pub perf_exit: bool,
}

pub struct MarkdownReaderApp {
    viewer: DocumentViewer,
    /// `None` when the loader thread could not start; the viewer then has no bridge.
    loader: Option<FileLoader>,
    pending_open: PendingOpen,
    shell_events: Receiver<ShellEvent>,
    perf: Arc<PerfLog>,
    search_input: String,
    debounce: SearchDebounce,
    focus_search: bool,
    applied_dark: Option<bool>,
    window_title: String,
    perf_exit: bool,
    quit_at: Option<Instant>,
}

impl MarkdownReaderApp {
    pub fn new(
        startup: StartupOptions,
        shell_events: Receiver<ShellEvent>,
        perf: Arc<PerfLog>,
        prefs: ReadingPreferences,
    ) -> Self {
        let bridge: Arc<dyn HostBridge> = Arc::new(NativeHost::new(Arc::clone(&perf)));
        Self::with_bridge(bridge, prefs, startup, shell_events, perf)
    }

    pub fn with_bridge(
        bridge: Arc<dyn HostBridge>,
        mut prefs: ReadingPreferences,
        startup: StartupOptions,
        shell_events: Receiver<ShellEvent>,
        perf: Arc<PerfLog>,
    ) -> Self {
        let (loader, viewer_bridge) = match FileLoader::spawn(Arc::clone(&bridge)) {
            Ok(loader) => (Some(loader), Some(bridge)),
            Err(err) => {
                log::error!("File loader unavailable: {err:#}");
                (None, None)
            }
        };
        if let Some(theme) = startup.theme_override {
            prefs.override_theme(theme);
        }

        let mut pending_open = PendingOpen::new();
        if let Some(path) = startup.initial_file {
            pending_open.notify(path);
        }

        Self {
            viewer: DocumentViewer::new(viewer_bridge, LazyRenderer::new(), prefs),
            loader,
            pending_open,
            shell_events,
            perf,
            search_input: String::new(),
            debounce: SearchDebounce::default(),
            focus_search: false,
            applied_dark: None,
            window_title: APP_TITLE.to_string(),
            perf_exit: startup.perf_exit,
            quit_at: None,
        }
    }

    pub fn viewer(&self) -> &DocumentViewer {
        &self.viewer
    }

    /// Start loading `path`. The loader answers on a later frame.
    fn open_path(&mut self, path: PathBuf) {
        if !self.viewer.begin_load(&path) {
            return;
        }
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        if let Err(err) = loader.request(path.clone()) {
            self.viewer.complete_load(path, Err(format!("{err:#}")));
        }
    }

    fn open_file_dialog(&mut self) {
        if let Some(path) = self.viewer.open_dialog() {
            self.open_path(path);
        }
    }

    fn clear_search_box(&mut self) {
        self.search_input.clear();
        self.debounce.cancel();
        self.viewer.clear_search();
    }

    /// Enter in the search box: run a query still waiting on the debounce,
    /// otherwise step through matches.
    fn search_enter(&mut self, backwards: bool) {
        if let Some(query) = self.debounce.flush() {
            self.viewer.run_search(&query);
            return;
        }
        let direction = if backwards {
            Direction::Previous
        } else {
            Direction::Next
        };
        self.viewer.advance_search(direction);
    }

    /// Per-frame bookkeeping that does not draw anything.
    fn begin_frame(&mut self, ctx: &Context) {
        if !self.pending_open.is_ready() {
            let pending = self.pending_open.mark_ready();
            self.perf.record(
                "window-shown",
                &perf_meta([("hasFile", PerfValue::from(pending.is_some()))]),
            );
            if let Some(path) = pending {
                self.open_path(path);
            }
            if self.perf_exit {
                self.quit_at = Some(Instant::now() + PERF_EXIT_DELAY);
            }
        }

        while let Ok(event) = self.shell_events.try_recv() {
            match event {
                ShellEvent::Activate => {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
                    ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
                }
                ShellEvent::OpenFile(path) => {
                    if let Some(path) = self.pending_open.notify(path) {
                        self.open_path(path);
                    }
                }
            }
        }

        if let Some(loader) = self.loader.as_mut() {
            for loaded in loader.poll() {
                self.viewer
                    .complete_load_timed(loaded.path, loaded.result, loaded.elapsed);
            }
            if loader.has_pending() {
                ctx.request_repaint_after(LOAD_POLL_INTERVAL);
            }
        }

        let now = Instant::now();
        if let Some(query) = self.debounce.poll(now) {
            self.viewer.run_search(&query);
        }
        if let Some(wait) = self.debounce.remaining(now) {
            ctx.request_repaint_after(wait);
        }

        let dark = self.viewer.prefs().theme().is_dark();
        // The OS theme follower may swap visuals underneath us.
        if self.applied_dark != Some(dark) || ctx.style().visuals.dark_mode != dark {
            apply_dark_mode_visuals(ctx, dark);
            self.applied_dark = Some(dark);
        }

        if let Some(quit_at) = self.quit_at {
            if now >= quit_at {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            } else {
                ctx.request_repaint_after(quit_at - now);
            }
        }
    }

    /// Handle keyboard shortcuts
    fn handle_shortcuts(&mut self, ctx: &Context) {
        use egui::{Key, KeyboardShortcut, Modifiers};

        let (open, find, theme, larger, smaller, escape) = ctx.input_mut(|i| {
            let open = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::O));
            let find = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::F));
            let theme = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::T));
            let larger = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Equals))
                | i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Plus));
            let smaller = i.consume_shortcut(&KeyboardShortcut::new(Modifiers::COMMAND, Key::Minus));
            let escape = i.key_pressed(Key::Escape);
            (open, find, theme, larger, smaller, escape)
        });

        if open {
            self.open_file_dialog();
        }
        if find {
            self.focus_search = true;
        }
        if theme {
            self.viewer.prefs_mut().toggle_theme();
        }
        if larger {
            self.viewer.prefs_mut().step_font_scale(FONT_SCALE_STEP);
        }
        if smaller {
            self.viewer.prefs_mut().step_font_scale(-FONT_SCALE_STEP);
        }
        if escape && (!self.search_input.is_empty() || !self.viewer.search().query().is_empty()) {
            self.clear_search_box();
        }
    }

    fn render_toolbar(&mut self, ctx: &Context) {
        let mut open_requested = false;
        TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui
                    .button("📂 Open")
                    .on_hover_text("Open a markdown file (Ctrl+O)")
                    .clicked()
                {
                    open_requested = true;
                }

                let name = if self.viewer.file_name().is_empty() {
                    "No file open"
                } else {
                    self.viewer.file_name()
                };
                ui.label(RichText::new(name).strong());

                let enabled = self.viewer.file_actions_enabled();
                if ui
                    .add_enabled(enabled, Button::new("Copy path"))
                    .clicked()
                {
                    self.viewer.copy_path();
                }
                if ui.add_enabled(enabled, Button::new("Reveal")).clicked() {
                    self.viewer.reveal_in_folder();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let prefs = self.viewer.prefs();
                    let width_label = prefs.width_mode().label();
                    let theme_label = if prefs.theme().is_dark() {
                        "☀ Light"
                    } else {
                        "🌙 Dark"
                    };

                    if ui
                        .button(width_label)
                        .on_hover_text("Cycle reading width")
                        .clicked()
                    {
                        self.viewer.prefs_mut().cycle_width_mode();
                    }
                    if ui.button("A+").on_hover_text("Larger text (Ctrl+=)").clicked() {
                        self.viewer.prefs_mut().step_font_scale(FONT_SCALE_STEP);
                    }
                    if ui.button("A−").on_hover_text("Smaller text (Ctrl+-)").clicked() {
                        self.viewer.prefs_mut().step_font_scale(-FONT_SCALE_STEP);
                    }
                    if ui
                        .button(theme_label)
                        .on_hover_text("Toggle theme (Ctrl+T)")
                        .clicked()
                    {
                        self.viewer.prefs_mut().toggle_theme();
                    }

                    ui.separator();

                    if ui
                        .add_enabled(!self.search_input.is_empty(), Button::new("✖"))
                        .on_hover_text("Clear search (Esc)")
                        .clicked()
                    {
                        self.clear_search_box();
                    }
                    ui.label(self.viewer.search().count_label());
                    self.render_search_box(ui);
                });
            });
            ui.add_space(4.0);
        });

        if open_requested {
            self.open_file_dialog();
        }
    }

    fn render_search_box(&mut self, ui: &mut egui::Ui) {
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.search_input)
                .id(egui::Id::new("search_input"))
                .hint_text("Search (Ctrl+F)")
                .desired_width(180.0),
        );
        if response.changed() {
            self.debounce.input(&self.search_input, Instant::now());
        }
        if self.focus_search {
            response.request_focus();
            self.focus_search = false;
        }
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            let backwards = ui.input(|i| i.modifiers.shift);
            self.search_enter(backwards);
            response.request_focus();
        }
    }

    /// Render the status bar
    fn render_status_bar(&self, ctx: &Context) {
        let prefs = self.viewer.prefs();
        let colors = ThemeColors::current(prefs.theme().is_dark());
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let level = self.viewer.status_level();
                egui::Frame::none()
                    .fill(colors.status_color(level))
                    .rounding(egui::Rounding::same(8.0))
                    .inner_margin(egui::Margin::symmetric(8.0, 1.0))
                    .show(ui, |ui| {
                        ui.label(RichText::new(level.pill()).small().strong().color(Color32::WHITE));
                    });
                if self.viewer.is_loading() {
                    ui.spinner();
                }
                ui.label(self.viewer.status_message());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(format!(
                            "{:.0}% | {}",
                            prefs.font_scale() * 100.0,
                            prefs.width_mode().label()
                        ))
                        .color(colors.status_hint),
                    );
                });
            });
        });
    }

    fn render_content(&mut self, ctx: &Context) {
        let mut open_requested = false;
        let presentation = self.viewer.prefs().presentation();
        let colors = ThemeColors::current(presentation.dark);
        let scroll_to = self.viewer.take_scroll_request();

        CentralPanel::default().show(ctx, |ui| {
            if self.viewer.status() == LoadStatus::Error {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.label(
                        RichText::new(ERROR_TITLE)
                            .size(22.0)
                            .strong()
                            .color(colors.error_title),
                    );
                    ui.add_space(8.0);
                    ui.label(self.viewer.error_message().unwrap_or_default());
                    ui.add_space(16.0);
                    if ui.button(RETRY_LABEL).clicked() {
                        open_requested = true;
                    }
                });
                return;
            }

            // An empty file still counts as loaded; show the blank page.
            if self.viewer.document().is_empty() && self.viewer.status() != LoadStatus::Ready {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    if self.viewer.is_loading() {
                        ui.spinner();
                        ui.label("Loading file...");
                        return;
                    }
                    ui.label(RichText::new(APP_TITLE).size(24.0).strong());
                    ui.add_space(12.0);
                    ui.label("Open a file, drop one onto this window, or pass a path on the command line.");
                    ui.add_space(16.0);
                    if ui.button("📂 Open a markdown file").clicked() {
                        open_requested = true;
                    }
                });
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.spacing_mut().item_spacing.y = 8.0;
                    let available = ui.available_width();
                    let column = available.min(presentation.max_width);
                    let margin = ((available - column) / 2.0).max(0.0);
                    ui.horizontal_top(|ui| {
                        ui.add_space(margin);
                        ui.vertical(|ui| {
                            ui.set_width(column);
                            DocumentView::new(presentation, scroll_to).show(ui, self.viewer.document());
                            ui.add_space(24.0);
                        });
                    });
                });
        });

        if open_requested {
            self.open_file_dialog();
        }
    }

    fn handle_file_drop(&mut self, ctx: &Context) {
        let (hovering, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw.dropped_files.first().map(|file| file.path.clone()),
            )
        });
        if hovering {
            drop_overlay(ctx, self.viewer.prefs().theme().is_dark());
        }
        if let Some(path) = dropped {
            if let Some(path) = self.viewer.accept_drop(path) {
                self.open_path(path);
            }
        }
    }

    fn sync_window_title(&mut self, ctx: &Context) {
        let title = if self.viewer.file_name().is_empty() {
            APP_TITLE.to_string()
        } else {
            format!("{} - {APP_TITLE}", self.viewer.file_name())
        };
        if title != self.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }
    }
}

impl eframe::App for MarkdownReaderApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.begin_frame(ctx);
        self.handle_shortcuts(ctx);
        self.render_toolbar(ctx);
        self.render_status_bar(ctx);
        self.render_content(ctx);
        self.handle_file_drop(ctx);
        self.sync_window_title(ctx);
    }
}
