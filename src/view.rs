//! Paints a [`Document`] into an egui `Ui`.
//!
//! Every run becomes its own label inside a wrapped row, so search markers
//! get their own background and their own response to scroll to.

use crate::document::{Block, BlockKind, Document, Mark, Run};
use crate::preferences::Presentation;
use crate::search::MatchLocation;
use crate::theme::ThemeColors;
use egui::{Color32, RichText, Stroke};

/// Font size configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FontSizes {
    pub body: f32,
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
    pub h4: f32,
    pub h5: f32,
    pub h6: f32,
    pub code: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            body: 15.0,
            h1: 28.0,
            h2: 24.0,
            h3: 20.0,
            h4: 18.0,
            h5: 16.0,
            h6: 15.0,
            code: 13.0,
        }
    }
}

impl FontSizes {
    pub fn scaled(factor: f32) -> Self {
        let base = Self::default();
        Self {
            body: base.body * factor,
            h1: base.h1 * factor,
            h2: base.h2 * factor,
            h3: base.h3 * factor,
            h4: base.h4 * factor,
            h5: base.h5 * factor,
            h6: base.h6 * factor,
            code: base.code * factor,
        }
    }

    pub fn heading(&self, level: u8) -> f32 {
        match level {
            1 => self.h1,
            2 => self.h2,
            3 => self.h3,
            4 => self.h4,
            5 => self.h5,
            6 => self.h6,
            _ => self.body,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LineStyle {
    size: f32,
    strong: bool,
    monospace: bool,
    indent: f32,
}

/// Split a block's runs at embedded newlines. Each line lists
/// `(run index, text slice)` pieces.
fn split_lines(runs: &[Run]) -> Vec<Vec<(usize, &str)>> {
    let mut lines: Vec<Vec<(usize, &str)>> = vec![Vec::new()];
    for (index, run) in runs.iter().enumerate() {
        for (part_index, part) in run.text.split('\n').enumerate() {
            if part_index > 0 {
                lines.push(Vec::new());
            }
            if !part.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.push((index, part));
                }
            }
        }
    }
    lines
}

pub struct DocumentView {
    colors: &'static ThemeColors,
    sizes: FontSizes,
    scroll_to: Option<MatchLocation>,
}

impl DocumentView {
    pub fn new(presentation: Presentation, scroll_to: Option<MatchLocation>) -> Self {
        Self {
            colors: ThemeColors::current(presentation.dark),
            sizes: FontSizes::scaled(presentation.text_scale),
            scroll_to,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui, doc: &Document) {
        let mut index = 0;
        while index < doc.blocks.len() {
            let block = &doc.blocks[index];
            if let BlockKind::TableCell { table, .. } = block.kind {
                let end = doc.blocks[index..]
                    .iter()
                    .position(|b| !matches!(b.kind, BlockKind::TableCell { table: t, .. } if t == table))
                    .map_or(doc.blocks.len(), |offset| index + offset);
                self.render_table(ui, table, index, &doc.blocks[index..end]);
                index = end;
                continue;
            }
            if block.quote_depth > 0 {
                self.render_quoted(ui, index, block);
            } else {
                self.render_block(ui, index, block);
            }
            index += 1;
        }
    }

    fn body_style(&self) -> LineStyle {
        LineStyle {
            size: self.sizes.body,
            strong: false,
            monospace: false,
            indent: 0.0,
        }
    }

    fn render_block(&self, ui: &mut egui::Ui, index: usize, block: &Block) {
        match &block.kind {
            BlockKind::Heading(level) => {
                ui.add_space(8.0);
                let style = LineStyle {
                    size: self.sizes.heading(*level),
                    strong: true,
                    ..self.body_style()
                };
                self.render_lines(ui, index, block, style, None);
                ui.add_space(6.0);
            }
            BlockKind::Paragraph | BlockKind::TableCell { .. } => {
                self.render_lines(ui, index, block, self.body_style(), None);
                ui.add_space(4.0);
            }
            BlockKind::Plain => {
                let style = LineStyle {
                    size: self.sizes.code,
                    monospace: true,
                    ..self.body_style()
                };
                self.render_lines(ui, index, block, style, None);
            }
            BlockKind::CodeBlock { language } => {
                self.render_code_block(ui, index, block, language.as_deref());
            }
            BlockKind::ListItem { number, depth } => {
                let marker = match number {
                    Some(n) => format!("{n}. "),
                    None => "• ".to_string(),
                };
                let style = LineStyle {
                    indent: 18.0 * f32::from(*depth),
                    ..self.body_style()
                };
                self.render_lines(ui, index, block, style, Some(marker));
                ui.add_space(2.0);
            }
            BlockKind::Rule => {
                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);
            }
        }
    }

    fn render_lines(
        &self,
        ui: &mut egui::Ui,
        index: usize,
        block: &Block,
        style: LineStyle,
        marker: Option<String>,
    ) {
        for (line_index, line) in split_lines(&block.runs).iter().enumerate() {
            ui.horizontal_wrapped(|ui| {
                // Avoid artificial gaps between run fragments
                ui.spacing_mut().item_spacing.x = 0.0;
                if style.indent > 0.0 {
                    ui.add_space(style.indent);
                }
                if let Some(marker) = &marker {
                    if line_index == 0 {
                        ui.label(
                            RichText::new(marker.as_str())
                                .size(style.size)
                                .color(self.colors.list_marker),
                        );
                    } else {
                        ui.add_space(18.0);
                    }
                }
                for (run_index, text) in line {
                    self.render_run(ui, index, *run_index, &block.runs[*run_index], text, style);
                }
            });
        }
    }

    fn rich_text(&self, run: &Run, text: &str, style: LineStyle) -> RichText {
        let code = style.monospace || run.style.code;
        let size = if code {
            self.sizes.code.max(style.size * 0.9)
        } else {
            style.size
        };
        let mut rich = RichText::new(text).size(size);
        if code {
            rich = rich.family(egui::FontFamily::Monospace);
        }
        if run.style.code && !style.monospace {
            rich = rich
                .background_color(self.colors.inline_code_bg)
                .color(self.colors.inline_code_fg);
        }
        if run.style.strong || style.strong {
            rich = rich.strong();
        }
        if run.style.emphasis {
            rich = rich.italics();
        }
        if run.style.strike {
            rich = rich.strikethrough();
        }
        if run.style.link.is_some() {
            rich = rich.color(self.colors.link).underline();
        }
        match run.mark {
            Some(Mark::Hit) => rich
                .background_color(self.colors.search_hit_bg)
                .color(self.colors.search_fg),
            Some(Mark::Active) => rich
                .background_color(self.colors.search_active_bg)
                .color(self.colors.search_fg),
            None => rich,
        }
    }

    fn render_run(
        &self,
        ui: &mut egui::Ui,
        block_index: usize,
        run_index: usize,
        run: &Run,
        text: &str,
        style: LineStyle,
    ) {
        let rich = self.rich_text(run, text, style);
        let response = match &run.style.link {
            Some(url) => {
                let response = ui
                    .add(egui::Label::new(rich).sense(egui::Sense::click()))
                    .on_hover_cursor(egui::CursorIcon::PointingHand)
                    .on_hover_text(url.as_str());
                if response.clicked() {
                    open_url(url);
                }
                response
            }
            None => ui.label(rich),
        };
        let here = MatchLocation {
            block: block_index,
            run: run_index,
        };
        if self.scroll_to == Some(here) {
            response.scroll_to_me(Some(egui::Align::Center));
        }
    }

    fn render_code_block(
        &self,
        ui: &mut egui::Ui,
        index: usize,
        block: &Block,
        language: Option<&str>,
    ) {
        ui.add_space(8.0);
        egui::Frame::none()
            .fill(self.colors.code_bg)
            .stroke(Stroke::new(1.0, self.colors.code_border))
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.with_layout(egui::Layout::top_down(egui::Align::LEFT), |ui| {
                    if let Some(lang) = language {
                        ui.label(
                            RichText::new(lang)
                                .size(self.sizes.code - 1.0)
                                .color(self.colors.code_label)
                                .family(egui::FontFamily::Monospace),
                        );
                        ui.add_space(2.0);
                    }
                    let style = LineStyle {
                        size: self.sizes.code,
                        monospace: true,
                        ..self.body_style()
                    };
                    self.render_lines(ui, index, block, style, None);
                });
            });
        ui.add_space(8.0);
    }

    fn render_quoted(&self, ui: &mut egui::Ui, index: usize, block: &Block) {
        let depth = block.quote_depth;
        let bar_width = 3.0;
        let bar_gap = 6.0;
        let left_pad = 10.0 + f32::from(depth) * (bar_width + bar_gap);

        let resp = egui::Frame::none()
            .fill(self.colors.blockquote_bg)
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(egui::Margin {
                left: left_pad,
                right: 10.0,
                top: 6.0,
                bottom: 6.0,
            })
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                self.render_block(ui, index, block);
            });

        let rect = resp.response.rect;
        let top = rect.top() + 4.0;
        let bottom = rect.bottom() - 4.0;
        for d in 0..depth {
            let x = rect.left() + 6.0 + f32::from(d) * (bar_width + bar_gap);
            let bar_rect =
                egui::Rect::from_min_max(egui::pos2(x, top), egui::pos2(x + bar_width, bottom));
            ui.painter()
                .rect_filled(bar_rect, 2.0, self.colors.blockquote_bar);
        }
        ui.add_space(2.0);
    }

    fn render_table(&self, ui: &mut egui::Ui, table: usize, first_index: usize, cells: &[Block]) {
        let columns = cells
            .iter()
            .filter_map(|cell| match cell.kind {
                BlockKind::TableCell { column, .. } => Some(column + 1),
                _ => None,
            })
            .max()
            .unwrap_or(1);
        let cell_width = (ui.available_width() / columns as f32).max(60.0);

        ui.add_space(8.0);
        egui::Frame::none()
            .stroke(Stroke::new(1.0, self.colors.table_border))
            .inner_margin(4.0)
            .show(ui, |ui| {
                egui::Grid::new(("md_table", table))
                    .striped(true)
                    .show(ui, |ui| {
                        let mut current_row = None;
                        for (offset, cell) in cells.iter().enumerate() {
                            let BlockKind::TableCell { row, header, .. } = cell.kind else {
                                continue;
                            };
                            if current_row.is_some_and(|r| r != row) {
                                ui.end_row();
                            }
                            current_row = Some(row);
                            let style = LineStyle {
                                strong: header,
                                ..self.body_style()
                            };
                            ui.scope(|ui| {
                                ui.set_max_width(cell_width);
                                self.render_lines(ui, first_index + offset, cell, style, None);
                            });
                        }
                        ui.end_row();
                    });
            });
        ui.add_space(8.0);
    }
}

/// Paint the dimmed backdrop and hint shown while files hover the window.
pub fn drop_overlay(ctx: &egui::Context, dark: bool) {
    let colors = ThemeColors::current(dark);
    let screen = ctx.screen_rect();
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("drop_overlay"),
    ));
    painter.rect_filled(screen, 0.0, colors.overlay_bg);
    painter.rect_stroke(
        screen.shrink(12.0),
        8.0,
        Stroke::new(2.0, colors.overlay_border),
    );
    painter.text(
        screen.center(),
        egui::Align2::CENTER_CENTER,
        "Drop a markdown file to open",
        egui::FontId::proportional(22.0),
        if dark { Color32::WHITE } else { Color32::BLACK },
    );
}

fn open_url(url: &str) {
    if let Err(e) = webbrowser::open(url) {
        log::warn!("Failed to open URL {}: {}", url, e);
    }
}
