// Light and dark palettes for the reader.
//
// `ThemeColors` holds every color that changes with the theme: document
// styling, search highlights and the status pill. `apply_dark_mode_visuals()`
// switches egui's own widgets between dark and light, with true-black panels
// in dark mode.

use crate::viewer::StatusLevel;
use egui::Color32;

pub struct ThemeColors {
    // Links
    pub link: Color32,
    // Code blocks
    pub code_bg: Color32,
    pub code_border: Color32,
    pub code_label: Color32,
    // Inline code
    pub inline_code_bg: Color32,
    pub inline_code_fg: Color32,
    // Blockquotes
    pub blockquote_bg: Color32,
    pub blockquote_bar: Color32,
    // Lists and tables
    pub list_marker: Color32,
    pub table_border: Color32,
    // Search
    pub search_hit_bg: Color32,
    pub search_active_bg: Color32,
    pub search_fg: Color32,
    // Status pill
    pub status_ready: Color32,
    pub status_loading: Color32,
    pub status_error: Color32,
    pub status_hint: Color32,
    // Error panel and drop overlay
    pub error_title: Color32,
    pub overlay_bg: Color32,
    pub overlay_border: Color32,
}

impl ThemeColors {
    pub const DARK: Self = Self {
        link: Color32::from_rgb(120, 190, 255),
        code_bg: Color32::from_rgb(30, 30, 30),
        code_border: Color32::from_rgb(60, 60, 60),
        code_label: Color32::from_rgb(140, 140, 140),
        inline_code_bg: Color32::from_rgb(30, 30, 30),
        inline_code_fg: Color32::from_rgb(180, 255, 180),
        blockquote_bg: Color32::from_rgb(24, 24, 24),
        blockquote_bar: Color32::from_rgb(255, 103, 25),
        list_marker: Color32::from_rgb(160, 160, 160),
        table_border: Color32::from_rgb(60, 60, 60),
        search_hit_bg: Color32::from_rgb(110, 90, 20),
        search_active_bg: Color32::from_rgb(230, 140, 30),
        search_fg: Color32::WHITE,
        status_ready: Color32::from_rgb(90, 200, 120),
        status_loading: Color32::from_rgb(120, 200, 255),
        status_error: Color32::from_rgb(255, 110, 100),
        status_hint: Color32::GRAY,
        error_title: Color32::from_rgb(255, 140, 120),
        overlay_bg: Color32::from_rgba_premultiplied(10, 20, 35, 200),
        overlay_border: Color32::from_rgb(120, 190, 255),
    };

    pub const LIGHT: Self = Self {
        link: Color32::from_rgb(0, 102, 204),
        code_bg: Color32::from_rgb(245, 245, 245),
        code_border: Color32::from_rgb(210, 210, 210),
        code_label: Color32::from_rgb(120, 120, 120),
        inline_code_bg: Color32::from_rgb(240, 240, 240),
        inline_code_fg: Color32::from_rgb(60, 80, 150),
        blockquote_bg: Color32::from_rgb(245, 245, 248),
        blockquote_bar: Color32::from_rgb(255, 103, 25),
        list_marker: Color32::from_rgb(110, 110, 110),
        table_border: Color32::from_rgb(210, 210, 210),
        search_hit_bg: Color32::from_rgb(255, 236, 150),
        search_active_bg: Color32::from_rgb(255, 170, 60),
        search_fg: Color32::from_rgb(20, 20, 20),
        status_ready: Color32::from_rgb(40, 140, 70),
        status_loading: Color32::from_rgb(30, 120, 200),
        status_error: Color32::from_rgb(200, 50, 40),
        status_hint: Color32::from_rgb(130, 130, 130),
        error_title: Color32::from_rgb(180, 40, 30),
        overlay_bg: Color32::from_rgba_premultiplied(230, 240, 250, 220),
        overlay_border: Color32::from_rgb(0, 102, 204),
    };

    /// Returns the palette for the given mode.
    pub fn current(dark_mode: bool) -> &'static Self {
        if dark_mode {
            &Self::DARK
        } else {
            &Self::LIGHT
        }
    }

    pub fn status_color(&self, level: StatusLevel) -> Color32 {
        match level {
            StatusLevel::Info => self.status_ready,
            StatusLevel::Loading => self.status_loading,
            StatusLevel::Error => self.status_error,
        }
    }
}

/// Apply dark or light visuals with true-black overrides for dark mode.
/// Clones the current style to preserve spacing/rounding set by `configure_egui_style()`.
pub fn apply_dark_mode_visuals(ctx: &egui::Context, dark: bool) {
    let mut style = (*ctx.style()).clone();
    style.visuals = if dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    if dark {
        style.visuals.window_fill = Color32::BLACK;
        style.visuals.panel_fill = Color32::BLACK;
        style.visuals.faint_bg_color = Color32::from_gray(20);
        style.visuals.extreme_bg_color = Color32::BLACK;
    }
    ctx.set_style(style);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_picks_palette() {
        assert_eq!(ThemeColors::current(true).link, ThemeColors::DARK.link);
        assert_eq!(ThemeColors::current(false).link, ThemeColors::LIGHT.link);
    }

    #[test]
    fn test_active_match_stands_out_from_hits() {
        for palette in [&ThemeColors::DARK, &ThemeColors::LIGHT] {
            assert_ne!(palette.search_hit_bg, palette.search_active_bg);
        }
    }

    #[test]
    fn test_status_colors_follow_level() {
        let palette = &ThemeColors::LIGHT;
        assert_eq!(palette.status_color(StatusLevel::Info), palette.status_ready);
        assert_eq!(
            palette.status_color(StatusLevel::Loading),
            palette.status_loading
        );
        assert_eq!(palette.status_color(StatusLevel::Error), palette.status_error);
    }

    #[test]
    fn test_apply_dark_mode_visuals_toggles() {
        let ctx = egui::Context::default();
        apply_dark_mode_visuals(&ctx, true);
        assert!(ctx.style().visuals.dark_mode);
        assert_eq!(ctx.style().visuals.panel_fill, Color32::BLACK);

        apply_dark_mode_visuals(&ctx, false);
        assert!(!ctx.style().visuals.dark_mode);
    }
}
