//! Reading preferences: theme, font scale and column width.
//!
//! Values live in a small `key=value` file in the per-user config directory
//! and are written back on every change.

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const THEME_KEY: &str = "theme";
pub const FONT_SCALE_KEY: &str = "fontScale";
pub const WIDTH_MODE_KEY: &str = "widthMode";

pub const MIN_FONT_SCALE: f32 = 0.8;
pub const MAX_FONT_SCALE: f32 = 1.6;
pub const DEFAULT_FONT_SCALE: f32 = 1.0;
pub const FONT_SCALE_STEP: f32 = 0.1;

const SETTINGS_FILE_NAME: &str = "preferences.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidthMode {
    Narrow,
    #[default]
    Comfort,
    Wide,
}

impl WidthMode {
    const ORDER: [WidthMode; 3] = [WidthMode::Narrow, WidthMode::Comfort, WidthMode::Wide];

    pub fn as_str(self) -> &'static str {
        match self {
            WidthMode::Narrow => "narrow",
            WidthMode::Comfort => "comfort",
            WidthMode::Wide => "wide",
        }
    }

    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            WidthMode::Narrow => "Narrow",
            WidthMode::Comfort => "Comfort",
            WidthMode::Wide => "Wide",
        }
    }

    /// Unknown values fall back to [`WidthMode::Comfort`].
    pub fn parse_or_default(value: &str) -> Self {
        Self::ORDER
            .into_iter()
            .find(|mode| mode.as_str() == value.trim())
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        let index = Self::ORDER
            .iter()
            .position(|mode| *mode == self)
            .unwrap_or(1);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    /// Maximum width of the reading column in points.
    pub fn max_width(self) -> f32 {
        match self {
            WidthMode::Narrow => 620.0,
            WidthMode::Comfort => 780.0,
            WidthMode::Wide => 1040.0,
        }
    }
}

/// Clamp to the supported range with two-decimal granularity.
pub fn clamp_font_scale(value: f32) -> f32 {
    if !value.is_finite() {
        return DEFAULT_FONT_SCALE;
    }
    let clamped = value.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
    (clamped * 100.0).round() / 100.0
}

/// Values derived from the preferences that the view applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub dark: bool,
    pub text_scale: f32,
    pub max_width: f32,
}

/// Persistent key-value settings file. Without a path it only keeps values
/// in memory.
#[derive(Debug, Default)]
pub struct SettingsFile {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SettingsFile {
    /// Settings file in the per-user config directory.
    pub fn open_default() -> Self {
        Self::open(config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME)))
    }

    /// Read `path` if it exists. Unreadable files start empty.
    pub fn open(path: Option<PathBuf>) -> Self {
        let values = path
            .as_deref()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|contents| parse_settings(&contents))
            .unwrap_or_default();
        Self { path, values }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating settings dir {}", dir.display()))?;
        }
        let mut contents = String::new();
        for (key, value) in &self.values {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }
}

fn parse_settings(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Per-user config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata).join("MDReader"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return Some(PathBuf::from(home).join("Library/Application Support/MDReader"));
        }
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("mdreader"));
    }
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config/mdreader"));
    }
    None
}

/// Theme, font scale and width mode, persisted on every change.
#[derive(Debug)]
pub struct ReadingPreferences {
    theme: Theme,
    font_scale: f32,
    width_mode: WidthMode,
    store: SettingsFile,
}

impl ReadingPreferences {
    /// Load from `store`. A missing theme follows `system_theme`; invalid
    /// values are normalized and written back.
    pub fn load(store: SettingsFile, system_theme: Theme) -> Self {
        let theme = store
            .get(THEME_KEY)
            .and_then(Theme::parse)
            .unwrap_or(system_theme);
        let font_scale = store
            .get(FONT_SCALE_KEY)
            .and_then(|value| value.trim().parse::<f32>().ok())
            .unwrap_or(DEFAULT_FONT_SCALE);
        let width_mode = store
            .get(WIDTH_MODE_KEY)
            .map(WidthMode::parse_or_default)
            .unwrap_or_default();

        let mut prefs = Self {
            theme,
            font_scale: DEFAULT_FONT_SCALE,
            width_mode,
            store,
        };
        prefs.set_theme(theme);
        prefs.set_font_scale(font_scale);
        prefs.set_width(width_mode);
        prefs
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn font_scale(&self) -> f32 {
        self.font_scale
    }

    pub fn width_mode(&self) -> WidthMode {
        self.width_mode
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            dark: self.theme.is_dark(),
            text_scale: self.font_scale,
            max_width: self.width_mode.max_width(),
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.persist(THEME_KEY, theme.as_str());
    }

    /// Session-only theme, not written to the settings file.
    pub fn override_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn toggle_theme(&mut self) {
        self.set_theme(self.theme.toggled());
    }

    pub fn set_font_scale(&mut self, scale: f32) {
        self.font_scale = clamp_font_scale(scale);
        let value = self.font_scale.to_string();
        self.persist(FONT_SCALE_KEY, &value);
    }

    /// Adjust by `delta` (normally ±[`FONT_SCALE_STEP`]).
    pub fn step_font_scale(&mut self, delta: f32) {
        self.set_font_scale(self.font_scale + delta);
    }

    /// Set from a stored or user-supplied name; invalid names become comfort.
    pub fn set_width_mode(&mut self, mode: &str) {
        self.set_width(WidthMode::parse_or_default(mode));
    }

    pub fn set_width(&mut self, mode: WidthMode) {
        self.width_mode = mode;
        self.persist(WIDTH_MODE_KEY, mode.as_str());
    }

    pub fn cycle_width_mode(&mut self) {
        self.set_width(self.width_mode.next());
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            log::warn!("Failed to save preference {key}: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock")
    }

    struct EnvGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, original }
        }

        fn unset(key: &'static str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                std::env::set_var(self.key, value);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn memory_prefs() -> ReadingPreferences {
        ReadingPreferences::load(SettingsFile::in_memory(), Theme::Light)
    }

    #[test]
    fn test_defaults_follow_system_theme() {
        let prefs = ReadingPreferences::load(SettingsFile::in_memory(), Theme::Dark);
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.font_scale(), 1.0);
        assert_eq!(prefs.width_mode(), WidthMode::Comfort);
    }

    #[test]
    fn test_font_scale_is_clamped() {
        let mut prefs = memory_prefs();
        for _ in 0..20 {
            prefs.step_font_scale(FONT_SCALE_STEP);
            assert!(prefs.font_scale() <= MAX_FONT_SCALE);
        }
        assert_eq!(prefs.font_scale(), 1.6);
        prefs.step_font_scale(FONT_SCALE_STEP);
        assert_eq!(prefs.font_scale(), 1.6);

        for _ in 0..20 {
            prefs.step_font_scale(-FONT_SCALE_STEP);
            assert!(prefs.font_scale() >= MIN_FONT_SCALE);
        }
        assert_eq!(prefs.font_scale(), 0.8);
    }

    #[test]
    fn test_font_scale_steps_land_on_two_decimals() {
        let mut prefs = memory_prefs();
        prefs.step_font_scale(FONT_SCALE_STEP);
        prefs.step_font_scale(FONT_SCALE_STEP);
        prefs.step_font_scale(FONT_SCALE_STEP);
        assert_eq!(prefs.font_scale(), 1.3);
        assert_eq!(clamp_font_scale(f32::NAN), 1.0);
        assert_eq!(clamp_font_scale(5.0), 1.6);
        assert_eq!(clamp_font_scale(1.234), 1.23);
    }

    #[test]
    fn test_width_mode_cycles_and_wraps() {
        let mut prefs = memory_prefs();
        prefs.set_width(WidthMode::Narrow);
        prefs.cycle_width_mode();
        assert_eq!(prefs.width_mode(), WidthMode::Comfort);
        prefs.cycle_width_mode();
        assert_eq!(prefs.width_mode(), WidthMode::Wide);
        prefs.cycle_width_mode();
        assert_eq!(prefs.width_mode(), WidthMode::Narrow);
    }

    #[test]
    fn test_invalid_width_normalizes_to_comfort() {
        let mut prefs = memory_prefs();
        prefs.set_width_mode("wide");
        assert_eq!(prefs.width_mode(), WidthMode::Wide);
        prefs.set_width_mode("enormous");
        assert_eq!(prefs.width_mode(), WidthMode::Comfort);
    }

    #[test]
    fn test_toggle_theme_and_presentation() {
        let mut prefs = memory_prefs();
        prefs.toggle_theme();
        prefs.set_width(WidthMode::Narrow);
        let presentation = prefs.presentation();
        assert!(presentation.dark);
        assert_eq!(presentation.text_scale, 1.0);
        assert_eq!(presentation.max_width, WidthMode::Narrow.max_width());
    }

    #[test]
    fn test_preferences_persist_across_loads() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("nested").join(SETTINGS_FILE_NAME);

        let mut prefs = ReadingPreferences::load(SettingsFile::open(Some(path.clone())), Theme::Light);
        prefs.set_theme(Theme::Dark);
        prefs.set_font_scale(1.2);
        prefs.set_width(WidthMode::Wide);

        let contents = fs::read_to_string(&path).expect("settings written");
        assert!(contents.contains("theme=dark"));
        assert!(contents.contains("fontScale=1.2"));
        assert!(contents.contains("widthMode=wide"));

        let reloaded = ReadingPreferences::load(SettingsFile::open(Some(path)), Theme::Light);
        assert_eq!(reloaded.theme(), Theme::Dark);
        assert_eq!(reloaded.font_scale(), 1.2);
        assert_eq!(reloaded.width_mode(), WidthMode::Wide);
    }

    #[test]
    fn test_invalid_stored_values_are_normalized() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &path,
            "# comment\ntheme=purple\nfontScale=huge\nwidthMode=giant\nnot a pair\n",
        )
        .expect("write settings");

        let prefs = ReadingPreferences::load(SettingsFile::open(Some(path.clone())), Theme::Dark);
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.font_scale(), 1.0);
        assert_eq!(prefs.width_mode(), WidthMode::Comfort);

        let contents = fs::read_to_string(&path).expect("settings rewritten");
        assert!(contents.contains("widthMode=comfort"));
    }

    #[test]
    fn test_out_of_range_stored_scale_is_clamped() {
        let mut store = SettingsFile::in_memory();
        store.set(FONT_SCALE_KEY, "3.5").expect("memory set");
        let prefs = ReadingPreferences::load(store, Theme::Light);
        assert_eq!(prefs.font_scale(), 1.6);
    }

    #[test]
    fn test_override_theme_is_not_persisted() {
        let mut prefs = memory_prefs();
        prefs.override_theme(Theme::Dark);
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.store.get(THEME_KEY), Some("light"));
    }

    #[test]
    fn test_config_dir_falls_back_to_xdg() {
        let _lock = env_lock();
        let temp = TempDir::new().expect("temp dir");
        let _guard_appdata = EnvGuard::unset("APPDATA");
        let _guard_home = EnvGuard::unset("HOME");
        let _guard_xdg = EnvGuard::set("XDG_CONFIG_HOME", temp.path().to_string_lossy().as_ref());

        let dir = config_dir().expect("config dir");
        assert!(dir.starts_with(temp.path()));
        assert!(dir.ends_with("mdreader"));
    }

    #[test]
    fn test_config_dir_none_without_env() {
        let _lock = env_lock();
        let _guard_appdata = EnvGuard::unset("APPDATA");
        let _guard_xdg = EnvGuard::unset("XDG_CONFIG_HOME");
        let _guard_home = EnvGuard::unset("HOME");

        assert!(config_dir().is_none());
        let store = SettingsFile::open_default();
        assert!(store.path().is_none());
    }
}
