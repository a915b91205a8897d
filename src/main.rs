#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // Hide console in release mode

//! MD Reader entry point: parses the command line, claims the single-instance
//! lock (or forwards to the running window), and starts the egui window.

#[cfg(not(test))]
use mdreader::{
    instance_port, resolve_file_argument, single_instance, InstanceRole, MarkdownReaderApp,
    PerfLog, PerfMeta, ReadingPreferences, SettingsFile, ShellEvent, StartupOptions, APP_TITLE,
};
use mdreader::Theme;
#[cfg(not(test))]
use std::sync::Arc;

/// Set to `1` to start with hardware acceleration off.
#[cfg(not(test))]
const DISABLE_GPU_ENV: &str = "MDREADER_DISABLE_GPU";

#[derive(Debug, Default)]
struct CliOptions {
    /// Non-flag arguments, in order. The first existing file among them opens.
    positional: Vec<String>,
    perf_exit: bool,
    theme: Option<Theme>,
}

#[cfg(not(test))]
fn parse_cli_args() -> Result<CliOptions, String> {
    parse_cli_from(std::env::args().skip(1))
}

fn parse_cli_from<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = CliOptions::default();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--perf-exit" => opts.perf_exit = true,
            "--theme" => {
                let value = next_value(&mut iter, "--theme")?;
                opts.theme = Some(parse_theme(&value)?);
            }
            _ => opts.positional.push(arg),
        }
    }

    Ok(opts)
}

fn next_value<I>(iter: &mut I, flag: &str) -> Result<String, String>
where
    I: Iterator<Item = String>,
{
    iter.next()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    Theme::parse(value)
        .ok_or_else(|| format!("Unsupported theme: {value}"))
}

#[cfg(not(test))]
fn main() -> Result<(), eframe::Error> {
    let started = std::time::Instant::now();
    env_logger::init();

    let perf = Arc::new(PerfLog::from_env(started));
    perf.record("main-process-start", &PerfMeta::new());

    let cli = match parse_cli_args() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("{err}");
            return Ok(());
        }
    };
    let initial_file = resolve_file_argument(&cli.positional);

    let instance_lock = match single_instance::acquire(instance_port(), initial_file.as_deref()) {
        Ok(InstanceRole::Primary(lock)) => Some(lock),
        Ok(InstanceRole::Secondary) => {
            log::info!("Handed off to the running {APP_TITLE} window");
            return Ok(());
        }
        Err(err) => {
            log::warn!("Single-instance lock unavailable, continuing without it: {err:#}");
            None
        }
    };

    perf.record("create-window:start", &PerfMeta::new());
    let viewport = egui::ViewportBuilder::default()
        .with_title(APP_TITLE)
        .with_inner_size(egui::Vec2::new(980.0, 720.0))
        .with_min_inner_size(egui::Vec2::new(600.0, 400.0))
        .with_drag_and_drop(true);

    let disable_gpu = gpu_disabled(std::env::var(DISABLE_GPU_ENV).ok().as_deref());
    if disable_gpu {
        perf.record("gpu-disabled", &PerfMeta::new());
    }
    let native_options = eframe::NativeOptions {
        viewport,
        hardware_acceleration: if disable_gpu {
            eframe::HardwareAcceleration::Off
        } else {
            eframe::HardwareAcceleration::Preferred
        },
        ..Default::default()
    };

    let (event_tx, event_rx) = crossbeam_channel::unbounded::<ShellEvent>();
    let startup = StartupOptions {
        initial_file,
        theme_override: cli.theme,
        perf_exit: cli.perf_exit,
    };

    eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(move |cc| {
            let system_theme = if cc.egui_ctx.style().visuals.dark_mode {
                Theme::Dark
            } else {
                Theme::Light
            };
            configure_egui_style(&cc.egui_ctx);

            if let Some(lock) = instance_lock {
                let ctx = cc.egui_ctx.clone();
                if let Err(err) = lock.spawn_listener(event_tx, move || ctx.request_repaint()) {
                    log::warn!("Second launches will open their own window: {err:#}");
                }
            }

            let prefs = ReadingPreferences::load(SettingsFile::open_default(), system_theme);
            let app = MarkdownReaderApp::new(startup, event_rx, Arc::clone(&perf), prefs);
            perf.record("create-window:done", &PerfMeta::new());
            Box::new(app)
        }),
    )
}

#[cfg(test)]
fn main() {}

/// Only the exact value `1` turns hardware acceleration off.
fn gpu_disabled(value: Option<&str>) -> bool {
    value == Some("1")
}

/// Configure egui styling for optimal markdown display
fn configure_egui_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    // Configure spacing for better readability
    style.spacing.item_spacing = egui::Vec2::new(8.0, 6.0);
    style.spacing.button_padding = egui::Vec2::new(8.0, 3.0);
    style.spacing.window_margin = egui::Margin::same(8.0);
    style.spacing.menu_margin = egui::Margin::same(6.0);

    style.visuals.window_rounding = egui::Rounding::same(4.0);
    style.visuals.menu_rounding = egui::Rounding::same(4.0);

    // Set to true black background for maximum contrast
    if style.visuals.dark_mode {
        style.visuals.window_fill = egui::Color32::BLACK;
        style.visuals.panel_fill = egui::Color32::BLACK;
        style.visuals.faint_bg_color = egui::Color32::from_gray(20);
        style.visuals.extreme_bg_color = egui::Color32::BLACK;
    }

    ctx.set_style(style);
}
