mod ui;

use eframe::egui;
use mercari_analyzer::config::{Settings, SETTINGS_FILE};
use tracing::error;
use tracing_subscriber::EnvFilter;
use ui::MarketApp;

fn main() -> eframe::Result<()> {
    let settings = Settings::load(SETTINGS_FILE);

    let level = settings
        .as_ref()
        .map(|s| s.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let settings = settings.unwrap_or_else(|e| {
        error!(error = %e, "could not read {SETTINGS_FILE}, using defaults");
        Settings::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mercari Price Analyzer",
        options,
        Box::new(|cc| {
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(MarketApp::new(settings)))
        }),
    )
}
