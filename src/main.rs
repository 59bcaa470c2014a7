use anyhow::anyhow;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

mod app;
mod constants;
mod engine;
mod events;
mod services;
mod state;
mod ui;

use app::TesterApp;
use constants::{
    APP_NAME, APP_VERSION, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_WIDTH,
};
use engine::FfmpegEngine;
use services::{ExecutionCoordinator, ServiceManager};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    // Background work runs here; it must outlive the window.
    let runtime = Runtime::new()?;

    let mut coordinator = ExecutionCoordinator::new(ServiceManager::system(), runtime.handle().clone());
    runtime.block_on(coordinator.restore_parameters());

    let ffmpeg_available = runtime.block_on(FfmpegEngine::new().is_available());
    if !ffmpeg_available {
        tracing::warn!("ffmpeg was not found in PATH");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT])
            .with_title(APP_NAME)
            .with_resizable(true),
        ..Default::default()
    };

    let app = TesterApp::new(coordinator, ffmpeg_available);
    let app_creator =
        move |_cc: &eframe::CreationContext| -> Box<dyn eframe::App> { Box::new(app) };
    let result = eframe::run_native(APP_NAME, options, Box::new(app_creator));

    tracing::info!("Application shutting down");
    runtime.shutdown_background();
    result.map_err(|e| anyhow!("UI error: {}", e))
}
