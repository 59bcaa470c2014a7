use crate::services::{ExecutionCoordinator, PlayerService};

pub struct TesterApp {
    pub coordinator: ExecutionCoordinator,
    pub player: PlayerService,
    pub error: Option<String>,
}

impl TesterApp {
    pub fn new(coordinator: ExecutionCoordinator, ffmpeg_available: bool) -> Self {
        let error = if ffmpeg_available {
            None
        } else {
            Some("FFmpeg not found in PATH. Please install FFmpeg.".to_string())
        };

        Self {
            coordinator,
            player: PlayerService::new(),
            error,
        }
    }

    /// Applies finished background work. Called once per frame.
    pub fn tick(&mut self) {
        self.coordinator.pump();
        self.player.poll();
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.is_executing() || self.coordinator.is_picking() || self.player.is_open()
    }

    pub fn select_input(&mut self) {
        self.coordinator.pick_asset();
    }

    pub fn toggle_execution(&mut self) {
        if self.coordinator.is_executing() {
            self.coordinator.cancel();
        } else {
            self.coordinator.start();
        }
    }

    pub fn open(&self, uri: &str) {
        self.coordinator.open(uri);
    }

    pub fn play(&mut self, uri: &str) {
        if let Err(e) = self.player.play(uri) {
            tracing::warn!("Failed to play {}: {}", uri, e);
        }
    }

    pub fn close_player(&mut self) {
        self.player.close();
    }
}
