use crate::app::TesterApp;
use crate::constants::{APP_NAME, REPAINT_INTERVAL_MS};
use crate::state::{ExecutionMode, ExecutionResult, SelectedAsset};
use eframe::egui;

pub mod format;

use format::{
    format_clock, format_dimensions, format_elapsed_ms, format_kbps, format_megabytes,
    format_percent,
};

/// Button presses collected while drawing, applied once the frame is laid out.
enum UiAction {
    Pick,
    Open(String),
    Play(String),
    ToggleExecution,
    ClosePlayer,
    DismissNotice,
}

impl eframe::App for TesterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.tick();

        let mut style = (*ctx.style()).clone();
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.visuals = egui::Visuals::dark();
        style.visuals.panel_fill = egui::Color32::from_gray(25);
        style.visuals.window_fill = egui::Color32::from_gray(20);
        ctx.set_style(style);

        let mut actions = Vec::new();

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(egui::Color32::from_gray(15)).inner_margin(15.0))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(
                        egui::RichText::new(APP_NAME)
                            .size(28.0)
                            .color(egui::Color32::WHITE)
                            .strong(),
                    );
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_banners(ui, &mut actions);
                section(ui, "1. Pick a video", |ui| self.show_pick_section(ui, &mut actions));
                ui.add_space(15.0);
                section(ui, "2. Set parameters", |ui| self.show_parameters_section(ui));
                ui.add_space(15.0);
                section(ui, "3. Execute", |ui| self.show_execute_section(ui, &mut actions));
            });
        });

        self.show_player(ctx, &mut actions);

        for action in actions {
            self.apply(action);
        }

        if self.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(REPAINT_INTERVAL_MS));
        }
    }
}

impl TesterApp {
    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Pick => self.select_input(),
            UiAction::Open(uri) => self.open(&uri),
            UiAction::Play(uri) => self.play(&uri),
            UiAction::ToggleExecution => self.toggle_execution(),
            UiAction::ClosePlayer => self.close_player(),
            UiAction::DismissNotice => self.coordinator.clear_notice(),
        }
    }

    fn show_banners(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        if let Some(error) = &self.error {
            banner(ui, egui::Color32::from_rgba_premultiplied(200, 50, 50, 50), |ui| {
                ui.label(egui::RichText::new(error).color(egui::Color32::LIGHT_RED));
            });
        }

        if let Some(notice) = self.coordinator.notice() {
            banner(ui, egui::Color32::from_rgba_premultiplied(200, 150, 0, 50), |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(notice).color(egui::Color32::YELLOW));
                    if ui.small_button("✖").clicked() {
                        actions.push(UiAction::DismissNotice);
                    }
                });
            });
        }
    }

    fn show_pick_section(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let enabled = !self.coordinator.is_executing() && !self.coordinator.is_picking();
        if ui.add_enabled(enabled, egui::Button::new("Open picker")).clicked() {
            actions.push(UiAction::Pick);
        }

        if self.coordinator.is_picking() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Waiting for a selection...");
            });
        }

        if let Some(asset) = self.coordinator.asset().filter(|asset| asset.has_uri()) {
            ui.add_space(8.0);
            show_asset(ui, asset);
            media_buttons(ui, &asset.uri, actions);
        }
    }

    fn show_parameters_section(&mut self, ui: &mut egui::Ui) {
        let editable = !self.coordinator.is_executing();

        ui.add_enabled_ui(editable, |ui| {
            ui.horizontal(|ui| {
                let mode = self.coordinator.mode_mut();
                ui.radio_value(mode, ExecutionMode::Compress, "Compress");
                ui.radio_value(mode, ExecutionMode::Command, "Command");
            });
        });

        let hint = match self.coordinator.mode() {
            ExecutionMode::Compress => "Automatic compression settings are used in this mode.",
            ExecutionMode::Command => "The parameters below are passed to ffmpeg as typed.",
        };
        ui.label(egui::RichText::new(hint).color(egui::Color32::GRAY));

        ui.add(
            egui::TextEdit::multiline(self.coordinator.parameters_mut())
                .hint_text("Enter ffmpeg parameters")
                .code_editor()
                .desired_rows(3)
                .desired_width(f32::INFINITY)
                .interactive(editable),
        );
    }

    fn show_execute_section(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        if self.coordinator.is_executing() {
            let progress = self.coordinator.progress();
            info_row(ui, "Executing: ", &format_percent(progress));
            ui.add(egui::ProgressBar::new(progress as f32).animate(true));
            ui.add_space(12.0);
        }

        if let Some(result) = self.coordinator.result() {
            if self.coordinator.phase().is_finished() {
                ui.label(egui::RichText::new("Last run").small().color(egui::Color32::GRAY));
            }
            show_result(ui, result, actions);
            ui.add_space(12.0);
        }

        let (label, enabled) = if self.coordinator.is_executing() {
            ("Cancel", true)
        } else {
            ("Start", self.coordinator.asset().is_some())
        };
        let button = egui::Button::new(egui::RichText::new(label).size(16.0))
            .fill(egui::Color32::from_rgb(0x84, 0x15, 0x84));
        if ui.add_enabled(enabled, button).clicked() {
            actions.push(UiAction::ToggleExecution);
        }
    }

    fn show_player(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let Some(uri) = self.player.player_uri() else {
            return;
        };

        egui::Window::new("Player")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(uri).monospace());
                match self.player.last_error() {
                    Some(error) => {
                        ui.label(egui::RichText::new(error).color(egui::Color32::LIGHT_RED));
                    }
                    None => {
                        ui.label("Playing in a separate window.");
                    }
                }
                ui.add_space(8.0);
                if ui.button("Close").clicked() {
                    actions.push(UiAction::ClosePlayer);
                }
            });
    }
}

fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(egui::Color32::from_gray(30))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_gray(45)))
        .rounding(10.0)
        .inner_margin(20.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading(egui::RichText::new(title).color(egui::Color32::WHITE).size(18.0));
            ui.add_space(12.0);
            add_contents(ui);
        });
}

fn banner(ui: &mut egui::Ui, fill: egui::Color32, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(fill)
        .rounding(8.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui);
        });
    ui.add_space(10.0);
}

fn info_row(ui: &mut egui::Ui, title: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(title).strong());
        ui.label(value);
    });
}

fn show_asset(ui: &mut egui::Ui, asset: &SelectedAsset) {
    ui.label(egui::RichText::new(&asset.uri).monospace().color(egui::Color32::LIGHT_GRAY));
    if let Some(size) = asset.file_size {
        info_row(ui, "Size: ", &format_megabytes(size));
    }
    if let Some(duration) = asset.duration {
        info_row(ui, "Duration: ", &format_clock(duration));
    }
    if let Some(bitrate) = asset.bitrate {
        info_row(ui, "Bitrate: ", &format_kbps(bitrate));
    }
    if let (Some(width), Some(height)) = (asset.width, asset.height) {
        info_row(ui, "Dimensions: ", &format_dimensions(width, height));
    }
}

fn show_result(ui: &mut egui::Ui, result: &ExecutionResult, actions: &mut Vec<UiAction>) {
    match result {
        ExecutionResult::Success {
            output_uri,
            file_size_bytes,
            elapsed_ms,
        } => {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Result: ").strong().color(egui::Color32::GREEN));
                ui.label(egui::RichText::new("Success").color(egui::Color32::GREEN));
            });
            ui.label(egui::RichText::new(output_uri).monospace().color(egui::Color32::LIGHT_GRAY));
            info_row(ui, "Size: ", &format_megabytes(*file_size_bytes));
            info_row(ui, "Execution time: ", &format_elapsed_ms(*elapsed_ms));
            media_buttons(ui, output_uri, actions);
        }
        ExecutionResult::Failure { error_text } => {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Result: ").strong().color(egui::Color32::RED));
                ui.label(egui::RichText::new(error_text).color(egui::Color32::RED));
            });
        }
    }
}

fn media_buttons(ui: &mut egui::Ui, uri: &str, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        if ui.button("Open").clicked() {
            actions.push(UiAction::Open(uri.to_string()));
        }
        if ui.button("Play").clicked() {
            actions.push(UiAction::Play(uri.to_string()));
        }
    });
}
