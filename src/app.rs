use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SpcViewerApp {
    pub state: AppState,
}

impl SpcViewerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for SpcViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Controls: date range, table, status buttons ----
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            panels::controls(ui, &mut self.state);
            ui.add_space(4.0);
        });

        // ---- Bottom panel: selected points table ----
        egui::TopBottomPanel::bottom("table_panel")
            .resizable(true)
            .default_height(260.0)
            .show(ctx, |ui| {
                table::selected_table(ui, &mut self.state);
            });

        // ---- Central panel: history plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("History Point");
            plot::history_plot(ui, &mut self.state);
        });
    }
}
