use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::DatePickerButton;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Controls row – date range, table, status buttons
// ---------------------------------------------------------------------------

/// Render the controls above the chart.
pub fn controls(ui: &mut Ui, state: &mut AppState) {
    let tables = state.dashboard.list_tables();
    if tables.is_empty() {
        ui.label("No dataset loaded.");
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        // ---- Date range ----
        ui.vertical(|ui: &mut Ui| {
            ui.strong("Date Range");
            ui.horizontal(|ui: &mut Ui| {
                let start = ui.add(DatePickerButton::new(&mut state.date_start).id_salt("date_start"));
                ui.label("→");
                let end = ui.add(DatePickerButton::new(&mut state.date_end).id_salt("date_end"));
                if start.changed() || end.changed() {
                    state.dates_changed();
                }
            });
        });

        ui.separator();

        // ---- Table ----
        ui.vertical(|ui: &mut Ui| {
            ui.strong("Table");
            let current = state.table_name.clone().unwrap_or_default();
            let mut picked: Option<String> = None;
            egui::ComboBox::from_id_salt("table")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for table in &tables {
                        if ui.selectable_label(current == *table, table).clicked() {
                            picked = Some(table.clone());
                        }
                    }
                });
            if let Some(table) = picked {
                state.set_table(table);
            }
        });

        ui.separator();

        // ---- Status buttons ----
        if ui.button("Filter In").on_hover_text("Mark selected points as used").clicked() {
            state.filter_in();
        }
        if ui
            .button("Filter Out")
            .on_hover_text("Mark selected points as ignore")
            .clicked()
        {
            state.filter_out();
        }

        if let Some(view) = &state.view {
            ui.separator();
            match view.chart.threshold {
                Some(t) => ui.label(format!(
                    "Upper Bound: {}   Lower Bound: {}",
                    t.upper_limit, t.lower_limit
                )),
                None => ui.label(RichText::new("No control limits (fewer than two used points)").weak()),
            };
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let store = state.dashboard.store();
        ui.label(format!(
            "{} points in {} tables",
            store.len(),
            state.dashboard.list_tables().len()
        ));
        if let Some((min, max)) = state.dataset_span() {
            ui.label(
                RichText::new(format!(
                    "{} – {}",
                    min.format("%Y-%m-%d"),
                    max.format("%Y-%m-%d")
                ))
                .weak(),
            );
        }
        if let Some(sel) = &state.selection {
            ui.separator();
            ui.label(format!("{} points selected (double-click chart to clear)", sel.labels.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open measurement history")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        match spc_viewer::data::loader::load_file(&path) {
            Ok(store) => {
                log::info!(
                    "Loaded {} points from {} with tables {:?}",
                    store.len(),
                    path.display(),
                    store.table_names()
                );
                state.set_dataset(store);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
