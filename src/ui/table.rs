use eframe::egui::{self, RichText, TextEdit, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use spc_viewer::{Column, SortDirection};

use crate::color::status_color;
use crate::state::AppState;

const ROW_HEIGHT: f32 = 20.0;

// ---------------------------------------------------------------------------
// Selected points table (bottom panel)
// ---------------------------------------------------------------------------

/// Render the paged table with sortable headers and a filter row.
///
/// Edits are collected while drawing and applied afterwards, so each frame
/// runs at most one evaluation per kind of change.
pub fn selected_table(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Selected Point");

    let Some(view) = &state.view else {
        ui.label("No table selected.");
        return;
    };
    let rows = view.table.rows.clone();
    let page_count = view.table.page_count().max(1);
    let total_rows = view.table.total_rows;

    let mut cells = state.filter_cells.clone();
    let mut sort_clicked: Option<Column> = None;
    let mut edited: Option<Column> = None;

    TableBuilder::new(ui)
        .id_salt("selected_table")
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(TableColumn::remainder().at_least(80.0), Column::ALL.len())
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for column in Column::ALL {
                header.col(|ui| {
                    let label = sort_label(state, column);
                    if ui.button(RichText::new(label).strong()).clicked() {
                        sort_clicked = Some(column);
                    }
                });
            }
        })
        .body(|mut body| {
            body.row(ROW_HEIGHT + 4.0, |mut row| {
                for column in Column::ALL {
                    row.col(|ui| {
                        let text = cells.entry(column).or_default();
                        let response = ui.add(
                            TextEdit::singleline(text)
                                .hint_text("filter data...")
                                .desired_width(f32::INFINITY),
                        );
                        if response.changed() {
                            edited = Some(column);
                        }
                    });
                }
            });

            for record in &rows {
                body.row(ROW_HEIGHT, |mut row| {
                    for column in Column::ALL {
                        row.col(|ui| {
                            let value = record.value(column).to_string();
                            if column == Column::Status {
                                ui.label(RichText::new(value).color(status_color(record.status)));
                            } else {
                                ui.label(value);
                            }
                        });
                    }
                });
            }
        });

    // ---- Pager ----
    let mut new_page: Option<usize> = None;
    ui.horizontal(|ui: &mut Ui| {
        let current = state.page_index;
        if ui.add_enabled(current > 0, egui::Button::new("◀")).clicked() {
            new_page = Some(current - 1);
        }
        ui.label(format!("{} / {page_count}", current + 1));
        if ui
            .add_enabled(current + 1 < page_count, egui::Button::new("▶"))
            .clicked()
        {
            new_page = Some(current + 1);
        }
        ui.separator();
        ui.label(format!("{total_rows} matching rows"));
        let query = state.filter_query();
        if !query.is_empty() {
            ui.separator();
            ui.label(RichText::new(query).weak().monospace());
        }
        if let Some(err) = &state.filter_error {
            ui.separator();
            ui.label(RichText::new(err).color(egui::Color32::RED));
        }
    });

    if let Some(column) = edited {
        let text = cells.remove(&column).unwrap_or_default();
        state.set_filter_cell(column, text);
    }
    if let Some(column) = sort_clicked {
        state.toggle_sort(column);
    }
    if let Some(page) = new_page {
        state.set_page(page);
    }
}

/// Header text with the column's sort arrow and, for multi-sort, its rank.
fn sort_label(state: &AppState, column: Column) -> String {
    let name = column.display_name();
    match state.sort.iter().position(|s| s.column == column) {
        None => name.to_string(),
        Some(rank) => {
            let arrow = match state.sort[rank].direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            };
            if state.sort.len() > 1 {
                format!("{name} {arrow}{}", rank + 1)
            } else {
                format!("{name} {arrow}")
            }
        }
    }
}
