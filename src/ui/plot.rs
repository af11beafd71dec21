use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{Color32, PointerButton, Ui};
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points, Text};

use spc_viewer::{SelectionBounds, Status};

use crate::color::{outline_for, status_color};
use crate::state::AppState;

/// Above this many points the PID labels are left off the markers.
const MAX_LABELLED_POINTS: usize = 150;

// ---------------------------------------------------------------------------
// Axis conversion: timestamps ↔ plot x (seconds since epoch)
// ---------------------------------------------------------------------------

pub fn to_plot_x(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64
}

pub fn from_plot_x(x: f64) -> Option<NaiveDateTime> {
    if !x.is_finite() {
        return None;
    }
    DateTime::from_timestamp(x.round() as i64, 0).map(|dt| dt.naive_utc())
}

fn rectangle(a: [f64; 2], b: [f64; 2]) -> Vec<[f64; 2]> {
    vec![
        [a[0], a[1]],
        [b[0], a[1]],
        [b[0], b[1]],
        [a[0], b[1]],
        [a[0], a[1]],
    ]
}

/// What the user did with the pointer this frame.
#[derive(Default)]
struct PlotInteraction {
    anchor: Option<[f64; 2]>,
    finished: Option<([f64; 2], [f64; 2])>,
    cleared: bool,
}

// ---------------------------------------------------------------------------
// History plot (central panel)
// ---------------------------------------------------------------------------

/// Scatter of the current table with control limits and box selection.
///
/// Primary-drag draws a selection box, double-click clears it.
pub fn history_plot(ui: &mut Ui, state: &mut AppState) {
    let chart = match &state.view {
        Some(view) => &view.chart,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No data loaded  (File → Open…)");
            });
            return;
        }
    };
    let anchor = state.drag_anchor;
    let has_selection = state.selection.as_ref().is_some_and(|s| !s.labels.is_empty());

    let response = Plot::new("history_plot")
        .legend(Legend::default())
        .x_axis_label("Inserted")
        .y_axis_label("Metric")
        .x_axis_formatter(|mark, _range| {
            from_plot_x(mark.value)
                .map(|ts| ts.format("%m-%d %H:%M").to_string())
                .unwrap_or_default()
        })
        .label_formatter(|name, value| {
            let when = from_plot_x(value.x)
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            if name.is_empty() {
                format!("{when}\n{:.2}", value.y)
            } else {
                format!("{name}\n{when}\n{:.2}", value.y)
            }
        })
        .include_x(to_plot_x(chart.x_range.0))
        .include_x(to_plot_x(chart.x_range.1))
        .allow_drag(false)
        .allow_boxed_zoom(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .allow_double_click_reset(false)
        .show(ui, |plot_ui| {
            for status in [Status::Used, Status::Ignore] {
                let points: PlotPoints = chart
                    .points
                    .iter()
                    .filter(|p| p.status == status)
                    .map(|p| [to_plot_x(p.inserted_at), p.metric])
                    .collect();
                plot_ui.points(
                    Points::new(points)
                        .name(status.as_str())
                        .color(status_color(status))
                        .radius(6.0)
                        .filled(true),
                );
            }

            for status in [Status::Used, Status::Ignore] {
                let selected: PlotPoints = chart
                    .points
                    .iter()
                    .filter(|p| has_selection && p.selected && p.status == status)
                    .map(|p| [to_plot_x(p.inserted_at), p.metric])
                    .collect();
                plot_ui.points(
                    Points::new(selected)
                        .color(outline_for(status_color(status)))
                        .radius(8.0)
                        .filled(false),
                );
            }

            if chart.points.len() <= MAX_LABELLED_POINTS {
                for p in &chart.points {
                    plot_ui.text(
                        Text::new(PlotPoint::new(to_plot_x(p.inserted_at), p.metric), p.id.to_string())
                            .color(Color32::BLACK),
                    );
                }
            }

            if let Some(t) = chart.threshold {
                plot_ui.hline(
                    HLine::new(t.upper_limit)
                        .name(format!("Upper Bound:{}", t.upper_limit))
                        .style(LineStyle::dotted_dense())
                        .width(2.0),
                );
                plot_ui.hline(
                    HLine::new(t.lower_limit)
                        .name(format!("Lower Bound:{}", t.lower_limit))
                        .style(LineStyle::dotted_dense())
                        .width(2.0),
                );
            }

            if let Some(b) = chart.selection_bounds {
                plot_ui.line(
                    Line::new(rectangle(
                        [to_plot_x(b.x0), b.y0],
                        [to_plot_x(b.x1), b.y1],
                    ))
                    .style(LineStyle::dotted_loose())
                    .color(Color32::DARK_GRAY)
                    .width(1.0),
                );
            }

            // ---- Box selection ----
            let mut interaction = PlotInteraction {
                anchor,
                ..Default::default()
            };
            let pointer = plot_ui.pointer_coordinate().map(|p| [p.x, p.y]);
            let drag = plot_ui.response().clone();

            if drag.drag_started_by(PointerButton::Primary) {
                interaction.anchor = pointer;
            }
            if let (Some(a), Some(b)) = (interaction.anchor, pointer) {
                if drag.dragged_by(PointerButton::Primary) {
                    plot_ui.line(
                        Line::new(rectangle(a, b))
                            .color(Color32::GRAY)
                            .style(LineStyle::dashed_dense()),
                    );
                }
            }
            if drag.drag_stopped_by(PointerButton::Primary) {
                interaction.finished = interaction.anchor.zip(pointer);
                interaction.anchor = None;
            }
            if drag.double_clicked() {
                interaction.cleared = true;
            }
            interaction
        });

    let interaction = response.inner;
    state.drag_anchor = interaction.anchor;

    if interaction.cleared {
        state.clear_selection();
    } else if let Some((a, b)) = interaction.finished {
        match (from_plot_x(a[0]), from_plot_x(b[0])) {
            (Some(x0), Some(x1)) => state.select_box(SelectionBounds {
                x0,
                x1,
                y0: a[1],
                y1: b[1],
            }),
            _ => log::warn!("box selection outside the time axis ignored"),
        }
    }
}
