use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::data::model::{Row, RowId, Status};
use crate::data::query::{run_query, SortColumn, TablePage, TableQuery};
use crate::data::store::DatasetStore;
use crate::data::threshold::{calculate_threshold, Threshold};

// ---------------------------------------------------------------------------
// Chart types
// ---------------------------------------------------------------------------

/// Rectangle on the chart, in data coordinates. Corners may come in any order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBounds {
    pub x0: NaiveDateTime,
    pub x1: NaiveDateTime,
    pub y0: f64,
    pub y1: f64,
}

impl SelectionBounds {
    /// Whether `(x, y)` lies inside the rectangle, edges included.
    pub fn contains(&self, x: NaiveDateTime, y: f64) -> bool {
        let (x_lo, x_hi) = (self.x0.min(self.x1), self.x0.max(self.x1));
        let (y_lo, y_hi) = (self.y0.min(self.y1), self.y0.max(self.y1));
        x_lo <= x && x <= x_hi && y_lo <= y && y <= y_hi
    }
}

/// What the chart reported for the user's last box selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSelection {
    pub bounds: Option<SelectionBounds>,
    /// Labels (row ids) of the points inside the selection.
    pub labels: Vec<RowId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub id: RowId,
    pub inserted_at: NaiveDateTime,
    pub metric: f64,
    pub status: Status,
    /// Point belongs to the current selection.
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub points: Vec<ChartPoint>,
    /// Rectangle drawn over the chart, `None` only for an empty dataset.
    pub selection_bounds: Option<SelectionBounds>,
    /// Visible x-axis range: the date range padded by an hour on each side.
    pub x_range: (NaiveDateTime, NaiveDateTime),
    /// Control limits; `None` when they are undefined.
    pub threshold: Option<Threshold>,
}

impl ChartData {
    /// Labels of the displayed points that fall inside `bounds`.
    pub fn points_within(&self, bounds: &SelectionBounds) -> Vec<RowId> {
        self.points
            .iter()
            .filter(|p| bounds.contains(p.inserted_at, p.metric))
            .map(|p| p.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Evaluation cycle types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    SetUsed,
    SetIgnore,
    NoOp,
}

/// The interaction that caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    DateRange,
    TableChanged,
    ChartSelected,
    FilterIn,
    FilterOut,
    Page,
    Sort,
    FilterQuery,
}

impl Trigger {
    pub fn status_action(&self) -> StatusAction {
        match self {
            Trigger::FilterIn => StatusAction::SetUsed,
            Trigger::FilterOut => StatusAction::SetIgnore,
            _ => StatusAction::NoOp,
        }
    }
}

/// Current state of every input widget.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub table_name: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub selection: Option<ChartSelection>,
    pub page_index: usize,
    pub page_size: usize,
    pub sort: Vec<SortColumn>,
    pub filter_query: String,
}

/// Outputs of one evaluation.
#[derive(Debug, Clone)]
pub struct View {
    pub chart: ChartData,
    pub table: TablePage,
    /// Page actually shown (reset to 0 after a chart selection).
    pub page_index: usize,
    /// Selection that remains active (cleared after a table change).
    pub selection: Option<ChartSelection>,
}

// ---------------------------------------------------------------------------
// Dashboard – owns the store and exposes the core operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    store: DatasetStore,
}

impl Dashboard {
    pub fn new(store: DatasetStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Swap in a freshly loaded dataset.
    pub fn replace_store(&mut self, store: DatasetStore) {
        self.store = store;
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.store.table_names()
    }

    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.store.date_bounds()
    }

    /// Ids in scope: every row, narrowed to the reported labels when the
    /// chart selection contains at least one point.
    pub fn resolve_selection(&self, selection: Option<&ChartSelection>) -> BTreeSet<RowId> {
        let all = self.store.get_all().iter().map(|row| row.id);
        match selection {
            Some(sel) if !sel.labels.is_empty() => {
                let labels: BTreeSet<RowId> = sel.labels.iter().copied().collect();
                all.filter(|id| labels.contains(id)).collect()
            }
            _ => all.collect(),
        }
    }

    /// Set the status of the selected rows of `table_name`.
    ///
    /// Returns the number of rows whose status changed.
    pub fn apply_status(
        &mut self,
        action: StatusAction,
        selected_ids: &BTreeSet<RowId>,
        table_name: &str,
    ) -> usize {
        let status = match action {
            StatusAction::SetUsed => Status::Used,
            StatusAction::SetIgnore => Status::Ignore,
            StatusAction::NoOp => return 0,
        };
        let resolved: BTreeSet<RowId> = self
            .store
            .get_all()
            .iter()
            .filter(|row| row.table_name == table_name && selected_ids.contains(&row.id))
            .map(|row| row.id)
            .collect();
        let changed = self.store.set_status(&resolved, status);
        log::info!(
            "marked {changed} of {} selected rows in table {table_name} as {status}",
            resolved.len()
        );
        changed
    }

    /// Points, selection rectangle and control limits for one table and
    /// the half-open date range `[date_start, date_end)`.
    pub fn compute_chart(
        &self,
        table_name: &str,
        date_start: NaiveDate,
        date_end: NaiveDate,
        selected_ids: &BTreeSet<RowId>,
        selection_bounds: Option<SelectionBounds>,
    ) -> ChartData {
        let start = midnight(date_start);
        let end = midnight(date_end);

        let rows: Vec<&Row> = self
            .store
            .get_all()
            .iter()
            .filter(|row| row.table_name == table_name && start <= row.inserted_at && row.inserted_at < end)
            .collect();

        let threshold = calculate_threshold(rows.iter().copied());
        if threshold.is_none() {
            log::debug!("no control limits for table {table_name}: fewer than two used points");
        }

        let points = rows
            .iter()
            .map(|row| ChartPoint {
                id: row.id,
                inserted_at: row.inserted_at,
                metric: row.metric,
                status: row.status,
                selected: selected_ids.contains(&row.id),
            })
            .collect();

        ChartData {
            points,
            selection_bounds: selection_bounds.or_else(|| self.full_extent()),
            x_range: (
                start.checked_sub_signed(Duration::hours(1)).unwrap_or(start),
                end.checked_add_signed(Duration::hours(1)).unwrap_or(end),
            ),
            threshold,
        }
    }

    /// One page of the selected rows of `table_name` after filtering and sorting.
    pub fn compute_table_page(
        &self,
        table_name: &str,
        selected_ids: &BTreeSet<RowId>,
        page_index: usize,
        page_size: usize,
        sort: &[SortColumn],
        filter_query: &str,
    ) -> TablePage {
        run_query(
            self.store.get_all(),
            &TableQuery {
                table_name,
                selected_ids,
                page_index,
                page_size,
                sort,
                filter_query,
            },
        )
    }

    /// Run one interaction: resolve the selection, apply any status change,
    /// then recompute chart and table so they reflect the change.
    pub fn evaluate(&mut self, request: &ViewRequest, trigger: Trigger) -> View {
        let selection = match trigger {
            Trigger::TableChanged => None,
            _ => request.selection.clone(),
        };
        let page_index = match trigger {
            Trigger::ChartSelected => 0,
            _ => request.page_index,
        };
        log::debug!(
            "evaluate {trigger:?}: table={} page={page_index} filter='{}'",
            request.table_name,
            request.filter_query
        );

        let selected = self.resolve_selection(selection.as_ref());
        self.apply_status(trigger.status_action(), &selected, &request.table_name);

        let chart = self.compute_chart(
            &request.table_name,
            request.date_start,
            request.date_end,
            &selected,
            selection.as_ref().and_then(|s| s.bounds),
        );
        let table = self.compute_table_page(
            &request.table_name,
            &selected,
            page_index,
            request.page_size,
            &request.sort,
            &request.filter_query,
        );

        View {
            chart,
            table,
            page_index,
            selection,
        }
    }

    /// Min/max of time and metric over the whole dataset.
    fn full_extent(&self) -> Option<SelectionBounds> {
        let (x0, x1) = self.store.date_bounds()?;
        let metrics = self.store.get_all().iter().map(|row| row.metric).filter(|m| !m.is_nan());
        let (y0, y1) = metrics.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| {
            (lo.min(m), hi.max(m))
        });
        if y0 > y1 {
            return None;
        }
        Some(SelectionBounds { x0, x1, y0, y1 })
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}
