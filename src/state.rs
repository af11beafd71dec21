use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use spc_viewer::data::filter::{build_query, check_cell};
use spc_viewer::{
    ChartSelection, Column, Dashboard, DatasetStore, SelectionBounds, SortColumn, SortDirection,
    Trigger, View, ViewRequest,
};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Owns the dataset; every read and write goes through it.
    pub dashboard: Dashboard,

    /// Table shown in chart and grid (None for an empty dataset).
    pub table_name: Option<String>,

    pub date_start: NaiveDate,
    pub date_end: NaiveDate,

    /// Last box selection on the chart.
    pub selection: Option<ChartSelection>,

    pub page_index: usize,
    pub page_size: usize,
    pub sort: Vec<SortColumn>,

    /// Raw text of each column's filter cell.
    pub filter_cells: BTreeMap<Column, String>,

    /// Why a filter cell is being ignored, if one is.
    pub filter_error: Option<String>,

    /// Plot coordinate where the current box drag started.
    pub drag_anchor: Option<[f64; 2]>,

    /// Outputs of the last evaluation.
    pub view: Option<View>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, page_size: usize) -> Self {
        let mut state = Self {
            dashboard,
            table_name: None,
            date_start: NaiveDate::default(),
            date_end: NaiveDate::default(),
            selection: None,
            page_index: 0,
            page_size,
            sort: Vec::new(),
            filter_cells: Column::ALL.into_iter().map(|c| (c, String::new())).collect(),
            filter_error: None,
            drag_anchor: None,
            view: None,
            status_message: None,
        };
        state.reset_inputs();
        state.fire(Trigger::Initial);
        state
    }

    /// Ingest a newly loaded dataset and reset every input.
    pub fn set_dataset(&mut self, store: DatasetStore) {
        self.dashboard.replace_store(store);
        self.selection = None;
        self.sort.clear();
        self.filter_cells.values_mut().for_each(String::clear);
        self.filter_error = None;
        self.reset_inputs();
        self.status_message = None;
        self.fire(Trigger::Initial);
    }

    /// First table and the full date span of the current dataset.
    fn reset_inputs(&mut self) {
        self.table_name = self.dashboard.list_tables().into_iter().next();
        if let Some((min, max)) = self.dashboard.date_bounds() {
            self.date_start = min.date();
            self.date_end = max.date();
        }
        self.page_index = 0;
    }

    /// The filter query the table cells currently spell.
    pub fn filter_query(&self) -> String {
        build_query(self.filter_cells.iter().map(|(c, s)| (*c, s.as_str())))
    }

    fn request(&self) -> Option<ViewRequest> {
        Some(ViewRequest {
            table_name: self.table_name.clone()?,
            date_start: self.date_start,
            date_end: self.date_end,
            selection: self.selection.clone(),
            page_index: self.page_index,
            page_size: self.page_size,
            sort: self.sort.clone(),
            filter_query: self.filter_query(),
        })
    }

    /// Run one evaluation cycle and keep its outputs.
    ///
    /// A page index past the last page is pulled back onto it.
    pub fn fire(&mut self, trigger: Trigger) {
        let Some(mut request) = self.request() else {
            self.view = None;
            return;
        };
        let mut view = self.dashboard.evaluate(&request, trigger);
        let last_page = view.table.page_count().saturating_sub(1);
        if view.page_index > last_page {
            request.page_index = last_page;
            request.selection = view.selection.clone();
            view = self.dashboard.evaluate(&request, Trigger::Page);
        }
        self.page_index = view.page_index;
        self.selection = view.selection.clone();
        self.view = Some(view);
    }

    // -- Input handlers --

    pub fn set_table(&mut self, table: String) {
        if self.table_name.as_deref() != Some(table.as_str()) {
            self.table_name = Some(table);
            self.fire(Trigger::TableChanged);
        }
    }

    pub fn dates_changed(&mut self) {
        self.fire(Trigger::DateRange);
    }

    /// Finish a box drag between two plot corners.
    pub fn select_box(&mut self, bounds: SelectionBounds) {
        let labels = self
            .view
            .as_ref()
            .map(|v| v.chart.points_within(&bounds))
            .unwrap_or_default();
        log::debug!("box selection holds {} points", labels.len());
        self.selection = Some(ChartSelection {
            bounds: Some(bounds),
            labels,
        });
        self.fire(Trigger::ChartSelected);
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.fire(Trigger::ChartSelected);
        }
    }

    pub fn filter_in(&mut self) {
        self.fire(Trigger::FilterIn);
    }

    pub fn filter_out(&mut self) {
        self.fire(Trigger::FilterOut);
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
        self.fire(Trigger::Page);
    }

    /// Cycle a column through ascending → descending → unsorted.
    pub fn toggle_sort(&mut self, column: Column) {
        match self.sort.iter().position(|s| s.column == column) {
            Some(i) if self.sort[i].direction == SortDirection::Asc => {
                self.sort[i].direction = SortDirection::Desc;
            }
            Some(i) => {
                self.sort.remove(i);
            }
            None => self.sort.push(SortColumn::asc(column)),
        }
        self.fire(Trigger::Sort);
    }

    pub fn set_filter_cell(&mut self, column: Column, text: String) {
        self.filter_cells.insert(column, text);
        self.filter_error = self
            .filter_cells
            .iter()
            .find_map(|(c, s)| check_cell(*c, s).err())
            .map(|e| e.to_string());
        if let Some(msg) = &self.filter_error {
            log::warn!("{msg}");
        }
        self.fire(Trigger::FilterQuery);
    }

    /// Full timestamp span of the loaded dataset.
    pub fn dataset_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.dashboard.date_bounds()
    }
}
