//! Statistical process control core: an in-memory measurement store, 3σ
//! control limits, a small filter-query language and the table query
//! pipeline behind the SPC viewer.

pub mod dashboard;
pub mod data;

pub use dashboard::{
    ChartData, ChartPoint, ChartSelection, Dashboard, SelectionBounds, StatusAction, Trigger, View,
    ViewRequest,
};
pub use data::model::{CellValue, Column, Row, RowId, Status};
pub use data::query::{SortColumn, SortDirection, TablePage};
pub use data::store::{DatasetStore, StoreError};
pub use data::threshold::Threshold;
