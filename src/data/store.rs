use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;
use thiserror::Error;

use super::model::{Row, RowId, Status};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate row id {0}")]
    DuplicateId(RowId),
}

// ---------------------------------------------------------------------------
// DatasetStore – the in-memory table
// ---------------------------------------------------------------------------

/// Owns every row of the dataset. `set_status` is the only write path.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    rows: Vec<Row>,
}

impl DatasetStore {
    /// Build a store, rejecting datasets whose ids are not unique.
    pub fn new(rows: Vec<Row>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.id) {
                return Err(StoreError::DuplicateId(row.id));
            }
        }
        Ok(Self { rows })
    }

    pub fn get_all(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Set `status` on every row whose id is in `ids`.
    ///
    /// Unknown ids are ignored. Returns how many rows actually changed.
    pub fn set_status(&mut self, ids: &BTreeSet<RowId>, status: Status) -> usize {
        let mut changed = 0;
        for row in self.rows.iter_mut().filter(|row| ids.contains(&row.id)) {
            if row.status != status {
                row.status = status;
                changed += 1;
            }
        }
        log::debug!("set_status({status}) on {} ids, {changed} rows changed", ids.len());
        changed
    }

    /// Sorted, distinct table names.
    pub fn table_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.table_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest `inserted_at` over the whole dataset.
    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.rows.iter().map(|row| row.inserted_at).min()?;
        let max = self.rows.iter().map(|row| row.inserted_at).max()?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn rows() -> Vec<Row> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ["B", "A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, table)| Row {
                id: i as RowId,
                inserted_at: start + Duration::hours(i as i64),
                metric: i as f64,
                table_name: table.to_string(),
                status: Status::Used,
            })
            .collect()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut data = rows();
        data[2].id = 0;
        assert_eq!(DatasetStore::new(data).unwrap_err(), StoreError::DuplicateId(0));
    }

    #[test]
    fn set_status_ignores_unknown_ids_and_counts_changes() {
        let mut store = DatasetStore::new(rows()).unwrap();
        let ids: BTreeSet<RowId> = [1, 2, 99].into_iter().collect();
        assert_eq!(store.set_status(&ids, Status::Ignore), 2);
        // Second application is a no-op.
        assert_eq!(store.set_status(&ids, Status::Ignore), 0);

        let ignored: Vec<RowId> = store
            .get_all()
            .iter()
            .filter(|r| r.status == Status::Ignore)
            .map(|r| r.id)
            .collect();
        assert_eq!(ignored, vec![1, 2]);
    }

    #[test]
    fn table_names_are_sorted_and_distinct() {
        let store = DatasetStore::new(rows()).unwrap();
        assert_eq!(store.table_names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn date_bounds_cover_whole_dataset() {
        let store = DatasetStore::new(rows()).unwrap();
        let (min, max) = store.date_bounds().unwrap();
        assert_eq!(max - min, Duration::hours(3));
        assert!(DatasetStore::default().date_bounds().is_none());
    }
}
