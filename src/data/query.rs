use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use super::filter::{parse_query, FilterOp, FilterValue, Predicate};
use super::model::{CellValue, Column, Row, RowId, TIMESTAMP_FORMAT};

// ---------------------------------------------------------------------------
// Query inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One key of a multi-column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortColumn {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortColumn {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Everything the table view asks for in one request.
#[derive(Debug, Clone, Copy)]
pub struct TableQuery<'a> {
    pub table_name: &'a str,
    pub selected_ids: &'a BTreeSet<RowId>,
    pub page_index: usize,
    pub page_size: usize,
    pub sort: &'a [SortColumn],
    pub filter_query: &'a str,
}

/// One page of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    pub rows: Vec<Row>,
    /// Rows matching the query before pagination.
    pub total_rows: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl TablePage {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total_rows.div_ceil(self.page_size)
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline: restrict → filter → sort → paginate
// ---------------------------------------------------------------------------

/// Run the table query over `rows`. Never mutates its input.
pub fn run_query(rows: &[Row], query: &TableQuery<'_>) -> TablePage {
    let mut matched: Vec<&Row> = rows
        .iter()
        .filter(|row| row.table_name == query.table_name && query.selected_ids.contains(&row.id))
        .collect();

    for predicate in resolve_predicates(query.filter_query) {
        matched.retain(|row| predicate.matches(row));
    }

    if !query.sort.is_empty() {
        // `sort_by` is stable: ties keep their previous relative order.
        matched.sort_by(|a, b| compare_rows(a, b, query.sort));
    }

    let total_rows = matched.len();
    let start = query.page_index.saturating_mul(query.page_size);
    let end = start.saturating_add(query.page_size).min(total_rows);
    let rows = if start < end {
        matched[start..end].iter().map(|row| (*row).clone()).collect()
    } else {
        Vec::new()
    };

    TablePage {
        rows,
        total_rows,
        page_index: query.page_index,
        page_size: query.page_size,
    }
}

fn compare_rows(a: &Row, b: &Row, sort: &[SortColumn]) -> Ordering {
    for key in sort {
        let ord = a.value(key.column).natural_cmp(&b.value(key.column));
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ---------------------------------------------------------------------------
// Predicate evaluation
// ---------------------------------------------------------------------------

/// A predicate whose column name has been resolved.
struct ColumnPredicate {
    column: Column,
    op: FilterOp,
    value: FilterValue,
}

fn resolve_predicates(filter_query: &str) -> Vec<ColumnPredicate> {
    parse_query(filter_query)
        .into_iter()
        .enumerate()
        .filter_map(|(i, parsed)| {
            let Some(Predicate { column, op, value }) = parsed else {
                log::debug!("skipping filter clause {i}: no operator recognised");
                return None;
            };
            match Column::from_name(&column) {
                Some(column) => Some(ColumnPredicate { column, op, value }),
                None => {
                    log::warn!("skipping filter on unknown column '{column}'");
                    None
                }
            }
        })
        .collect()
}

impl ColumnPredicate {
    fn matches(&self, row: &Row) -> bool {
        let cell = row.value(self.column);
        match self.op {
            FilterOp::Contains => match &cell {
                CellValue::Text(text) => text.contains(&self.value.as_text()),
                _ => false,
            },
            FilterOp::DateStartsWith => {
                let prefix = self.value.as_text();
                match &cell {
                    // `2023-01-01 05` and `2023-01-01T05` name the same prefix.
                    CellValue::Timestamp(_) => {
                        cell.to_text().starts_with(&prefix.replacen(' ', "T", 1))
                    }
                    _ => cell.to_text().starts_with(&prefix),
                }
            }
            op => match compare_cell(&cell, &self.value) {
                Some(ord) => match op {
                    FilterOp::Eq => ord == Ordering::Equal,
                    FilterOp::Ne => ord != Ordering::Equal,
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Le => ord != Ordering::Greater,
                    FilterOp::Gt => ord == Ordering::Greater,
                    FilterOp::Ge => ord != Ordering::Less,
                    FilterOp::Contains | FilterOp::DateStartsWith => false,
                },
                None => op == FilterOp::Ne,
            },
        }
    }
}

/// Compare a cell against a filter value; `None` when the two are incomparable.
fn compare_cell(cell: &CellValue, value: &FilterValue) -> Option<Ordering> {
    match (cell, value) {
        (CellValue::Integer(_) | CellValue::Float(_), FilterValue::Number(n)) => {
            cell.as_f64()?.partial_cmp(n)
        }
        (CellValue::Text(text), FilterValue::Text(v)) => Some(text.as_str().cmp(v.as_str())),
        (CellValue::Timestamp(ts), FilterValue::Text(v)) => parse_timestamp(v).map(|t| ts.cmp(&t)),
        _ => None,
    }
}

/// Parse the date/time spellings a filter value may use.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Status;
    use chrono::Duration;

    fn ts(hour: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(hour)
    }

    /// Rows for table "A" with the given metrics, ids starting at 0, plus two
    /// rows in table "B".
    fn dataset(metrics: &[f64]) -> Vec<Row> {
        let mut rows: Vec<Row> = metrics
            .iter()
            .enumerate()
            .map(|(i, m)| Row {
                id: i as RowId,
                inserted_at: ts(i as i64),
                metric: *m,
                table_name: "A".into(),
                status: Status::Used,
            })
            .collect();
        for i in 0..2 {
            rows.push(Row {
                id: 1000 + i,
                inserted_at: ts(i as i64),
                metric: 20.0,
                table_name: "B".into(),
                status: Status::Used,
            });
        }
        rows
    }

    fn all_ids(rows: &[Row]) -> BTreeSet<RowId> {
        rows.iter().map(|r| r.id).collect()
    }

    fn run(rows: &[Row], filter_query: &str, sort: &[SortColumn], page: usize, size: usize) -> TablePage {
        let ids = all_ids(rows);
        run_query(
            rows,
            &TableQuery {
                table_name: "A",
                selected_ids: &ids,
                page_index: page,
                page_size: size,
                sort,
                filter_query,
            },
        )
    }

    fn ids(page: &TablePage) -> Vec<RowId> {
        page.rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn paginates_and_returns_empty_past_the_end() {
        let rows = dataset(&[1.0; 12]);
        let page = run(&rows, "", &[], 2, 5);
        assert_eq!(ids(&page), vec![10, 11]);
        assert_eq!(page.total_rows, 12);
        assert_eq!(page.page_count(), 3);

        assert!(run(&rows, "", &[], 3, 5).rows.is_empty());
        assert!(run(&rows, "", &[], usize::MAX, 5).rows.is_empty());
        assert!(run(&rows, "", &[], 0, 0).rows.is_empty());
    }

    #[test]
    fn restricts_to_table_and_selected_ids() {
        let rows = dataset(&[1.0, 2.0, 3.0]);
        let selected: BTreeSet<RowId> = [0, 2, 1000].into_iter().collect();
        let page = run_query(
            &rows,
            &TableQuery {
                table_name: "A",
                selected_ids: &selected,
                page_index: 0,
                page_size: 10,
                sort: &[],
                filter_query: "",
            },
        );
        assert_eq!(ids(&page), vec![0, 2]);
    }

    #[test]
    fn combined_range_filter() {
        let rows = dataset(&[5.0, 10.0, 25.0, 40.0, 41.0, 12.0]);
        let page = run(&rows, "{Metric} ge 10 && {Metric} le 40", &[], 0, 50);
        assert_eq!(ids(&page), vec![1, 2, 3, 5]);
        assert!(page.rows.iter().all(|r| (10.0..=40.0).contains(&r.metric)));
    }

    #[test]
    fn malformed_and_unknown_clauses_are_skipped() {
        let rows = dataset(&[5.0, 10.0]);
        let page = run(&rows, "{Metric} about 3 && {Colour} eq red && {Metric} gt 6", &[], 0, 50);
        assert_eq!(ids(&page), vec![1]);
    }

    #[test]
    fn status_and_text_filters() {
        let mut rows = dataset(&[1.0, 2.0, 3.0]);
        rows[1].status = Status::Ignore;
        assert_eq!(ids(&run(&rows, "{Status} eq 'used'", &[], 0, 50)), vec![0, 2]);
        assert_eq!(ids(&run(&rows, "{Status} ne used", &[], 0, 50)), vec![1]);
        assert_eq!(ids(&run(&rows, "{Status} contains ign", &[], 0, 50)), vec![1]);
        assert_eq!(ids(&run(&rows, "{Table} contains a", &[], 0, 50)), Vec::<RowId>::new());
    }

    #[test]
    fn contains_on_numeric_column_matches_nothing() {
        let rows = dataset(&[1.0, 11.0]);
        assert!(run(&rows, "{Metric} contains 1", &[], 0, 50).rows.is_empty());
    }

    #[test]
    fn incomparable_values_only_pass_ne() {
        let rows = dataset(&[1.0, 2.0]);
        assert!(run(&rows, "{Metric} eq abc", &[], 0, 50).rows.is_empty());
        assert!(run(&rows, "{Metric} lt abc", &[], 0, 50).rows.is_empty());
        assert_eq!(run(&rows, "{Metric} ne abc", &[], 0, 50).total_rows, 2);
    }

    #[test]
    fn timestamps_compare_against_date_text() {
        let rows = dataset(&[1.0; 30]);
        let page = run(&rows, "{Inserted} ge 2023-01-02", &[], 0, 50);
        assert_eq!(ids(&page), (24..30).collect::<Vec<RowId>>());

        let page = run(&rows, "{Inserted} lt 2023-01-01T03:00:00", &[], 0, 50);
        assert_eq!(ids(&page), vec![0, 1, 2]);
    }

    #[test]
    fn date_prefix_matches_canonical_text() {
        let rows = dataset(&[1.0; 30]);
        let page = run(&rows, "{Inserted} datestartswith 2023-01-02", &[], 0, 50);
        assert_eq!(page.total_rows, 6);
        let page = run(&rows, "{Inserted} datestartswith 2023-01-01T1", &[], 0, 50);
        assert_eq!(ids(&page), (10..20).collect::<Vec<RowId>>());
    }

    #[test]
    fn date_prefix_typed_from_the_table_matches() {
        let rows = dataset(&[1.0; 30]);
        let shown = rows[5].value(Column::InsertedAt).to_string();
        assert_eq!(shown, "2023-01-01T05:00:00");

        let query = crate::data::filter::build_query([(Column::InsertedAt, &shown[..13])]);
        assert_eq!(ids(&run(&rows, &query, &[], 0, 50)), vec![5]);

        // A space in place of the `T` still selects the same hour.
        let query = crate::data::filter::build_query([(Column::InsertedAt, "2023-01-01 05")]);
        assert_eq!(query, r#"{Inserted} datestartswith "2023-01-01 05""#);
        assert_eq!(ids(&run(&rows, &query, &[], 0, 50)), vec![5]);
    }

    #[test]
    fn multi_column_sort_is_stable() {
        let mut rows = dataset(&[3.0, 1.0, 3.0, 1.0, 2.0]);
        rows[0].status = Status::Ignore;
        rows[3].status = Status::Ignore;

        let by_metric = [SortColumn::asc(Column::Metric)];
        assert_eq!(ids(&run(&rows, "", &by_metric, 0, 50)), vec![1, 3, 4, 0, 2]);

        let by_status_then_metric = [SortColumn::desc(Column::Status), SortColumn::desc(Column::Metric)];
        assert_eq!(
            ids(&run(&rows, "", &by_status_then_metric, 0, 50)),
            vec![2, 4, 1, 0, 3]
        );
    }

    #[test]
    fn empty_sort_preserves_order() {
        let rows = dataset(&[9.0, 1.0, 5.0]);
        assert_eq!(ids(&run(&rows, "", &[], 0, 50)), vec![0, 1, 2]);
    }
}
