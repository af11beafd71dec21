use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Text form of a timestamp cell, both in the table and for `datestartswith`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Row identifier, unique across every table of a dataset.
pub type RowId = u64;

// ---------------------------------------------------------------------------
// Status – whether a point takes part in the control limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Used,
    Ignore,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Used => "used",
            Status::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "used" => Ok(Status::Used),
            "ignore" => Ok(Status::Ignore),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one observation
// ---------------------------------------------------------------------------

/// A single measurement. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub inserted_at: NaiveDateTime,
    pub metric: f64,
    pub table_name: String,
    pub status: Status,
}

impl Row {
    /// Typed value of `column` for this row.
    pub fn value(&self, column: Column) -> CellValue {
        match column {
            Column::Id => CellValue::Integer(self.id as i64),
            Column::InsertedAt => CellValue::Timestamp(self.inserted_at),
            Column::Metric => CellValue::Float(self.metric),
            Column::TableName => CellValue::Text(self.table_name.clone()),
            Column::Status => CellValue::Text(self.status.as_str().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – addressable fields of a row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Id,
    InsertedAt,
    Metric,
    TableName,
    Status,
}

impl Column {
    /// All columns in display order.
    pub const ALL: [Column; 5] = [
        Column::Id,
        Column::InsertedAt,
        Column::Metric,
        Column::TableName,
        Column::Status,
    ];

    /// Header shown in the table and used inside `{…}` filter clauses.
    pub fn display_name(&self) -> &'static str {
        match self {
            Column::Id => "PID",
            Column::InsertedAt => "Inserted",
            Column::Metric => "Metric",
            Column::TableName => "Table",
            Column::Status => "Status",
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::InsertedAt => "inserted_at",
            Column::Metric => "metric",
            Column::TableName => "table_name",
            Column::Status => "status",
        }
    }

    /// Resolve a column from its display or field name, ignoring case.
    pub fn from_name(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL.into_iter().find(|col| {
            col.display_name().eq_ignore_ascii_case(name) || col.field_name().eq_ignore_ascii_case(name)
        })
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Id | Column::Metric => ColumnKind::Numeric,
            Column::InsertedAt => ColumnKind::Timestamp,
            Column::TableName | Column::Status => ColumnKind::Text,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Timestamp,
}

// ---------------------------------------------------------------------------
// CellValue – a single typed cell
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical text rendering, as matched by `datestartswith`.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Natural ordering between two cells of the same column.
    ///
    /// Numbers compare numerically (NaN sorts last via `total_cmp`), text
    /// lexicographically, timestamps chronologically. Cells of different kinds
    /// fall back to a fixed kind order so sorting stays total.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Integer(_) | Float(_) => 0,
                Timestamp(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row() -> Row {
        Row {
            id: 7,
            inserted_at: NaiveDate::from_ymd_opt(2023, 1, 1)
                .unwrap()
                .and_hms_opt(5, 0, 0)
                .unwrap(),
            metric: 12.5,
            table_name: "A".into(),
            status: Status::Ignore,
        }
    }

    #[test]
    fn columns_resolve_by_display_and_field_name() {
        assert_eq!(Column::from_name("Metric"), Some(Column::Metric));
        assert_eq!(Column::from_name("table_name"), Some(Column::TableName));
        assert_eq!(Column::from_name("pid"), Some(Column::Id));
        assert_eq!(Column::from_name(" Inserted "), Some(Column::InsertedAt));
        assert_eq!(Column::from_name("Sample"), None);
    }

    #[test]
    fn row_values_render_canonically() {
        let r = row();
        assert_eq!(r.value(Column::Id), CellValue::Integer(7));
        assert_eq!(r.value(Column::Status).to_text(), "ignore");
        assert_eq!(r.value(Column::InsertedAt).to_text(), "2023-01-01T05:00:00");
        assert_eq!(r.value(Column::InsertedAt).to_string(), "2023-01-01T05:00:00");
    }

    #[test]
    fn status_serializes_as_its_text() {
        assert_eq!(serde_json::to_string(&Status::Ignore).unwrap(), r#""ignore""#);
        assert_eq!(serde_json::to_string(&Status::Used).unwrap(), r#""used""#);
        assert_eq!(" USED ".parse::<Status>(), Ok(Status::Used));
    }

    #[test]
    fn natural_ordering_mixes_integer_and_float() {
        let a = CellValue::Integer(3);
        let b = CellValue::Float(2.5);
        assert_eq!(a.natural_cmp(&b), Ordering::Greater);
        assert_eq!(
            CellValue::Text("a".into()).natural_cmp(&CellValue::Text("b".into())),
            Ordering::Less
        );
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("USED".parse::<Status>(), Ok(Status::Used));
        assert_eq!(" ignore".parse::<Status>(), Ok(Status::Ignore));
        assert!("maybe".parse::<Status>().is_err());
    }
}
