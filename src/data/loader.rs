use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampMillisecondType};
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Column, Row, RowId, Status};
use super::query::parse_timestamp;
use super::store::DatasetStore;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per field (recommended for large histories)
/// * `.json`    – `[{ "PID": 0, "Inserted": ..., "Metric": ..., ... }, ...]`
/// * `.csv`     – header row with the same column names
///
/// Columns may use display names (`PID`, `Inserted`, `Metric`, `Table`,
/// `Status`) or field names (`id`, `inserted_at`, ...). A missing status
/// column means every row is `used`.
pub fn load_file(path: &Path) -> Result<DatasetStore> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    let store = DatasetStore::new(rows).with_context(|| format!("validating {}", path.display()))?;
    Ok(store)
}

// ---------------------------------------------------------------------------
// Records shared by the CSV and JSON loaders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "PID", alias = "pid")]
    id: RowId,
    #[serde(alias = "Inserted")]
    inserted_at: RawTimestamp,
    #[serde(alias = "Metric")]
    metric: f64,
    #[serde(alias = "Table")]
    table_name: String,
    #[serde(alias = "Status", default)]
    status: Option<String>,
}

/// `df.to_json(orient='records')` writes epoch milliseconds, CSV writes text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn resolve(&self) -> Result<NaiveDateTime> {
        match self {
            RawTimestamp::Millis(ms) => from_millis(*ms),
            RawTimestamp::Text(text) => {
                parse_timestamp(text).with_context(|| format!("'{text}' is not a timestamp"))
            }
        }
    }
}

impl RawRecord {
    fn into_row(self) -> Result<Row> {
        let inserted_at = self.inserted_at.resolve()?;
        let status = parse_status(self.status.as_deref())?;
        Ok(Row {
            id: self.id,
            inserted_at,
            metric: self.metric,
            table_name: self.table_name,
            status,
        })
    }
}

fn parse_status(raw: Option<&str>) -> Result<Status> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Status::Used),
        Some(s) => s.parse::<Status>().map_err(|e| anyhow!(e)),
    }
}

fn from_millis(ms: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .with_context(|| format!("timestamp {ms} ms is out of range"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<Row>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<RawRecord> = serde_json::from_str(&text).context("parsing JSON records")?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| rec.into_row().with_context(|| format!("JSON row {i}")))
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let mut rows = Vec::new();
    for (row_no, result) in reader.deserialize::<RawRecord>().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.into_row().with_context(|| format!("CSV row {row_no}"))?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by e.g. `df.to_parquet()`.
///
/// Each column is cast to the type the row needs, so integer ids of any
/// width, float or integer metrics and timestamps of any unit (or ISO text)
/// are accepted.
fn load_parquet(path: &Path) -> Result<Vec<Row>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |wanted: Column, to: &DataType| -> Result<Option<ArrayRef>> {
            let Some(idx) = schema
                .fields()
                .iter()
                .position(|f| Column::from_name(f.name()) == Some(wanted))
            else {
                return Ok(None);
            };
            let array = cast(batch.column(idx), to)
                .with_context(|| format!("casting column '{}' to {to:?}", schema.field(idx).name()))?;
            Ok(Some(array))
        };
        let required = |wanted: Column, to: &DataType| -> Result<ArrayRef> {
            column(wanted, to)?.with_context(|| format!("Parquet file missing '{wanted}' column"))
        };

        let ids = required(Column::Id, &DataType::Int64)?;
        let inserted = required(
            Column::InsertedAt,
            &DataType::Timestamp(TimeUnit::Millisecond, None),
        )?;
        let metrics = required(Column::Metric, &DataType::Float64)?;
        let tables = required(Column::TableName, &DataType::Utf8)?;
        let statuses = column(Column::Status, &DataType::Utf8)?;

        let ids = ids.as_primitive::<Int64Type>();
        let inserted = inserted.as_primitive::<TimestampMillisecondType>();
        let metrics = metrics.as_primitive::<Float64Type>();
        let tables = tables.as_string::<i32>();
        let statuses = statuses.as_ref().map(|s| s.as_string::<i32>());

        for row in 0..batch.num_rows() {
            if ids.is_null(row) || inserted.is_null(row) || tables.is_null(row) {
                bail!("Row {row}: null in a required column");
            }
            let id = RowId::try_from(ids.value(row))
                .with_context(|| format!("Row {row}: negative id {}", ids.value(row)))?;
            let status = match statuses {
                Some(s) if !s.is_null(row) => parse_status(Some(s.value(row))),
                _ => Ok(Status::Used),
            }
            .with_context(|| format!("Row {row}: bad status"))?;

            rows.push(Row {
                id,
                inserted_at: from_millis(inserted.value(row))?,
                metric: if metrics.is_null(row) {
                    f64::NAN
                } else {
                    metrics.value(row)
                },
                table_name: tables.value(row).to_string(),
                status,
            });
        }
    }

    Ok(rows)
}
