use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use spc_viewer::data::mock::{history_data, MockConfig};
use spc_viewer::data::model::TIMESTAMP_FORMAT;
use spc_viewer::{Row, Status};

/// Write a mock measurement history that `spc-viewer --data` can open.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Output file; the extension picks the format (.parquet, .csv, .json)
    #[arg(default_value = "sample_data.parquet")]
    output: PathBuf,
    #[arg(long, default_value_t = 100)]
    rows_per_table: usize,
    #[arg(long, value_delimiter = ',', default_value = "A,B,C")]
    tables: Vec<String>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// One record as the viewer's CSV/JSON loaders expect it.
#[derive(Serialize)]
struct Record<'a> {
    #[serde(rename = "PID")]
    id: u64,
    #[serde(rename = "Inserted")]
    inserted: String,
    #[serde(rename = "Metric")]
    metric: f64,
    #[serde(rename = "Table")]
    table: &'a str,
    #[serde(rename = "Status")]
    status: Status,
}

impl<'a> From<&'a Row> for Record<'a> {
    fn from(row: &'a Row) -> Self {
        Record {
            id: row.id,
            inserted: row.inserted_at.format(TIMESTAMP_FORMAT).to_string(),
            metric: row.metric,
            table: &row.table_name,
            status: row.status,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rows = history_data(&MockConfig {
        tables: args.tables.clone(),
        rows_per_table: args.rows_per_table,
        seed: args.seed,
    });

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(&args.output, &rows)?,
        "csv" => write_csv(&args.output, &rows)?,
        "json" => write_json(&args.output, &rows)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!(
        "Wrote {} rows ({} tables) to {}",
        rows.len(),
        args.tables.len(),
        args.output.display()
    );
    Ok(())
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(Record::from(row)).context("writing CSV record")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_json(path: &Path, rows: &[Row]) -> Result<()> {
    let records: Vec<Record<'_>> = rows.iter().map(Record::from).collect();
    let text = serde_json::to_string_pretty(&records).context("encoding JSON")?;
    std::fs::write(path, text).context("writing JSON file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let ids = Int64Array::from(rows.iter().map(|r| r.id as i64).collect::<Vec<_>>());
    let inserted = TimestampMillisecondArray::from(
        rows.iter()
            .map(|r| r.inserted_at.and_utc().timestamp_millis())
            .collect::<Vec<_>>(),
    );
    let metrics = Float64Array::from(rows.iter().map(|r| r.metric).collect::<Vec<_>>());
    let tables = StringArray::from(rows.iter().map(|r| r.table_name.as_str()).collect::<Vec<_>>());
    let statuses = StringArray::from(rows.iter().map(|r| r.status.as_str()).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("PID", DataType::Int64, false),
        Field::new("Inserted", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("Metric", DataType::Float64, false),
        Field::new("Table", DataType::Utf8, false),
        Field::new("Status", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(ids),
            Arc::new(inserted),
            Arc::new(metrics),
            Arc::new(tables),
            Arc::new(statuses),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
