//! Reading and writing tables as CSV and Parquet.

use super::{Column, Table, TableError};
use crate::error::{EnigmaError, Result};
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use enigma_abstraction::Value;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// On-disk table formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// `.csv` or `.parquet`/`.pq`, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            Some(other) => Err(EnigmaError::UnsupportedFormat(format!(".{other}"))),
            None => Err(EnigmaError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
        }
    }
}

/// Reads a table, picking the format from the extension.
pub fn read_table(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    if !path.exists() {
        return Err(EnigmaError::DatasetNotFound(path.to_path_buf()));
    }
    let table = match format {
        TableFormat::Csv => read_csv(BufReader::new(File::open(path)?))?,
        TableFormat::Parquet => read_parquet(path)?,
    };
    debug!(path = %path.display(), rows = table.n_rows(), cols = table.n_cols(), "Table loaded");
    Ok(table)
}

/// Writes a table, picking the format from the extension.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_csv(table, &mut writer)?;
            writer.flush()?;
        }
        TableFormat::Parquet => write_parquet(table, path)?,
    }
    debug!(path = %path.display(), rows = table.n_rows(), "Table written");
    Ok(())
}

/// Parses CSV with a header row, inferring each cell's type.
pub fn read_csv(reader: impl Read) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut columns: Vec<Column> =
        rdr.headers()?.iter().map(|name| Column::new(name, Vec::new())).collect();

    for record in rdr.records() {
        let record = record?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.values.push(parse_cell(cell));
        }
    }
    Ok(Table::from_columns(columns)?)
}

/// Empty cells are missing; then integer, float, boolean, and finally text.
fn parse_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::Float(f);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(cell.to_string()),
    }
}

pub fn write_csv(table: &Table, writer: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.column_names())?;
    for row in 0..table.n_rows() {
        wtr.write_record(table.columns().iter().map(|c| format_cell(&c.values[row])))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Whole floats keep a decimal point so they read back as floats.
fn format_cell(value: &Value) -> String {
    match value {
        v if v.is_missing() => String::new(),
        Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => format!("{x:.1}"),
        other => other.to_string(),
    }
}

pub fn read_parquet(path: &Path) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let mut columns: Vec<Column> =
        builder.schema().fields().iter().map(|f| Column::new(f.name().clone(), Vec::new())).collect();

    for batch in builder.build()? {
        let batch = batch?;
        for (column, array) in columns.iter_mut().zip(batch.columns()) {
            append_array(column, array.as_ref())?;
        }
    }
    Ok(Table::from_columns(columns)?)
}

fn append_array(column: &mut Column, array: &dyn Array) -> Result<()> {
    let values = &mut column.values;
    match array.data_type() {
        DataType::Boolean => {
            let a = array.as_boolean();
            values.extend((0..a.len()).map(|i| if a.is_null(i) { Value::Null } else { Value::Bool(a.value(i)) }));
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let cast = cast(array, &DataType::Int64)?;
            let a = cast.as_primitive::<Int64Type>();
            values.extend((0..a.len()).map(|i| if a.is_null(i) { Value::Null } else { Value::Int(a.value(i)) }));
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let cast = cast(array, &DataType::Float64)?;
            let a = cast.as_primitive::<Float64Type>();
            values.extend((0..a.len()).map(|i| if a.is_null(i) { Value::Null } else { Value::Float(a.value(i)) }));
        }
        DataType::Utf8 => extend_strings(values, array.as_string::<i32>()),
        DataType::LargeUtf8 => extend_strings(values, array.as_string::<i64>()),
        _ => {
            let cast = cast(array, &DataType::Utf8)?;
            extend_strings(values, cast.as_string::<i32>());
        }
    }
    Ok(())
}

fn extend_strings<O: arrow::array::OffsetSizeTrait>(
    values: &mut Vec<Value>,
    array: &arrow::array::GenericStringArray<O>,
) {
    values.extend(
        (0..array.len())
            .map(|i| if array.is_null(i) { Value::Null } else { Value::Str(array.value(i).to_string()) }),
    );
}

pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    if table.n_cols() == 0 {
        return Err(TableError::NoColumns.into());
    }
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = table
        .columns()
        .iter()
        .map(|column| {
            let array = column_to_array(column);
            (Field::new(column.name.clone(), array.data_type().clone(), true), array)
        })
        .unzip();

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;
    let mut writer = ArrowWriter::try_new(File::create(path)?, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Int64 if every present value is an integer, Float64 if numeric, Boolean
/// if boolean, otherwise text. Missing values become nulls.
fn column_to_array(column: &Column) -> ArrayRef {
    let present: Vec<&Value> = column.values.iter().filter(|v| !v.is_missing()).collect();
    let values = &column.values;

    if !present.is_empty() && present.iter().all(|v| matches!(v, Value::Int(_))) {
        let data: Vec<Option<i64>> =
            values.iter().map(|v| if let Value::Int(i) = v { Some(*i) } else { None }).collect();
        Arc::new(Int64Array::from(data))
    } else if present.iter().all(|v| v.is_numeric()) {
        let data: Vec<Option<f64>> =
            values.iter().map(|v| if v.is_numeric() { v.as_f64() } else { None }).collect();
        Arc::new(Float64Array::from(data))
    } else if present.iter().all(|v| matches!(v, Value::Bool(_))) {
        let data: Vec<Option<bool>> =
            values.iter().map(|v| if let Value::Bool(b) = v { Some(*b) } else { None }).collect();
        Arc::new(BooleanArray::from(data))
    } else {
        let data: Vec<Option<String>> =
            values.iter().map(|v| (!v.is_missing()).then(|| v.to_string())).collect();
        Arc::new(StringArray::from(data))
    }
}
