//! Fixture helpers shared by the unit tests: in-memory instance tables and
//! Parquet files written into temporary corpus trees.

use std::{fs, path::Path, sync::Arc};

use arrow::array::{
    ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, TimestampMillisecondArray,
};
use parquet::arrow::ArrowWriter;

use crate::{catalog::Instance, schema::FileSchema};

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A two-variable contract keeps fixtures small: columns
/// `[timestamp, A, B, state, class]`.
pub(crate) fn test_contract() -> FileSchema {
    FileSchema::new(["A", "B"])
}

/// Build an in-memory data-file batch for `contract`.
///
/// `columns` supplies every column after the timestamp, in contract order
/// (variables, then state, then class).
pub(crate) fn build_file_batch(
    contract: &FileSchema,
    ts: &[i64],
    columns: &[Vec<Option<f64>>],
) -> RecordBatch {
    assert_eq!(columns.len(), contract.expected_columns().len());

    let mut arrays: Vec<ArrayRef> =
        vec![Arc::new(TimestampMillisecondArray::from(ts.to_vec()))];
    for column in columns {
        arrays.push(Arc::new(Float64Array::from(column.clone())));
    }
    RecordBatch::try_new(contract.file_schema(), arrays).expect("valid fixture batch")
}

/// Build an in-memory instance table (the reader's output shape) with
/// constant metadata columns.
pub(crate) fn build_instance_batch(
    contract: &FileSchema,
    label: i64,
    well: &str,
    id: &str,
    ts: &[i64],
    columns: &[Vec<Option<f64>>],
) -> RecordBatch {
    assert_eq!(columns.len(), contract.expected_columns().len());

    let n = ts.len();
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(ts.to_vec())),
        Arc::new(Int64Array::from(vec![label; n])),
        Arc::new(StringArray::from(vec![well; n])),
        Arc::new(StringArray::from(vec![id; n])),
    ];
    for column in columns {
        arrays.push(Arc::new(Float64Array::from(column.clone())));
    }
    RecordBatch::try_new(contract.instance_schema(), arrays).expect("valid fixture batch")
}

/// Write a data file for `contract` at `path`, creating parent directories.
pub(crate) fn write_data_file(
    path: &Path,
    contract: &FileSchema,
    ts: &[i64],
    columns: &[Vec<Option<f64>>],
) -> TestResult {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let batch = build_file_batch(contract, ts, columns);
    let file = fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Write a deterministic `n_rows`-row instance file under
/// `root/<label>/<stem>.parquet` and return its catalog record.
///
/// Column `A` varies per row, `B` and `state` are frozen at constants, and
/// the first row's class is unlabeled.
pub(crate) fn seed_instance(
    root: &Path,
    contract: &FileSchema,
    label: i64,
    stem: &str,
    n_rows: usize,
) -> Result<Instance, Box<dyn std::error::Error>> {
    let ts: Vec<i64> = (0..n_rows as i64).map(|i| i * 1_000).collect();
    let a: Vec<Option<f64>> = (0..n_rows).map(|i| Some(i as f64)).collect();
    let b = vec![Some(1.0); n_rows];
    let state = vec![Some(0.0); n_rows];
    let class: Vec<Option<f64>> = (0..n_rows)
        .map(|i| (i > 0).then(|| label as f64))
        .collect();

    let path = root.join(label.to_string()).join(format!("{stem}.parquet"));
    write_data_file(&path, contract, &ts, &[a, b, state, class])?;
    Ok(Instance::new(label, path))
}
