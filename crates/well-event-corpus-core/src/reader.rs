//! Single-instance reader.
//!
//! Wires the storage layer to the Parquet decoder: read the whole file into
//! memory, build a `RecordBatch` reader over the bytes, and materialize one
//! table per instance. [`read_file_table`] returns the file exactly as
//! stored; [`read_instance`] additionally validates the column contract,
//! decodes `well` and `id` from the file stem, and prepends the instance
//! metadata columns.
//!
//! Every failure identifies the offending file. Nothing is skipped here: a
//! malformed file name or schema is the caller's problem to hear about, in
//! contrast to the catalog's silent skip rules.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Int64Array, RecordBatch, RecordBatchReader, StringArray},
    compute::concat_batches,
    error::ArrowError,
};
use bytes::Bytes;
use parquet::{arrow::arrow_reader::ParquetRecordBatchReaderBuilder, errors::ParquetError};
use snafu::prelude::*;

use crate::{
    catalog::Instance,
    schema::{FileSchema, SchemaError},
    storage::{self, StorageError},
};

/// Errors raised while loading an instance file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    /// The file could not be read from disk.
    #[snafu(display("Error reading file {path}: {source}"))]
    Storage {
        /// Path of the offending file.
        path: String,
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },

    /// The file is not valid Parquet.
    #[snafu(display("Error parsing file {path}: {source}"))]
    ParquetRead {
        /// Path of the offending file.
        path: String,
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// Arrow failed to materialize or assemble the table.
    #[snafu(display("Arrow error while materializing {path}: {source}"))]
    Arrow {
        /// Path of the offending file.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The file stem does not split into `<well>_<id>`.
    #[snafu(display("File name {stem:?} of {path} does not split into well and id"))]
    InstanceStem {
        /// Path of the offending file.
        path: String,
        /// The stem that failed to split into exactly two parts.
        stem: String,
    },

    /// The file's columns deviate from the schema contract.
    #[snafu(display("{source}"))]
    Schema {
        /// Underlying schema contract violation.
        #[snafu(source)]
        source: SchemaError,
    },

    /// Concatenating per-instance tables into the unified table failed.
    #[snafu(display("Unified table concatenation failed: {source}"))]
    Concat {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

fn display_path(instance_path: &std::path::Path) -> String {
    instance_path.display().to_string()
}

/// Read one data file into a single `RecordBatch`, exactly as stored.
///
/// No schema validation and no metadata columns; this is the raw view the
/// property counters operate on. An empty file yields an empty batch with
/// the file's own schema.
pub async fn read_file_table(path: &std::path::Path) -> Result<RecordBatch, LoadError> {
    let display = display_path(path);

    let bytes = storage::read_all_bytes(path)
        .await
        .context(StorageSnafu { path: display.as_str() })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
        .context(ParquetReadSnafu { path: display.as_str() })?;
    let reader = builder
        .build()
        .context(ParquetReadSnafu { path: display.as_str() })?;
    let schema = reader.schema();

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.context(ArrowSnafu { path: display.as_str() })?);
    }

    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    concat_batches(&schema, &batches).context(ArrowSnafu { path: display.as_str() })
}

/// Split an instance file stem into its `(well, id)` parts.
fn split_stem<'a>(path: &str, stem: &'a str) -> Result<(&'a str, &'a str), LoadError> {
    let mut parts = stem.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(well), Some(id), None) => Ok((well, id)),
        _ => InstanceStemSnafu { path, stem }.fail(),
    }
}

/// Load one instance's table with its metadata columns.
///
/// Validates the file against the schema contract, decodes `well` and `id`
/// from the file stem, and returns the table with columns ordered
/// `[timestamp, label, well, id, <contract columns>]`. The metadata columns
/// are constant within the returned table.
pub async fn read_instance(
    contract: &FileSchema,
    instance: &Instance,
) -> Result<RecordBatch, LoadError> {
    let display = display_path(&instance.path);

    let stem = instance.stem().unwrap_or_default();
    let (well, id) = split_stem(&display, stem)?;

    let table = read_file_table(&instance.path).await?;
    contract
        .validate(&display, table.schema().as_ref())
        .context(SchemaSnafu)?;

    let n_rows = table.num_rows();
    let label_column: ArrayRef = Arc::new(Int64Array::from(vec![instance.label; n_rows]));
    let well_column: ArrayRef = Arc::new(StringArray::from(vec![well; n_rows]));
    let id_column: ArrayRef = Arc::new(StringArray::from(vec![id; n_rows]));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.num_columns() + 3);
    columns.push(table.column(0).clone());
    columns.push(label_column);
    columns.push(well_column);
    columns.push(id_column);
    columns.extend(table.columns()[1..].iter().cloned());

    RecordBatch::try_new(contract.instance_schema(), columns)
        .context(ArrowSnafu { path: display.as_str() })
}
