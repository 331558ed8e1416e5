//! Block downsampling with transient-label preservation.
//!
//! Partitions an instance table into consecutive blocks of `block_size` rows
//! and reduces each block to one row: the block's last timestamp, the mean
//! of each sensor column, and a class label reduced so that rare transient
//! labels survive the aggregation.
//!
//! A naive max over the class column would let a transient label
//! (`class_number + 100`) shadow every permanent label by sheer numeric
//! value, and a mean would destroy it entirely. The reduction therefore
//! remaps the transient value to a sentinel strictly between normal (`0`)
//! and the smallest permanent class, takes the block max, and maps the
//! sentinel back afterwards. A block containing a transient row and no
//! permanent row resamples to the transient label; a permanent label in the
//! same block outranks it.

use std::sync::Arc;

use arrow::{
    array::{
        Array, ArrayRef, Float64Array, Float64Builder, RecordBatch, TimestampMillisecondArray,
        TimestampMillisecondBuilder,
    },
    datatypes::{DataType, Field, Schema, TimeUnit},
    error::ArrowError,
};
use snafu::prelude::*;

use crate::schema::{CLASS_COLUMN, TIMESTAMP_COLUMN};

/// Sentinel the transient label is parked at during the block max; sits
/// strictly between normal (0) and any permanent class value.
const TRANSIENT_SENTINEL: f64 = 0.5;

/// Errors raised by the resampler.
#[derive(Debug, Snafu)]
pub enum ResampleError {
    /// The block size is zero or exceeds the table's row count.
    #[snafu(display("Invalid block size {block_size} for a table with {n_rows} rows"))]
    InvalidBlockSize {
        /// The rejected block size.
        block_size: usize,
        /// The table's row count.
        n_rows: usize,
    },

    /// The table lacks a column the resampler needs.
    #[snafu(display("Table has no {column} column"))]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A required column carries an unsupported type.
    #[snafu(display("Column {column} has unsupported type {found}"))]
    UnsupportedColumnType {
        /// Name of the offending column.
        column: String,
        /// The Arrow type the column actually carries.
        found: String,
    },

    /// Arrow failed to assemble the resampled table.
    #[snafu(display("Arrow error while building resampled table: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

fn blocks(n_rows: usize, block_size: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    (0..n_rows.div_ceil(block_size))
        .map(move |b| b * block_size..((b + 1) * block_size).min(n_rows))
}

fn block_max_timestamp(
    timestamps: &TimestampMillisecondArray,
    block: std::ops::Range<usize>,
) -> Option<i64> {
    block
        .filter(|&i| !timestamps.is_null(i))
        .map(|i| timestamps.value(i))
        .max()
}

fn block_mean(values: &Float64Array, block: std::ops::Range<usize>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in block {
        if values.is_null(i) {
            continue;
        }
        sum += values.value(i);
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

fn block_class(
    classes: &Float64Array,
    block: std::ops::Range<usize>,
    transient: f64,
) -> Option<f64> {
    let mut max: Option<f64> = None;
    for i in block {
        if classes.is_null(i) {
            continue;
        }
        let mut value = classes.value(i);
        if value == transient {
            value = TRANSIENT_SENTINEL;
        }
        max = Some(max.map_or(value, |m: f64| m.max(value)));
    }
    max.map(|m| if m == TRANSIENT_SENTINEL { transient } else { m })
}

/// Downsample an instance table by averaging blocks of `block_size` rows.
///
/// Per block: the timestamp is the block's maximum, every `Float64` column
/// except `class` is reduced to the mean of its non-null values (entirely
/// null blocks stay null), and `class` is reduced with the
/// transient-preserving max for the event class `class_number`. Columns of
/// any other type (the reader's metadata columns, for example) are dropped,
/// as a numeric aggregation has nothing to say about them. The output
/// columns are `[timestamp, <numeric columns>, class]`; the final block may
/// cover fewer than `block_size` rows.
pub fn resample(
    table: &RecordBatch,
    block_size: usize,
    class_number: i64,
) -> Result<RecordBatch, ResampleError> {
    let n_rows = table.num_rows();
    ensure!(
        block_size >= 1 && block_size <= n_rows,
        InvalidBlockSizeSnafu { block_size, n_rows }
    );

    let schema = table.schema();

    let timestamps = table
        .column_by_name(TIMESTAMP_COLUMN)
        .context(MissingColumnSnafu {
            column: TIMESTAMP_COLUMN,
        })?;
    let timestamps = timestamps
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .context(UnsupportedColumnTypeSnafu {
            column: TIMESTAMP_COLUMN,
            found: timestamps.data_type().to_string(),
        })?;

    let classes = table
        .column_by_name(CLASS_COLUMN)
        .context(MissingColumnSnafu {
            column: CLASS_COLUMN,
        })?;
    let classes = classes
        .as_any()
        .downcast_ref::<Float64Array>()
        .context(UnsupportedColumnTypeSnafu {
            column: CLASS_COLUMN,
            found: classes.data_type().to_string(),
        })?;

    let transient = (class_number + 100) as f64;
    let n_blocks = n_rows.div_ceil(block_size);

    // Timestamp column: block max.
    let mut ts_builder = TimestampMillisecondBuilder::with_capacity(n_blocks);
    for block in blocks(n_rows, block_size) {
        ts_builder.append_option(block_max_timestamp(timestamps, block));
    }

    let mut fields = vec![Field::new(
        TIMESTAMP_COLUMN,
        DataType::Timestamp(TimeUnit::Millisecond, None),
        true,
    )];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(ts_builder.finish())];

    // Sensor columns: block means, in input order. Class is appended last;
    // everything non-numeric is dropped.
    for (idx, field) in schema.fields().iter().enumerate() {
        let name = field.name();
        if name == TIMESTAMP_COLUMN || name == CLASS_COLUMN {
            continue;
        }
        let Some(values) = table.column(idx).as_any().downcast_ref::<Float64Array>() else {
            continue;
        };

        let mut builder = Float64Builder::with_capacity(n_blocks);
        for block in blocks(n_rows, block_size) {
            builder.append_option(block_mean(values, block));
        }
        fields.push(Field::new(name.clone(), DataType::Float64, true));
        columns.push(Arc::new(builder.finish()));
    }

    // Class column: transient-preserving max.
    let mut class_builder = Float64Builder::with_capacity(n_blocks);
    for block in blocks(n_rows, block_size) {
        class_builder.append_option(block_class(classes, block, transient));
    }
    fields.push(Field::new(CLASS_COLUMN, DataType::Float64, true));
    columns.push(Arc::new(class_builder.finish()));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu)
}
