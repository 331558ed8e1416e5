//! Dataset schema contract and label taxonomy.
//!
//! Every data file in the corpus is expected to carry the same ordered column
//! set: a leading millisecond `timestamp` column followed by the sensor
//! variables, the operational `state` indicator, and the per-row `class`
//! label. [`FileSchema`] holds that contract and validates loaded files
//! against it; a deviation is a [`SchemaError`] naming the file and the
//! offending columns rather than a silently reshaped table.
//!
//! The column list is externally defined (it ships with the dataset), so the
//! contract is a runtime value, not a compile-time constant. The
//! [`FileSchema::standard`] constructor covers the published corpus layout.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use snafu::prelude::*;

/// Name of the leading time column in every data file.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Name of the per-row class label column (last column in every data file).
pub const CLASS_COLUMN: &str = "class";

/// Name of the operational state indicator column.
pub const STATE_COLUMN: &str = "state";

/// Name of the instance-level label column appended by the reader.
pub const LABEL_COLUMN: &str = "label";

/// Name of the well column appended by the reader.
pub const WELL_COLUMN: &str = "well";

/// Name of the instance id column appended by the reader.
pub const ID_COLUMN: &str = "id";

/// File extension of corpus data files (without the leading dot).
pub const DATA_FILE_EXTENSION: &str = "parquet";

/// Errors raised when a loaded file deviates from the schema contract.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    /// The file's leading column is not a naive millisecond timestamp.
    #[snafu(display(
        "File {path} must start with a millisecond timestamp column named \
         {TIMESTAMP_COLUMN:?}, found {found}"
    ))]
    TimestampColumn {
        /// Path of the offending file.
        path: String,
        /// Description of what was found in the leading position.
        found: String,
    },

    /// The columns after the timestamp do not equal the expected list.
    #[snafu(display("Invalid columns in file {path}: expected {expected:?}, found {actual:?}"))]
    ColumnMismatch {
        /// Path of the offending file.
        path: String,
        /// The ordered column list the contract requires.
        expected: Vec<String>,
        /// The ordered column list the file actually carries.
        actual: Vec<String>,
    },

    /// A correctly-named column carries a non-Float64 type.
    #[snafu(display("Column {column} in file {path} must be Float64, found {found}"))]
    ColumnType {
        /// Path of the offending file.
        path: String,
        /// Name of the offending column.
        column: String,
        /// The Arrow type the column actually carries.
        found: String,
    },
}

/// The ordered sensor/state column contract for corpus data files.
///
/// The contract lists the columns expected *after* the leading timestamp
/// column: the sensor variables in dataset order, then [`STATE_COLUMN`],
/// then [`CLASS_COLUMN`]. All of them are nullable `Float64`.
#[derive(Clone, Debug)]
pub struct FileSchema {
    variables: Vec<String>,
}

impl FileSchema {
    /// Build a contract from the dataset's sensor variable names, in order.
    ///
    /// `state` and `class` are implied and must not be listed.
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FileSchema {
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// The published corpus column contract.
    pub fn standard() -> Self {
        FileSchema::new([
            "P-PDG",
            "P-TPT",
            "T-TPT",
            "P-MON-CKP",
            "T-JUS-CKP",
            "P-JUS-CKGL",
            "T-JUS-CKGL",
            "QGL",
        ])
    }

    /// The sensor variable names, excluding `state` and `class`.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The full ordered column list expected after the timestamp column.
    pub fn expected_columns(&self) -> Vec<String> {
        let mut cols = self.variables.clone();
        cols.push(STATE_COLUMN.to_string());
        cols.push(CLASS_COLUMN.to_string());
        cols
    }

    /// Arrow schema of a raw data file: `[timestamp, <variables>, state, class]`.
    pub fn file_schema(&self) -> SchemaRef {
        let mut fields = vec![Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        )];
        for name in self.expected_columns() {
            fields.push(Field::new(name, DataType::Float64, true));
        }
        Arc::new(Schema::new(fields))
    }

    /// Arrow schema of a loaded instance table:
    /// `[timestamp, label, well, id, <variables>, state, class]`.
    pub fn instance_schema(&self) -> SchemaRef {
        let mut fields = vec![
            Field::new(
                TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new(LABEL_COLUMN, DataType::Int64, false),
            Field::new(WELL_COLUMN, DataType::Utf8, false),
            Field::new(ID_COLUMN, DataType::Utf8, false),
        ];
        for name in self.expected_columns() {
            fields.push(Field::new(name, DataType::Float64, true));
        }
        Arc::new(Schema::new(fields))
    }

    /// Validate a loaded file's schema against the contract.
    ///
    /// Validation is order-sensitive: the dataset publishes its columns as an
    /// ordered list and files are rejected when the order deviates, not only
    /// when the column set does.
    pub fn validate(&self, path: &str, schema: &Schema) -> Result<(), SchemaError> {
        let fields = schema.fields();

        let leading = fields.first().context(TimestampColumnSnafu {
            path,
            found: "an empty schema".to_string(),
        })?;
        let leading_ok = leading.name() == TIMESTAMP_COLUMN
            && matches!(
                leading.data_type(),
                DataType::Timestamp(TimeUnit::Millisecond, None)
            );
        ensure!(
            leading_ok,
            TimestampColumnSnafu {
                path,
                found: format!("{} ({})", leading.name(), leading.data_type()),
            }
        );

        let actual: Vec<String> = fields.iter().skip(1).map(|f| f.name().clone()).collect();
        let expected = self.expected_columns();
        ensure!(
            actual == expected,
            ColumnMismatchSnafu {
                path,
                expected,
                actual,
            }
        );

        for field in fields.iter().skip(1) {
            ensure!(
                field.data_type() == &DataType::Float64,
                ColumnTypeSnafu {
                    path,
                    column: field.name().clone(),
                    found: field.data_type().to_string(),
                }
            );
        }

        Ok(())
    }
}

/// Mapping from an integer instance label to its human-readable description.
///
/// Used only to decorate inventory and statistics outputs; no control flow
/// depends on it. Unknown labels fall back to their numeric form, and
/// transient per-row labels (`label + 100`) are described via their permanent
/// counterpart.
#[derive(Clone, Debug, Default)]
pub struct LabelCatalog {
    descriptions: std::collections::BTreeMap<i64, String>,
}

impl LabelCatalog {
    /// Build a taxonomy from `(label, description)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        LabelCatalog {
            descriptions: entries
                .into_iter()
                .map(|(label, desc)| (label, desc.into()))
                .collect(),
        }
    }

    /// The published corpus taxonomy.
    pub fn standard() -> Self {
        LabelCatalog::new([
            (0, "Normal Operation"),
            (1, "Abrupt Increase of BSW"),
            (2, "Spurious Closure of DHSV"),
            (3, "Severe Slugging"),
            (4, "Flow Instability"),
            (5, "Rapid Productivity Loss"),
            (6, "Quick Restriction in PCK"),
            (7, "Scaling in PCK"),
            (8, "Hydrate in Production Line"),
            (9, "Hydrate in Service Line"),
        ])
    }

    /// Decorated form of a label, e.g. `"3 - Severe Slugging"`.
    pub fn describe(&self, label: i64) -> String {
        if let Some(desc) = self.descriptions.get(&label) {
            return format!("{label} - {desc}");
        }
        if label > 100 {
            if let Some(desc) = self.descriptions.get(&(label - 100)) {
                return format!("{label} - {desc} (transient)");
            }
        }
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> FileSchema {
        FileSchema::new(["A", "B"])
    }

    #[test]
    fn expected_columns_append_state_and_class() {
        assert_eq!(contract().expected_columns(), ["A", "B", "state", "class"]);
    }

    #[test]
    fn validate_accepts_matching_schema() {
        let schema = contract().file_schema();
        contract()
            .validate("f.parquet", &schema)
            .expect("contract schema should validate");
    }

    #[test]
    fn validate_rejects_missing_timestamp() {
        let schema = Schema::new(vec![Field::new("A", DataType::Float64, true)]);
        let err = contract().validate("f.parquet", &schema).unwrap_err();
        assert!(matches!(err, SchemaError::TimestampColumn { .. }));
    }

    #[test]
    fn validate_rejects_wrong_timestamp_unit() {
        let schema = Schema::new(vec![Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        )]);
        let err = contract().validate("f.parquet", &schema).unwrap_err();
        assert!(matches!(err, SchemaError::TimestampColumn { .. }));
    }

    #[test]
    fn validate_reports_offending_column_list() {
        let schema = Schema::new(vec![
            Field::new(
                TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new("A", DataType::Float64, true),
            Field::new("unexpected", DataType::Float64, true),
        ]);
        let err = contract().validate("f.parquet", &schema).unwrap_err();
        match err {
            SchemaError::ColumnMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, ["A", "B", "state", "class"]);
                assert_eq!(actual, ["A", "unexpected"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_out_of_order_columns() {
        let schema = Schema::new(vec![
            Field::new(
                TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new("B", DataType::Float64, true),
            Field::new("A", DataType::Float64, true),
            Field::new(STATE_COLUMN, DataType::Float64, true),
            Field::new(CLASS_COLUMN, DataType::Float64, true),
        ]);
        let err = contract().validate("f.parquet", &schema).unwrap_err();
        assert!(matches!(err, SchemaError::ColumnMismatch { .. }));
    }

    #[test]
    fn validate_rejects_non_float_variable() {
        let schema = Schema::new(vec![
            Field::new(
                TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new("A", DataType::Int64, true),
            Field::new("B", DataType::Float64, true),
            Field::new(STATE_COLUMN, DataType::Float64, true),
            Field::new(CLASS_COLUMN, DataType::Float64, true),
        ]);
        let err = contract().validate("f.parquet", &schema).unwrap_err();
        assert!(matches!(err, SchemaError::ColumnType { column, .. } if column == "A"));
    }

    #[test]
    fn describe_known_transient_and_unknown_labels() {
        let labels = LabelCatalog::standard();
        assert_eq!(labels.describe(3), "3 - Severe Slugging");
        assert_eq!(labels.describe(103), "103 - Severe Slugging (transient)");
        assert_eq!(labels.describe(42), "42");
    }
}
