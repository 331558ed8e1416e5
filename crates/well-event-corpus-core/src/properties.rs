//! Per-instance quality counters and corpus-wide statistics.
//!
//! Real instances suffer from three data-quality problems: variables that
//! were never recorded (entirely null), variables frozen at a single value,
//! and observations nobody labeled. [`count_properties`] measures one
//! instance; [`aggregate`] fans the count out over the pool and reduces with
//! a coordinate-wise sum (commutative, so completion order is irrelevant);
//! [`derive_statistics`] renders the totals as amounts with percentage
//! strings.
//!
//! Counting operates on the raw file table: the metadata columns the reader
//! appends would distort the variable counts.

use std::{iter::Sum, ops::Add, path::Path};

use arrow::array::{Array, Float64Array};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    catalog::Instance,
    pool,
    reader::{self, LoadError},
    schema::{CLASS_COLUMN, TIMESTAMP_COLUMN},
};

/// Errors raised while counting or deriving statistics.
#[derive(Debug, Snafu)]
pub enum PropertiesError {
    /// An instance file could not be loaded.
    #[snafu(display("{source}"))]
    Load {
        /// Underlying load error, identifying the file.
        #[snafu(source, backtrace)]
        source: LoadError,
    },

    /// The file lacks a column the counters need.
    #[snafu(display("File {path} has no {column} column"))]
    MissingColumn {
        /// Path of the offending file.
        path: String,
        /// Name of the missing column.
        column: String,
    },

    /// A variable column carries a type the counters cannot scan.
    #[snafu(display("Column {column} in file {path} must be Float64, found {found}"))]
    UnsupportedColumnType {
        /// Path of the offending file.
        path: String,
        /// Name of the offending column.
        column: String,
        /// The Arrow type the column actually carries.
        found: String,
    },

    /// Statistics were requested over zero instances (or zero totals).
    #[snafu(display("Statistics require at least one instance with variables and observations"))]
    EmptyInput,
}

/// Quality counters for one instance, or summed over many.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCounters {
    /// Number of variables (all columns except timestamp and class).
    pub n_vars: u64,
    /// Number of entirely-null variables.
    pub n_vars_missing: u64,
    /// Number of variables frozen at a single value.
    pub n_vars_frozen: u64,
    /// Number of observations (rows).
    pub n_obs: u64,
    /// Number of observations with a null class label.
    pub n_obs_unlabeled: u64,
}

impl Add for PropertyCounters {
    type Output = PropertyCounters;

    fn add(self, rhs: PropertyCounters) -> PropertyCounters {
        PropertyCounters {
            n_vars: self.n_vars + rhs.n_vars,
            n_vars_missing: self.n_vars_missing + rhs.n_vars_missing,
            n_vars_frozen: self.n_vars_frozen + rhs.n_vars_frozen,
            n_obs: self.n_obs + rhs.n_obs,
            n_obs_unlabeled: self.n_obs_unlabeled + rhs.n_obs_unlabeled,
        }
    }
}

impl Sum for PropertyCounters {
    fn sum<I: Iterator<Item = PropertyCounters>>(iter: I) -> PropertyCounters {
        iter.fold(PropertyCounters::default(), Add::add)
    }
}

/// Whether a variable column is frozen: exactly one distinct non-null value,
/// and that value is not NaN. Distinctness compares f64 bit patterns.
fn is_frozen(values: &Float64Array) -> bool {
    let mut first: Option<u64> = None;
    for i in 0..values.len() {
        if values.is_null(i) {
            continue;
        }
        let bits = values.value(i).to_bits();
        match first {
            None => first = Some(bits),
            Some(seen) if seen != bits => return false,
            Some(_) => {}
        }
    }
    matches!(first, Some(bits) if !f64::from_bits(bits).is_nan())
}

/// Count the quality properties of one instance file.
///
/// Works on the raw file table; every column except `timestamp` and `class`
/// counts as a variable.
pub async fn count_properties(path: &Path) -> Result<PropertyCounters, PropertiesError> {
    let table = reader::read_file_table(path).await.context(LoadSnafu)?;
    let display = path.display().to_string();

    let mut counters = PropertyCounters {
        n_obs: table.num_rows() as u64,
        ..PropertyCounters::default()
    };

    for (idx, field) in table.schema().fields().iter().enumerate() {
        let name = field.name();
        if name == TIMESTAMP_COLUMN || name == CLASS_COLUMN {
            continue;
        }
        counters.n_vars += 1;

        let column = table.column(idx);
        if column.null_count() == column.len() {
            counters.n_vars_missing += 1;
            continue;
        }
        let values = column
            .as_any()
            .downcast_ref::<Float64Array>()
            .context(UnsupportedColumnTypeSnafu {
                path: display.as_str(),
                column: name.as_str(),
                found: field.data_type().to_string(),
            })?;
        if is_frozen(values) {
            counters.n_vars_frozen += 1;
        }
    }

    let class = table
        .column_by_name(CLASS_COLUMN)
        .context(MissingColumnSnafu {
            path: display.as_str(),
            column: CLASS_COLUMN,
        })?;
    counters.n_obs_unlabeled = class.null_count() as u64;

    Ok(counters)
}

/// Count properties over many instances in parallel and sum the results.
///
/// Same dispatch and fail-fast policy as the bulk loader. An empty instance
/// set is an error, not a zero-valued result; downstream statistics would
/// divide by zero.
pub async fn aggregate(instances: &[Instance]) -> Result<PropertyCounters, PropertiesError> {
    ensure!(!instances.is_empty(), EmptyInputSnafu);

    let counters =
        pool::run_unordered(instances, |instance| count_properties(&instance.path)).await?;
    Ok(counters.into_iter().sum())
}

/// One derived statistic: an absolute amount and its share of the total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    /// Absolute count.
    pub amount: u64,
    /// Rendered share, e.g. `"12.50% of 8"`.
    pub percentage: String,
}

fn statistic(amount: u64, denominator: u64) -> Statistic {
    Statistic {
        amount,
        percentage: format!(
            "{:.2}% of {denominator}",
            100.0 * amount as f64 / denominator as f64
        ),
    }
}

/// The corpus-wide quality statistics derived from summed counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Entirely-null variables, relative to all variables.
    pub missing_variables: Statistic,
    /// Single-valued variables, relative to all variables.
    pub frozen_variables: Statistic,
    /// Null-class observations, relative to all observations.
    pub unlabeled_observations: Statistic,
}

/// Derive the three corpus statistics from summed counters.
///
/// Both denominators must be positive; summed counters from at least one
/// non-empty instance guarantee that, and anything else fails with
/// [`PropertiesError::EmptyInput`] instead of dividing by zero.
pub fn derive_statistics(counters: &PropertyCounters) -> Result<Statistics, PropertiesError> {
    ensure!(counters.n_vars > 0 && counters.n_obs > 0, EmptyInputSnafu);

    Ok(Statistics {
        missing_variables: statistic(counters.n_vars_missing, counters.n_vars),
        frozen_variables: statistic(counters.n_vars_frozen, counters.n_vars),
        unlabeled_observations: statistic(counters.n_obs_unlabeled, counters.n_obs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn count_properties_measures_quality_problems() -> TestResult {
        let tmp = TempDir::new()?;
        let contract = test_contract();
        let path = tmp.path().join("WELL-A_1.parquet");
        // A: healthy; B: missing; state: frozen; class: one unlabeled row.
        write_data_file(
            &path,
            &contract,
            &[0, 1_000, 2_000],
            &[
                vec![Some(1.0), Some(2.0), Some(3.0)],
                vec![None, None, None],
                vec![Some(1.0), Some(1.0), Some(1.0)],
                vec![Some(0.0), None, Some(4.0)],
            ],
        )?;

        let counters = count_properties(&path).await?;
        assert_eq!(
            counters,
            PropertyCounters {
                n_vars: 3,
                n_vars_missing: 1,
                n_vars_frozen: 1,
                n_obs: 3,
                n_obs_unlabeled: 1,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn frozen_requires_a_single_non_nan_value() -> TestResult {
        let tmp = TempDir::new()?;
        let contract = test_contract();
        let path = tmp.path().join("WELL-A_1.parquet");
        // A: constant with interspersed nulls (frozen); B: all-NaN (not frozen,
        // not missing).
        write_data_file(
            &path,
            &contract,
            &[0, 1_000, 2_000],
            &[
                vec![Some(7.5), None, Some(7.5)],
                vec![Some(f64::NAN), Some(f64::NAN), Some(f64::NAN)],
                vec![Some(0.0), Some(1.0), Some(2.0)],
                vec![Some(0.0), Some(0.0), Some(0.0)],
            ],
        )?;

        let counters = count_properties(&path).await?;
        assert_eq!(counters.n_vars_frozen, 1);
        assert_eq!(counters.n_vars_missing, 0);
        Ok(())
    }

    #[tokio::test]
    async fn aggregate_is_additive_over_disjoint_sets() -> TestResult {
        let tmp = TempDir::new()?;
        let contract = test_contract();

        let first = vec![
            seed_instance(tmp.path(), &contract, 0, "WELL-A_1", 4)?,
            seed_instance(tmp.path(), &contract, 1, "WELL-B_2", 2)?,
        ];
        let second = vec![seed_instance(tmp.path(), &contract, 2, "WELL-C_3", 5)?];

        let combined: Vec<_> = first.iter().chain(&second).cloned().collect();

        let sum = aggregate(&first).await? + aggregate(&second).await?;
        assert_eq!(aggregate(&combined).await?, sum);
        Ok(())
    }

    #[tokio::test]
    async fn aggregate_rejects_zero_instances() {
        let err = aggregate(&[]).await.expect_err("empty input must error");
        assert!(matches!(err, PropertiesError::EmptyInput { .. }));
    }

    #[tokio::test]
    async fn aggregate_fails_fast_on_unreadable_instance() -> TestResult {
        let tmp = TempDir::new()?;
        let contract = test_contract();
        let instances = vec![
            seed_instance(tmp.path(), &contract, 0, "WELL-A_1", 4)?,
            Instance::new(0, tmp.path().join("0").join("missing.parquet")),
        ];

        let err = aggregate(&instances)
            .await
            .expect_err("one missing file must fail the batch");
        assert!(matches!(err, PropertiesError::Load { .. }));
        Ok(())
    }

    #[test]
    fn derive_statistics_formats_percentages() {
        let counters = PropertyCounters {
            n_vars: 8,
            n_vars_missing: 1,
            n_vars_frozen: 2,
            n_obs: 200,
            n_obs_unlabeled: 30,
        };

        let stats = derive_statistics(&counters).expect("positive denominators");
        assert_eq!(stats.missing_variables.amount, 1);
        assert_eq!(stats.missing_variables.percentage, "12.50% of 8");
        assert_eq!(stats.frozen_variables.percentage, "25.00% of 8");
        assert_eq!(stats.unlabeled_observations.percentage, "15.00% of 200");
    }

    #[test]
    fn derive_statistics_rejects_zero_denominators() {
        let err = derive_statistics(&PropertyCounters::default())
            .expect_err("zero totals must error");
        assert!(matches!(err, PropertiesError::EmptyInput { .. }));
    }

    #[test]
    fn statistics_serialize_for_reporting() {
        let stats = derive_statistics(&PropertyCounters {
            n_vars: 4,
            n_vars_missing: 1,
            n_vars_frozen: 0,
            n_obs: 10,
            n_obs_unlabeled: 5,
        })
        .expect("positive denominators");

        let json = serde_json::to_string(&stats).expect("serializable");
        assert!(json.contains("\"25.00% of 4\""));
        assert!(json.contains("\"50.00% of 10\""));
    }
}
