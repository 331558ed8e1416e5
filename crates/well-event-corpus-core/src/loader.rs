//! Parallel bulk loader.
//!
//! Fans [`crate::reader::read_instance`] out over the worker pool and
//! concatenates the per-instance tables into one unified table. The policy
//! is all-or-nothing: a single failed instance aborts the whole batch,
//! cancels everything still pending, and propagates that one failure.
//! Callers either get the complete requested corpus subset or a clear error,
//! never a silently incomplete table.
//!
//! Rows from different instances may interleave in any order (tables are
//! concatenated in completion order); `well` + `id` + `timestamp` identify
//! rows across instances.

use arrow::{array::RecordBatch, compute::concat_batches};
use snafu::prelude::*;

use crate::{
    catalog::Instance,
    pool,
    reader::{self, ConcatSnafu, LoadError},
    schema::FileSchema,
};

/// Load every instance in `instances` into one unified table.
///
/// Dispatch is parallel and unordered; the first failure cancels the rest of
/// the batch and is returned as-is. An empty instance list yields an empty
/// table with the full instance schema.
pub async fn load_all(
    contract: &FileSchema,
    instances: &[Instance],
) -> Result<RecordBatch, LoadError> {
    let unified_schema = contract.instance_schema();
    if instances.is_empty() {
        return Ok(RecordBatch::new_empty(unified_schema));
    }

    let tables = pool::run_unordered(instances, |instance| {
        reader::read_instance(contract, instance)
    })
    .await?;

    concat_batches(&unified_schema, &tables).context(ConcatSnafu)
}
