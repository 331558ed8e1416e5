//! Core engine for the well-event corpus toolkit.
//!
//! This crate provides the foundational pieces for `well-event-corpus`:
//!
//! - An instance catalog that walks the corpus directory layout, classifies
//!   files by label and knowledge source, and builds per-label inventories
//!   (`catalog` module).
//! - A single-instance Parquet reader that validates the dataset's column
//!   contract and attaches label/well/id metadata (`reader` module, contract
//!   in `schema`).
//! - A parallel bulk loader that merges arbitrary instance subsets into one
//!   unified table with an all-or-nothing failure policy (`loader` module).
//! - A property aggregator for corpus-wide data-quality statistics
//!   (`properties` module).
//! - A deterministic block resampler that preserves rare transient event
//!   labels under aggregation (`resample` module).
//!
//! Higher-level consumers (reporting, plotting, model pipelines) are
//! expected to depend on this core crate rather than re-implementing the
//! traversal and loading logic.
#![deny(missing_docs)]

pub mod catalog;
pub mod loader;
pub mod properties;
pub mod reader;
pub mod resample;
pub mod schema;
pub mod storage;

pub(crate) mod pool;

#[cfg(test)]
pub(crate) mod test_util;
