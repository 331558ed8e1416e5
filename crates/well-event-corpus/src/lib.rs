//! # well-event-corpus
//!
//! Catalog, bulk-load, aggregate, and downsample a labeled well-event
//! time-series corpus stored as one Parquet file per recorded instance.
//!
//! This crate is the supported public entry point and provides a small,
//! stable surface over `well-event-corpus-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use well_event_corpus::prelude::*;
//!
//! let partitions = catalog_all(Path::new("/data/corpus"))?;
//! let table = load_all(&FileSchema::standard(), &partitions.real).await?;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

pub use well_event_corpus_core::catalog::{
    CatalogError, CatalogPartitions, Instance, InstanceInventory, InventoryRow, Provenance,
    SourceSelection, catalog_all, enumerate,
};
pub use well_event_corpus_core::loader::load_all;
pub use well_event_corpus_core::properties::{
    PropertiesError, PropertyCounters, Statistic, Statistics, aggregate, count_properties,
    derive_statistics,
};
pub use well_event_corpus_core::reader::{LoadError, read_file_table, read_instance};
pub use well_event_corpus_core::resample::{ResampleError, resample};
pub use well_event_corpus_core::schema::{FileSchema, LabelCatalog, SchemaError};
