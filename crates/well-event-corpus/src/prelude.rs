//! Wrapper prelude.
//!
//! The `well-event-corpus` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::{
    CatalogError, CatalogPartitions, FileSchema, Instance, InstanceInventory, InventoryRow,
    LabelCatalog, LoadError, PropertiesError, PropertyCounters, Provenance, ResampleError,
    SchemaError, SourceSelection, Statistic, Statistics, aggregate, catalog_all,
    count_properties, derive_statistics, enumerate, load_all, read_file_table, read_instance,
    resample,
};
