//! Instance catalog: corpus traversal, provenance classification, inventory.
//!
//! The corpus root contains one subdirectory per integer label, each holding
//! one Parquet file per recorded instance. [`enumerate`] walks that layout
//! lazily and yields [`Instance`] records for the requested sources;
//! [`catalog_all`] materializes the three provenance partitions with one
//! pass per source. Entries that are not label directories or data files are
//! skipped, never reported as errors, since the root may legitimately
//! contain auxiliary files. Only an unreadable root itself fails the
//! enumeration.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::Serialize;
use snafu::{Backtrace, prelude::*};

use crate::schema::{DATA_FILE_EXTENSION, LabelCatalog};

/// Errors raised while enumerating the corpus.
#[derive(Debug, Snafu)]
pub enum CatalogError {
    /// The corpus root directory could not be read at all.
    #[snafu(display("Cannot read corpus root {}: {source}", path.display()))]
    RootUnreadable {
        /// The corpus root that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Knowledge source an instance file comes from, derived from its file name.
///
/// The three sources partition the corpus: every data file is exactly one of
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Recorded on a real well.
    Real,
    /// Produced by a simulator (`SIMULATED` file name prefix).
    Simulated,
    /// Hand-drawn by an expert (`DRAWN` file name prefix).
    HandDrawn,
}

impl Provenance {
    /// Classify a file stem by its provenance prefix.
    pub fn of_stem(stem: &str) -> Provenance {
        if stem.starts_with("SIMULATED") {
            Provenance::Simulated
        } else if stem.starts_with("DRAWN") {
            Provenance::HandDrawn
        } else {
            Provenance::Real
        }
    }

    /// The source name as it appears in corpus documentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Real => "REAL",
            Provenance::Simulated => "SIMULATED",
            Provenance::HandDrawn => "HAND-DRAWN",
        }
    }
}

/// One cataloged instance: its directory label and the data file behind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    /// The instance-level event label (the name of its parent directory).
    pub label: i64,
    /// Full path of the instance's Parquet file.
    pub path: PathBuf,
}

impl Instance {
    /// Create an instance record.
    pub fn new(label: i64, path: impl Into<PathBuf>) -> Self {
        Instance {
            label,
            path: path.into(),
        }
    }

    /// The file stem, if the path has a UTF-8 one.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Provenance of this instance, derived from the file name prefix.
    pub fn provenance(&self) -> Provenance {
        self.stem().map(Provenance::of_stem).unwrap_or(Provenance::Real)
    }

    /// Recording start time encoded in the file name, when present.
    ///
    /// Real instance files are named `<well>_<YYYYMMDDhhmmss>.parquet`; the
    /// second stem part decodes to the recording start. Simulated and
    /// hand-drawn instances use opaque ids and yield `None`.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        let stem = self.stem()?;
        let id = stem.split('_').nth(1)?;
        NaiveDateTime::parse_from_str(id, "%Y%m%d%H%M%S").ok()
    }
}

/// Which knowledge sources an enumeration should include.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSelection {
    /// Include real instances.
    pub real: bool,
    /// Include simulated instances.
    pub simulated: bool,
    /// Include hand-drawn instances.
    pub drawn: bool,
}

impl SourceSelection {
    /// Every source.
    pub fn all() -> Self {
        SourceSelection {
            real: true,
            simulated: true,
            drawn: true,
        }
    }

    /// Real instances only.
    pub fn real_only() -> Self {
        SourceSelection {
            real: true,
            simulated: false,
            drawn: false,
        }
    }

    /// Simulated instances only.
    pub fn simulated_only() -> Self {
        SourceSelection {
            real: false,
            simulated: true,
            drawn: false,
        }
    }

    /// Hand-drawn instances only.
    pub fn drawn_only() -> Self {
        SourceSelection {
            real: false,
            simulated: false,
            drawn: true,
        }
    }

    /// Whether this selection admits the given provenance.
    pub fn admits(&self, provenance: Provenance) -> bool {
        match provenance {
            Provenance::Real => self.real,
            Provenance::Simulated => self.simulated,
            Provenance::HandDrawn => self.drawn,
        }
    }
}

/// Decide whether a directory entry is a label directory.
///
/// A label directory has a name that parses as a non-negative integer.
/// Anything else (stray files, auxiliary directories) is not an error, it is
/// simply not part of the corpus.
pub fn parse_label_dir(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    name.parse::<i64>().ok().filter(|label| *label >= 0)
}

fn is_data_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DATA_FILE_EXTENSION)
}

/// Lazily enumerate instances under `root` for the selected sources.
///
/// The returned iterator re-scans the filesystem each time it is created;
/// nothing is cached. Unreadable or foreign entries below the root are
/// skipped (logged at debug level); only an unreadable root is an error.
pub fn enumerate(
    root: &Path,
    sources: SourceSelection,
) -> Result<impl Iterator<Item = Instance>, CatalogError> {
    let entries = fs::read_dir(root).context(RootUnreadableSnafu { path: root })?;

    let iter = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let path = entry.path();
            match parse_label_dir(&path) {
                Some(label) => Some((label, path)),
                None => {
                    log::debug!("skipping non-label entry {}", path.display());
                    None
                }
            }
        })
        .flat_map(move |(label, dir)| {
            let files = match fs::read_dir(&dir) {
                Ok(rd) => Some(rd),
                Err(e) => {
                    log::debug!("skipping unreadable label directory {}: {e}", dir.display());
                    None
                }
            };
            files
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| is_data_file(path))
                .filter_map(move |path| {
                    let stem = path.file_stem().and_then(|s| s.to_str())?;
                    sources
                        .admits(Provenance::of_stem(stem))
                        .then(|| Instance::new(label, path.clone()))
                })
        });

    Ok(iter)
}

/// The corpus split into its three provenance partitions.
#[derive(Clone, Debug, Default)]
pub struct CatalogPartitions {
    /// All real instances.
    pub real: Vec<Instance>,
    /// All simulated instances.
    pub simulated: Vec<Instance>,
    /// All hand-drawn instances.
    pub drawn: Vec<Instance>,
}

impl CatalogPartitions {
    /// All partitions chained into one list, real first.
    pub fn all(&self) -> Vec<Instance> {
        self.real
            .iter()
            .chain(&self.simulated)
            .chain(&self.drawn)
            .cloned()
            .collect()
    }
}

/// Materialize the three provenance partitions of the corpus under `root`.
///
/// Runs one full enumeration pass per source, each with the other two
/// disabled, so the partitions are pairwise disjoint by construction.
pub fn catalog_all(root: &Path) -> Result<CatalogPartitions, CatalogError> {
    Ok(CatalogPartitions {
        real: enumerate(root, SourceSelection::real_only())?.collect(),
        simulated: enumerate(root, SourceSelection::simulated_only())?.collect(),
        drawn: enumerate(root, SourceSelection::drawn_only())?.collect(),
    })
}

/// One inventory row: instance counts for a single label, by source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    /// The instance label the row counts.
    pub label: i64,
    /// Decorated label description.
    pub description: String,
    /// Number of real instances with this label.
    pub real: u64,
    /// Number of simulated instances with this label.
    pub simulated: u64,
    /// Number of hand-drawn instances with this label.
    pub drawn: u64,
}

impl InventoryRow {
    /// Instance count across all sources.
    pub fn total(&self) -> u64 {
        self.real + self.simulated + self.drawn
    }
}

/// Per-label, per-source instance counts for the whole corpus.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InstanceInventory {
    rows: Vec<InventoryRow>,
}

impl InstanceInventory {
    /// Count the partitioned catalog into an inventory, ordered by label.
    pub fn build(partitions: &CatalogPartitions, labels: &LabelCatalog) -> Self {
        let mut counts: BTreeMap<i64, (u64, u64, u64)> = BTreeMap::new();
        for instance in &partitions.real {
            counts.entry(instance.label).or_default().0 += 1;
        }
        for instance in &partitions.simulated {
            counts.entry(instance.label).or_default().1 += 1;
        }
        for instance in &partitions.drawn {
            counts.entry(instance.label).or_default().2 += 1;
        }

        let rows = counts
            .into_iter()
            .map(|(label, (real, simulated, drawn))| InventoryRow {
                label,
                description: labels.describe(label),
                real,
                simulated,
                drawn,
            })
            .collect();
        InstanceInventory { rows }
    }

    /// The inventory rows, ordered by label.
    pub fn rows(&self) -> &[InventoryRow] {
        &self.rows
    }

    /// Total instance count across all labels and sources.
    pub fn grand_total(&self) -> u64 {
        self.rows.iter().map(InventoryRow::total).sum()
    }

    /// Keep only rare event types.
    ///
    /// A label is rare when its instance count is below `threshold` times the
    /// corpus total. Real instances always participate in both counts;
    /// simulated and hand-drawn instances only when the corresponding flag is
    /// set.
    pub fn filter_rare(&self, threshold: f64, simulated: bool, drawn: bool) -> InstanceInventory {
        let counted = |row: &InventoryRow| {
            let mut total = row.real;
            if simulated {
                total += row.simulated;
            }
            if drawn {
                total += row.drawn;
            }
            total
        };

        let grand_total: u64 = self.rows.iter().map(&counted).sum();
        let limit = threshold * grand_total as f64;

        InstanceInventory {
            rows: self
                .rows
                .iter()
                .filter(|row| (counted(row) as f64) < limit)
                .cloned()
                .collect(),
        }
    }
}
