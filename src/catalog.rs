//! Read-only facility catalog, loaded once from a CSV file.
//!
//! Expected header: `name,rating,status,lat,lon,tags` (`rating`, `status`
//! and `tags` may be absent). `tags` is a comma-separated list, so the cell
//! must be quoted when it holds more than one tag.
//!
//! Loading never takes the service down: a missing or unreadable file
//! yields an empty catalog plus a `CatalogStatus` explaining why, and bad
//! rows are skipped one by one.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::models::{split_tags, FacilityRecord};

const REQUIRED_COLUMNS: [&str; 3] = ["name", "lat", "lon"];

static SHARED_CATALOG: OnceLock<FacilityCatalog> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog file not found: {0}")]
    Missing(PathBuf),

    #[error("Cannot read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog is missing required column {0:?}")]
    MissingColumn(&'static str),
}

/// How the catalog came to hold what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CatalogStatus {
    Loaded { rows: usize, skipped: usize },
    Missing { path: String },
    Malformed { reason: String },
}

#[derive(Deserialize)]
struct RawRow {
    name: String,
    #[serde(default)]
    rating: String,
    #[serde(default)]
    status: String,
    lat: String,
    lon: String,
    #[serde(default)]
    tags: String,
}

impl RawRow {
    fn into_record(self) -> FacilityRecord {
        let position = match GeoPoint::parse(&self.lat, &self.lon) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(facility = %self.name, error = %e, "Facility has unusable coordinates");
                None
            }
        };
        FacilityRecord {
            name: self.name,
            rating: self.rating,
            status: self.status,
            position,
            tags: split_tags(&self.tags),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FacilityCatalog {
    records: Vec<FacilityRecord>,
    status: CatalogStatus,
}

impl FacilityCatalog {
    /// Load from `path`, degrading to an empty catalog on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), status = ?catalog.status, "Facility catalog loaded");
                catalog
            }
            Err(CatalogError::Missing(p)) => {
                tracing::warn!(path = %p.display(), "Facility catalog not found, continuing with none");
                Self::empty(CatalogStatus::Missing {
                    path: p.display().to_string(),
                })
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Facility catalog unreadable, continuing with none");
                Self::empty(CatalogStatus::Malformed {
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, CatalogError> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::Missing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_reader(file)
    }

    /// Parse CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == column) {
                return Err(CatalogError::MissingColumn(column));
            }
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for (index, row) in csv_reader.deserialize::<RawRow>().enumerate() {
            match row {
                Ok(raw) if raw.name.is_empty() => {
                    tracing::warn!(row = index + 2, "Skipping facility row without a name");
                    skipped += 1;
                }
                Ok(raw) => records.push(raw.into_record()),
                Err(e) => {
                    tracing::warn!(row = index + 2, error = %e, "Skipping malformed facility row");
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            status: CatalogStatus::Loaded {
                rows: records.len(),
                skipped,
            },
            records,
        })
    }

    pub fn from_records(records: Vec<FacilityRecord>) -> Self {
        Self {
            status: CatalogStatus::Loaded {
                rows: records.len(),
                skipped: 0,
            },
            records,
        }
    }

    pub fn empty(status: CatalogStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
        }
    }

    pub fn records(&self) -> &[FacilityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status(&self) -> &CatalogStatus {
        &self.status
    }
}

/// Process-wide catalog. The first call loads `path`; later calls return
/// the same catalog regardless of `path`. Restart to pick up data changes.
pub fn load_cached(path: &Path) -> &'static FacilityCatalog {
    SHARED_CATALOG.get_or_init(|| FacilityCatalog::load(path))
}
