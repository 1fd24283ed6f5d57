//! Run output: listing worklists, enriched detail lines, raw snapshots.
//!
//! Layout under the sink root:
//!
//! ```text
//! listings/<site>.json          pretty JSON array of ListingRecord
//! details/<site>.jsonl          one EnrichedRecord per line, appended as produced
//! snapshots/<site>/<hash>.html  raw detail-page markup, keyed by identity hash
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gigdb_core::{EnrichedRecord, ListingRecord};
use sha2::{Digest, Sha256};

use crate::error::SinkError;

/// Where a run reads its worklist from and writes its results to.
pub trait RecordSink {
    /// Read the listing worklist written by an earlier listing run.
    ///
    /// # Errors
    ///
    /// [`SinkError::WorklistMissing`] when no worklist exists for `name`.
    fn read_listings(&self, name: &str) -> Result<Vec<ListingRecord>, SinkError>;

    /// Replace the listing worklist for `name`.
    ///
    /// # Errors
    ///
    /// I/O or serialization failures.
    fn write_listings(&self, name: &str, records: &[ListingRecord]) -> Result<(), SinkError>;

    /// Start a fresh detail output for `name`.
    ///
    /// # Errors
    ///
    /// I/O failures.
    fn reset_enriched(&self, name: &str) -> Result<(), SinkError>;

    /// Append one enriched record; durable when this returns.
    ///
    /// # Errors
    ///
    /// I/O or serialization failures.
    fn append_enriched(&self, name: &str, record: &EnrichedRecord) -> Result<(), SinkError>;

    /// Store raw page markup for `identity`, returning its sink-relative path.
    ///
    /// # Errors
    ///
    /// I/O failures.
    fn save_snapshot(&self, name: &str, identity: &str, html: &str) -> Result<String, SinkError>;

    /// Markup saved earlier for `identity`, if any.
    ///
    /// # Errors
    ///
    /// I/O failures other than the snapshot being absent.
    fn load_snapshot(&self, name: &str, identity: &str) -> Result<Option<String>, SinkError>;
}

/// Stable file stem for an identity: first 16 hex chars of its SHA-256.
#[must_use]
pub fn snapshot_key(identity: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(identity.as_bytes()));
    digest[..16].to_string()
}

/// Sink-relative path of the snapshot for `identity`.
#[must_use]
pub fn snapshot_path(name: &str, identity: &str) -> String {
    format!("snapshots/{name}/{}.html", snapshot_key(identity))
}

/// JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn listings_path(&self, name: &str) -> PathBuf {
        self.root.join("listings").join(format!("{name}.json"))
    }

    #[must_use]
    pub fn details_path(&self, name: &str) -> PathBuf {
        self.root.join("details").join(format!("{name}.jsonl"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(io_error(parent)),
        None => Ok(()),
    }
}

impl RecordSink for JsonFileSink {
    fn read_listings(&self, name: &str) -> Result<Vec<ListingRecord>, SinkError> {
        let path = self.listings_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SinkError::WorklistMissing {
                    name: name.to_string(),
                    path: path.display().to_string(),
                });
            }
            Err(err) => return Err(io_error(&path)(err)),
        };
        serde_json::from_str(&raw).map_err(|source| SinkError::Json {
            context: path.display().to_string(),
            source,
        })
    }

    fn write_listings(&self, name: &str, records: &[ListingRecord]) -> Result<(), SinkError> {
        let path = self.listings_path(name);
        ensure_parent(&path)?;

        let json = serde_json::to_string_pretty(records).map_err(|source| SinkError::Json {
            context: format!("listings for {name}"),
            source,
        })?;

        // Readers never see a half-written worklist.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_error(&path))?;

        tracing::info!(site = name, count = records.len(), path = %path.display(), "listings written");
        Ok(())
    }

    fn reset_enriched(&self, name: &str) -> Result<(), SinkError> {
        let path = self.details_path(name);
        ensure_parent(&path)?;
        File::create(&path).map_err(io_error(&path))?;
        Ok(())
    }

    fn append_enriched(&self, name: &str, record: &EnrichedRecord) -> Result<(), SinkError> {
        let path = self.details_path(name);
        ensure_parent(&path)?;

        let line = serde_json::to_string(record).map_err(|source| SinkError::Json {
            context: format!("enriched record {}", record.identity()),
            source,
        })?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error(&path))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{line}").map_err(io_error(&path))?;
        writer.flush().map_err(io_error(&path))?;
        Ok(())
    }

    fn save_snapshot(&self, name: &str, identity: &str, html: &str) -> Result<String, SinkError> {
        let relative = snapshot_path(name, identity);
        let path = self.root.join(&relative);
        ensure_parent(&path)?;
        fs::write(&path, html).map_err(io_error(&path))?;
        Ok(relative)
    }

    fn load_snapshot(&self, name: &str, identity: &str) -> Result<Option<String>, SinkError> {
        let path = self.root.join(snapshot_path(name, identity));
        match fs::read_to_string(&path) {
            Ok(html) => Ok(Some(html)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }
}

/// Read back every line of a detail output file.
///
/// # Errors
///
/// I/O failures, or a line that is not an enriched record.
pub fn read_enriched(path: &Path) -> Result<Vec<EnrichedRecord>, SinkError> {
    let raw = fs::read_to_string(path).map_err(io_error(path))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| SinkError::Json {
                context: format!("{} line {}", path.display(), index + 1),
                source,
            })
        })
        .collect()
}
