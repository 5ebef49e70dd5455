//! JSON document store with one reading per station, fuel and day.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use fueltrack_types::PriceReading;

use crate::error::{Error, Result};

/// Where the readings of a [`Snapshot`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Parsed from the document on disk.
    File,
    /// No document exists yet.
    Missing,
    /// The document could not be read or parsed and was treated as empty.
    Corrupt { reason: String },
}

impl SnapshotSource {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SnapshotSource::Corrupt { .. })
    }
}

/// The ordered readings loaded from disk at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub readings: Vec<PriceReading>,
    pub source: SnapshotSource,
}

impl Snapshot {
    fn empty(source: SnapshotSource) -> Self {
        Self {
            readings: Vec::new(),
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Result of an [`PriceStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// A reading for the same station, fuel and day existed and was overwritten.
    Replaced {
        index: usize,
        previous: PriceReading,
    },
    /// The reading was appended at the end of the sequence.
    Appended { index: usize },
}

impl UpsertOutcome {
    pub fn index(&self) -> usize {
        match self {
            UpsertOutcome::Replaced { index, .. } | UpsertOutcome::Appended { index } => *index,
        }
    }
}

/// Persistence for the daily price history.
///
/// Implementations keep the sequence ordered by first appearance and hold
/// at most one reading per [`ReadingIdentity`](fueltrack_types::ReadingIdentity).
pub trait PriceStore {
    /// Read the persisted sequence afresh. Never fails.
    fn load_all(&self) -> Snapshot;

    /// Insert or replace a reading in memory.
    fn upsert(&mut self, reading: PriceReading) -> UpsertOutcome;

    /// Write the in-memory sequence to durable storage.
    fn persist(&self) -> Result<()>;

    /// The in-memory sequence.
    fn readings(&self) -> &[PriceReading];
}

/// File-backed [`PriceStore`] holding a single JSON array document.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    readings: Vec<PriceReading>,
    source: SnapshotSource,
}

impl JsonStore {
    /// Open the store at `path`, creating parent directories if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        debug!("Opening price store at {}", path.display());
        let snapshot = load_snapshot(&path);

        Ok(Self {
            path,
            readings: snapshot.readings,
            source: snapshot.source,
        })
    }

    /// Open the default store location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_store_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the in-memory sequence was last loaded.
    pub fn source(&self) -> &SnapshotSource {
        &self.source
    }

    pub fn record_count(&self) -> usize {
        self.readings.len()
    }

    /// Replace the in-memory sequence with the document on disk.
    pub fn reload(&mut self) -> &SnapshotSource {
        let snapshot = load_snapshot(&self.path);
        self.readings = snapshot.readings;
        self.source = snapshot.source;
        &self.source
    }

    /// Start a locked reload, upsert and persist cycle.
    ///
    /// Blocks until no other writer holds the lock on `<file>.lock`.
    pub fn begin_write(&mut self) -> Result<WriteGuard<'_>> {
        let lock = self.open_lock_file()?;
        lock.lock().map_err(|e| Error::Lock {
            path: self.lock_path(),
            source: e,
        })?;
        Ok(WriteGuard::new(self, lock))
    }

    /// Like [`begin_write`](Self::begin_write) but fails with
    /// [`Error::Busy`] instead of waiting.
    pub fn try_begin_write(&mut self) -> Result<WriteGuard<'_>> {
        let lock = self.open_lock_file()?;
        match lock.try_lock() {
            Ok(()) => Ok(WriteGuard::new(self, lock)),
            Err(TryLockError::WouldBlock) => Err(Error::Busy(self.path.clone())),
            Err(TryLockError::Error(e)) => Err(Error::Lock {
                path: self.lock_path(),
                source: e,
            }),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn open_lock_file(&self) -> Result<File> {
        let path = self.lock_path();
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Lock { path, source: e })
    }

    /// Move a damaged document aside so the next persist does not erase it.
    fn quarantine_corrupt(&self) {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        let backup = PathBuf::from(name);
        match std::fs::rename(&self.path, &backup) {
            Ok(()) => warn!(
                "Moved unreadable price store {} to {}",
                self.path.display(),
                backup.display()
            ),
            Err(e) => warn!("Failed to back up {}: {}", self.path.display(), e),
        }
    }
}

impl PriceStore for JsonStore {
    fn load_all(&self) -> Snapshot {
        load_snapshot(&self.path)
    }

    fn upsert(&mut self, reading: PriceReading) -> UpsertOutcome {
        let position = {
            let identity = reading.identity();
            self.readings.iter().position(|r| r.identity() == identity)
        };

        match position {
            Some(index) => {
                let previous = std::mem::replace(&mut self.readings[index], reading);
                debug!(
                    "Replaced {} {} for {} ({} -> {})",
                    previous.station_key,
                    previous.fuel_type,
                    previous.date(),
                    previous.price,
                    self.readings[index].price
                );
                UpsertOutcome::Replaced { index, previous }
            }
            None => {
                self.readings.push(reading);
                UpsertOutcome::Appended {
                    index: self.readings.len() - 1,
                }
            }
        }
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut body = serde_json::to_vec_pretty(&self.readings)?;
        body.push(b'\n');

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(
            "Persisted {} readings to {}",
            self.readings.len(),
            self.path.display()
        );
        Ok(())
    }

    fn readings(&self) -> &[PriceReading] {
        &self.readings
    }
}

/// An exclusive write cycle on a [`JsonStore`].
///
/// The document is reloaded when the guard is created, so upserts apply to
/// what the previous writer committed. Dropping the guard without calling
/// [`commit`](Self::commit) releases the lock and writes nothing.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    store: &'a mut JsonStore,
    _lock: File,
}

impl<'a> WriteGuard<'a> {
    fn new(store: &'a mut JsonStore, lock: File) -> Self {
        if store.reload().is_corrupt() {
            store.quarantine_corrupt();
        }
        Self { store, _lock: lock }
    }

    pub fn upsert(&mut self, reading: PriceReading) -> UpsertOutcome {
        self.store.upsert(reading)
    }

    pub fn readings(&self) -> &[PriceReading] {
        self.store.readings()
    }

    /// Persist and release the lock.
    pub fn commit(self) -> Result<()> {
        self.store.persist()?;
        info!(
            "Committed {} readings to {}",
            self.store.record_count(),
            self.store.path.display()
        );
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Snapshot {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Snapshot::empty(SnapshotSource::Missing);
        }
        Err(e) => return corrupt(path, e.to_string()),
    };

    if content.trim().is_empty() {
        return Snapshot::empty(SnapshotSource::File);
    }

    match serde_json::from_str::<Vec<PriceReading>>(&content) {
        Ok(readings) => Snapshot {
            readings,
            source: SnapshotSource::File,
        },
        Err(e) => corrupt(path, e.to_string()),
    }
}

fn corrupt(path: &Path, reason: String) -> Snapshot {
    warn!(
        "Price store {} is unreadable, treating it as empty: {}",
        path.display(),
        reason
    );
    Snapshot::empty(SnapshotSource::Corrupt { reason })
}
