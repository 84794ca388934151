//! Provider registry persistence
//!
//! The registry is a single JSON array rewritten in full on every change.
//! Reads are permissive: a missing or empty file is an empty registry, and
//! entries that do not parse are carried through rewrites untouched. A file
//! that is not a JSON array at all is moved aside before anything replaces it.

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chargemap_core::{PROVIDER_ID_BASE, ProviderDraft, ProviderRecord, Station};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Two registrations closer than this with the same name are the same site
const DUPLICATE_DISTANCE_KM: f64 = 0.01;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to write provider registry {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize provider registry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Refusing to overwrite unreadable provider registry {}", path.display())]
    Unparsed { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    path: PathBuf,
    records: Vec<ProviderRecord>,
    /// Entries kept verbatim because they are not valid provider records
    unreadable: Vec<Value>,
    /// The file could not be parsed nor moved aside, so it must not be replaced
    write_blocked: bool,
}

#[derive(Debug, Default)]
struct Contents {
    records: Vec<ProviderRecord>,
    unreadable: Vec<Value>,
    write_blocked: bool,
}

impl ProviderRegistry {
    /// Read the registry at `path`, falling back to an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let contents = read_contents(&path);
        tracing::info!(
            "Loaded {} provider station(s) from {}",
            contents.records.len(),
            path.display()
        );
        if !contents.unreadable.is_empty() {
            tracing::warn!(
                "{} unreadable provider entries in {} are kept as they are",
                contents.unreadable.len(),
                path.display()
            );
        }
        ProviderRegistry {
            path,
            records: contents.records,
            unreadable: contents.unreadable,
            write_blocked: contents.write_blocked,
        }
    }

    pub fn records(&self) -> &[ProviderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Next free provider id.
    ///
    /// Offset by the provider count from [`PROVIDER_ID_BASE`], bumped past the
    /// highest stored id (unreadable entries included) in case the file was
    /// edited by hand.
    pub fn next_id(&self) -> u32 {
        let by_count = PROVIDER_ID_BASE.saturating_add(self.records.len() as u32);
        let stored_ids = self.records.iter().map(|record| record.id).chain(
            self.unreadable
                .iter()
                .filter_map(|entry| entry.get("id")?.as_u64())
                .map(|id| u32::try_from(id).unwrap_or(u32::MAX)),
        );
        let after_highest = stored_ids
            .map(|id| id.saturating_add(1))
            .max()
            .unwrap_or(PROVIDER_ID_BASE);
        by_count.max(after_highest)
    }

    /// An existing record with the same name at (almost) the same place
    pub fn find_duplicate(&self, draft: &ProviderDraft) -> Option<&ProviderRecord> {
        self.records.iter().find(|record| {
            record.name.trim().eq_ignore_ascii_case(&draft.name)
                && record.location().distance_to(&draft.location) < DUPLICATE_DISTANCE_KM
        })
    }

    /// Append a record and rewrite the file.
    ///
    /// The record is kept in memory even when the write fails.
    pub fn append(&mut self, record: ProviderRecord) -> Result<(), RegistryError> {
        self.records.push(record);
        self.save()
    }

    pub fn save(&self) -> Result<(), RegistryError> {
        if self.write_blocked {
            return Err(RegistryError::Unparsed {
                path: self.path.clone(),
            });
        }

        let mut entries = self
            .records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        entries.extend(self.unreadable.iter().cloned());
        let content = serde_json::to_string_pretty(&entries)?;

        write_atomically(&self.path, &content).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            "Wrote {} provider station(s) to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn stations(&self) -> impl Iterator<Item = Station> + '_ {
        self.records.iter().map(ProviderRecord::to_station)
    }
}

fn read_contents(path: &Path) -> Contents {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No provider registry at {}, starting empty", path.display());
            return Contents::default();
        }
        Err(e) => {
            tracing::warn!(
                "Cannot read provider registry {}: {}; starting empty",
                path.display(),
                e
            );
            return Contents::default();
        }
    };

    if content.trim().is_empty() {
        return Contents::default();
    }

    let entries: Vec<Value> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                "Provider registry {} is corrupt ({}); starting empty",
                path.display(),
                e
            );
            return Contents {
                write_blocked: !move_aside(path),
                ..Contents::default()
            };
        }
    };

    let mut contents = Contents::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match ProviderRecord::deserialize(&entry) {
            Ok(record) => contents.records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping provider entry {} in {}: {}",
                    index,
                    path.display(),
                    e
                );
                contents.unreadable.push(entry);
            }
        }
    }
    contents
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Rename an unparseable registry to `<name>.bak`. Returns false if it is still in place.
fn move_aside(path: &Path) -> bool {
    let backup = backup_path(path);
    match fs::rename(path, &backup) {
        Ok(()) => {
            tracing::warn!(
                "Moved unparseable provider registry to {}",
                backup.display()
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                "Cannot move {} aside ({}); it will not be overwritten",
                path.display(),
                e
            );
            false
        }
    }
}

/// Write through a temporary file in the same directory, then rename over
/// the target so readers never see a half-written registry.
fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
