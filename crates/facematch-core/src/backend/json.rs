//! Single-file JSON persistence.
//!
//! Writes go to a sibling temp file which is fsynced and renamed over the
//! target, so readers see either the old or the new document. Loading also
//! accepts the legacy `faces_data.json` layout, a `{name: {encoding, timestamp}}`
//! map.

use super::{BackendError, StoreBackend};
use crate::types::{FaceEncoding, Record};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    faces: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    encoding: Vec<f32>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Name-keyed legacy map, kept in file order.
#[derive(Debug)]
struct LegacyMap(Vec<(String, LegacyEntry)>);

impl<'de> Deserialize<'de> for LegacyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = LegacyMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of names to face entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<LegacyMap, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(LegacyMap(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyDocument {
    Current(StoreDocument),
    Legacy(LegacyMap),
}

pub struct JsonFileBackend {
    path: PathBuf,
    /// Serializes writers on the temp file.
    write_lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "faces.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<Record>, BackendError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        parse_document(&raw)
    }

    fn persist(&self, records: &[Record]) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let doc = StoreDocument {
            version: DOCUMENT_VERSION,
            faces: records.to_vec(),
        };

        let tmp = self.temp_path();
        let file = std::fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &doc)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        std::fs::rename(&tmp, &self.path)?;
        sync_parent_dir(&self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Parse either the current document layout or the legacy name-keyed map.
///
/// Legacy entries keep their file order (the order they were registered
/// in). Names are trimmed; blank names are skipped and a repeated name
/// replaces the earlier entry in place.
pub fn parse_document(raw: &str) -> Result<Vec<Record>, BackendError> {
    match serde_json::from_str::<AnyDocument>(raw)? {
        AnyDocument::Current(doc) => {
            if doc.version != DOCUMENT_VERSION {
                return Err(BackendError::UnsupportedVersion(doc.version));
            }
            Ok(doc.faces)
        }
        AnyDocument::Legacy(LegacyMap(entries)) => {
            let mut records: Vec<Record> = Vec::with_capacity(entries.len());
            for (raw_name, entry) in entries {
                let name = raw_name.trim();
                if name.is_empty() {
                    tracing::warn!(key = %raw_name, "skipping legacy entry with blank name");
                    continue;
                }
                let registered_at = entry
                    .timestamp
                    .as_deref()
                    .and_then(parse_legacy_timestamp)
                    .unwrap_or_else(Utc::now);
                let record = Record {
                    name: name.to_string(),
                    encoding: FaceEncoding::new(entry.encoding),
                    registered_at,
                };
                match records.iter().position(|r| r.name == record.name) {
                    Some(idx) => records[idx] = record,
                    None => records.push(record),
                }
            }
            Ok(records)
        }
    }
}

/// Make the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// numpy `datetime64('now')` renders as `2024-05-01T12:30:00` (no zone, UTC).
fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}
