//! SQLite persistence. Encodings are stored as little-endian f32 blobs.

use super::{BackendError, StoreBackend};
use crate::types::{FaceEncoding, Record};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS faces (
    position      INTEGER NOT NULL,
    name          TEXT    NOT NULL UNIQUE,
    dim           INTEGER NOT NULL,
    encoding      BLOB    NOT NULL,
    registered_at TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS faces_position ON faces(position);
";

pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)?;

        tracing::debug!(path = %path.display(), "opened sqlite face store");

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }
}

impl StoreBackend for SqliteBackend {
    fn load(&self) -> Result<Vec<Record>, BackendError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT name, dim, encoding, registered_at FROM faces ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, dim, blob, registered_at) = row?;
            let dim = usize::try_from(dim).map_err(|_| BackendError::Corrupt {
                name: name.clone(),
                reason: format!("negative dimension {dim}"),
            })?;
            let values = decode_f32_blob(&name, &blob, dim)?;
            let registered_at = parse_timestamp(&name, &registered_at)?;
            records.push(Record {
                name,
                encoding: FaceEncoding::new(values),
                registered_at,
            });
        }
        Ok(records)
    }

    fn persist(&self, records: &[Record]) -> Result<(), BackendError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM faces", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO faces (position, name, dim, encoding, registered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    record.name,
                    record.encoding.len() as i64,
                    encode_f32_blob(record.encoding.as_slice()),
                    record.registered_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

fn encode_f32_blob(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(values));
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn decode_f32_blob(name: &str, blob: &[u8], dim: usize) -> Result<Vec<f32>, BackendError> {
    let corrupt = |reason: String| BackendError::Corrupt {
        name: name.to_string(),
        reason,
    };

    let expected = dim
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or_else(|| corrupt(format!("dimension {dim} overflows")))?;
    if blob.len() != expected {
        return Err(corrupt(format!(
            "encoding blob is {} bytes, expected {expected}",
            blob.len()
        )));
    }

    let mut values = Vec::with_capacity(dim);
    for chunk in blob.chunks_exact(4) {
        let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !v.is_finite() {
            return Err(corrupt("encoding contains non-finite values".into()));
        }
        values.push(v);
    }
    Ok(values)
}

fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, BackendError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BackendError::Corrupt {
            name: name.to_string(),
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}
