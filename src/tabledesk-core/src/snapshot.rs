//! Disk snapshot store: one JSON file per key.
//!
//! Files are named by the SHA-256 of the key, so any key string maps to its
//! own file. Writes go to a temp file that is renamed into place, so a snapshot is
//! either fully replaced or untouched. Reads never fail: a missing, foreign
//! or corrupt file is reported as absent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hex length of a SHA-256 digest
const DIGEST_LEN: usize = 64;
const EXTENSION: &str = ".json";
const TEMP_EXTENSION: &str = ".tmp";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    key: &'a str,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    key: String,
    saved_at: DateTime<Utc>,
    data: T,
}

/// Age and timestamp of a stored snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub modified_at: DateTime<Utc>,
    pub age: Duration,
}

impl SnapshotInfo {
    fn at(modified_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            modified_at,
            age: (now - modified_at).to_std().unwrap_or_default(),
        }
    }

    pub fn age_minutes(&self) -> u64 {
        self.age.as_secs() / 60
    }
}

/// Key-addressed snapshot files under a single directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn digest(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn file_name(key: &str) -> String {
        format!("{}{}", Self::digest(key), EXTENSION)
    }

    /// Whether `name` is a snapshot or temp file this store writes
    fn is_owned(name: &str) -> bool {
        let is_digest = |stem: &str| {
            stem.len() == DIGEST_LEN && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        };
        if let Some(stem) = name.strip_suffix(EXTENSION) {
            return is_digest(stem);
        }
        name.strip_suffix(TEMP_EXTENSION)
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|rest| rest.split_once('.'))
            .map_or(false, |(stem, _)| is_digest(stem))
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(Self::file_name(key))
    }

    /// Persist `value` under `key`, replacing any previous snapshot
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec(&EnvelopeRef {
            key,
            saved_at: Utc::now(),
            data: value,
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path(key);
        let temp = self
            .dir
            .join(format!(
                ".{}.{}{}",
                Self::digest(key),
                uuid::Uuid::new_v4(),
                TEMP_EXTENSION
            ));

        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!("Saved snapshot '{}' ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn read_envelope<T: DeserializeOwned>(&self, key: &str) -> Option<Envelope<T>> {
        let path = self.path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read snapshot {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(envelope) if envelope.key == key => Some(envelope),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring corrupt snapshot {:?}: {}", path, e);
                None
            }
        }
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_envelope(key).await.map(|envelope| envelope.data)
    }

    /// Load the snapshot together with its age
    pub async fn load_with_info<T: DeserializeOwned>(&self, key: &str) -> Option<(T, SnapshotInfo)> {
        self.read_envelope(key).await.map(|envelope| {
            let info = SnapshotInfo::at(envelope.saved_at, Utc::now());
            (envelope.data, info)
        })
    }

    pub async fn info(&self, key: &str) -> Option<SnapshotInfo> {
        self.read_envelope::<IgnoredAny>(key)
            .await
            .map(|envelope| SnapshotInfo::at(envelope.saved_at, Utc::now()))
    }

    /// Remove one snapshot. Returns whether a file was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, SnapshotError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every snapshot this store wrote. Other files in the directory
    /// are left alone. Returns the number removed.
    pub async fn clear(&self) -> Result<usize, SnapshotError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !Self::is_owned(&name) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!("Cleared {} snapshots from {:?}", removed, self.dir);
        Ok(removed)
    }
}
