//! On-disk record of an exchange.
//!
//! The file is JSON with an integer `format_version` header. Version 1
//! predates the shared access key; version 2 carries it. Decoding reads the
//! header alone first and then parses the layout that version defines.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::Participant;

pub const CURRENT_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A persisted exchange, one variant per format version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRecord {
    V1 {
        roster: Vec<Participant>,
    },
    V2 {
        shared_access_key: u64,
        roster: Vec<Participant>,
    },
}

impl StorageRecord {
    pub fn format_version(&self) -> u32 {
        match self {
            StorageRecord::V1 { .. } => 1,
            StorageRecord::V2 { .. } => 2,
        }
    }

    pub fn roster(&self) -> &[Participant] {
        match self {
            StorageRecord::V1 { roster } | StorageRecord::V2 { roster, .. } => roster,
        }
    }

    /// `None` for versions that predate the key.
    pub fn shared_access_key(&self) -> Option<u64> {
        match self {
            StorageRecord::V1 { .. } => None,
            StorageRecord::V2 {
                shared_access_key, ..
            } => Some(*shared_access_key),
        }
    }
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
}

#[derive(Serialize, Deserialize)]
struct LayoutV1<R> {
    format_version: u32,
    roster: R,
}

#[derive(Serialize, Deserialize)]
struct LayoutV2<R> {
    format_version: u32,
    shared_access_key: u64,
    roster: R,
}

pub fn encode(record: &StorageRecord) -> Result<Vec<u8>, StoreError> {
    let bytes = match record {
        StorageRecord::V1 { roster } => serde_json::to_vec_pretty(&LayoutV1 {
            format_version: 1,
            roster,
        }),
        StorageRecord::V2 {
            shared_access_key,
            roster,
        } => serde_json::to_vec_pretty(&LayoutV2 {
            format_version: 2,
            shared_access_key: *shared_access_key,
            roster,
        }),
    };
    bytes.map_err(|e| StoreError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<StorageRecord, StoreError> {
    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Decode(format!("reading format version: {e}")))?;

    match header.format_version {
        1 => {
            let layout: LayoutV1<Vec<Participant>> = serde_json::from_slice(bytes)
                .map_err(|e| StoreError::Decode(format!("version 1 record: {e}")))?;
            Ok(StorageRecord::V1 {
                roster: layout.roster,
            })
        }
        2 => {
            let layout: LayoutV2<Vec<Participant>> = serde_json::from_slice(bytes)
                .map_err(|e| StoreError::Decode(format!("version 2 record: {e}")))?;
            Ok(StorageRecord::V2 {
                shared_access_key: layout.shared_access_key,
                roster: layout.roster,
            })
        }
        other => Err(StoreError::Decode(format!(
            "unsupported format version {other} (this build reads up to {CURRENT_FORMAT_VERSION})"
        ))),
    }
}

/// A single data file. Writes go through a temporary sibling and a rename,
/// so a reader sees either the previous record or the new one.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    path: PathBuf,
}

impl PersistentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet (first run). A file that
    /// exists but cannot be read or decoded is an error.
    pub fn load(&self) -> Result<Option<StorageRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "data file does not exist");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record = decode(&bytes)?;
        info!(
            path = %self.path.display(),
            file_version = record.format_version(),
            program_version = CURRENT_FORMAT_VERSION,
            people = record.roster().len(),
            "imported data file"
        );
        Ok(Some(record))
    }

    pub fn save(&self, record: &StorageRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = encode(record)?;
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(&bytes)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        info!(path = %self.path.display(), people = record.roster().len(), "saved data file");
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf, StoreError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "data path has no file name",
            ))
        })?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(self.path.with_file_name(tmp_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn roster() -> Vec<Participant> {
        let mut a = Participant::new("Aurélie", 42);
        a.recipient_index = Some(1);
        a.wishlist = "a book\nwarm socks".into();
        let mut b = Participant::new("Yves", 7);
        b.recipient_index = Some(0);
        b.has_picked = true;
        vec![a, b]
    }

    #[test]
    fn codec_round_trips_every_version() {
        for record in [
            StorageRecord::V1 { roster: roster() },
            StorageRecord::V2 {
                shared_access_key: 99,
                roster: roster(),
            },
        ] {
            let bytes = encode(&record).unwrap();
            assert_eq!(decode(&bytes).unwrap(), record);
        }
    }

    #[test]
    fn version_one_has_no_key_field() {
        let bytes = encode(&StorageRecord::V1 { roster: roster() }).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["format_version"], 1);
        assert!(value.get("shared_access_key").is_none());
    }

    #[test]
    fn encode_and_decode_failures_are_told_apart() {
        let encode_err = StoreError::Encode("key must be a string".into());
        let decode_err = StoreError::Decode("expected value".into());
        assert_eq!(encode_err.to_string(), "encode error: key must be a string");
        assert_eq!(decode_err.to_string(), "decode error: expected value");
        assert!(encode(&StorageRecord::V1 { roster: roster() }).is_ok());
    }

    #[test]
    fn version_two_without_key_is_corrupt() {
        let bytes = br#"{"format_version": 2, "roster": []}"#;
        assert!(matches!(decode(bytes), Err(StoreError::Decode(_))));
    }

    #[test]
    fn rejects_unknown_or_missing_version() {
        assert!(matches!(
            decode(br#"{"format_version": 9, "roster": []}"#),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            decode(br#"{"roster": []}"#),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(decode(b""), Err(StoreError::Decode(_))));
    }

    #[test]
    fn missing_file_is_first_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::new(temp_dir.path().join("people.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::new(temp_dir.path().join("nested/people.json"));
        let record = StorageRecord::V2 {
            shared_access_key: 1234,
            roster: roster(),
        };

        store.save(&record).unwrap();

        assert_eq!(store.load().unwrap(), Some(record));
        assert!(!temp_dir.path().join("nested/.people.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("people.json");
        fs::write(&path, b"{\"format_version\": 2, \"shared_access_key\": ").unwrap();

        let store = PersistentStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Decode(_))));
    }

    #[test]
    fn save_replaces_previous_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::new(temp_dir.path().join("people.json"));
        store.save(&StorageRecord::V1 { roster: roster() }).unwrap();

        let newer = StorageRecord::V2 {
            shared_access_key: 5,
            roster: Vec::new(),
        };
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap(), Some(newer));
    }
}
