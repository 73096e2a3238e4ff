//! Snapshot codec - portable JSON form of one knowledge source
//!
//! ```json
//! {
//!     "source": "npo-2023",
//!     "knowledge": [
//!         { "id": "path:1", "label": "Vagal pathway", ... }
//!     ]
//! }
//! ```

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use crate::knowledge::{KnowledgeRecord, Payload};
use crate::{Error, Result};

/// One knowledge source's full record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub source: String,
    pub knowledge: Vec<Payload>,
}

impl Snapshot {
    /// Build a snapshot from stored records, injecting each entity id
    pub fn from_records(source: impl Into<String>, records: &[KnowledgeRecord]) -> Self {
        Self {
            source: source.into(),
            knowledge: records.iter().map(KnowledgeRecord::to_snapshot_entry).collect(),
        }
    }

    /// Default location of a source's snapshot: `<store-dir>/<source>.json`
    pub fn default_path(store_dir: &Path, source: &str) -> PathBuf {
        store_dir.join(format!("{}.json", source))
    }

    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedSnapshot(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|e| match e {
            Error::MalformedSnapshot(reason) => {
                Error::MalformedSnapshot(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Serialize with four-space indentation
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::MalformedSnapshot(e.to_string()))
    }

    /// Write the snapshot, replacing any existing file.
    ///
    /// The document is written next to `path` first and renamed into place,
    /// so an interrupted write never leaves a truncated snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.knowledge.len()
    }
}
