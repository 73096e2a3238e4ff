//! Extract: store -> snapshot file

use std::path::PathBuf;
use crate::snapshot::Snapshot;
use crate::{Error, Result};
use super::SyncEngine;

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub source: String,
    pub path: PathBuf,
    pub records: usize,
}

impl SyncEngine<'_> {
    /// Write every record of `source` (default: the most recent source) to
    /// `<store-dir>/<source>.json`, ordered by entity id.
    pub fn extract(&self, source: Option<&str>) -> Result<ExtractReport> {
        let source = match source {
            Some(source) => {
                if !self.store.has_source(source)? {
                    return Err(Error::NoSource(format!(
                        "{} matching `{}`",
                        self.store.path().display(),
                        source
                    )));
                }
                source.to_string()
            }
            None => self.store
                .latest_source()?
                .ok_or_else(|| Error::NoSource(self.store.path().display().to_string()))?,
        };

        let records = self.store.knowledge(&source)?;
        let snapshot = Snapshot::from_records(&source, &records);
        let path = Snapshot::default_path(&self.store_dir, &source);
        snapshot.write(&path)?;

        tracing::info!("Saved {} records for `{}` to `{}`", snapshot.len(), source, path.display());
        Ok(ExtractReport {
            source,
            path,
            records: snapshot.len(),
        })
    }
}
