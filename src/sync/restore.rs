//! Restore: snapshot file -> store

use std::path::Path;
use crate::config;
use crate::knowledge::KnowledgeRecord;
use crate::snapshot::Snapshot;
use crate::storage::{KnowledgeStore, OpenMode};
use crate::ui::{ProgressMessage, ProgressPhase, ProgressSink};
use crate::{Error, Result};
use super::{SourceWriter, SyncEngine, WriteCounts};

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub source: String,
    pub counts: WriteCounts,
}

/// Rebuild a source, derived tables included, from a snapshot file.
///
/// The snapshot is read and every record checked before the store
/// directory or file is touched, so a malformed snapshot creates nothing.
/// Returns the opened store alongside the report.
pub fn restore_file<P>(
    store_dir: &Path,
    store_path: &Path,
    json_file: &Path,
    progress: &mut P,
) -> Result<(KnowledgeStore, RestoreReport)>
where
    P: ProgressSink + ?Sized,
{
    let snapshot = Snapshot::read(json_file)?;
    let records = checked_records(&snapshot)?;

    config::ensure_store_dir(store_dir)?;
    let mut store = KnowledgeStore::open(store_path, OpenMode::ReadWrite)?;
    let report = SyncEngine::new(&mut store, store_dir).restore_records(&snapshot.source, &records, progress)?;

    tracing::info!(
        "Restored {} records for `{}` from `{}`",
        report.counts.records,
        report.source,
        json_file.display()
    );
    Ok((store, report))
}

impl SyncEngine<'_> {
    /// Replace `source` with `records` in a single transaction
    fn restore_records<P>(&mut self, source: &str, records: &[KnowledgeRecord], progress: &mut P) -> Result<RestoreReport>
    where
        P: ProgressSink + ?Sized,
    {
        progress.report(ProgressMessage::Started {
            phase: ProgressPhase::Restoring,
            total: records.len(),
        });

        let outcome = self.store.transaction(|store| {
            store.delete_source(source)?;
            let mut writer = SourceWriter::new(store, source);
            for (index, record) in records.iter().enumerate() {
                writer.write(record).map_err(|e| malformed_entry(index, e))?;
                progress.report(ProgressMessage::Progress {
                    phase: ProgressPhase::Restoring,
                    current: index + 1,
                    entity: Some(record.entity.clone()),
                });
            }
            Ok(writer.finish())
        });

        progress.report(ProgressMessage::Finished { phase: ProgressPhase::Restoring });
        Ok(RestoreReport {
            source: source.to_string(),
            counts: outcome?,
        })
    }
}

/// Snapshot entries as records, failing on the first malformed one
fn checked_records(snapshot: &Snapshot) -> Result<Vec<KnowledgeRecord>> {
    snapshot
        .knowledge
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            KnowledgeRecord::from_snapshot_entry(entry.clone())
                .and_then(|record| {
                    record.label()?;
                    record.references()?;
                    record.connectivity()?;
                    Ok(record)
                })
                .map_err(|e| malformed_entry(index, e))
        })
        .collect()
}

/// Record shape errors become snapshot errors naming the offending entry
fn malformed_entry(index: usize, err: Error) -> Error {
    match err {
        Error::MalformedSnapshot(reason) => {
            Error::MalformedSnapshot(format!("knowledge[{}]: {}", index, reason))
        }
        Error::MalformedRecord { entity, reason } => {
            Error::MalformedSnapshot(format!("knowledge[{}] (`{}`): {}", index, entity, reason))
        }
        other => other,
    }
}
