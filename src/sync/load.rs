//! Load: remote knowledge source -> store

use crate::knowledge::KnowledgeRecord;
use crate::remote::RemoteSource;
use crate::ui::{ProgressMessage, ProgressPhase, ProgressSink};
use crate::Result;
use super::{ExtractReport, SourceWriter, SyncEngine, WriteCounts};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Release to load; the remote's latest when `None`
    pub version: Option<String>,
    /// Extract the loaded source to a snapshot once committed
    pub save_json: bool,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: String,
    pub counts: WriteCounts,
    pub snapshot: Option<ExtractReport>,
}

impl SyncEngine<'_> {
    /// Replace a source with the remote's current knowledge.
    ///
    /// The source id and path list are resolved before the store is touched,
    /// so an unreachable remote leaves it unchanged. Paths are then fetched
    /// one at a time, in remote order, inside a single transaction.
    pub fn load<R, P>(&mut self, remote: &mut R, options: &LoadOptions, progress: &mut P) -> Result<LoadReport>
    where
        R: RemoteSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let source = remote.resolve_source(options.version.as_deref())?;
        tracing::info!("Loading connectivity for source `{}`", source);

        let paths = remote.connectivity_paths()?;
        progress.report(ProgressMessage::Started {
            phase: ProgressPhase::Loading,
            total: paths.len(),
        });

        let outcome = self.store.transaction(|store| {
            store.delete_source(&source)?;
            let mut writer = SourceWriter::new(store, &source);
            for (index, path) in paths.iter().enumerate() {
                let payload = remote.entity_knowledge(path)?;
                writer.write(&KnowledgeRecord::new(path.clone(), payload))?;
                progress.report(ProgressMessage::Progress {
                    phase: ProgressPhase::Loading,
                    current: index + 1,
                    entity: Some(path.clone()),
                });
            }
            Ok(writer.finish())
        });

        progress.report(ProgressMessage::Finished { phase: ProgressPhase::Loading });
        let counts = outcome?;
        tracing::info!("Loaded connectivity for {} paths for `{}`", counts.records, source);

        let snapshot = if options.save_json {
            Some(self.extract(Some(&source))?)
        } else {
            None
        };

        Ok(LoadReport { source, counts, snapshot })
    }
}
