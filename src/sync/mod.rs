//! Sync Engine - Load, Extract, Restore and Info
//!
//! Load and Restore rewrite one knowledge source inside a single store
//! transaction: every source-scoped row is deleted, then each record is
//! written together with its derived rows (label, publications,
//! connectivity nodes). A failure anywhere rolls the whole source back.

pub mod extract;
pub mod load;
pub mod restore;

pub use extract::ExtractReport;
pub use load::{LoadOptions, LoadReport};
pub use restore::{restore_file, RestoreReport};

use std::collections::HashSet;
use std::path::PathBuf;
use crate::knowledge::{ConnectivityNode, KnowledgeRecord};
use crate::storage::KnowledgeStore;
use crate::Result;

/// Orchestrates synchronization between a store, a remote and snapshots
pub struct SyncEngine<'a> {
    store: &'a mut KnowledgeStore,
    store_dir: PathBuf,
}

impl<'a> SyncEngine<'a> {
    /// `store_dir` is where extracted snapshots are written
    pub fn new(store: &'a mut KnowledgeStore, store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            store_dir: store_dir.into(),
        }
    }

    /// Known source ids, most recent first
    pub fn info(&self) -> Result<Vec<String>> {
        self.store.sources()
    }
}

/// Counts of rows written for one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub records: usize,
    pub connectivity_nodes: usize,
}

/// Writes records of one source and their derived rows.
///
/// Connectivity nodes are deduplicated across everything written through
/// one writer, i.e. across the whole sync of the source.
pub(crate) struct SourceWriter<'s> {
    store: &'s KnowledgeStore,
    source: &'s str,
    seen_nodes: HashSet<ConnectivityNode>,
    counts: WriteCounts,
}

impl<'s> SourceWriter<'s> {
    pub(crate) fn new(store: &'s KnowledgeStore, source: &'s str) -> Self {
        Self {
            store,
            source,
            seen_nodes: HashSet::new(),
            counts: WriteCounts::default(),
        }
    }

    pub(crate) fn write(&mut self, record: &KnowledgeRecord) -> Result<()> {
        // Shape checks come first so a bad record writes nothing
        let label = record.label()?;
        let references = record.references()?;
        let edges = record.connectivity()?;

        self.store.upsert_knowledge(self.source, record)?;

        // Global label: may replace one written under another source
        if let Some(label) = label {
            self.store.upsert_label(&record.entity, label)?;
        }

        self.store.replace_publications(self.source, &record.entity, &references)?;

        for node in edges.into_iter().flatten() {
            if self.seen_nodes.contains(&node) {
                continue;
            }
            if self.store.upsert_connectivity_node(self.source, &node, &record.entity)? {
                self.counts.connectivity_nodes += 1;
            }
            self.seen_nodes.insert(node);
        }

        self.counts.records += 1;
        tracing::debug!("Wrote knowledge for `{}` in `{}`", record.entity, self.source);
        Ok(())
    }

    pub(crate) fn finish(self) -> WriteCounts {
        self.counts
    }
}
