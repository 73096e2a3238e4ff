//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use crate::knowledge::{ConnectivityNode, KnowledgeRecord, Payload};
use crate::{Error, Result};
use super::schema;

/// How a store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// The file must already exist and hold the knowledge schema
    ReadOnly,
    /// Create the file and schema when missing
    ReadWrite,
}

/// SQLite-backed knowledge store
pub struct KnowledgeStore {
    conn: Connection,
    path: PathBuf,
}

impl KnowledgeStore {
    /// Open a store file.
    ///
    /// A missing, corrupt or schema-less file fails with [`Error::StoreOpen`];
    /// a competing writer surfaces as [`Error::StoreBusy`].
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        let conn = match mode {
            OpenMode::ReadWrite => Connection::open(path),
            OpenMode::ReadOnly => {
                if !path.is_file() {
                    return Err(Error::StoreOpen {
                        path: path.to_path_buf(),
                        reason: "no such file".to_string(),
                    });
                }
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
            }
        }
        .map_err(|e| open_failure(path, e.into()))?;

        let store = Self { conn, path: path.to_path_buf() };
        store.configure(mode).map_err(|e| open_failure(path, e))?;
        tracing::debug!("Opened knowledge store {} ({:?})", path.display(), mode);
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.configure(OpenMode::ReadWrite)?;
        Ok(store)
    }

    /// Path of the underlying store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure(&self, mode: OpenMode) -> Result<()> {
        // Lock conflicts are fatal, never waited out
        self.conn.busy_timeout(Duration::ZERO)?;
        match mode {
            OpenMode::ReadWrite => self.initialize_schema(),
            OpenMode::ReadOnly => self.verify_schema(),
        }
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Check that a read-only store carries every knowledge table
    fn verify_schema(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
             AND name IN ('knowledge', 'labels', 'publications', 'connectivity_nodes')",
            [],
            |row| row.get(0),
        )?;
        if tables != 4 {
            return Err(Error::StoreOpen {
                path: self.path.clone(),
                reason: "not a knowledge store (missing tables)".to_string(),
            });
        }
        Ok(())
    }

    // ========== Source Operations ==========

    /// Known knowledge sources, most recently written first
    pub fn sources(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT source FROM knowledge GROUP BY source ORDER BY MAX(rowid) DESC"
        )?;

        let sources = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(sources)
    }

    /// The most recently written source, if any
    pub fn latest_source(&self) -> Result<Option<String>> {
        Ok(self.sources()?.into_iter().next())
    }

    pub fn has_source(&self, source: &str) -> Result<bool> {
        let found: Option<i64> = self.conn
            .query_row(
                "SELECT 1 FROM knowledge WHERE source = ?1 LIMIT 1",
                [source],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Remove every source-scoped row for `source`. Labels are global and stay.
    pub fn delete_source(&self, source: &str) -> Result<()> {
        for table in schema::SOURCE_TABLES {
            let removed = self.conn.execute(
                &format!("DELETE FROM {} WHERE source = ?1", table),
                [source],
            )?;
            tracing::debug!("Removed {} rows from {} for `{}`", removed, table, source);
        }
        Ok(())
    }

    // ========== Knowledge Operations ==========

    /// Insert or replace one knowledge record
    pub fn upsert_knowledge(&self, source: &str, record: &KnowledgeRecord) -> Result<()> {
        let payload_json = serde_json::to_string(&record.payload)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO knowledge (source, entity, payload_json)
            VALUES (?1, ?2, ?3)
            "#,
            params![source, record.entity, payload_json],
        )?;
        Ok(())
    }

    /// All records for a source, ordered by entity id
    pub fn knowledge(&self, source: &str) -> Result<Vec<KnowledgeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity, payload_json FROM knowledge WHERE source = ?1 ORDER BY entity"
        )?;

        let rows = stmt
            .query_map([source], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(entity, json)| row_to_record(entity, &json))
            .collect()
    }

    /// One entity's record within a source
    pub fn entity_knowledge(&self, source: &str, entity: &str) -> Result<Option<KnowledgeRecord>> {
        let json: Option<String> = self.conn
            .query_row(
                "SELECT payload_json FROM knowledge WHERE source = ?1 AND entity = ?2",
                params![source, entity],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|json| row_to_record(entity.to_string(), &json)).transpose()
    }

    // ========== Label Operations ==========

    /// Set the global label for an entity, replacing any previous one
    pub fn upsert_label(&self, entity: &str, label: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO labels (entity, label) VALUES (?1, ?2)",
            params![entity, label],
        )?;
        Ok(())
    }

    pub fn label(&self, entity: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT label FROM labels WHERE entity = ?1", [entity], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    // ========== Publication Operations ==========

    /// Replace the full publication set of (source, entity)
    pub fn replace_publications(&self, source: &str, entity: &str, publications: &[String]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM publications WHERE source = ?1 AND entity = ?2",
            params![source, entity],
        )?;

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO publications (source, entity, publication) VALUES (?1, ?2, ?3)"
        )?;
        for publication in publications {
            stmt.execute(params![source, entity, publication])?;
        }
        Ok(())
    }

    pub fn publications(&self, source: &str, entity: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT publication FROM publications WHERE source = ?1 AND entity = ?2 ORDER BY rowid"
        )?;

        let publications = stmt
            .query_map(params![source, entity], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(publications)
    }

    // ========== Connectivity Node Operations ==========

    /// Record a node for a source unless already present.
    ///
    /// Returns `true` when a row was written.
    pub fn upsert_connectivity_node(&self, source: &str, node: &ConnectivityNode, path_entity: &str) -> Result<bool> {
        let node_json = node.to_json()?;
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO connectivity_nodes (source, node_json, path_entity)
            VALUES (?1, ?2, ?3)
            "#,
            params![source, node_json, path_entity],
        )?;
        Ok(inserted > 0)
    }

    /// Nodes of a source with their owning path entity, ordered by node
    pub fn connectivity_nodes(&self, source: &str) -> Result<Vec<(ConnectivityNode, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT node_json, path_entity FROM connectivity_nodes WHERE source = ?1 ORDER BY node_json"
        )?;

        let rows = stmt
            .query_map([source], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(json, path)| Ok((ConnectivityNode::from_json(&json)?, path)))
            .collect()
    }

    // ========== Transactions ==========

    /// Begin a write transaction, taking the write lock immediately
    pub fn begin(&mut self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` succeeds; rolls back when `f` or the commit fails.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&KnowledgeStore) -> Result<T>,
    {
        self.begin()?;
        match f(&*self) {
            Ok(value) => match self.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.rollback_quietly();
                    Err(err)
                }
            },
            Err(err) => {
                self.rollback_quietly();
                Err(err)
            }
        }
    }

    fn rollback_quietly(&mut self) {
        if !self.in_transaction() {
            return;
        }
        match self.rollback() {
            Ok(()) => tracing::debug!("Rolled back knowledge store transaction"),
            Err(e) => tracing::warn!("Rollback failed for {}: {}", self.path.display(), e),
        }
    }

    // ========== Statistics ==========

    fn count(&self, sql: &str, source: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [source], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count all labels
    pub fn count_labels(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM labels", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Row counts for one source
    pub fn source_stats(&self, source: &str) -> Result<SourceStats> {
        Ok(SourceStats {
            source: source.to_string(),
            records: self.count("SELECT COUNT(*) FROM knowledge WHERE source = ?1", source)?,
            publications: self.count("SELECT COUNT(*) FROM publications WHERE source = ?1", source)?,
            connectivity_nodes: self.count("SELECT COUNT(*) FROM connectivity_nodes WHERE source = ?1", source)?,
            labels: self.count_labels()?,
        })
    }

    /// Every row of every table, rendered as text, for whole-store comparisons
    #[cfg(test)]
    pub(crate) fn dump(&self) -> Vec<String> {
        let mut rows = Vec::new();
        for (table, columns) in [
            ("knowledge", "source, entity, payload_json"),
            ("labels", "entity, label, ''"),
            ("publications", "source, entity, publication"),
            ("connectivity_nodes", "source, node_json, path_entity"),
        ] {
            let mut stmt = self.conn
                .prepare(&format!("SELECT {} FROM {} ORDER BY 1, 2, 3", columns, table))
                .unwrap();
            let table_rows = stmt
                .query_map([], |row| {
                    Ok(format!(
                        "{}|{}|{}|{}",
                        table,
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?
                    ))
                })
                .unwrap()
                .collect::<rusqlite::Result<Vec<_>>>()
                .unwrap();
            rows.extend(table_rows);
        }
        rows
    }
}

fn row_to_record(entity: String, payload_json: &str) -> Result<KnowledgeRecord> {
    let payload: Payload = serde_json::from_str(payload_json)?;
    Ok(KnowledgeRecord::new(entity, payload))
}

/// Anything but a lock conflict while opening is reported as an open failure
fn open_failure(path: &Path, err: Error) -> Error {
    match err {
        Error::StoreBusy(_) | Error::StoreOpen { .. } => err,
        other => Error::StoreOpen {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Row counts for one knowledge source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub records: usize,
    pub publications: usize,
    pub connectivity_nodes: usize,
    /// Global, not per source
    pub labels: usize,
}

impl std::fmt::Display for SourceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Knowledge source `{}`:", self.source)?;
        writeln!(f, "  Records: {}", self.records)?;
        writeln!(f, "  Publications: {}", self.publications)?;
        writeln!(f, "  Connectivity nodes: {}", self.connectivity_nodes)?;
        write!(f, "  Labels (all sources): {}", self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(entity: &str, payload: serde_json::Value) -> KnowledgeRecord {
        match payload {
            serde_json::Value::Object(map) => KnowledgeRecord::new(entity, map),
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_knowledge_crud() {
        let store = KnowledgeStore::open_in_memory().unwrap();

        store.upsert_knowledge("npo", &record("path:2", json!({"label": "b"}))).unwrap();
        store.upsert_knowledge("npo", &record("path:1", json!({"label": "a"}))).unwrap();
        store.upsert_knowledge("npo", &record("path:1", json!({"label": "a2"}))).unwrap();

        let rows = store.knowledge("npo").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity, "path:1");
        assert_eq!(rows[0].payload.get("label"), Some(&json!("a2")));

        let one = store.entity_knowledge("npo", "path:2").unwrap().unwrap();
        assert_eq!(one.payload.get("label"), Some(&json!("b")));
        assert!(store.entity_knowledge("npo", "path:9").unwrap().is_none());
    }

    #[test]
    fn test_sources_most_recent_first() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        for source in ["A", "B", "C"] {
            store.upsert_knowledge(source, &record("path:1", json!({}))).unwrap();
        }
        assert_eq!(store.sources().unwrap(), vec!["C", "B", "A"]);

        // Rewriting A makes it the most recent
        store.delete_source("A").unwrap();
        store.upsert_knowledge("A", &record("path:1", json!({}))).unwrap();
        assert_eq!(store.sources().unwrap(), vec!["A", "C", "B"]);
        assert_eq!(store.latest_source().unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn test_delete_source_is_scoped_and_idempotent() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        let node = ConnectivityNode::new("UBERON:1", vec![]);

        for source in ["old", "new"] {
            store.upsert_knowledge(source, &record("path:1", json!({}))).unwrap();
            store.replace_publications(source, "path:1", &["PMID:1".to_string()]).unwrap();
            store.upsert_connectivity_node(source, &node, "path:1").unwrap();
        }
        store.upsert_label("path:1", "Label").unwrap();

        store.delete_source("old").unwrap();
        store.delete_source("old").unwrap();

        assert!(!store.has_source("old").unwrap());
        assert!(store.publications("old", "path:1").unwrap().is_empty());
        assert!(store.connectivity_nodes("old").unwrap().is_empty());

        assert!(store.has_source("new").unwrap());
        assert_eq!(store.connectivity_nodes("new").unwrap().len(), 1);
        assert_eq!(store.label("path:1").unwrap().as_deref(), Some("Label"));
    }

    #[test]
    fn test_label_replace() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        store.upsert_label("path:1", "first").unwrap();
        store.upsert_label("path:1", "second").unwrap();
        assert_eq!(store.label("path:1").unwrap().as_deref(), Some("second"));
        assert_eq!(store.count_labels().unwrap(), 1);
    }

    #[test]
    fn test_publications_replaced_not_merged() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        store.replace_publications("npo", "path:1", &["PMID:1".to_string(), "PMID:2".to_string()]).unwrap();
        store.replace_publications("npo", "path:1", &["PMID:3".to_string()]).unwrap();
        assert_eq!(store.publications("npo", "path:1").unwrap(), vec!["PMID:3"]);

        store.replace_publications("npo", "path:1", &[]).unwrap();
        assert!(store.publications("npo", "path:1").unwrap().is_empty());
    }

    #[test]
    fn test_connectivity_node_written_once_per_source() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        let node = ConnectivityNode::new("UBERON:0001", vec!["qualifierA".into()]);

        assert!(store.upsert_connectivity_node("npo", &node, "path:1").unwrap());
        assert!(!store.upsert_connectivity_node("npo", &node, "path:2").unwrap());
        assert!(store.upsert_connectivity_node("other", &node, "path:2").unwrap());

        let nodes = store.connectivity_nodes("npo").unwrap();
        assert_eq!(nodes, vec![(node, "path:1".to_string())]);
    }

    #[test]
    fn test_transaction_rollback_on_error() {
        let mut store = KnowledgeStore::open_in_memory().unwrap();
        store.upsert_knowledge("npo", &record("path:1", json!({"v": 1}))).unwrap();
        let before = store.dump();

        let result: Result<()> = store.transaction(|tx| {
            tx.delete_source("npo")?;
            tx.upsert_knowledge("npo", &record("path:2", json!({"v": 2})))?;
            Err(Error::NoSource("npo".to_string()))
        });

        assert!(result.is_err());
        assert!(!store.in_transaction());
        assert_eq!(store.dump(), before);
    }

    #[test]
    fn test_transaction_commit() {
        let mut store = KnowledgeStore::open_in_memory().unwrap();
        let count = store
            .transaction(|tx| {
                tx.upsert_knowledge("npo", &record("path:1", json!({})))?;
                Ok(1)
            })
            .unwrap();
        assert_eq!(count, 1);
        assert!(!store.in_transaction());
        assert!(store.has_source("npo").unwrap());
    }

    #[test]
    fn test_source_stats() {
        let store = KnowledgeStore::open_in_memory().unwrap();
        store.upsert_knowledge("npo", &record("path:1", json!({}))).unwrap();
        store.replace_publications("npo", "path:1", &["PMID:1".to_string(), "PMID:2".to_string()]).unwrap();
        store.upsert_label("path:1", "x").unwrap();

        let stats = store.source_stats("npo").unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.publications, 2);
        assert_eq!(stats.connectivity_nodes, 0);
        assert_eq!(stats.labels, 1);
    }

    #[test]
    fn test_read_only_open_requires_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        assert!(matches!(
            KnowledgeStore::open(&missing, OpenMode::ReadOnly),
            Err(Error::StoreOpen { .. })
        ));
        assert!(!missing.exists());

        let path = dir.path().join("knowledgebase.db");
        {
            let store = KnowledgeStore::open(&path, OpenMode::ReadWrite).unwrap();
            store.upsert_knowledge("npo", &record("path:1", json!({}))).unwrap();
        }
        let store = KnowledgeStore::open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(store.sources().unwrap(), vec!["npo"]);
    }

    #[test]
    fn test_corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.db");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        assert!(matches!(
            KnowledgeStore::open(&path, OpenMode::ReadWrite),
            Err(Error::StoreOpen { .. })
        ));
        assert!(matches!(
            KnowledgeStore::open(&path, OpenMode::ReadOnly),
            Err(Error::StoreOpen { .. })
        ));
    }

    #[test]
    fn test_competing_writer_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledgebase.db");
        let mut first = KnowledgeStore::open(&path, OpenMode::ReadWrite).unwrap();
        let mut second = KnowledgeStore::open(&path, OpenMode::ReadWrite).unwrap();

        first.begin().unwrap();
        assert!(matches!(second.begin(), Err(Error::StoreBusy(_))));
        first.rollback().unwrap();
    }
}
