//! Storage Layer - SQLite-backed knowledge store
//!
//! System of record is SQLite with tables:
//! - knowledge(source, entity, payload_json)
//! - labels(entity, label)
//! - publications(source, entity, publication)
//! - connectivity_nodes(source, node_json, path_entity)

pub mod schema;
pub mod sqlite;

pub use sqlite::{KnowledgeStore, OpenMode, SourceStats};
