//! Database schema definitions

/// SQL to create the knowledge table
/// One opaque JSON payload per (source, entity)
pub const CREATE_KNOWLEDGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS knowledge (
    source TEXT NOT NULL,
    entity TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    UNIQUE(source, entity)
)
"#;

/// SQL to create the labels table
/// Labels are global: not scoped by source, last writer wins
pub const CREATE_LABELS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS labels (
    entity TEXT PRIMARY KEY,
    label TEXT NOT NULL
)
"#;

/// SQL to create the publications table
pub const CREATE_PUBLICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS publications (
    source TEXT NOT NULL,
    entity TEXT NOT NULL,
    publication TEXT NOT NULL
)
"#;

/// SQL to create the connectivity_nodes table
pub const CREATE_CONNECTIVITY_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS connectivity_nodes (
    source TEXT NOT NULL,
    node_json TEXT NOT NULL,
    path_entity TEXT NOT NULL,
    UNIQUE(source, node_json)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_knowledge_source ON knowledge(source)",
    "CREATE INDEX IF NOT EXISTS idx_publications_source_entity ON publications(source, entity)",
    "CREATE INDEX IF NOT EXISTS idx_connectivity_nodes_path ON connectivity_nodes(source, path_entity)",
];

/// Tables holding rows scoped to a knowledge source
pub const SOURCE_TABLES: &[&str] = &["knowledge", "connectivity_nodes", "publications"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_KNOWLEDGE_TABLE,
        CREATE_LABELS_TABLE,
        CREATE_PUBLICATIONS_TABLE,
        CREATE_CONNECTIVITY_NODES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
