//! Knowledge types - records, payloads and connectivity nodes
//!
//! A knowledge record is an opaque JSON object describing one connectivity
//! path. A few of its fields feed derived index tables:
//! - `label`: display label for the entity (global `labels` table)
//! - `references`: publication ids (`publications` table)
//! - `connectivity`: list of edges, each a list of nodes (`connectivity_nodes` table)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque record payload, preserved verbatim.
pub type Payload = serde_json::Map<String, Value>;

/// Key carrying the entity id inside a snapshot entry.
pub const ID_FIELD: &str = "id";
pub const LABEL_FIELD: &str = "label";
pub const REFERENCES_FIELD: &str = "references";
pub const CONNECTIVITY_FIELD: &str = "connectivity";

/// A vertex of a connectivity graph: an anatomical term plus its qualifiers.
///
/// Equality and hashing are structural, so two nodes naming the same term with
/// the same ordered qualifiers are the same node wherever they appear.
/// On the wire a node is a 2-tuple: `["UBERON:0001", ["qualifier"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, Vec<String>)", into = "(String, Vec<String>)")]
pub struct ConnectivityNode {
    /// Anatomical term, e.g. `UBERON:0000948`
    pub term: String,
    /// Ordered qualifier terms (layers, locations)
    pub qualifiers: Vec<String>,
}

impl ConnectivityNode {
    pub fn new(term: impl Into<String>, qualifiers: Vec<String>) -> Self {
        Self {
            term: term.into(),
            qualifiers,
        }
    }

    /// The JSON text stored in `connectivity_nodes.node_json`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<(String, Vec<String>)> for ConnectivityNode {
    fn from((term, qualifiers): (String, Vec<String>)) -> Self {
        Self { term, qualifiers }
    }
}

impl From<ConnectivityNode> for (String, Vec<String>) {
    fn from(node: ConnectivityNode) -> Self {
        (node.term, node.qualifiers)
    }
}

/// One entity's knowledge within a source.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeRecord {
    /// Entity id of the connectivity path
    pub entity: String,
    /// Payload without the `id` field
    pub payload: Payload,
}

impl KnowledgeRecord {
    /// Create a record; any `id` key in the payload is dropped since the
    /// entity column already carries it. Remaining keys keep their order.
    pub fn new(entity: impl Into<String>, mut payload: Payload) -> Self {
        payload.shift_remove(ID_FIELD);
        Self {
            entity: entity.into(),
            payload,
        }
    }

    /// Build a record from a snapshot entry, which must carry a string `id`.
    pub fn from_snapshot_entry(mut entry: Payload) -> Result<Self> {
        match entry.shift_remove(ID_FIELD) {
            Some(Value::String(entity)) => Ok(Self::new(entity, entry)),
            Some(other) => Err(Error::MalformedSnapshot(format!(
                "record `id` must be a string, found {}",
                other
            ))),
            None => Err(Error::MalformedSnapshot(
                "record without an `id` field".to_string(),
            )),
        }
    }

    /// The payload with the entity id appended under `id`.
    pub fn to_snapshot_entry(&self) -> Payload {
        let mut entry = self.payload.clone();
        entry.insert(ID_FIELD.to_string(), Value::String(self.entity.clone()));
        entry
    }

    /// Display label, if the record has one.
    pub fn label(&self) -> Result<Option<&str>> {
        match self.field(LABEL_FIELD) {
            None => Ok(None),
            Some(Value::String(label)) => Ok(Some(label.as_str())),
            Some(other) => Err(self.malformed(format!("`label` must be a string, found {}", other))),
        }
    }

    /// Publication references; an absent field means no references.
    pub fn references(&self) -> Result<Vec<String>> {
        match self.field(REFERENCES_FIELD) {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| self.malformed(format!("`references` is not a list of strings: {}", e))),
        }
    }

    /// Connectivity edges, each a list of nodes.
    pub fn connectivity(&self) -> Result<Vec<Vec<ConnectivityNode>>> {
        match self.field(CONNECTIVITY_FIELD) {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| self.malformed(format!("`connectivity` is not a list of edges: {}", e))),
        }
    }

    /// Field lookup treating JSON `null` as absent.
    fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name).filter(|v| !v.is_null())
    }

    fn malformed(&self, reason: String) -> Error {
        Error::MalformedRecord {
            entity: self.entity.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_node_wire_format() {
        let node = ConnectivityNode::new("UBERON:0001", vec!["qualifierA".to_string()]);
        assert_eq!(node.to_json().unwrap(), r#"["UBERON:0001",["qualifierA"]]"#);

        let parsed = ConnectivityNode::from_json(r#"["UBERON:2",[]]"#).unwrap();
        assert_eq!(parsed.term, "UBERON:2");
        assert!(parsed.qualifiers.is_empty());
    }

    #[test]
    fn test_node_identity_is_structural() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        assert!(seen.insert(ConnectivityNode::new("UBERON:1", vec!["a".into(), "b".into()])));
        assert!(!seen.insert(ConnectivityNode::new("UBERON:1", vec!["a".into(), "b".into()])));
        // qualifier order matters
        assert!(seen.insert(ConnectivityNode::new("UBERON:1", vec!["b".into(), "a".into()])));
    }

    #[test]
    fn test_snapshot_entry_moves_id() {
        let entry = payload(json!({"id": "path:1", "label": "Vagal pathway"}));
        let record = KnowledgeRecord::from_snapshot_entry(entry).unwrap();
        assert_eq!(record.entity, "path:1");
        assert!(!record.payload.contains_key("id"));

        let back = record.to_snapshot_entry();
        assert_eq!(back.get("id"), Some(&json!("path:1")));
        assert_eq!(back.get("label"), Some(&json!("Vagal pathway")));
    }

    #[test]
    fn test_payload_key_order_is_kept() {
        let entry = payload(json!({"zeta": 1, "id": "p", "alpha": 2, "mid": 3}));
        let record = KnowledgeRecord::from_snapshot_entry(entry).unwrap();
        let keys: Vec<_> = record.payload.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let back = record.to_snapshot_entry();
        let keys: Vec<_> = back.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "id"]);
    }

    #[test]
    fn test_snapshot_entry_requires_string_id() {
        let missing = KnowledgeRecord::from_snapshot_entry(payload(json!({"label": "x"})));
        assert!(matches!(missing, Err(Error::MalformedSnapshot(_))));

        let numeric = KnowledgeRecord::from_snapshot_entry(payload(json!({"id": 7})));
        assert!(matches!(numeric, Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn test_derived_fields() {
        let record = KnowledgeRecord::new(
            "path:1",
            payload(json!({
                "label": "Vagal pathway",
                "references": ["PMID:123", "PMID:456"],
                "connectivity": [[["UBERON:1", []], ["UBERON:2", ["ILX:9"]]]],
            })),
        );

        assert_eq!(record.label().unwrap(), Some("Vagal pathway"));
        assert_eq!(record.references().unwrap(), vec!["PMID:123", "PMID:456"]);

        let edges = record.connectivity().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0][1], ConnectivityNode::new("UBERON:2", vec!["ILX:9".into()]));
    }

    #[test]
    fn test_absent_and_null_fields() {
        let record = KnowledgeRecord::new("path:2", payload(json!({"label": null})));
        assert_eq!(record.label().unwrap(), None);
        assert!(record.references().unwrap().is_empty());
        assert!(record.connectivity().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_connectivity() {
        let record = KnowledgeRecord::new("path:3", payload(json!({"connectivity": "UBERON:1"})));
        match record.connectivity() {
            Err(Error::MalformedRecord { entity, .. }) => assert_eq!(entity, "path:3"),
            other => panic!("expected malformed record, got {:?}", other),
        }
    }
}
