//! Chain export as JSON or CSV

use super::FraudGraph;
use crate::error::FraudGraphResult;
use crate::graph::ChainId;
use crate::persistence::StorageError;
use std::fmt::Write as _;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

const CSV_HEADER: &str = "record,id,chain_id,type,reference_id,label,from_node_id,to_node_id,confidence,metadata";

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl FraudGraph {
    /// Export a chain in the given format
    pub fn export_chain(&self, chain_id: ChainId, format: ExportFormat) -> FraudGraphResult<String> {
        match format {
            ExportFormat::Json => self.export_chain_json(chain_id),
            ExportFormat::Csv => self.export_chain_csv(chain_id),
        }
    }

    /// `{chain, nodes, edges}` as pretty-printed JSON
    pub fn export_chain_json(&self, chain_id: ChainId) -> FraudGraphResult<String> {
        let detail = self.get_chain(chain_id)?;
        let json = serde_json::to_string_pretty(&detail).map_err(StorageError::from)?;
        Ok(json)
    }

    /// One row per node, then one row per edge
    pub fn export_chain_csv(&self, chain_id: ChainId) -> FraudGraphResult<String> {
        let detail = self.get_chain(chain_id)?;
        let mut out = String::new();
        out.push_str(CSV_HEADER);
        out.push('\n');

        for node in &detail.nodes {
            let metadata = serde_json::to_string(&node.metadata).map_err(StorageError::from)?;
            let _ = writeln!(
                out,
                "node,{},{},{},{},{},,,,{}",
                node.id.as_u64(),
                node.chain_id.as_u64(),
                csv_field(node.node_type.as_str()),
                csv_field(&node.reference_id),
                csv_field(node.label.as_deref().unwrap_or("")),
                csv_field(&metadata),
            );
        }
        for edge in &detail.edges {
            let metadata = serde_json::to_string(&edge.metadata).map_err(StorageError::from)?;
            let _ = writeln!(
                out,
                "edge,{},{},{},,,{},{},{},{}",
                edge.id.as_u64(),
                edge.chain_id.as_u64(),
                csv_field(edge.relationship_type.as_str()),
                edge.from_node_id.as_u64(),
                edge.to_node_id.as_u64(),
                edge.confidence,
                csv_field(&metadata),
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::evidence::InMemoryEvidenceStore;
    use crate::graph::PropertyMap;
    use std::sync::Arc;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_export_formats() {
        let graph = FraudGraph::in_memory(Arc::new(InMemoryEvidenceStore::new()));
        let a = graph.upsert_entity("advisor", "adv-1", Some("Smith, J."), None, true).unwrap();
        let b = graph.upsert_entity("document", "d-1", None, Some(a.chain_id), false).unwrap();
        graph
            .link_nodes(a.node_id, b.node_id, "references", Some(80), PropertyMap::new())
            .unwrap();

        let csv = graph.export_chain(a.chain_id, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("node,"));
        assert!(lines[1].contains("\"Smith, J.\""));
        assert!(lines[3].starts_with("edge,"));
        assert!(lines[3].contains(",80,"));

        let json: serde_json::Value =
            serde_json::from_str(&graph.export_chain(a.chain_id, ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"][0]["relationshipType"], "references");
        assert_eq!(json["chain"]["id"], a.chain_id.as_u64());

        assert!(graph.export_chain(ChainId::new(77), ExportFormat::Json).is_err());
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
    }

    #[test]
    fn test_metadata_serialized_into_csv() {
        let graph = FraudGraph::in_memory(Arc::new(InMemoryEvidenceStore::new()));
        let a = graph.upsert_entity("advisor", "adv-1", None, None, true).unwrap();
        let b = graph.upsert_entity("document", "d-1", None, Some(a.chain_id), false).unwrap();
        let mut metadata = PropertyMap::new();
        metadata.insert("amount".to_string(), 25_000i64.into());
        graph
            .link_nodes(a.node_id, b.node_id, "references", None, metadata)
            .unwrap();

        let csv = graph.export_chain(a.chain_id, ExportFormat::Csv).unwrap();
        let edge = csv.lines().find(|l| l.starts_with("edge,")).unwrap();
        assert!(edge.ends_with(",\"{\"\"amount\"\":25000}\""));

        for format in [ExportFormat::Json, ExportFormat::Csv] {
            let err = graph.export_chain(ChainId::new(77), format).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
