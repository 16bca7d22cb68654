//! FraudGraph
//!
//! A fraud-chain engine: a small persisted property graph in which chains
//! hold typed evidence nodes (tips, risk assessments, documents, advisors)
//! joined by confidence-weighted edges, plus the algorithms built on it.
//!
//! # Architecture
//!
//! - [`graph`]: chain/node/edge model and the in-memory store with its
//!   (node_type, reference_id) uniqueness index
//! - [`persistence`]: RocksDB backend, one `WriteBatch` per unit of work
//! - [`evidence`]: the platform's evidence records and node enrichment
//! - [`engine`]: upsert, auto-linking, bounded subgraph retrieval, search,
//!   chain administration and export
//!
//! ## Example Usage
//!
//! ```rust
//! use fraudgraph::evidence::{InMemoryEvidenceStore, RiskAssessment, RiskLevel, Tip};
//! use fraudgraph::FraudGraph;
//! use std::sync::Arc;
//!
//! let evidence = InMemoryEvidenceStore::new()
//!     .with_tip(Tip {
//!         id: "tip-1".to_string(),
//!         message: "ACME will triple by Friday".to_string(),
//!         source: None,
//!         created_at: 0,
//!     })
//!     .with_assessment(RiskAssessment {
//!         id: "risk-1".to_string(),
//!         tip_id: "tip-1".to_string(),
//!         level: RiskLevel::High,
//!         score: 91.0,
//!         stock_symbols: vec!["ACME".to_string()],
//!         created_at: 0,
//!     });
//! let graph = FraudGraph::in_memory(Arc::new(evidence));
//!
//! // The assessment pulls its tip into the same chain
//! let outcome = graph.upsert_entity("assessment", "risk-1", None, None, true).unwrap();
//! assert_eq!(outcome.nodes_created, 2);
//!
//! let sub = graph.subgraph("tip", "tip-1", Some(1), None).unwrap();
//! assert_eq!(sub.nodes.len(), 2);
//!
//! let groups = graph.search_nodes("acme", None, None).unwrap();
//! assert_eq!(groups[0].count, 2);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod logging;
pub mod persistence;

// Re-export main types for convenience
pub use config::{AutoLinkConfig, ConfigError, EngineConfig, SearchLimits, SubgraphLimits};
pub use engine::{
    AutoLinkReport, ChainComponents, ChainDetail, ChainSummary, ExportFormat, FraudGraph,
    GraphStats, RemovalReport, SearchGroup, Subgraph, UpsertOutcome,
};
pub use error::{ErrorKind, FraudGraphError, FraudGraphResult};
pub use evidence::{EvidenceStore, InMemoryEvidenceStore};
pub use graph::{
    Chain, ChainId, ChainStatus, ChainUpdate, Edge, EdgeId, GraphError, GraphResult, GraphStore,
    Node, NodeId, NodeType, PropertyMap, PropertyValue,
};
pub use persistence::{GraphBackend, MemoryBackend, PersistentStorage, StorageError, StorageResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
