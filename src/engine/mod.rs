//! The fraud-chain engine
//!
//! [`FraudGraph`] ties the in-memory [`GraphStore`], a durable
//! [`GraphBackend`] and the platform's [`EvidenceStore`] together. Each
//! public operation runs as one logical transaction:
//!
//! 1. take the store's write lock and stage a [`crate::graph::ChangeSet`]
//! 2. validate it against the store
//! 3. commit it to the backend
//! 4. apply it in memory
//!
//! A failure at any step drops the staged writes, so memory and backend
//! never diverge. Reads share the lock and never block each other.

mod admin;
mod builder;
mod export;
mod linker;
mod search;
mod subgraph;
mod transaction;

pub use admin::{ChainComponents, ChainDetail, ChainSummary, GraphStats, RemovalReport};
pub use builder::UpsertOutcome;
pub use export::ExportFormat;
pub use linker::{plan_clusters, AssessedPair, AutoLinkReport, Cluster, ClusterKind};
pub use search::SearchGroup;
pub use subgraph::Subgraph;

use crate::config::EngineConfig;
use crate::error::{FraudGraphError, FraudGraphResult, StoreFailure};
use crate::evidence::{EnricherRegistry, EvidenceStore};
use crate::graph::GraphStore;
use crate::persistence::{GraphBackend, MemoryBackend, PersistentStorage};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::info;

fn check_config(config: &EngineConfig) -> FraudGraphResult<()> {
    config
        .validate()
        .map_err(|e| FraudGraphError::invalid(e.to_string()))
}

/// Fraud-chain graph engine
pub struct FraudGraph {
    config: EngineConfig,
    store: RwLock<GraphStore>,
    backend: Arc<dyn GraphBackend>,
    evidence: Arc<dyn EvidenceStore>,
    enrichers: EnricherRegistry,
}

impl FraudGraph {
    /// Engine with default configuration and no durability
    pub fn in_memory(evidence: Arc<dyn EvidenceStore>) -> Self {
        FraudGraph {
            config: EngineConfig::default(),
            store: RwLock::new(GraphStore::new()),
            backend: Arc::new(MemoryBackend::new()),
            evidence,
            enrichers: EnricherRegistry::standard(),
        }
    }

    /// Open the backend named by the configuration and recover the graph
    pub fn open(config: EngineConfig, evidence: Arc<dyn EvidenceStore>) -> FraudGraphResult<Self> {
        check_config(&config)?;
        let backend: Arc<dyn GraphBackend> = match &config.data_path {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(crate::persistence::StorageError::from)?;
                Arc::new(PersistentStorage::open(path)?)
            }
            None => Arc::new(MemoryBackend::new()),
        };
        Self::with_backend(config, backend, evidence)
    }

    /// Engine over an explicit backend; the graph is recovered from it
    pub fn with_backend(
        config: EngineConfig,
        backend: Arc<dyn GraphBackend>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> FraudGraphResult<Self> {
        check_config(&config)?;
        let snapshot = backend.load()?;
        let store = GraphStore::recover(snapshot).map_err(StoreFailure::Graph)?;
        info!(
            backend = backend.name(),
            chains = store.chain_count(),
            nodes = store.node_count(),
            edges = store.edge_count(),
            "Fraud graph ready"
        );
        Ok(FraudGraph {
            config,
            store: RwLock::new(store),
            backend,
            evidence,
            enrichers: EnricherRegistry::standard(),
        })
    }

    /// Replace the enrichers used by upsert and auto-link
    pub fn with_enrichers(mut self, enrichers: EnricherRegistry) -> Self {
        self.enrichers = enrichers;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Flush the backend
    pub fn flush(&self) -> FraudGraphResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    pub(crate) fn read(&self) -> FraudGraphResult<RwLockReadGuard<'_, GraphStore>> {
        self.store.read().map_err(|_| StoreFailure::Poisoned.into())
    }
}

impl std::fmt::Debug for FraudGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FraudGraph")
            .field("backend", &self.backend.name())
            .field("enrichers", &self.enrichers)
            .finish()
    }
}
