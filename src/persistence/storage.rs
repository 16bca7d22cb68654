//! RocksDB storage layer implementation
//!
//! Column families:
//! - `chains`, `nodes`, `edges`: bincode records keyed by hex id
//! - `indices`: uniqueness key (node_type, reference_id) -> node id
//!
//! Every commit is a single `WriteBatch`, so a change set lands completely
//! or not at all.

use super::{GraphBackend, StorageError, StorageResult};
use crate::graph::{
    Chain, ChainId, ChainStatus, ChangeSet, Edge, EdgeId, GraphSnapshot, Node, NodeId, NodeType,
    Position, PropertyMap, RelationshipType,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const CF_CHAINS: &str = "chains";
const CF_NODES: &str = "nodes";
const CF_EDGES: &str = "edges";
const CF_INDICES: &str = "indices";

/// Serialized chain for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChain {
    id: u64,
    name: Option<String>,
    description: Option<String>,
    status: ChainStatus,
    created_at: i64,
    updated_at: i64,
}

/// Serialized node for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    id: u64,
    chain_id: u64,
    node_type: String,
    reference_id: String,
    label: Option<String>,
    metadata: String, // JSON-encoded PropertyMap
    position: Option<(f64, f64)>,
    created_at: i64,
}

/// Serialized edge for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEdge {
    id: u64,
    chain_id: u64,
    from_node_id: u64,
    to_node_id: u64,
    relationship_type: String,
    confidence: u8,
    metadata: String, // JSON-encoded PropertyMap
    created_at: i64,
}

impl From<&Chain> for StoredChain {
    fn from(chain: &Chain) -> Self {
        StoredChain {
            id: chain.id.as_u64(),
            name: chain.name.clone(),
            description: chain.description.clone(),
            status: chain.status,
            created_at: chain.created_at,
            updated_at: chain.updated_at,
        }
    }
}

impl From<StoredChain> for Chain {
    fn from(stored: StoredChain) -> Self {
        Chain {
            id: ChainId::new(stored.id),
            name: stored.name,
            description: stored.description,
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

impl StoredNode {
    fn encode(node: &Node) -> StorageResult<Self> {
        Ok(StoredNode {
            id: node.id.as_u64(),
            chain_id: node.chain_id.as_u64(),
            node_type: node.node_type.as_str().to_string(),
            reference_id: node.reference_id.clone(),
            label: node.label.clone(),
            metadata: serde_json::to_string(&node.metadata)?,
            position: node.position.map(|p| (p.x, p.y)),
            created_at: node.created_at,
        })
    }

    fn decode(self) -> StorageResult<Node> {
        let metadata: PropertyMap = serde_json::from_str(&self.metadata)?;
        Ok(Node {
            id: NodeId::new(self.id),
            chain_id: ChainId::new(self.chain_id),
            node_type: NodeType::new(self.node_type),
            reference_id: self.reference_id,
            label: self.label,
            metadata,
            position: self.position.map(|(x, y)| Position::new(x, y)),
            created_at: self.created_at,
        })
    }
}

impl StoredEdge {
    fn encode(edge: &Edge) -> StorageResult<Self> {
        Ok(StoredEdge {
            id: edge.id.as_u64(),
            chain_id: edge.chain_id.as_u64(),
            from_node_id: edge.from_node_id.as_u64(),
            to_node_id: edge.to_node_id.as_u64(),
            relationship_type: edge.relationship_type.as_str().to_string(),
            confidence: edge.confidence,
            metadata: serde_json::to_string(&edge.metadata)?,
            created_at: edge.created_at,
        })
    }

    fn decode(self) -> StorageResult<Edge> {
        let metadata: PropertyMap = serde_json::from_str(&self.metadata)?;
        Ok(Edge {
            id: EdgeId::new(self.id),
            chain_id: ChainId::new(self.chain_id),
            from_node_id: NodeId::new(self.from_node_id),
            to_node_id: NodeId::new(self.to_node_id),
            relationship_type: RelationshipType::new(self.relationship_type),
            confidence: self.confidence,
            metadata,
            created_at: self.created_at,
        })
    }
}

/// RocksDB-based persistent storage
pub struct PersistentStorage {
    /// RocksDB instance
    db: DB,
    /// Storage path
    path: String,
    /// Serializes the uniqueness check with the batch write
    commit_lock: Mutex<()>,
}

impl PersistentStorage {
    /// Open or create a new persistent storage
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        info!("Opening persistent storage at: {}", path_str);

        // Configure RocksDB options
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_write_buffer_size(16 * 1024 * 1024); // 16 MB
        opts.set_max_write_buffer_number(3);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CHAINS, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(CF_NODES, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(CF_EDGES, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::index_cf_options()),
        ];

        let db = DB::open_cf_descriptors(&opts, &path_str, cf_descriptors)?;

        info!("Persistent storage opened successfully");

        Ok(Self {
            db,
            path: path_str,
            commit_lock: Mutex::new(()),
        })
    }

    /// Column family options for chain, node and edge records
    fn record_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    /// Column family options for indices
    fn index_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn cf(&self, name: &str) -> StorageResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    /// Node id holding a (node_type, reference_id) identity
    pub fn lookup_reference(&self, node_type: &str, reference_id: &str) -> StorageResult<Option<NodeId>> {
        let cf = self.cf(CF_INDICES)?;
        match self.db.get_cf(cf, Self::reference_key(node_type, reference_id))? {
            Some(value) => Ok(Some(NodeId::new(Self::decode_id(&value)?))),
            None => Ok(None),
        }
    }

    /// Get a node by id
    pub fn get_node(&self, node_id: NodeId) -> StorageResult<Option<Node>> {
        let cf = self.cf(CF_NODES)?;
        match self.db.get_cf(cf, Self::node_key(node_id.as_u64()))? {
            Some(value) => {
                let stored: StoredNode = bincode::deserialize(&value)?;
                Ok(Some(stored.decode()?))
            }
            None => Ok(None),
        }
    }

    /// Get a chain by id
    pub fn get_chain(&self, chain_id: ChainId) -> StorageResult<Option<Chain>> {
        let cf = self.cf(CF_CHAINS)?;
        match self.db.get_cf(cf, Self::chain_key(chain_id.as_u64()))? {
            Some(value) => {
                let stored: StoredChain = bincode::deserialize(&value)?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    /// Reject a change set that would give one identity to two nodes
    ///
    /// Holders removed by the same change set do not count.
    fn check_uniqueness(&self, changes: &ChangeSet) -> StorageResult<()> {
        let removed: HashSet<NodeId> = changes.removed_nodes.iter().map(|n| n.id).collect();
        let mut staged: HashMap<Vec<u8>, NodeId> = HashMap::new();

        for node in &changes.nodes {
            let key = Self::reference_key(node.node_type.as_str(), &node.reference_id);
            if let Some(holder) = staged.insert(key, node.id) {
                if holder != node.id {
                    return Err(StorageError::UniqueViolation {
                        node_type: node.node_type.to_string(),
                        reference_id: node.reference_id.clone(),
                    });
                }
            }
            if let Some(holder) = self.lookup_reference(node.node_type.as_str(), &node.reference_id)? {
                if holder != node.id && !removed.contains(&holder) {
                    return Err(StorageError::UniqueViolation {
                        node_type: node.node_type.to_string(),
                        reference_id: node.reference_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn build_batch(&self, changes: &ChangeSet) -> StorageResult<WriteBatch> {
        let chains_cf = self.cf(CF_CHAINS)?;
        let nodes_cf = self.cf(CF_NODES)?;
        let edges_cf = self.cf(CF_EDGES)?;
        let indices_cf = self.cf(CF_INDICES)?;

        let mut batch = WriteBatch::default();

        for edge in &changes.removed_edges {
            batch.delete_cf(edges_cf, Self::edge_key(edge.id.as_u64()));
        }
        for node in &changes.removed_nodes {
            batch.delete_cf(nodes_cf, Self::node_key(node.id.as_u64()));
            batch.delete_cf(
                indices_cf,
                Self::reference_key(node.node_type.as_str(), &node.reference_id),
            );
        }
        for chain in &changes.removed_chains {
            batch.delete_cf(chains_cf, Self::chain_key(chain.id.as_u64()));
        }

        for chain in &changes.chains {
            let value = bincode::serialize(&StoredChain::from(chain))?;
            batch.put_cf(chains_cf, Self::chain_key(chain.id.as_u64()), value);
        }
        for node in &changes.nodes {
            let value = bincode::serialize(&StoredNode::encode(node)?)?;
            batch.put_cf(nodes_cf, Self::node_key(node.id.as_u64()), value);
            batch.put_cf(
                indices_cf,
                Self::reference_key(node.node_type.as_str(), &node.reference_id),
                node.id.as_u64().to_be_bytes(),
            );
        }
        for edge in &changes.edges {
            let value = bincode::serialize(&StoredEdge::encode(edge)?)?;
            batch.put_cf(edges_cf, Self::edge_key(edge.id.as_u64()), value);
        }

        Ok(batch)
    }

    fn scan_chains(&self) -> StorageResult<Vec<Chain>> {
        let cf = self.cf(CF_CHAINS)?;
        let mut chains = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let stored: StoredChain = bincode::deserialize(&value)?;
            chains.push(stored.into());
        }
        Ok(chains)
    }

    fn scan_nodes(&self) -> StorageResult<Vec<Node>> {
        let cf = self.cf(CF_NODES)?;
        let mut nodes = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let stored: StoredNode = bincode::deserialize(&value)?;
            nodes.push(stored.decode()?);
        }
        Ok(nodes)
    }

    fn scan_edges(&self) -> StorageResult<Vec<Edge>> {
        let cf = self.cf(CF_EDGES)?;
        let mut edges = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let stored: StoredEdge = bincode::deserialize(&value)?;
            edges.push(stored.decode()?);
        }
        Ok(edges)
    }

    fn chain_key(chain_id: u64) -> Vec<u8> {
        format!("c:{:016x}", chain_id).into_bytes()
    }

    fn node_key(node_id: u64) -> Vec<u8> {
        format!("n:{:016x}", node_id).into_bytes()
    }

    fn edge_key(edge_id: u64) -> Vec<u8> {
        format!("e:{:016x}", edge_id).into_bytes()
    }

    /// Length-prefixed so no (type, reference) pair can collide with another
    fn reference_key(node_type: &str, reference_id: &str) -> Vec<u8> {
        format!("u:{}:{}:{}", node_type.len(), node_type, reference_id).into_bytes()
    }

    fn decode_id(bytes: &[u8]) -> StorageResult<u64> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StorageError::Corrupt(format!("index value of {} bytes", bytes.len())))?;
        Ok(u64::from_be_bytes(raw))
    }
}

impl GraphBackend for PersistentStorage {
    fn name(&self) -> &'static str {
        "rocksdb"
    }

    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StorageError::Backend("commit lock poisoned".to_string()))?;

        self.check_uniqueness(changes)?;
        let batch = self.build_batch(changes)?;
        self.db.write(batch)?;

        debug!(records = changes.len(), "Committed change set");
        Ok(())
    }

    fn load(&self) -> StorageResult<GraphSnapshot> {
        let snapshot = GraphSnapshot {
            chains: self.scan_chains()?,
            nodes: self.scan_nodes()?,
            edges: self.scan_edges()?,
        };
        info!(
            chains = snapshot.chains.len(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Loaded graph from storage"
        );
        Ok(snapshot)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        debug!("Flushed storage to disk");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_changes() -> ChangeSet {
        let chain_id = ChainId::new(1);
        let mut metadata = PropertyMap::new();
        metadata.insert("score".to_string(), 92i64.into());
        metadata.insert("symbols".to_string(), vec!["ACME".to_string()].into());

        let mut cs = ChangeSet::new();
        cs.put_chain(Chain::new(chain_id, Some("Case".to_string())));
        cs.put_node(Node::new(NodeId::new(1), chain_id, "tip", "t-1").with_position(Position::new(1.0, 2.0)));
        cs.put_node(Node::new(NodeId::new(2), chain_id, "assessment", "a-1").with_metadata(metadata));
        cs.put_edge(Edge::new(EdgeId::new(1), chain_id, NodeId::new(1), NodeId::new(2), "leads_to").with_confidence(95));
        cs
    }

    #[test]
    fn test_storage_open() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        assert_eq!(storage.name(), "rocksdb");
    }

    #[test]
    fn test_commit_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        let cs = sample_changes();
        storage.commit(&cs).unwrap();

        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.chains, cs.chains);
        assert_eq!(snapshot.nodes, cs.nodes);
        assert_eq!(snapshot.edges, cs.edges);

        assert_eq!(storage.lookup_reference("tip", "t-1").unwrap(), Some(NodeId::new(1)));
        assert_eq!(storage.lookup_reference("tip", "a-1").unwrap(), None);
        let node = storage.get_node(NodeId::new(2)).unwrap().unwrap();
        assert_eq!(node.get_metadata("score").and_then(|v| v.as_integer()), Some(92));
    }

    #[test]
    fn test_unique_violation_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        storage.commit(&sample_changes()).unwrap();

        let mut cs = ChangeSet::new();
        cs.put_chain(Chain::new(ChainId::new(2), None));
        cs.put_node(Node::new(NodeId::new(3), ChainId::new(2), "tip", "t-1"));
        let err = storage.commit(&cs).unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { .. }));

        assert!(storage.get_chain(ChainId::new(2)).unwrap().is_none());
        assert!(storage.get_node(NodeId::new(3)).unwrap().is_none());
    }

    #[test]
    fn test_removal_clears_index() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        let cs = sample_changes();
        storage.commit(&cs).unwrap();

        let removal = ChangeSet {
            removed_chains: cs.chains.clone(),
            removed_nodes: cs.nodes.clone(),
            removed_edges: cs.edges.clone(),
            ..ChangeSet::default()
        };
        storage.commit(&removal).unwrap();

        assert!(storage.load().unwrap().is_empty());
        assert_eq!(storage.lookup_reference("tip", "t-1").unwrap(), None);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = PersistentStorage::open(temp_dir.path()).unwrap();
            storage.commit(&sample_changes()).unwrap();
            storage.flush().unwrap();
        }
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        let snapshot = storage.load().unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges[0].confidence, 95);
    }

    #[test]
    fn test_reference_key_is_unambiguous() {
        assert_ne!(
            PersistentStorage::reference_key("a:b", "c"),
            PersistentStorage::reference_key("a", "b:c")
        );
    }
}
