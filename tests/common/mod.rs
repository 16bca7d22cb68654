#![allow(dead_code)]

use fraudgraph::evidence::{InMemoryEvidenceStore, RiskAssessment, RiskLevel, Tip};
use fraudgraph::graph::{ChangeSet, GraphSnapshot};
use fraudgraph::{EngineConfig, FraudGraph, GraphBackend, MemoryBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Memory backend whose Nth non-empty commit fails
pub struct FailingBackend {
    inner: MemoryBackend,
    fail_on: u64,
    seen: AtomicU64,
}

impl FailingBackend {
    pub fn failing_on(fail_on: u64) -> Self {
        FailingBackend {
            inner: MemoryBackend::new(),
            fail_on,
            seen: AtomicU64::new(0),
        }
    }

    pub fn commits(&self) -> u64 {
        self.inner.commits()
    }
}

impl GraphBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StorageError::Backend(format!("injected failure on commit {}", n)));
        }
        self.inner.commit(changes)
    }

    fn load(&self) -> StorageResult<GraphSnapshot> {
        Ok(GraphSnapshot::default())
    }
}

pub fn tip(id: &str, message: &str) -> Tip {
    Tip {
        id: id.to_string(),
        message: message.to_string(),
        source: None,
        created_at: 0,
    }
}

pub fn assessment(id: &str, tip_id: &str, level: RiskLevel, score: f64, symbols: &[&str]) -> RiskAssessment {
    RiskAssessment {
        id: id.to_string(),
        tip_id: tip_id.to_string(),
        level,
        score,
        stock_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        created_at: 0,
    }
}

/// Add tip `t-{n}` assessed by `a-{n}`
pub fn add_assessed(store: &mut InMemoryEvidenceStore, n: u32, level: RiskLevel, score: f64, symbols: &[&str]) {
    let tip_id = format!("t-{:02}", n);
    store.add_tip(tip(&tip_id, &format!("tip number {}", n)));
    store.add_assessment(assessment(&format!("a-{:02}", n), &tip_id, level, score, symbols));
}

pub fn engine(evidence: InMemoryEvidenceStore) -> FraudGraph {
    FraudGraph::in_memory(Arc::new(evidence))
}

pub fn engine_with_backend(evidence: InMemoryEvidenceStore, backend: Arc<dyn GraphBackend>) -> FraudGraph {
    FraudGraph::with_backend(EngineConfig::default(), backend, Arc::new(evidence))
        .expect("backend loads")
}
