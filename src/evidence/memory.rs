//! In-memory evidence store
//!
//! Backs the demo binary, the CLI and the tests. Loadable from a JSON
//! document of the form `{"tips": [...], "assessments": [...], "documents": [...]}`.

use super::{DocumentCheck, EvidenceResult, EvidenceStore, RiskAssessment, Tip};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct EvidenceFile {
    #[serde(default)]
    tips: Vec<Tip>,
    #[serde(default)]
    assessments: Vec<RiskAssessment>,
    #[serde(default)]
    documents: Vec<DocumentCheck>,
}

/// Evidence kept in insertion order, keyed by id
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvidenceStore {
    tips: IndexMap<String, Tip>,
    assessments: IndexMap<String, RiskAssessment>,
    documents: IndexMap<String, DocumentCheck>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> EvidenceResult<Self> {
        let file: EvidenceFile = serde_json::from_str(json)?;
        let mut store = Self::new();
        for tip in file.tips {
            store.add_tip(tip);
        }
        for assessment in file.assessments {
            store.add_assessment(assessment);
        }
        for document in file.documents {
            store.add_document(document);
        }
        debug!(
            tips = store.tips.len(),
            assessments = store.assessments.len(),
            documents = store.documents.len(),
            "Loaded evidence"
        );
        Ok(store)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> EvidenceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Insert or replace a tip
    pub fn add_tip(&mut self, tip: Tip) {
        self.tips.insert(tip.id.clone(), tip);
    }

    /// Insert or replace an assessment
    pub fn add_assessment(&mut self, assessment: RiskAssessment) {
        self.assessments.insert(assessment.id.clone(), assessment);
    }

    /// Insert or replace a document check
    pub fn add_document(&mut self, document: DocumentCheck) {
        self.documents.insert(document.id.clone(), document);
    }

    pub fn with_tip(mut self, tip: Tip) -> Self {
        self.add_tip(tip);
        self
    }

    pub fn with_assessment(mut self, assessment: RiskAssessment) -> Self {
        self.add_assessment(assessment);
        self
    }

    pub fn with_document(mut self, document: DocumentCheck) -> Self {
        self.add_document(document);
        self
    }

    pub fn len(&self) -> usize {
        self.tips.len() + self.assessments.len() + self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn tip(&self, id: &str) -> EvidenceResult<Option<Tip>> {
        Ok(self.tips.get(id).cloned())
    }

    fn assessment(&self, id: &str) -> EvidenceResult<Option<RiskAssessment>> {
        Ok(self.assessments.get(id).cloned())
    }

    fn document(&self, id: &str) -> EvidenceResult<Option<DocumentCheck>> {
        Ok(self.documents.get(id).cloned())
    }

    fn assessments_for_tip(&self, tip_id: &str) -> EvidenceResult<Vec<RiskAssessment>> {
        let mut found: Vec<RiskAssessment> = self
            .assessments
            .values()
            .filter(|a| a.tip_id == tip_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    fn tips(&self) -> EvidenceResult<Vec<Tip>> {
        Ok(self.tips.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::RiskLevel;

    const SAMPLE: &str = r#"{
        "tips": [
            {"id": "t-1", "message": "ACME to the moon", "source": "telegram", "createdAt": 1},
            {"id": "t-2", "message": "Unassessed tip"}
        ],
        "assessments": [
            {"id": "a-2", "tipId": "t-1", "level": "high", "score": 90, "createdAt": 20},
            {"id": "a-1", "tipId": "t-1", "level": "Medium", "score": 55, "stockSymbols": ["ACME"], "createdAt": 10}
        ],
        "documents": [
            {"id": "d-1", "filename": "contract.pdf", "anomalies": ["font mismatch"], "score": 40}
        ]
    }"#;

    #[test]
    fn test_load_from_json() {
        let store = InMemoryEvidenceStore::from_json_str(SAMPLE).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.tip("t-1").unwrap().unwrap().source.as_deref(), Some("telegram"));
        assert!(store.tip("t-9").unwrap().is_none());
        assert_eq!(store.document("d-1").unwrap().unwrap().anomalies.len(), 1);
    }

    #[test]
    fn test_assessments_oldest_first() {
        let store = InMemoryEvidenceStore::from_json_str(SAMPLE).unwrap();
        let ids: Vec<String> = store
            .assessments_for_tip("t-1")
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["a-1", "a-2"]);
        assert!(store.assessments_for_tip("t-2").unwrap().is_empty());
    }

    #[test]
    fn test_assessed_tips_uses_latest() {
        let store = InMemoryEvidenceStore::from_json_str(SAMPLE).unwrap();
        let pairs = store.assessed_tips().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.id, "t-1");
        assert_eq!(pairs[0].1.id, "a-2");
        assert_eq!(pairs[0].1.level, RiskLevel::High);
    }

    #[test]
    fn test_invalid_json() {
        assert!(InMemoryEvidenceStore::from_json_str("{\"tips\": 3}").is_err());
        assert!(InMemoryEvidenceStore::from_json_str("{}").unwrap().is_empty());
    }
}
