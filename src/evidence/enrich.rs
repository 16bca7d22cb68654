//! Label and metadata derived from evidence
//!
//! Each recognized node type has an [`Enricher`] that turns the referenced
//! record into a node label and metadata. Unknown types and missing records
//! yield nothing; the node is still created.

use super::{EvidenceResult, EvidenceStore};
use crate::graph::{node_types, NodeType, PropertyMap, PropertyValue};
use std::collections::HashMap;

/// Longest tip excerpt used as a label
const TIP_LABEL_CHARS: usize = 60;

/// Derived node content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub label: Option<String>,
    pub metadata: PropertyMap,
}

/// Builds an [`Enrichment`] for one node type
pub trait Enricher: Send + Sync {
    fn enrich(&self, evidence: &dyn EvidenceStore, reference_id: &str) -> EvidenceResult<Option<Enrichment>>;
}

/// Whole-number scores are stored as integers
fn score_value(score: f64) -> PropertyValue {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        PropertyValue::Integer(score as i64)
    } else {
        PropertyValue::Float(score)
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= TIP_LABEL_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(TIP_LABEL_CHARS).collect();
    cut.push_str("...");
    cut
}

struct TipEnricher;

impl Enricher for TipEnricher {
    fn enrich(&self, evidence: &dyn EvidenceStore, reference_id: &str) -> EvidenceResult<Option<Enrichment>> {
        let Some(tip) = evidence.tip(reference_id)? else {
            return Ok(None);
        };
        let mut metadata = PropertyMap::new();
        metadata.insert("message".to_string(), tip.message.clone().into());
        if let Some(source) = tip.source {
            metadata.insert("source".to_string(), source.into());
        }
        Ok(Some(Enrichment {
            label: Some(excerpt(&tip.message)),
            metadata,
        }))
    }
}

struct AssessmentEnricher;

impl Enricher for AssessmentEnricher {
    fn enrich(&self, evidence: &dyn EvidenceStore, reference_id: &str) -> EvidenceResult<Option<Enrichment>> {
        let Some(assessment) = evidence.assessment(reference_id)? else {
            return Ok(None);
        };
        let score = score_value(assessment.score);
        let mut metadata = PropertyMap::new();
        metadata.insert("level".to_string(), assessment.level.as_str().into());
        metadata.insert("score".to_string(), score.clone());
        metadata.insert("symbols".to_string(), assessment.stock_symbols.into());
        metadata.insert("tipId".to_string(), assessment.tip_id.into());
        Ok(Some(Enrichment {
            label: Some(format!("{} risk ({})", assessment.level, score)),
            metadata,
        }))
    }
}

struct DocumentEnricher;

impl Enricher for DocumentEnricher {
    fn enrich(&self, evidence: &dyn EvidenceStore, reference_id: &str) -> EvidenceResult<Option<Enrichment>> {
        let Some(document) = evidence.document(reference_id)? else {
            return Ok(None);
        };
        let mut metadata = PropertyMap::new();
        metadata.insert("filename".to_string(), document.filename.clone().into());
        metadata.insert("anomalies".to_string(), document.anomalies.into());
        metadata.insert("score".to_string(), score_value(document.score));
        Ok(Some(Enrichment {
            label: Some(document.filename),
            metadata,
        }))
    }
}

/// Enrichers keyed by node type
#[derive(Default)]
pub struct EnricherRegistry {
    enrichers: HashMap<NodeType, Box<dyn Enricher>>,
}

impl EnricherRegistry {
    /// Registry without any enricher
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enrichers for tips, assessments and documents
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(node_types::TIP, TipEnricher);
        registry.register(node_types::ASSESSMENT, AssessmentEnricher);
        registry.register(node_types::DOCUMENT, DocumentEnricher);
        registry
    }

    pub fn register(&mut self, node_type: impl Into<NodeType>, enricher: impl Enricher + 'static) {
        self.enrichers.insert(node_type.into(), Box::new(enricher));
    }

    pub fn supports(&self, node_type: &NodeType) -> bool {
        self.enrichers.contains_key(node_type)
    }

    /// Enrichment for a reference, or `None` when the type is unknown or the
    /// record does not exist
    pub fn enrich(
        &self,
        node_type: &NodeType,
        evidence: &dyn EvidenceStore,
        reference_id: &str,
    ) -> EvidenceResult<Option<Enrichment>> {
        match self.enrichers.get(node_type) {
            Some(enricher) => enricher.enrich(evidence, reference_id),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for EnricherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.enrichers.keys().map(NodeType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("EnricherRegistry").field("types", &types).finish()
    }
}
