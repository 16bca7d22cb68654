//! Incremental chain building
//!
//! `upsert_entity` places one piece of evidence in the graph, together with
//! the convenience edges that tie tips and their assessments together.
//! `link_nodes` adds a manual edge between two nodes of one chain.

use super::transaction::GraphTransaction;
use super::FraudGraph;
use crate::error::{FraudGraphError, FraudGraphResult};
use crate::evidence::Enrichment;
use crate::graph::{
    node_types, relationships, ChainId, Edge, NodeId, NodeType, PropertyMap, DEFAULT_CONFIDENCE,
    MAX_CONFIDENCE,
};
use serde::Serialize;
use tracing::{debug, info};

/// Confidence of edges the builder adds between a tip and its assessments
const TIP_ASSESSMENT_CONFIDENCE: u8 = 95;

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    /// Chain holding the node
    pub chain_id: ChainId,
    /// The upserted node
    pub node_id: NodeId,
    /// False when the node already existed
    pub created: bool,
    pub nodes_created: usize,
    pub edges_created: usize,
}

fn default_chain_name() -> String {
    format!("Fraud Chain {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"))
}

impl FraudGraph {
    /// Insert a node for `(node_type, reference_id)` unless one exists
    ///
    /// An existing node is returned unchanged, wherever it lives. Otherwise
    /// the node goes into `target_chain_id` or, when `create_if_missing` is
    /// set and no existing chain was given, into a new chain. Assessments pull
    /// in their tip; tips pull in up to `auto_link.tip_fanout` assessments.
    pub fn upsert_entity(
        &self,
        node_type: &str,
        reference_id: &str,
        label: Option<&str>,
        target_chain_id: Option<ChainId>,
        create_if_missing: bool,
    ) -> FraudGraphResult<UpsertOutcome> {
        let node_type = node_type.trim();
        let reference_id = reference_id.trim();
        if node_type.is_empty() {
            return Err(FraudGraphError::invalid("node type must not be empty"));
        }
        if reference_id.is_empty() {
            return Err(FraudGraphError::invalid("reference id must not be empty"));
        }
        if !self.config.accepts_node_type(node_type) {
            return Err(FraudGraphError::invalid(format!("unsupported node type '{}'", node_type)));
        }
        let node_type = NodeType::new(node_type);

        let mut tx = GraphTransaction::begin(self)?;

        if let Some(existing) = tx.store().find_node(node_type.as_str(), reference_id) {
            debug!(node = %existing.id, chain = %existing.chain_id, "Entity already graphed");
            return Ok(UpsertOutcome {
                chain_id: existing.chain_id,
                node_id: existing.id,
                created: false,
                nodes_created: 0,
                edges_created: 0,
            });
        }

        let chain_id = match target_chain_id {
            Some(id) if tx.chain_exists(id) => id,
            Some(id) if !create_if_missing => {
                return Err(FraudGraphError::not_found(format!("chain {}", id.as_u64())));
            }
            None if !create_if_missing => {
                return Err(FraudGraphError::not_found(
                    "no target chain given and chain creation not allowed",
                ));
            }
            _ => tx.create_chain(Some(default_chain_name()), None),
        };

        let enrichment = self.enrichment(&node_type, reference_id)?;
        let label = label.map(str::to_string).or(enrichment.label);
        let node_id = tx.create_node(chain_id, node_type.clone(), reference_id, label, enrichment.metadata, None);

        if node_type.is_assessment() {
            self.attach_parent_tip(&mut tx, chain_id, node_id, reference_id)?;
        } else if node_type.is_tip() {
            self.attach_assessments(&mut tx, chain_id, node_id, reference_id)?;
        }

        let changes = tx.commit()?;
        let outcome = UpsertOutcome {
            chain_id,
            node_id,
            created: true,
            nodes_created: changes.nodes.len(),
            edges_created: changes.edges.len(),
        };
        info!(
            node_type = %node_type,
            reference_id,
            chain = %chain_id,
            nodes = outcome.nodes_created,
            edges = outcome.edges_created,
            "Upserted entity"
        );
        Ok(outcome)
    }

    /// Manual edge between two nodes of the same chain
    ///
    /// An edge with the same direction and relationship is returned as is.
    pub fn link_nodes(
        &self,
        from: NodeId,
        to: NodeId,
        relationship: &str,
        confidence: Option<u8>,
        metadata: PropertyMap,
    ) -> FraudGraphResult<Edge> {
        let relationship = relationship.trim();
        if relationship.is_empty() {
            return Err(FraudGraphError::invalid("relationship type must not be empty"));
        }
        let confidence = confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if confidence > MAX_CONFIDENCE {
            return Err(FraudGraphError::invalid(format!(
                "confidence {} is outside 0-{}",
                confidence, MAX_CONFIDENCE
            )));
        }

        let mut tx = GraphTransaction::begin(self)?;
        let source = tx
            .node(from)
            .ok_or_else(|| FraudGraphError::not_found(format!("node {}", from.as_u64())))?;
        let target = tx
            .node(to)
            .ok_or_else(|| FraudGraphError::not_found(format!("node {}", to.as_u64())))?;
        if source.chain_id != target.chain_id {
            return Err(FraudGraphError::invalid(format!(
                "nodes {} and {} belong to different chains",
                from.as_u64(),
                to.as_u64()
            )));
        }

        let Some(edge_id) = tx.link(source.chain_id, from, to, relationship, confidence, metadata) else {
            let existing = tx.find_edge(from, to, &relationship.into());
            return existing.ok_or_else(|| FraudGraphError::not_found("edge"));
        };
        let edge = tx
            .edge(edge_id)
            .ok_or_else(|| FraudGraphError::not_found(format!("edge {}", edge_id.as_u64())))?;
        tx.commit()?;

        info!(edge = %edge.id, chain = %edge.chain_id, relationship, "Linked nodes");
        Ok(edge)
    }

    pub(crate) fn enrichment(&self, node_type: &NodeType, reference_id: &str) -> FraudGraphResult<Enrichment> {
        Ok(self
            .enrichers
            .enrich(node_type, self.evidence.as_ref(), reference_id)?
            .unwrap_or_default())
    }

    /// Node for `(node_type, reference_id)` in `chain_id`, created when absent
    ///
    /// Returns `None` when the entity already lives in another chain.
    fn node_in_chain(
        &self,
        tx: &mut GraphTransaction<'_>,
        chain_id: ChainId,
        node_type: &str,
        reference_id: &str,
    ) -> FraudGraphResult<Option<NodeId>> {
        let node_type = NodeType::new(node_type);
        if let Some(existing) = tx.find_node(&node_type, reference_id) {
            if existing.chain_id == chain_id {
                return Ok(Some(existing.id));
            }
            debug!(
                node = %existing.id,
                chain = %existing.chain_id,
                target = %chain_id,
                "Related entity lives in another chain, not linking"
            );
            return Ok(None);
        }
        let enrichment = self.enrichment(&node_type, reference_id)?;
        let id = tx.create_node(chain_id, node_type, reference_id, enrichment.label, enrichment.metadata, None);
        Ok(Some(id))
    }

    fn attach_parent_tip(
        &self,
        tx: &mut GraphTransaction<'_>,
        chain_id: ChainId,
        assessment_node: NodeId,
        assessment_id: &str,
    ) -> FraudGraphResult<()> {
        let Some(assessment) = self.evidence.assessment(assessment_id)? else {
            return Ok(());
        };
        if let Some(tip_node) = self.node_in_chain(tx, chain_id, node_types::TIP, &assessment.tip_id)? {
            tx.link(
                chain_id,
                tip_node,
                assessment_node,
                relationships::LEADS_TO,
                TIP_ASSESSMENT_CONFIDENCE,
                PropertyMap::new(),
            );
        }
        Ok(())
    }

    fn attach_assessments(
        &self,
        tx: &mut GraphTransaction<'_>,
        chain_id: ChainId,
        tip_node: NodeId,
        tip_id: &str,
    ) -> FraudGraphResult<()> {
        let assessments = self.evidence.assessments_for_tip(tip_id)?;
        for assessment in assessments.iter().take(self.config.auto_link.tip_fanout) {
            if let Some(node) = self.node_in_chain(tx, chain_id, node_types::ASSESSMENT, &assessment.id)? {
                tx.link(
                    chain_id,
                    tip_node,
                    node,
                    relationships::LEADS_TO,
                    TIP_ASSESSMENT_CONFIDENCE,
                    PropertyMap::new(),
                );
            }
        }
        Ok(())
    }
}
