//! Auto-linking of ungraphed evidence
//!
//! Assessed tips that have no node yet are partitioned into clusters:
//! - primary: tips sharing a stock symbol
//! - secondary: symbol-less tips assessed at the configured high-risk level
//!
//! Each cluster becomes one new chain, committed in its own transaction, so
//! a failing cluster does not undo the others.

use super::transaction::GraphTransaction;
use super::FraudGraph;
use crate::config::AutoLinkConfig;
use crate::error::FraudGraphResult;
use crate::evidence::{RiskAssessment, Tip};
use crate::graph::{node_types, relationships, ChainId, NodeId, NodeType, Position, PropertyMap};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const PAIR_CONFIDENCE: u8 = 100;
const PATTERN_CONFIDENCE: u8 = 75;

/// Outcome of an auto-link run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLinkReport {
    pub chains_created: usize,
    pub links_added: usize,
    /// Chains created by this run, in cluster order
    pub chain_ids: Vec<ChainId>,
    /// Names of clusters whose transaction failed
    pub failed_clusters: Vec<String>,
}

/// A tip with the assessment used for clustering
#[derive(Debug, Clone, PartialEq)]
pub struct AssessedPair {
    pub tip: Tip,
    pub assessment: RiskAssessment,
    /// Trimmed, upper-cased, de-duplicated stock symbols
    pub symbols: Vec<String>,
}

impl AssessedPair {
    pub fn new(tip: Tip, assessment: RiskAssessment) -> Self {
        let mut symbols: Vec<String> = Vec::new();
        for raw in &assessment.stock_symbols {
            let symbol = raw.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        AssessedPair {
            tip,
            assessment,
            symbols,
        }
    }
}

/// Why a cluster was formed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterKind {
    /// Pairs sharing this stock symbol
    Symbol(String),
    /// Symbol-less high-risk pairs
    HighRisk,
}

/// Pairs destined for one new chain
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub kind: ClusterKind,
    /// Ordered by tip id
    pub pairs: Vec<AssessedPair>,
}

impl Cluster {
    pub fn chain_name(&self) -> String {
        match &self.kind {
            ClusterKind::Symbol(symbol) => format!("Stock Symbol Chain: {}", symbol),
            ClusterKind::HighRisk => "High-Risk Fraud Pattern".to_string(),
        }
    }

    /// Fewest pairs this kind of cluster may hold
    pub fn min_pairs(&self, config: &AutoLinkConfig) -> usize {
        match self.kind {
            ClusterKind::Symbol(_) => config.min_symbol_pairs,
            ClusterKind::HighRisk => config.min_high_risk_pairs,
        }
    }

    fn description(&self) -> String {
        match &self.kind {
            ClusterKind::Symbol(symbol) => {
                format!("{} tips mentioning {}", self.pairs.len(), symbol)
            }
            ClusterKind::HighRisk => {
                format!("{} high-risk tips without stock symbols", self.pairs.len())
            }
        }
    }

    fn pattern_metadata(&self) -> PropertyMap {
        let mut metadata = PropertyMap::new();
        match &self.kind {
            ClusterKind::Symbol(symbol) => {
                metadata.insert("reason".to_string(), "shared_symbol".into());
                metadata.insert("symbol".to_string(), symbol.as_str().into());
            }
            ClusterKind::HighRisk => {
                metadata.insert("reason".to_string(), "high_risk_pattern".into());
            }
        }
        metadata
    }
}

/// Partition pairs into clusters
///
/// Deterministic: pairs are ordered by tip id and symbols are visited in
/// sorted order. A pair joins the first symbol cluster that still has at
/// least `min_symbol_pairs` unclaimed members; pairs nobody claims stay out.
pub fn plan_clusters(pairs: Vec<(Tip, RiskAssessment)>, config: &AutoLinkConfig) -> Vec<Cluster> {
    let mut pairs: Vec<AssessedPair> = pairs
        .into_iter()
        .map(|(tip, assessment)| AssessedPair::new(tip, assessment))
        .collect();
    pairs.sort_by(|a, b| a.tip.id.cmp(&b.tip.id));

    let mut by_symbol: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, pair) in pairs.iter().enumerate() {
        for symbol in &pair.symbols {
            by_symbol.entry(symbol.as_str()).or_default().push(idx);
        }
    }

    let mut claimed = vec![false; pairs.len()];
    let mut plan: Vec<(ClusterKind, Vec<usize>)> = Vec::new();

    for (symbol, members) in &by_symbol {
        let free: Vec<usize> = members.iter().copied().filter(|&i| !claimed[i]).collect();
        if free.len() < config.min_symbol_pairs {
            continue;
        }
        for &i in &free {
            claimed[i] = true;
        }
        plan.push((ClusterKind::Symbol(symbol.to_string()), free));
    }

    let high_risk: Vec<usize> = pairs
        .iter()
        .enumerate()
        .filter(|(i, pair)| {
            !claimed[*i]
                && pair.symbols.is_empty()
                && pair.assessment.level == config.high_risk_level
                && pair.assessment.score >= config.high_risk_min_score
        })
        .map(|(i, _)| i)
        .collect();
    if high_risk.len() >= config.min_high_risk_pairs {
        plan.push((ClusterKind::HighRisk, high_risk));
    }

    plan.into_iter()
        .map(|(kind, members)| Cluster {
            kind,
            pairs: members.into_iter().map(|i| pairs[i].clone()).collect(),
        })
        .collect()
}

impl FraudGraph {
    /// Cluster ungraphed assessed tips into new chains
    pub fn auto_link_unclustered_evidence(&self) -> FraudGraphResult<AutoLinkReport> {
        let assessed = self.evidence.assessed_tips()?;
        let candidates: Vec<(Tip, RiskAssessment)> = {
            let store = self.read()?;
            assessed
                .into_iter()
                .filter(|(tip, assessment)| {
                    store.find_node(node_types::TIP, &tip.id).is_none()
                        && store.find_node(node_types::ASSESSMENT, &assessment.id).is_none()
                })
                .collect()
        };
        debug!(candidates = candidates.len(), "Auto-link candidates");

        let clusters = plan_clusters(candidates, &self.config.auto_link);
        let mut report = AutoLinkReport::default();

        for cluster in &clusters {
            match self.materialize_cluster(cluster) {
                Ok(Some((chain_id, links))) => {
                    report.chains_created += 1;
                    report.links_added += links;
                    report.chain_ids.push(chain_id);
                }
                Ok(None) => {
                    debug!(cluster = %cluster.chain_name(), "Cluster already graphed, skipped");
                }
                Err(err) => {
                    warn!(cluster = %cluster.chain_name(), error = %err, "Cluster failed, its writes were discarded");
                    report.failed_clusters.push(cluster.chain_name());
                }
            }
        }

        info!(
            chains = report.chains_created,
            links = report.links_added,
            failed = report.failed_clusters.len(),
            "Auto-link finished"
        );
        Ok(report)
    }

    /// Create the chain of one cluster; returns the chain and its edge count
    fn materialize_cluster(&self, cluster: &Cluster) -> FraudGraphResult<Option<(ChainId, usize)>> {
        let mut tx = GraphTransaction::begin(self)?;
        let tip_type = NodeType::new(node_types::TIP);
        let assessment_type = NodeType::new(node_types::ASSESSMENT);

        // Another writer may have graphed some pairs since the scan
        let pairs: Vec<&AssessedPair> = cluster
            .pairs
            .iter()
            .filter(|p| {
                tx.find_node(&tip_type, &p.tip.id).is_none()
                    && tx.find_node(&assessment_type, &p.assessment.id).is_none()
            })
            .collect();
        let layout = &self.config.auto_link;
        if pairs.len() < cluster.min_pairs(layout) {
            return Ok(None);
        }

        let chain_id = tx.create_chain(Some(cluster.chain_name()), Some(cluster.description()));
        let mut previous_tip: Option<NodeId> = None;

        for (i, pair) in pairs.iter().enumerate() {
            let (tip_pos, assessment_pos) = grid_positions(i, layout);

            let tip = self.enrichment(&tip_type, &pair.tip.id)?;
            let tip_node = tx.create_node(
                chain_id,
                tip_type.clone(),
                &pair.tip.id,
                tip.label,
                tip.metadata,
                Some(tip_pos),
            );
            let assessment = self.enrichment(&assessment_type, &pair.assessment.id)?;
            let assessment_node = tx.create_node(
                chain_id,
                assessment_type.clone(),
                &pair.assessment.id,
                assessment.label,
                assessment.metadata,
                Some(assessment_pos),
            );

            tx.link(
                chain_id,
                tip_node,
                assessment_node,
                relationships::LEADS_TO,
                PAIR_CONFIDENCE,
                PropertyMap::new(),
            );
            if let Some(prev) = previous_tip {
                tx.link(
                    chain_id,
                    prev,
                    tip_node,
                    relationships::SIMILAR_PATTERN,
                    PATTERN_CONFIDENCE,
                    cluster.pattern_metadata(),
                );
            }
            previous_tip = Some(tip_node);
        }

        let changes = tx.commit()?;
        info!(
            chain = %chain_id,
            name = %cluster.chain_name(),
            pairs = pairs.len(),
            edges = changes.edges.len(),
            "Created chain from cluster"
        );
        Ok(Some((chain_id, changes.edges.len())))
    }
}

/// Tip above its assessment, `grid_columns` pairs per row
fn grid_positions(index: usize, layout: &AutoLinkConfig) -> (Position, Position) {
    let column = (index % layout.grid_columns) as f64;
    let row = (index / layout.grid_columns) as f64;
    let x = 100.0 + column * layout.grid_spacing_x;
    let y = 100.0 + row * 2.0 * layout.grid_spacing_y;
    (Position::new(x, y), Position::new(x, y + layout.grid_spacing_y))
}
