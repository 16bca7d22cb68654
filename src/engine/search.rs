//! Substring search over node content, grouped by chain

use super::FraudGraph;
use crate::error::{FraudGraphError, FraudGraphResult};
use crate::graph::ChainId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Matches within one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGroup {
    pub chain_id: ChainId,
    /// Reference ids of matching nodes, in node id order, capped per chain
    pub reference_ids: Vec<String>,
    /// Number of matching nodes, uncapped
    pub count: usize,
}

impl FraudGraph {
    /// Case-insensitive search over label, node type, reference id and
    /// metadata, optionally restricted to one chain
    ///
    /// Groups are ordered by chain id. No ranking. A scoped chain that does
    /// not exist yields no groups.
    pub fn search_nodes(
        &self,
        query: &str,
        chain_id: Option<ChainId>,
        limit_per_chain: Option<usize>,
    ) -> FraudGraphResult<Vec<SearchGroup>> {
        if query.trim().is_empty() {
            return Err(FraudGraphError::invalid("search query must not be empty"));
        }
        let needle = query.to_lowercase();
        let bounds = &self.config.search;
        let limit = limit_per_chain.unwrap_or(bounds.default_per_chain);
        if limit < 1 || limit > bounds.max_per_chain {
            return Err(FraudGraphError::invalid(format!(
                "limit per chain {} must be within 1..={}",
                limit, bounds.max_per_chain
            )));
        }

        let store = self.read()?;
        let scope: Vec<ChainId> = match chain_id {
            Some(id) => store.get_chain(id).map(|c| c.id).into_iter().collect(),
            None => store.chains().map(|c| c.id).collect(),
        };

        let mut groups = Vec::new();
        for chain in scope {
            let mut group = SearchGroup {
                chain_id: chain,
                reference_ids: Vec::new(),
                count: 0,
            };
            for node in store.chain_nodes(chain) {
                if !node.matches_text(&needle) {
                    continue;
                }
                group.count += 1;
                if group.reference_ids.len() < limit {
                    group.reference_ids.push(node.reference_id.clone());
                }
            }
            if group.count > 0 {
                groups.push(group);
            }
        }

        debug!(query = %needle, groups = groups.len(), "Search finished");
        Ok(groups)
    }
}
