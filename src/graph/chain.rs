//! Chain: the grouping unit of a fraud case
//!
//! A chain owns its nodes and edges. Only name, description and status
//! change in place; everything else is fixed at creation.

use super::types::{now_millis, ChainId, ChainStatus};
use serde::{Deserialize, Serialize};

/// A fraud chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// Unique identifier for this chain
    pub id: ChainId,

    /// Display name
    pub name: Option<String>,

    /// Free-text description
    pub description: Option<String>,

    /// Investigation status
    pub status: ChainStatus,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Chain {
    /// Create a new active chain
    pub fn new(id: ChainId, name: Option<String>) -> Self {
        let now = now_millis();
        Chain {
            id,
            name,
            description: None,
            status: ChainStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("chain {}", self.id.as_u64()),
        }
    }

    /// Apply an administrative update; returns true when anything changed
    pub fn apply_update(&mut self, update: &ChainUpdate) -> bool {
        let mut changed = false;
        if let Some(name) = &update.name {
            if self.name.as_deref() != Some(name.as_str()) {
                self.name = Some(name.clone());
                changed = true;
            }
        }
        if let Some(description) = &update.description {
            if self.description.as_deref() != Some(description.as_str()) {
                self.description = Some(description.clone());
                changed = true;
            }
        }
        if let Some(status) = update.status {
            if self.status != status {
                self.status = status;
                changed = true;
            }
        }
        if changed {
            self.updated_at = now_millis().max(self.updated_at);
        }
        changed
    }
}

/// Fields an administrator may change on a chain. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ChainStatus>,
}

impl ChainUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}
