//! Core type definitions for the fraud-chain graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known node types. The vocabulary is open; these are the ones the
/// engine knows how to enrich or link.
pub mod node_types {
    pub const TIP: &str = "tip";
    pub const ASSESSMENT: &str = "assessment";
    pub const DOCUMENT: &str = "document";
    pub const ADVISOR: &str = "advisor";
}

/// Well-known relationship types.
pub mod relationships {
    pub const LEADS_TO: &str = "leads_to";
    pub const MENTIONS: &str = "mentions";
    pub const REFERENCES: &str = "references";
    pub const SIMILAR_PATTERN: &str = "similar_pattern";
    pub const ESCALATES_TO: &str = "escalates_to";
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                $name(id)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a chain
    ChainId
);
numeric_id!(
    /// Unique identifier for a node
    NodeId
);
numeric_id!(
    /// Unique identifier for an edge
    EdgeId
);

/// Node type tag (e.g., "tip", "assessment")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    pub fn new(node_type: impl Into<String>) -> Self {
        NodeType(node_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_tip(&self) -> bool {
        self.0 == node_types::TIP
    }

    pub fn is_assessment(&self) -> bool {
        self.0 == node_types::ASSESSMENT
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        NodeType(s)
    }
}

impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        NodeType(s.to_string())
    }
}

/// Relationship type of an edge (e.g., "leads_to", "similar_pattern")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RelationshipType(String);

impl RelationshipType {
    pub fn new(relationship: impl Into<String>) -> Self {
        RelationshipType(relationship.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RelationshipType {
    fn from(s: String) -> Self {
        RelationshipType(s)
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        RelationshipType(s.to_string())
    }
}

/// Investigation status of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    #[default]
    Active,
    Investigating,
    Closed,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Active => "active",
            ChainStatus::Investigating => "investigating",
            ChainStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ChainStatus::Active),
            "investigating" => Ok(ChainStatus::Investigating),
            "closed" => Ok(ChainStatus::Closed),
            other => Err(format!("unknown chain status '{}'", other)),
        }
    }
}

/// 2-D layout hint for visualization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Current timestamp (Unix milliseconds)
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
