//! Evidence records and the store the engine reads them from
//!
//! Tips, risk assessments and document checks are owned by the surrounding
//! platform. The graph only holds opaque references to them; this module
//! describes what the engine may ask for when it needs the content.

pub mod enrich;
pub mod memory;

pub use enrich::{Enricher, EnricherRegistry, Enrichment};
pub use memory::InMemoryEvidenceStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Evidence store errors
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid evidence document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Evidence store unavailable: {0}")]
    Unavailable(String),
}

pub type EvidenceResult<T> = Result<T, EvidenceError>;

/// Risk level of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// An investment tip submitted to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

/// Risk scoring of a tip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub id: String,
    pub tip_id: String,
    pub level: RiskLevel,
    /// 0-100
    pub score: f64,
    #[serde(default)]
    pub stock_symbols: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
}

/// Authenticity check of an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCheck {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
    pub score: f64,
}

/// Read access to the platform's evidence
pub trait EvidenceStore: Send + Sync {
    fn tip(&self, id: &str) -> EvidenceResult<Option<Tip>>;

    fn assessment(&self, id: &str) -> EvidenceResult<Option<RiskAssessment>>;

    fn document(&self, id: &str) -> EvidenceResult<Option<DocumentCheck>>;

    /// Assessments of a tip, oldest first
    fn assessments_for_tip(&self, tip_id: &str) -> EvidenceResult<Vec<RiskAssessment>>;

    /// Every tip
    fn tips(&self) -> EvidenceResult<Vec<Tip>>;

    /// Each assessed tip paired with its most recent assessment
    fn assessed_tips(&self) -> EvidenceResult<Vec<(Tip, RiskAssessment)>> {
        let mut pairs = Vec::new();
        for tip in self.tips()? {
            if let Some(latest) = self.assessments_for_tip(&tip.id)?.pop() {
                pairs.push((tip, latest));
            }
        }
        Ok(pairs)
    }
}
