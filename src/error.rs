//! Public error type of the engine
//!
//! Every operation reports one of three kinds: the thing asked for does not
//! exist, the request is malformed, or the store could not complete it.

use crate::evidence::EvidenceError;
use crate::graph::GraphError;
use crate::persistence::StorageError;
use thiserror::Error;

/// Underlying cause of a [`FraudGraphError::StoreFailure`]
#[derive(Error, Debug)]
pub enum StoreFailure {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error("graph lock poisoned")]
    Poisoned,
}

/// Engine errors
#[derive(Error, Debug)]
pub enum FraudGraphError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreFailure),
}

/// Error kind, for callers that only branch on the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    StoreFailure,
}

impl FraudGraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FraudGraphError::NotFound(_) => ErrorKind::NotFound,
            FraudGraphError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FraudGraphError::StoreFailure(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        FraudGraphError::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        FraudGraphError::InvalidArgument(what.into())
    }
}

impl From<GraphError> for FraudGraphError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::ChainNotFound(_) | GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(_) => {
                FraudGraphError::NotFound(err.to_string())
            }
            GraphError::CrossChainEdge { .. }
            | GraphError::InvalidConfidence(_)
            | GraphError::EmptyReference
            | GraphError::EmptyNodeType => FraudGraphError::InvalidArgument(err.to_string()),
            other => FraudGraphError::StoreFailure(StoreFailure::Graph(other)),
        }
    }
}

impl From<StorageError> for FraudGraphError {
    fn from(err: StorageError) -> Self {
        FraudGraphError::StoreFailure(StoreFailure::Storage(err))
    }
}

impl From<EvidenceError> for FraudGraphError {
    fn from(err: EvidenceError) -> Self {
        FraudGraphError::StoreFailure(StoreFailure::Evidence(err))
    }
}

pub type FraudGraphResult<T> = Result<T, FraudGraphError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ChainId, NodeId, NodeType};

    #[test]
    fn test_graph_error_kinds() {
        let err: FraudGraphError = GraphError::ChainNotFound(ChainId::new(3)).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: FraudGraphError = GraphError::InvalidConfidence(120).into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err: FraudGraphError = GraphError::DuplicateReference {
            node_type: NodeType::new("tip"),
            reference_id: "t".to_string(),
            existing: NodeId::new(1),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StoreFailure);
    }

    #[test]
    fn test_storage_error_is_store_failure() {
        let err: FraudGraphError = StorageError::Backend("disk full".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StoreFailure);
        assert!(err.to_string().contains("disk full"));
    }
}
