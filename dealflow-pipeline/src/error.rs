//! Error types for the pipeline engine

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a move request was rejected before anything was applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMoveReason {
    /// The deal is not on the board
    #[error("deal is not on the board")]
    UnknownDeal,

    /// The source stage is not part of the pipeline
    #[error("unknown source stage '{stage}'")]
    UnknownSourceStage { stage: String },

    /// The destination stage is not part of the pipeline
    #[error("unknown destination stage '{stage}'")]
    UnknownDestinationStage { stage: String },

    /// The source coordinates do not point at the deal
    #[error("deal is not at {stage}[{index}]")]
    SourceMismatch { stage: String, index: usize },

    /// The destination index is past the end of the destination stage
    #[error("destination index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },
}

/// Errors that can occur in pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or impossible move request, rejected before any mutation
    #[error("invalid move for deal {deal}: {reason}")]
    InvalidMove {
        deal: String,
        reason: InvalidMoveReason,
    },

    /// The board does not hold what the caller expected at a position.
    /// Signals a client-side synchronisation bug.
    #[error("inconsistent board state: expected deal {deal} at {stage}[{index}], found {}", .found.as_deref().unwrap_or("nothing"))]
    InconsistentState {
        deal: String,
        stage: String,
        index: usize,
        found: Option<String>,
    },

    /// Stage not found
    #[error("stage not found: {id}")]
    StageNotFound { id: String },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// Configuration loaded but not usable
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Configuration could not be loaded or parsed
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The remote store failed
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Failures reported by the remote store.
///
/// The reconciler treats every variant the same way: the optimistic move is
/// reverted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport-level failure
    #[error("network error: {message}")]
    Network { message: String },

    /// The server refused the update
    #[error("server rejected update ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No answer within the configured deadline
    #[error("remote call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl RemoteError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a server rejection
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl PipelineError {
    /// Create an invalid move error
    pub fn invalid_move(deal: impl Into<String>, reason: InvalidMoveReason) -> Self {
        Self::InvalidMove {
            deal: deal.into(),
            reason,
        }
    }

    /// Create an inconsistent state error
    pub fn inconsistent(
        deal: impl Into<String>,
        stage: impl Into<String>,
        index: usize,
        found: Option<String>,
    ) -> Self {
        Self::InconsistentState {
            deal: deal.into(),
            stage: stage.into(),
            index,
            found,
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error points at a client-side synchronisation defect
    /// rather than bad input or an unreachable server
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::InconsistentState { .. } | Self::DuplicateId { .. }
        )
    }

    /// Check if this is a rejected move request
    pub fn is_invalid_move(&self) -> bool {
        matches!(self, Self::InvalidMove { .. })
    }
}
