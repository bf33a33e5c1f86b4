//! The remote store, as seen by the engine

use crate::error::RemoteError;
use crate::types::{Deal, DealId, StageId};
use async_trait::async_trait;

/// Remote deal store. The HTTP client lives behind this trait.
#[async_trait]
pub trait PipelineRemote: Send + Sync {
    /// Persist a deal's stage.
    ///
    /// This is the only durable write the engine performs. It carries no
    /// ordering: the server owns stage membership, not order within a stage.
    async fn update_stage(&self, deal: &DealId, stage: &StageId) -> Result<(), RemoteError>;

    /// Fetch every deal. Used for the initial load and explicit refreshes.
    async fn load_deals(&self) -> Result<Vec<Deal>, RemoteError>;
}
